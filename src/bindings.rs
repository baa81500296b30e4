//! Binding descriptors and the classifiers that build them.
//!
//! A tag node is classified once, in priority order: `each`, `if`, nested
//! component, simple (dynamic attributes or text), static. Structural bindings
//! own a sub-template built from a stripped copy of the node.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::options::ExpressionType;
use crate::scope::{merge_segments, scopeify, Evaluator};
use crate::transform::TemplateBuilder;
use crate::validate::{AttributeIR, CompilerError, Segment, TagNode, TemplateNode};

pub const EACH_DIRECTIVE: &str = "each";
pub const IF_DIRECTIVE: &str = "if";
pub const KEY_ATTRIBUTE: &str = "key";
pub const SLOT_ATTRIBUTE: &str = "slot";
pub const IS_ATTRIBUTE: &str = "is";
pub const DEFAULT_SLOT: &str = "default";

/// Attributes never forwarded to a nested component.
const TAG_EXCLUDED_ATTRIBUTES: [&str; 5] = [
    EACH_DIRECTIVE,
    IF_DIRECTIVE,
    KEY_ATTRIBUTE,
    SLOT_ATTRIBUTE,
    IS_ATTRIBUTE,
];

/// Hyphenated names reserved by SVG and MathML.
const RESERVED_CUSTOM_NAMES: [&str; 8] = [
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

lazy_static! {
    static ref EACH_PATTERN: Regex =
        Regex::new(r"^\s*\(?\s*([$\w]+)\s*(?:,\s*([$\w]+))?\s*\)?\s*\bin\s+([\s\S]+)$")
            .expect("each pattern is valid");
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingType {
    Simple,
    If,
    Each,
    Tag,
}

impl BindingType {
    pub fn as_str(self) -> &'static str {
        match self {
            BindingType::Simple => "SIMPLE",
            BindingType::If => "IF",
            BindingType::Each => "EACH",
            BindingType::Tag => "TAG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionDescriptor {
    #[serde(rename = "type")]
    pub kind: ExpressionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_node_index: Option<usize>,
    pub evaluate: Evaluator,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Template {
    pub html: String,
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub id: String,
    pub html: String,
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// `None` only for text placed directly at a template root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redundant_attribute: Option<String>,
    #[serde(flatten)]
    pub kind: BindingKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingKind {
    Simple(SimpleBinding),
    If(IfBinding),
    Each(EachBinding),
    Tag(TagBinding),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleBinding {
    pub expressions: Vec<ExpressionDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfBinding {
    pub evaluate: Evaluator,
    pub template: Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EachBinding {
    pub evaluate: Evaluator,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Evaluator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_key: Option<Evaluator>,
    pub template: Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagBinding {
    pub name: String,
    pub attributes: Vec<ExpressionDescriptor>,
    pub slots: Vec<Slot>,
}

impl Binding {
    pub fn binding_type(&self) -> BindingType {
        match &self.kind {
            BindingKind::Simple(_) => BindingType::Simple,
            BindingKind::If(_) => BindingType::If,
            BindingKind::Each(_) => BindingType::Each,
            BindingKind::Tag(_) => BindingType::Tag,
        }
    }

    fn for_marker(marker: &str, kind: BindingKind) -> Self {
        Binding {
            selector: Some(crate::marker::selector_for(marker)),
            redundant_attribute: Some(marker.to_string()),
            kind,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Each,
    If,
    Tag(String),
    Simple,
    Static,
}

pub fn is_void_tag(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "keygen"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_custom_tag(name: &str) -> bool {
    let starts_uppercase = name.chars().next().map_or(false, |c| c.is_ascii_uppercase());
    let custom_element = name.contains('-')
        && !RESERVED_CUSTOM_NAMES.contains(&name.to_ascii_lowercase().as_str());
    starts_uppercase || custom_element
}

/// Component identifier of a tag, if it instantiates a nested component.
pub fn component_name(tag: &TagNode) -> Option<String> {
    if let Some(is) = tag.attribute(IS_ATTRIBUTE) {
        if let (Some(value), false) = (&is.value, is.is_dynamic()) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    is_custom_tag(&tag.name).then(|| tag.name.clone())
}

pub fn has_dynamic_text(tag: &TagNode) -> bool {
    !is_void_tag(&tag.name)
        && tag.children.iter().any(|child| match child {
            TemplateNode::Text(text) => !text.expressions.is_empty(),
            TemplateNode::Expression(_) => true,
            TemplateNode::Tag(_) => false,
        })
}

pub fn classify(tag: &TagNode) -> NodeKind {
    if tag.has_attribute(EACH_DIRECTIVE) {
        NodeKind::Each
    } else if tag.has_attribute(IF_DIRECTIVE) {
        NodeKind::If
    } else if let Some(name) = component_name(tag) {
        NodeKind::Tag(name)
    } else if tag.attributes.iter().any(AttributeIR::is_dynamic) || has_dynamic_text(tag) {
        NodeKind::Simple
    } else {
        NodeKind::Static
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluator of a directive. A plain string value is read as an expression.
fn directive_evaluator(
    builder: &TemplateBuilder<'_>,
    tag: &TagNode,
    attribute: &AttributeIR,
) -> Result<Evaluator, CompilerError> {
    let source = directive_source(builder, tag, attribute)?;
    scopeify(source).map_err(|e| builder.expression_error(e, source, &attribute.location))
}

/// Expression source of a directive: a single bracketed span, or the raw value.
fn directive_source<'n>(
    builder: &TemplateBuilder<'_>,
    tag: &TagNode,
    attribute: &'n AttributeIR,
) -> Result<&'n str, CompilerError> {
    let Some(value) = &attribute.value else {
        return Err(builder.directive_error(
            &format!("`{}` on <{}> needs a value.", attribute.name, tag.name),
            &attribute.location,
        ));
    };
    if !attribute.is_dynamic() {
        return Ok(value.as_str());
    }

    match attribute.segments().as_slice() {
        [Segment::Expression(source)] => Ok(*source),
        _ => Err(builder.directive_error(
            &format!(
                "`{}` on <{}> must be a single expression.",
                attribute.name, tag.name
            ),
            &attribute.location,
        )),
    }
}

/// Evaluator of a forwarded or simple attribute value.
pub(crate) fn attribute_evaluator(
    builder: &TemplateBuilder<'_>,
    attribute: &AttributeIR,
) -> Result<Evaluator, CompilerError> {
    if !attribute.is_dynamic() {
        return Ok(match &attribute.value {
            Some(value) => Evaluator::constant(value),
            None => Evaluator::boolean(true),
        });
    }
    let source = attribute.value.as_deref().unwrap_or_default();
    merge_segments(&attribute.segments())
        .map_err(|e| builder.expression_error(e, source, &attribute.location))
}

pub(crate) fn simple_binding(
    builder: &TemplateBuilder<'_>,
    tag: &TagNode,
    marker: &str,
    text_expressions: Vec<ExpressionDescriptor>,
) -> Result<Binding, CompilerError> {
    let mut expressions = Vec::new();
    for attribute in tag.attributes.iter().filter(|attr| attr.is_dynamic()) {
        expressions.push(ExpressionDescriptor {
            kind: builder.policy().attribute_kind(&attribute.name),
            name: Some(attribute.name.clone()),
            child_node_index: None,
            evaluate: attribute_evaluator(builder, attribute)?,
        });
    }
    expressions.extend(text_expressions);

    Ok(Binding::for_marker(
        marker,
        BindingKind::Simple(SimpleBinding { expressions }),
    ))
}

pub(crate) fn if_binding(
    builder: &mut TemplateBuilder<'_>,
    tag: &TagNode,
    marker: &str,
) -> Result<Binding, CompilerError> {
    let Some(directive) = tag.attribute(IF_DIRECTIVE) else {
        return Err(builder.directive_error("missing `if` directive", &tag.location));
    };
    let evaluate = directive_evaluator(builder, tag, directive)?;

    let stripped = tag.without_attributes(&[IF_DIRECTIVE]);
    let template = builder.build_template(&[TemplateNode::Tag(stripped)])?;

    Ok(Binding::for_marker(
        marker,
        BindingKind::If(IfBinding { evaluate, template }),
    ))
}

pub(crate) fn each_binding(
    builder: &mut TemplateBuilder<'_>,
    tag: &TagNode,
    marker: &str,
) -> Result<Binding, CompilerError> {
    let Some(directive) = tag.attribute(EACH_DIRECTIVE) else {
        return Err(builder.directive_error("missing `each` directive", &tag.location));
    };
    let source = directive_source(builder, tag, directive)?;

    let Some(captures) = EACH_PATTERN.captures(source) else {
        return Err(builder.directive_error(
            &format!(
                "`each` on <{}> must read `item in items` or `(item, index) in items`, got `{}`.",
                tag.name,
                source.trim()
            ),
            &directive.location,
        ));
    };
    let item_name = captures[1].to_string();
    let index_name = captures.get(2).map(|m| m.as_str().to_string());
    let collection = captures.get(3).map_or("", |m| m.as_str());

    let evaluate = scopeify(collection)
        .map_err(|e| builder.expression_error(e, collection, &directive.location))?;

    let condition = match tag.attribute(IF_DIRECTIVE) {
        Some(attr) => Some(directive_evaluator(builder, tag, attr)?),
        None => None,
    };
    let get_key = match tag.attribute(KEY_ATTRIBUTE) {
        Some(attr) => Some(directive_evaluator(builder, tag, attr)?),
        None => None,
    };

    let stripped = tag.without_attributes(&[EACH_DIRECTIVE, IF_DIRECTIVE, KEY_ATTRIBUTE]);
    let template = builder.build_template(&[TemplateNode::Tag(stripped)])?;

    Ok(Binding::for_marker(
        marker,
        BindingKind::Each(EachBinding {
            evaluate,
            item_name,
            index_name,
            condition,
            get_key,
            template,
        }),
    ))
}

pub(crate) fn tag_binding(
    builder: &mut TemplateBuilder<'_>,
    tag: &TagNode,
    name: &str,
    marker: &str,
) -> Result<Binding, CompilerError> {
    let mut attributes = Vec::new();
    for attribute in &tag.attributes {
        if TAG_EXCLUDED_ATTRIBUTES.contains(&attribute.name.as_str()) {
            continue;
        }
        attributes.push(ExpressionDescriptor {
            kind: ExpressionType::Attribute,
            name: Some(attribute.name.clone()),
            child_node_index: None,
            evaluate: attribute_evaluator(builder, attribute)?,
        });
    }

    let mut slots = Vec::new();
    for (id, nodes) in partition_slots(builder, &tag.children)? {
        let template = builder.build_template(&nodes)?;
        slots.push(Slot {
            id,
            html: template.html,
            bindings: template.bindings,
        });
    }

    Ok(Binding::for_marker(
        marker,
        BindingKind::Tag(TagBinding {
            name: name.to_string(),
            attributes,
            slots,
        }),
    ))
}

fn is_blank_text(node: &TemplateNode) -> bool {
    match node {
        TemplateNode::Text(text) => text.expressions.is_empty() && text.text.trim().is_empty(),
        _ => false,
    }
}

/// Whether the node at `index` sits between two text or expression siblings.
fn inside_text_run(children: &[TemplateNode], index: usize) -> bool {
    let is_text = |node: Option<&TemplateNode>| {
        matches!(node, Some(TemplateNode::Text(_) | TemplateNode::Expression(_)))
    };
    index > 0 && is_text(children.get(index - 1)) && is_text(children.get(index + 1))
}

/// Splits component children into slots, in order of first appearance.
fn partition_slots(
    builder: &TemplateBuilder<'_>,
    children: &[TemplateNode],
) -> Result<Vec<(String, Vec<TemplateNode>)>, CompilerError> {
    let mut slots: Vec<(String, Vec<TemplateNode>)> = Vec::new();

    for (i, child) in children.iter().enumerate() {
        if is_blank_text(child) && !inside_text_run(children, i) {
            continue;
        }

        let (id, node) = match child {
            TemplateNode::Tag(tag) => match tag.attribute(SLOT_ATTRIBUTE) {
                Some(slot) => match (&slot.value, slot.is_dynamic()) {
                    (Some(value), false) if !value.trim().is_empty() => (
                        value.trim().to_string(),
                        TemplateNode::Tag(tag.without_attributes(&[SLOT_ATTRIBUTE])),
                    ),
                    _ => {
                        return Err(builder.directive_error(
                            &format!("`slot` on <{}> must be a static name.", tag.name),
                            &slot.location,
                        ))
                    }
                },
                None => (DEFAULT_SLOT.to_string(), child.clone()),
            },
            _ => (DEFAULT_SLOT.to_string(), child.clone()),
        };

        match slots.iter_mut().find(|(slot_id, _)| *slot_id == id) {
            Some((_, nodes)) => nodes.push(node),
            None => slots.push((id, vec![node])),
        }
    }

    Ok(slots)
}
