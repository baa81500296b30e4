//! Tree builder: walks the node tree and produces the skeleton markup and its bindings.

use log::trace;

use crate::bindings::{
    classify, each_binding, if_binding, is_void_tag, simple_binding, tag_binding, Binding,
    BindingKind, ExpressionDescriptor, NodeKind, SimpleBinding, Template,
};
use crate::marker::MarkerAllocator;
use crate::options::{CompileOptions, ExpressionPolicy, ExpressionType};
use crate::scope::{merge_segments, ScopeError};
use crate::validate::{
    split_segments, validate_template, CompilerError, Segment, SourceLocation, TagNode,
    TemplateNode, TemplateRoot, ERR_INVALID_DIRECTIVE,
};

/// Comment placeholder replaced at runtime by a dynamic text run.
pub const TEXT_PLACEHOLDER: &str = "<!---->";

/// Per-compile builder state. Owns the marker allocator for the whole component,
/// nested templates and slots included.
pub struct TemplateBuilder<'a> {
    markers: MarkerAllocator,
    options: &'a CompileOptions,
    policy: &'a dyn ExpressionPolicy,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(options: &'a CompileOptions, policy: &'a dyn ExpressionPolicy) -> Self {
        TemplateBuilder {
            markers: MarkerAllocator::new(&options.marker_prefix),
            options,
            policy,
        }
    }

    /// Validates and compiles a root. A missing root compiles to an empty template.
    pub fn build(&mut self, root: Option<&TemplateRoot>) -> Result<Template, CompilerError> {
        let Some(root) = root else {
            return Ok(Template::default());
        };
        validate_template(root, &self.options.file_path)?;
        self.build_template(&root.nodes)
    }

    pub fn markers_allocated(&self) -> usize {
        self.markers.allocated()
    }

    pub(crate) fn policy(&self) -> &dyn ExpressionPolicy {
        self.policy
    }

    pub(crate) fn expression_error(
        &self,
        error: ScopeError,
        source: &str,
        location: &SourceLocation,
    ) -> CompilerError {
        error.into_compiler_error(source, &self.options.file_path, location)
    }

    pub(crate) fn directive_error(&self, message: &str, location: &SourceLocation) -> CompilerError {
        CompilerError::at(ERR_INVALID_DIRECTIVE, message, &self.options.file_path, location)
    }

    /// Builds a template from sibling nodes. Text runs placed directly at this
    /// level have no element to target and compile to a selector-less binding.
    pub(crate) fn build_template(&mut self, nodes: &[TemplateNode]) -> Result<Template, CompilerError> {
        let mut html = String::new();
        let mut bindings = Vec::new();

        let texts = self.build_children(nodes, &mut html, &mut bindings)?;
        if !texts.is_empty() {
            trace!("fragment text binding with {} expression(s)", texts.len());
            bindings.push(Binding {
                selector: None,
                redundant_attribute: None,
                kind: BindingKind::Simple(SimpleBinding { expressions: texts }),
            });
        }

        Ok(Template { html, bindings })
    }

    /// Emits children into `html`. Returns the TEXT expressions of dynamic runs
    /// for the owning element to carry.
    fn build_children(
        &mut self,
        nodes: &[TemplateNode],
        html: &mut String,
        bindings: &mut Vec<Binding>,
    ) -> Result<Vec<ExpressionDescriptor>, CompilerError> {
        let mut texts = Vec::new();
        let mut child_index = 0;
        let mut i = 0;

        while i < nodes.len() {
            if let TemplateNode::Tag(tag) = &nodes[i] {
                self.build_tag(tag, html, bindings)?;
                child_index += 1;
                i += 1;
                continue;
            }

            let run_start = i;
            while i < nodes.len() && !matches!(nodes[i], TemplateNode::Tag(_)) {
                i += 1;
            }
            let run = &nodes[run_start..i];

            if let Some(expression) = self.build_text_run(run, child_index, html)? {
                texts.push(expression);
            }
            if !run_is_empty(run) {
                child_index += 1;
            }
        }

        Ok(texts)
    }

    /// Static runs are copied verbatim; dynamic runs become one placeholder.
    fn build_text_run(
        &mut self,
        run: &[TemplateNode],
        child_index: usize,
        html: &mut String,
    ) -> Result<Option<ExpressionDescriptor>, CompilerError> {
        let mut segments = Vec::new();
        let mut location = None;
        for node in run {
            match node {
                TemplateNode::Text(text) => {
                    location.get_or_insert(text.location);
                    segments.extend(split_segments(&text.text, &text.expressions));
                }
                TemplateNode::Expression(expression) => {
                    location.get_or_insert(expression.location);
                    segments.push(Segment::Expression(expression.expression.as_str()));
                }
                TemplateNode::Tag(_) => {}
            }
        }

        let dynamic = segments
            .iter()
            .any(|segment| matches!(segment, Segment::Expression(_)));
        if !dynamic {
            for segment in &segments {
                if let Segment::Literal(text) = segment {
                    html.push_str(text);
                }
            }
            return Ok(None);
        }

        html.push_str(TEXT_PLACEHOLDER);
        let evaluate = merge_segments(&segments).map_err(|e| {
            let source = run_source(&segments);
            self.expression_error(e, &source, &location.unwrap_or_default())
        })?;

        Ok(Some(ExpressionDescriptor {
            kind: ExpressionType::Text,
            name: None,
            child_node_index: Some(child_index),
            evaluate,
        }))
    }

    fn build_tag(
        &mut self,
        tag: &TagNode,
        html: &mut String,
        bindings: &mut Vec<Binding>,
    ) -> Result<(), CompilerError> {
        match classify(tag) {
            NodeKind::Static => {
                open_tag(html, tag, None, false);
                if !closes_inline(tag) {
                    self.build_children(&tag.children, html, bindings)?;
                    close_tag(html, tag);
                }
            }
            NodeKind::Simple => {
                let marker = self.markers.next_marker();
                open_tag(html, tag, Some(&marker), true);

                let mut child_bindings = Vec::new();
                let mut texts = Vec::new();
                if !closes_inline(tag) {
                    texts = self.build_children(&tag.children, html, &mut child_bindings)?;
                    close_tag(html, tag);
                }

                let binding = simple_binding(self, tag, &marker, texts)?;
                trace!("{} SIMPLE <{}>", marker, tag.name);
                bindings.push(binding);
                bindings.extend(child_bindings);
            }
            NodeKind::Each => {
                let marker = self.markers.next_marker();
                let binding = each_binding(self, tag, &marker)?;
                push_structural(html, bindings, tag, &marker, binding);
            }
            NodeKind::If => {
                let marker = self.markers.next_marker();
                let binding = if_binding(self, tag, &marker)?;
                push_structural(html, bindings, tag, &marker, binding);
            }
            NodeKind::Tag(name) => {
                let marker = self.markers.next_marker();
                let binding = tag_binding(self, tag, &name, &marker)?;
                push_structural(html, bindings, tag, &marker, binding);
            }
        }

        Ok(())
    }
}

/// Structural bindings consume the node body; the skeleton keeps an empty shell.
fn push_structural(
    html: &mut String,
    bindings: &mut Vec<Binding>,
    tag: &TagNode,
    marker: &str,
    binding: Binding,
) {
    trace!("{} {} <{}>", marker, binding.binding_type().as_str(), tag.name);
    if closes_inline(tag) {
        html.push_str(&format!("<{} {}/>", tag.name, marker));
    } else {
        html.push_str(&format!("<{} {}></{}>", tag.name, marker, tag.name));
    }
    bindings.push(binding);
}

fn run_is_empty(run: &[TemplateNode]) -> bool {
    run.iter().all(|node| match node {
        TemplateNode::Text(text) => text.text.is_empty(),
        _ => false,
    })
}

fn run_source(segments: &[Segment<'_>]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => text.to_string(),
            Segment::Expression(source) => format!("{{{}}}", source),
        })
        .collect()
}

/// Only void tags are written as `<name/>`; HTML ignores the flag on any other element.
fn closes_inline(tag: &TagNode) -> bool {
    is_void_tag(&tag.name)
}

/// Attribute values are raw markup like text runs; only the delimiter is escaped.
fn escape_attribute(value: &str) -> String {
    value.replace('"', "&quot;")
}

/// Writes the opening tag. With `skip_dynamic`, attributes carrying expressions are left out.
fn open_tag(html: &mut String, tag: &TagNode, marker: Option<&str>, skip_dynamic: bool) {
    html.push('<');
    html.push_str(&tag.name);
    if let Some(marker) = marker {
        html.push(' ');
        html.push_str(marker);
    }
    for attribute in &tag.attributes {
        if skip_dynamic && attribute.is_dynamic() {
            continue;
        }
        html.push(' ');
        html.push_str(&attribute.name);
        if let Some(value) = &attribute.value {
            html.push_str("=\"");
            html.push_str(&escape_attribute(value));
            html.push('"');
        }
    }
    html.push_str(if closes_inline(tag) { "/>" } else { ">" });
}

fn close_tag(html: &mut String, tag: &TagNode) {
    html.push_str("</");
    html.push_str(&tag.name);
    html.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::NamingPolicy;

    fn build(value: serde_json::Value) -> Template {
        let root: TemplateRoot = serde_json::from_value(value).unwrap();
        let options = CompileOptions::default();
        let policy = NamingPolicy::from_options(&options);
        TemplateBuilder::new(&options, &policy)
            .build(Some(&root))
            .unwrap()
    }

    #[test]
    fn test_missing_root_is_empty() {
        let options = CompileOptions::default();
        let policy = NamingPolicy::default();
        let template = TemplateBuilder::new(&options, &policy).build(None).unwrap();
        assert_eq!(template, Template::default());
    }

    #[test]
    fn test_attribute_escaping() {
        let template = build(serde_json::json!({
            "nodes": [{
                "type": "tag",
                "name": "a",
                "attributes": [{ "name": "title", "value": "Tom & \"Jerry\"" }],
                "children": [{ "type": "text", "text": "x" }]
            }]
        }));
        assert_eq!(template.html, "<a title=\"Tom & &quot;Jerry&quot;\">x</a>");
    }

    #[test]
    fn test_entities_round_trip() {
        let template = build(serde_json::json!({
            "nodes": [{
                "type": "tag",
                "name": "a",
                "attributes": [{ "name": "href", "value": "?a=1&amp;b=2" }],
                "children": [{ "type": "text", "text": "Tom &amp; Jerry" }]
            }]
        }));
        assert_eq!(template.html, "<a href=\"?a=1&amp;b=2\">Tom &amp; Jerry</a>");
    }

    #[test]
    fn test_non_void_tags_are_never_self_closed() {
        let template = build(serde_json::json!({
            "nodes": [
                { "type": "tag", "name": "span", "isSelfClosing": true },
                { "type": "tag", "name": "my-tag", "isSelfClosing": true },
                { "type": "tag", "name": "br", "isSelfClosing": true }
            ]
        }));
        assert_eq!(template.html, "<span></span><my-tag expr0></my-tag><br/>");
    }

    #[test]
    fn test_root_text_binding_has_no_selector() {
        let template = build(serde_json::json!({
            "nodes": [
                { "type": "text", "text": "Hi " },
                { "type": "expression", "expression": "name" }
            ]
        }));
        assert_eq!(template.html, "<!---->");
        assert_eq!(template.bindings.len(), 1);
        assert_eq!(template.bindings[0].selector, None);
        match &template.bindings[0].kind {
            BindingKind::Simple(simple) => {
                assert_eq!(simple.expressions[0].child_node_index, Some(0));
                assert_eq!(
                    simple.expressions[0].evaluate.expression_source(),
                    "`Hi ${scope.name}`"
                );
            }
            other => panic!("unexpected binding {:?}", other),
        }
    }

    #[test]
    fn test_child_node_index_counts_emitted_nodes() {
        let template = build(serde_json::json!({
            "nodes": [{
                "type": "tag",
                "name": "p",
                "children": [
                    { "type": "text", "text": "a" },
                    { "type": "tag", "name": "b" },
                    { "type": "expression", "expression": "c" }
                ]
            }]
        }));
        assert_eq!(template.html, "<p expr0>a<b></b><!----></p>");
        match &template.bindings[0].kind {
            BindingKind::Simple(simple) => {
                assert_eq!(simple.expressions[0].child_node_index, Some(2));
            }
            other => panic!("unexpected binding {:?}", other),
        }
    }
}
