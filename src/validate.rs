use serde::{Deserialize, Serialize};

use crate::visitor::{walk_node, walk_tag, TemplateVisitor};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_EMPTY_EXPRESSION: &str = "TPL-ERR-EXPR-001";
pub const ERR_EXPRESSION_SYNTAX: &str = "TPL-ERR-EXPR-002";
pub const ERR_UNSUPPORTED_EXPRESSION: &str = "TPL-ERR-EXPR-003";
pub const ERR_INVALID_TEMPLATE: &str = "TPL-ERR-TEMPLATE-001";
pub const ERR_INVALID_DIRECTIVE: &str = "TPL-ERR-DIRECTIVE-001";
pub const ERR_MIXED_EXPORT_STYLE: &str = "TPL-ERR-SCRIPT-001";

fn get_error_type(code: &str) -> &'static str {
    match code {
        ERR_EMPTY_EXPRESSION => "EmptyExpressionError",
        ERR_EXPRESSION_SYNTAX => "ExpressionSyntaxError",
        ERR_UNSUPPORTED_EXPRESSION => "UnsupportedExpressionError",
        ERR_INVALID_TEMPLATE => "InvalidTemplateError",
        ERR_INVALID_DIRECTIVE => "InvalidDirectiveError",
        ERR_MIXED_EXPORT_STYLE => "MixedExportStyleError",
        _ => "CompilerError",
    }
}

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_EMPTY_EXPRESSION => "Every expression span compiles to a non-empty evaluator.",
        ERR_EXPRESSION_SYNTAX => "Every evaluator is produced from a syntactically valid expression.",
        ERR_UNSUPPORTED_EXPRESSION => {
            "Evaluators only contain syntax the scope rewriter understands."
        }
        ERR_INVALID_TEMPLATE => "The node tree is well formed before any binding is built.",
        ERR_INVALID_DIRECTIVE => "Directive attributes have exactly one meaning per node.",
        ERR_MIXED_EXPORT_STYLE => "A component exports its logic in exactly one style.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{error_type} [{code}] {file}:{line}:{column}: {message}")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: get_error_type(code).to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }

    pub fn at(code: &str, message: &str, file: &str, location: &SourceLocation) -> Self {
        Self::new(code, message, file, location.line, location.column)
    }

    /// Attaches the offending source text, keeping the first context recorded.
    pub fn with_context(mut self, context: &str) -> Self {
        if self.context.is_none() {
            self.context = Some(context.to_string());
        }
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IR TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// Root of a component template as handed over by the markup parser.
/// A root without `nodes` is an empty template.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRoot {
    #[serde(default)]
    pub nodes: Vec<TemplateNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateNode {
    Tag(TagNode),
    Text(TextNode),
    Expression(ExpressionNode),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagNode {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeIR>,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
    #[serde(default)]
    pub is_self_closing: bool,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub expressions: Vec<ExpressionSpan>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// A bare `{expression}` node, equivalent to a text node made of a single span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    pub expression: String,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIR {
    pub name: String,
    /// `None` for boolean attributes such as `<video muted>`.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub expressions: Vec<ExpressionSpan>,
    #[serde(default)]
    pub location: SourceLocation,
}

/// One bracketed expression inside a text or attribute value.
/// `start..end` covers the delimiters, `text` is the inner source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A piece of a textual context: literal markup text or expression source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Expression(&'a str),
}

/// Splits `source` into literal and expression segments. Empty literals are dropped.
/// Spans must have passed validation.
pub fn split_segments<'a>(source: &'a str, spans: &'a [ExpressionSpan]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for span in spans {
        if span.start > cursor {
            segments.push(Segment::Literal(&source[cursor..span.start]));
        }
        segments.push(Segment::Expression(span.text.as_str()));
        cursor = span.end;
    }

    if cursor < source.len() {
        segments.push(Segment::Literal(&source[cursor..]));
    }

    segments
}

impl TextNode {
    pub fn segments(&self) -> Vec<Segment<'_>> {
        split_segments(&self.text, &self.expressions)
    }
}

impl AttributeIR {
    pub fn is_dynamic(&self) -> bool {
        !self.expressions.is_empty()
    }

    pub fn segments(&self) -> Vec<Segment<'_>> {
        match &self.value {
            Some(value) => split_segments(value, &self.expressions),
            None => Vec::new(),
        }
    }
}

impl TagNode {
    pub fn attribute(&self, name: &str) -> Option<&AttributeIR> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Returns a copy of this node without the named attributes.
    pub fn without_attributes(&self, names: &[&str]) -> TagNode {
        TagNode {
            name: self.name.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|attr| !names.contains(&attr.name.as_str()))
                .cloned()
                .collect(),
            children: self.children.clone(),
            is_self_closing: self.is_self_closing,
            location: self.location,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

const SINGLE_USE_DIRECTIVES: [&str; 2] = ["each", "if"];

struct TemplateValidator<'f> {
    file: &'f str,
    error: Option<CompilerError>,
}

impl TemplateValidator<'_> {
    fn fail(&mut self, message: String, location: &SourceLocation) {
        if self.error.is_none() {
            self.error = Some(CompilerError::at(
                ERR_INVALID_TEMPLATE,
                &message,
                self.file,
                location,
            ));
        }
    }

    fn check_spans(&mut self, owner: &str, source: &str, spans: &[ExpressionSpan], location: &SourceLocation) {
        let mut cursor = 0;
        for span in spans {
            if span.start < cursor
                || span.start > span.end
                || span.end > source.len()
                || !source.is_char_boundary(span.start)
                || !source.is_char_boundary(span.end)
            {
                self.fail(
                    format!(
                        "Expression span {}..{} is out of order or out of bounds in {}.",
                        span.start, span.end, owner
                    ),
                    location,
                );
                return;
            }
            cursor = span.end;
        }
    }
}

impl TemplateVisitor for TemplateValidator<'_> {
    fn visit_node(&mut self, node: &TemplateNode) {
        if self.error.is_none() {
            walk_node(self, node);
        }
    }

    fn visit_tag(&mut self, tag: &TagNode) {
        if tag.name.trim().is_empty() {
            self.fail("Tag node without a name.".to_string(), &tag.location);
            return;
        }

        for directive in SINGLE_USE_DIRECTIVES {
            let count = tag
                .attributes
                .iter()
                .filter(|attr| attr.name == directive)
                .count();
            if count > 1 {
                self.fail(
                    format!("<{}> carries {} `{}` directives.", tag.name, count, directive),
                    &tag.location,
                );
                return;
            }
        }

        walk_tag(self, tag);
    }

    fn visit_attribute(&mut self, tag: &TagNode, attribute: &AttributeIR) {
        if attribute.name.trim().is_empty() {
            self.fail(
                format!("<{}> has an attribute without a name.", tag.name),
                &attribute.location,
            );
            return;
        }

        match &attribute.value {
            Some(value) => {
                let owner = format!("attribute `{}` of <{}>", attribute.name, tag.name);
                self.check_spans(&owner, value, &attribute.expressions, &attribute.location);
            }
            None if attribute.is_dynamic() => self.fail(
                format!(
                    "Boolean attribute `{}` of <{}> cannot carry expressions.",
                    attribute.name, tag.name
                ),
                &attribute.location,
            ),
            None => {}
        }
    }

    fn visit_text(&mut self, text: &TextNode) {
        self.check_spans("text node", &text.text, &text.expressions, &text.location);
    }
}

/// Checks the structural invariants the builder relies on.
pub fn validate_template(root: &TemplateRoot, file: &str) -> Result<(), CompilerError> {
    let mut validator = TemplateValidator { file, error: None };
    validator.visit_root(root);
    match validator.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
