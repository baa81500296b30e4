//! Codegen module
//!
//! Renders a compiled template into the runtime-callable JavaScript factory:
//! `function(template, expressionTypes, bindingTypes, getComponent) { ... }`.
//! Output is indented with two spaces and identical for identical input.

use crate::ast::quote_string;
use crate::bindings::{Binding, BindingKind, ExpressionDescriptor, Slot, Template};

pub const TEMPLATE_FN: &str = "template";
pub const EXPRESSION_TYPES: &str = "expressionTypes";
pub const BINDING_TYPES: &str = "bindingTypes";
pub const GET_COMPONENT: &str = "getComponent";

const INDENT: &str = "  ";

/// Intermediate JS value tree, printed with fixed layout rules.
enum Js {
    Raw(String),
    Object(Vec<(&'static str, Js)>),
    Array(Vec<Js>),
    Call(&'static str, Vec<Js>),
}

impl Js {
    fn string(value: &str) -> Js {
        Js::Raw(quote_string(value))
    }

    fn print(&self, out: &mut String, depth: usize) {
        match self {
            Js::Raw(source) => out.push_str(source),
            Js::Object(fields) if fields.is_empty() => out.push_str("{}"),
            Js::Object(fields) => {
                out.push_str("{\n");
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(",\n");
                    }
                    push_indent(out, depth + 1);
                    out.push_str(key);
                    out.push_str(": ");
                    value.print(out, depth + 1);
                }
                out.push('\n');
                push_indent(out, depth);
                out.push('}');
            }
            Js::Array(items) if items.is_empty() => out.push_str("[]"),
            Js::Array(items) => {
                out.push_str("[\n");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(",\n");
                    }
                    push_indent(out, depth + 1);
                    item.print(out, depth + 1);
                }
                out.push('\n');
                push_indent(out, depth);
                out.push(']');
            }
            Js::Call(callee, arguments) => {
                out.push_str(callee);
                out.push('(');
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    argument.print(out, depth);
                }
                out.push(')');
            }
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTOR LOWERING
// ═══════════════════════════════════════════════════════════════════════════════

fn template_call(template: &Template) -> Js {
    Js::Call(
        TEMPLATE_FN,
        vec![
            Js::string(&template.html),
            Js::Array(template.bindings.iter().map(binding_object).collect()),
        ],
    )
}

fn expression_object(expression: &ExpressionDescriptor) -> Js {
    let mut fields = vec![(
        "type",
        Js::Raw(format!("{}.{}", EXPRESSION_TYPES, expression.kind.as_str())),
    )];
    if let Some(name) = &expression.name {
        fields.push(("name", Js::string(name)));
    }
    if let Some(index) = expression.child_node_index {
        fields.push(("childNodeIndex", Js::Raw(index.to_string())));
    }
    fields.push(("evaluate", Js::Raw(expression.evaluate.source())));
    Js::Object(fields)
}

fn slot_object(slot: &Slot) -> Js {
    Js::Object(vec![
        ("id", Js::string(&slot.id)),
        ("html", Js::string(&slot.html)),
        (
            "bindings",
            Js::Array(slot.bindings.iter().map(binding_object).collect()),
        ),
    ])
}

fn binding_object(binding: &Binding) -> Js {
    let mut fields = Vec::new();
    if let Some(selector) = &binding.selector {
        fields.push(("selector", Js::string(selector)));
    }
    if let Some(attribute) = &binding.redundant_attribute {
        fields.push(("redundantAttribute", Js::string(attribute)));
    }
    fields.push((
        "type",
        Js::Raw(format!("{}.{}", BINDING_TYPES, binding.binding_type().as_str())),
    ));

    match &binding.kind {
        BindingKind::Simple(simple) => {
            fields.push((
                "expressions",
                Js::Array(simple.expressions.iter().map(expression_object).collect()),
            ));
        }
        BindingKind::If(conditional) => {
            fields.push(("evaluate", Js::Raw(conditional.evaluate.source())));
            fields.push(("template", template_call(&conditional.template)));
        }
        BindingKind::Each(each) => {
            fields.push(("itemName", Js::string(&each.item_name)));
            if let Some(index_name) = &each.index_name {
                fields.push(("indexName", Js::string(index_name)));
            }
            if let Some(condition) = &each.condition {
                fields.push(("condition", Js::Raw(condition.source())));
            }
            if let Some(get_key) = &each.get_key {
                fields.push(("getKey", Js::Raw(get_key.source())));
            }
            fields.push(("evaluate", Js::Raw(each.evaluate.source())));
            fields.push(("template", template_call(&each.template)));
        }
        BindingKind::Tag(tag) => {
            fields.push(("getComponent", Js::Raw(GET_COMPONENT.to_string())));
            fields.push((
                "evaluate",
                Js::Raw(format!("() => {}", quote_string(&tag.name))),
            ));
            fields.push((
                "slots",
                Js::Array(tag.slots.iter().map(slot_object).collect()),
            ));
            fields.push((
                "attributes",
                Js::Array(tag.attributes.iter().map(expression_object).collect()),
            ));
        }
    }

    Js::Object(fields)
}

/// Renders the template factory function.
pub fn generate_template_function(template: &Template) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "function({}, {}, {}, {}) {{\n",
        TEMPLATE_FN, EXPRESSION_TYPES, BINDING_TYPES, GET_COMPONENT
    ));
    push_indent(&mut out, 1);
    out.push_str("return ");
    template_call(template).print(&mut out, 1);
    out.push_str(";\n}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::SimpleBinding;
    use crate::options::ExpressionType;
    use crate::scope::scopeify;

    #[test]
    fn test_empty_template() {
        let code = generate_template_function(&Template::default());
        assert_eq!(
            code,
            "function(template, expressionTypes, bindingTypes, getComponent) {\n  return template('', []);\n}"
        );
    }

    #[test]
    fn test_simple_binding_layout() {
        let template = Template {
            html: "<p expr0><!----></p>".to_string(),
            bindings: vec![Binding {
                selector: Some("[expr0]".to_string()),
                redundant_attribute: Some("expr0".to_string()),
                kind: BindingKind::Simple(SimpleBinding {
                    expressions: vec![ExpressionDescriptor {
                        kind: ExpressionType::Text,
                        name: None,
                        child_node_index: Some(0),
                        evaluate: scopeify("foo").unwrap(),
                    }],
                }),
            }],
        };

        let expected = "\
function(template, expressionTypes, bindingTypes, getComponent) {
  return template('<p expr0><!----></p>', [
    {
      selector: '[expr0]',
      redundantAttribute: 'expr0',
      type: bindingTypes.SIMPLE,
      expressions: [
        {
          type: expressionTypes.TEXT,
          childNodeIndex: 0,
          evaluate: scope => scope.foo
        }
      ]
    }
  ]);
}";
        assert_eq!(generate_template_function(&template), expected);
    }
}
