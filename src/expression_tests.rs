//! Compiled expressions evaluated against a scope object.

#[cfg(test)]
mod tests {
    use crate::bindings::BindingKind;
    use crate::{compile, scopeify, Binding, CompileOptions, EvalError, Evaluator, TemplateRoot};
    use serde_json::{json, Value};

    fn first_binding(nodes: Value) -> Binding {
        let root: TemplateRoot = serde_json::from_value(json!({ "nodes": nodes })).unwrap();
        let result = compile(Some(&root), &CompileOptions::default()).unwrap();
        result.template.bindings.into_iter().next().unwrap()
    }

    fn text_evaluator(binding: &Binding) -> &Evaluator {
        match &binding.kind {
            BindingKind::Simple(simple) => &simple.expressions[0].evaluate,
            other => panic!("expected SIMPLE, got {:?}", other),
        }
    }

    #[test]
    fn test_merged_text_evaluates_to_string() {
        let binding = first_binding(json!([{
            "type": "tag",
            "name": "p",
            "children": [{
                "type": "text",
                "text": "{foo} + {bar}",
                "expressions": [
                    { "text": "foo", "start": 0, "end": 5 },
                    { "text": "bar", "start": 8, "end": 13 }
                ]
            }]
        }]));
        let value = text_evaluator(&binding)
            .evaluate(&json!({ "foo": "a", "bar": "b" }))
            .unwrap();
        assert_eq!(value, json!("a + b"));
    }

    #[test]
    fn test_lone_expression_keeps_its_type() {
        let binding = first_binding(json!([{
            "type": "tag",
            "name": "p",
            "children": [{ "type": "expression", "expression": "count * 2" }]
        }]));
        let value = text_evaluator(&binding).evaluate(&json!({ "count": 21 })).unwrap();
        assert_eq!(value, json!(42));
    }

    #[test]
    fn test_each_evaluators() {
        let binding = first_binding(json!([{
            "type": "tag",
            "name": "li",
            "attributes": [
                { "name": "each", "value": "item in items" },
                { "name": "if", "value": "item > 1" },
                { "name": "key", "value": "item" }
            ]
        }]));
        let BindingKind::Each(each) = &binding.kind else {
            panic!("expected EACH, got {:?}", binding.kind);
        };

        let scope = json!({ "items": [1, 2, 3] });
        assert_eq!(each.evaluate.evaluate(&scope).unwrap(), json!([1, 2, 3]));

        let get_key = each.get_key.as_ref().unwrap();
        assert_eq!(get_key.evaluate(&json!({ "item": 2 })).unwrap(), json!(2));

        let condition = each.condition.as_ref().unwrap();
        assert_eq!(condition.evaluate(&json!({ "item": 1 })).unwrap(), json!(false));
        assert_eq!(condition.evaluate(&json!({ "item": 3 })).unwrap(), json!(true));
    }

    #[test]
    fn test_if_is_not_coerced() {
        let binding = first_binding(json!([{
            "type": "tag",
            "name": "p",
            "attributes": [{ "name": "if", "value": "{1 > 2}", "expressions": [{ "text": "1 > 2", "start": 0, "end": 7 }] }]
        }]));
        let BindingKind::If(conditional) = &binding.kind else {
            panic!("expected IF, got {:?}", binding.kind);
        };
        assert_eq!(conditional.evaluate.evaluate(&json!({})).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_this_reads_from_scope() {
        let scope = json!({ "foo": 1, "bar": 2 });
        let with_this = scopeify("this.foo + this.bar").unwrap();
        let bare = scopeify("foo + bar").unwrap();
        assert_eq!(with_this, bare);
        assert_eq!(bare.evaluate(&scope).unwrap(), json!(3));
    }

    #[test]
    fn test_objects_and_arrays_read_scope() {
        let evaluator = scopeify("{ name, tags: [first, 'x'] }").unwrap();
        let value = evaluator
            .evaluate(&json!({ "name": "riot", "first": "a" }))
            .unwrap();
        assert_eq!(value, json!({ "name": "riot", "tags": ["a", "x"] }));
    }

    #[test]
    fn test_missing_properties_read_as_null() {
        let evaluator = scopeify("user?.profile.name ?? 'anonymous'").unwrap();
        assert_eq!(evaluator.evaluate(&json!({})).unwrap(), json!("anonymous"));
        assert_eq!(
            evaluator
                .evaluate(&json!({ "user": { "profile": { "name": "ada" } } }))
                .unwrap(),
            json!("ada")
        );
    }

    #[test]
    fn test_handlers_are_not_run() {
        let evaluator = scopeify("e => select(e)").unwrap();
        assert!(matches!(
            evaluator.evaluate(&json!({})),
            Err(EvalError::Unsupported(_))
        ));
    }

    #[test]
    fn test_evaluator_serializes_as_source() {
        let evaluator = scopeify("a.b").unwrap();
        assert_eq!(serde_json::to_value(&evaluator).unwrap(), json!("scope => scope.a.b"));
    }
}
