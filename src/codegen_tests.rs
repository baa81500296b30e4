#[cfg(test)]
mod tests {
    use crate::{compile, compile_json, CompileOptions, TemplateRoot};
    use serde_json::{json, Value};

    fn code(nodes: Value) -> String {
        let root: TemplateRoot = serde_json::from_value(json!({ "nodes": nodes })).unwrap();
        compile(Some(&root), &CompileOptions::default()).unwrap().code
    }

    #[test]
    fn test_each_layout() {
        let actual = code(json!([{
            "type": "tag",
            "name": "ul",
            "children": [{
                "type": "tag",
                "name": "li",
                "attributes": [
                    { "name": "each", "value": "{item in items}", "expressions": [{ "text": "item in items", "start": 0, "end": 15 }] },
                    { "name": "key", "value": "{item}", "expressions": [{ "text": "item", "start": 0, "end": 6 }] }
                ],
                "children": [{ "type": "expression", "expression": "item" }]
            }]
        }]));

        let expected = "\
function(template, expressionTypes, bindingTypes, getComponent) {
  return template('<ul><li expr0></li></ul>', [
    {
      selector: '[expr0]',
      redundantAttribute: 'expr0',
      type: bindingTypes.EACH,
      itemName: 'item',
      getKey: scope => scope.item,
      evaluate: scope => scope.items,
      template: template('<li expr1><!----></li>', [
        {
          selector: '[expr1]',
          redundantAttribute: 'expr1',
          type: bindingTypes.SIMPLE,
          expressions: [
            {
              type: expressionTypes.TEXT,
              childNodeIndex: 0,
              evaluate: scope => scope.item
            }
          ]
        }
      ])
    }
  ]);
}";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_tag_layout() {
        let actual = code(json!([{
            "type": "tag",
            "name": "my-tag",
            "attributes": [{ "name": "onclick", "value": "{e => select(e)}", "expressions": [{ "text": "e => select(e)", "start": 0, "end": 16 }] }],
            "children": [{ "type": "tag", "name": "b", "children": [{ "type": "text", "text": "hey" }] }]
        }]));

        let expected = "\
function(template, expressionTypes, bindingTypes, getComponent) {
  return template('<my-tag expr0></my-tag>', [
    {
      selector: '[expr0]',
      redundantAttribute: 'expr0',
      type: bindingTypes.TAG,
      getComponent: getComponent,
      evaluate: () => 'my-tag',
      slots: [
        {
          id: 'default',
          html: '<b>hey</b>',
          bindings: []
        }
      ],
      attributes: [
        {
          type: expressionTypes.ATTRIBUTE,
          name: 'onclick',
          evaluate: scope => (e) => scope.select(e)
        }
      ]
    }
  ]);
}";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_if_layout() {
        let actual = code(json!([{
            "type": "tag",
            "name": "p",
            "attributes": [{ "name": "if", "value": "{visible}", "expressions": [{ "text": "visible", "start": 0, "end": 9 }] }],
            "children": [{ "type": "text", "text": "it's here" }]
        }]));

        let expected = "\
function(template, expressionTypes, bindingTypes, getComponent) {
  return template('<p expr0></p>', [
    {
      selector: '[expr0]',
      redundantAttribute: 'expr0',
      type: bindingTypes.IF,
      evaluate: scope => scope.visible,
      template: template('<p>it\\'s here</p>', [])
    }
  ]);
}";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_root_text_has_no_selector() {
        let actual = code(json!([{ "type": "expression", "expression": "greeting" }]));
        assert!(actual.contains("    {\n      type: bindingTypes.SIMPLE,"));
        assert!(!actual.contains("selector"));
    }

    #[test]
    fn test_null_tree_compiles_to_empty_template() {
        let result = compile_json("null", &CompileOptions::default()).unwrap();
        assert_eq!(
            result.code,
            "function(template, expressionTypes, bindingTypes, getComponent) {\n  return template('', []);\n}"
        );
    }

    #[test]
    fn test_newlines_in_markup_are_escaped() {
        let actual = code(json!([{
            "type": "tag",
            "name": "pre",
            "children": [{ "type": "text", "text": "a\nb" }]
        }]));
        assert!(actual.contains("template('<pre>a\\nb</pre>', [])"));
    }
}
