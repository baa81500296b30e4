use crate::validate::{AttributeIR, ExpressionNode, TagNode, TemplateNode, TemplateRoot, TextNode};

/// The TemplateVisitor trait defines the single traversal mechanism for input node trees.
///
/// Rules:
/// 1. Traversal order is document order: attributes of a tag before its children.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the `walk_*` functions to continue traversal unless pruning is intended.
pub trait TemplateVisitor {
    fn visit_root(&mut self, root: &TemplateRoot) {
        walk_root(self, root);
    }

    fn visit_node(&mut self, node: &TemplateNode) {
        walk_node(self, node);
    }

    fn visit_tag(&mut self, tag: &TagNode) {
        walk_tag(self, tag);
    }

    fn visit_attribute(&mut self, _tag: &TagNode, _attribute: &AttributeIR) {
        // Leaf
    }

    fn visit_text(&mut self, _text: &TextNode) {
        // Leaf
    }

    fn visit_expression(&mut self, _expression: &ExpressionNode) {
        // Leaf
    }

    fn visit_children(&mut self, children: &[TemplateNode]) {
        walk_children(self, children);
    }
}

pub fn walk_root<V: TemplateVisitor + ?Sized>(visitor: &mut V, root: &TemplateRoot) {
    visitor.visit_children(&root.nodes);
}

pub fn walk_children<V: TemplateVisitor + ?Sized>(visitor: &mut V, children: &[TemplateNode]) {
    for node in children {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, node: &TemplateNode) {
    match node {
        TemplateNode::Tag(tag) => visitor.visit_tag(tag),
        TemplateNode::Text(text) => visitor.visit_text(text),
        TemplateNode::Expression(expression) => visitor.visit_expression(expression),
    }
}

pub fn walk_tag<V: TemplateVisitor + ?Sized>(visitor: &mut V, tag: &TagNode) {
    for attribute in &tag.attributes {
        visitor.visit_attribute(tag, attribute);
    }
    visitor.visit_children(&tag.children);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TemplateVisitor for Recorder {
        fn visit_tag(&mut self, tag: &TagNode) {
            self.events.push(format!("<{}>", tag.name));
            walk_tag(self, tag);
            self.events.push(format!("</{}>", tag.name));
        }

        fn visit_attribute(&mut self, _tag: &TagNode, attribute: &AttributeIR) {
            self.events.push(format!("@{}", attribute.name));
        }

        fn visit_text(&mut self, text: &TextNode) {
            self.events.push(format!("'{}'", text.text));
        }

        fn visit_expression(&mut self, expression: &ExpressionNode) {
            self.events.push(format!("{{{}}}", expression.expression));
        }
    }

    #[test]
    fn test_walks_in_document_order() {
        let root: TemplateRoot = serde_json::from_value(serde_json::json!({
            "nodes": [{
                "type": "tag",
                "name": "ul",
                "attributes": [{ "name": "class", "value": "list" }],
                "children": [
                    { "type": "text", "text": "a" },
                    {
                        "type": "tag",
                        "name": "li",
                        "children": [{ "type": "expression", "expression": "b" }]
                    }
                ]
            }]
        }))
        .unwrap();

        let mut recorder = Recorder::default();
        recorder.visit_root(&root);

        assert_eq!(
            recorder.events,
            vec!["<ul>", "@class", "'a'", "<li>", "{b}", "</li>", "</ul>"]
        );
    }
}
