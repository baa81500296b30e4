use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::ast::{
    ArrayElement, Class, ClassMethod, Expr, Function, FunctionBody, Literal, MemberProperty,
    ObjectMember, Pattern, PatternProperty, PropertyKey, Statement, TemplateLiteral,
};
use crate::lowering::{parse_expression, LowerError};
use crate::validate::{
    CompilerError, Segment, SourceLocation, ERR_EMPTY_EXPRESSION, ERR_EXPRESSION_SYNTAX,
    ERR_UNSUPPORTED_EXPRESSION,
};

/// Name of the runtime object free identifiers resolve against.
pub const SCOPE: &str = "scope";

lazy_static::lazy_static! {
    pub static ref GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        // Value properties
        s.insert("undefined");
        s.insert("NaN");
        s.insert("Infinity");
        s.insert("globalThis");

        // Constructors and namespaces
        s.insert("Boolean");
        s.insert("Number");
        s.insert("String");
        s.insert("RegExp");
        s.insert("Array");
        s.insert("Object");
        s.insert("Function");
        s.insert("Date");
        s.insert("Math");
        s.insert("JSON");
        s.insert("Intl");
        s.insert("Promise");
        s.insert("Map");
        s.insert("Set");
        s.insert("WeakMap");
        s.insert("WeakSet");
        s.insert("Symbol");
        s.insert("Error");
        s.insert("TypeError");
        s.insert("RangeError");

        // Functions
        s.insert("parseInt");
        s.insert("parseFloat");
        s.insert("isNaN");
        s.insert("isFinite");
        s.insert("encodeURI");
        s.insert("encodeURIComponent");
        s.insert("decodeURI");
        s.insert("decodeURIComponent");

        // Host objects
        s.insert("window");
        s.insert("document");
        s.insert("console");
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// A compiled expression: a pure function of the runtime scope object.
/// Serializes as its JavaScript source, `scope => <body>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluator {
    body: Expr,
}

impl Evaluator {
    pub fn new(body: Expr) -> Self {
        Evaluator { body }
    }

    /// Evaluator returning a string constant.
    pub fn constant(value: &str) -> Self {
        Evaluator::new(Expr::string(value))
    }

    pub fn boolean(value: bool) -> Self {
        Evaluator::new(Expr::Literal(Literal::Boolean(value)))
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Source of the scoped expression alone, without the arrow head.
    pub fn expression_source(&self) -> String {
        self.body.to_source()
    }

    pub fn source(&self) -> String {
        let body = self.body.to_source();
        let needs_parens = body.starts_with('{') || matches!(self.body, Expr::Sequence(_));
        if needs_parens {
            format!("{} => ({})", SCOPE, body)
        } else {
            format!("{} => {}", SCOPE, body)
        }
    }
}

impl fmt::Display for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source())
    }
}

impl Serialize for Evaluator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScopeError {
    #[error("Expression is empty.")]
    Empty,
    #[error(transparent)]
    Lower(#[from] LowerError),
}

impl ScopeError {
    /// Attaches position information from the owning node.
    pub fn into_compiler_error(self, source: &str, file: &str, location: &SourceLocation) -> CompilerError {
        let (code, message) = match &self {
            ScopeError::Empty => (ERR_EMPTY_EXPRESSION, self.to_string()),
            ScopeError::Lower(LowerError::Syntax(detail)) => (
                ERR_EXPRESSION_SYNTAX,
                format!("Invalid expression syntax: {}", detail),
            ),
            ScopeError::Lower(LowerError::Unsupported(_)) => {
                (ERR_UNSUPPORTED_EXPRESSION, self.to_string())
            }
        };
        CompilerError::at(code, &message, file, location).with_context(source)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiles expression source into an evaluator whose free identifiers read from `scope`.
pub fn scopeify(source: &str) -> Result<Evaluator, ScopeError> {
    if source.trim().is_empty() {
        return Err(ScopeError::Empty);
    }
    let expr = parse_expression(source)?;
    Ok(Evaluator::new(rewrite_expression(expr)))
}

/// Rewrites an already parsed expression at the top level of a template.
pub fn rewrite_expression(expr: Expr) -> Expr {
    rewrite(expr, &HashSet::new(), true)
}

/// Folds literal text and expressions of one textual context into a single evaluator.
/// A lone expression keeps its bare evaluator; anything else becomes a template literal.
pub fn merge_segments(segments: &[Segment<'_>]) -> Result<Evaluator, ScopeError> {
    if let [Segment::Expression(source)] = segments {
        return scopeify(source);
    }

    let mut quasis = vec![String::new()];
    let mut expressions = Vec::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                if let Some(last) = quasis.last_mut() {
                    last.push_str(&escape_template_text(text));
                }
            }
            Segment::Expression(source) => {
                expressions.push(scopeify(source)?.body);
                quasis.push(String::new());
            }
        }
    }

    Ok(Evaluator::new(Expr::Template(TemplateLiteral {
        quasis,
        expressions,
    })))
}

fn escape_template_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out
}

type Locals = HashSet<String>;

fn is_free(name: &str, locals: &Locals) -> bool {
    !locals.contains(name) && !GLOBALS.contains(name)
}

fn rewrite_box(expr: Box<Expr>, locals: &Locals, bind_this: bool) -> Box<Expr> {
    Box::new(rewrite(*expr, locals, bind_this))
}

/// `bind_this` is false inside non-arrow functions and classes, where `this` is their own.
fn rewrite(expr: Expr, locals: &Locals, bind_this: bool) -> Expr {
    match expr {
        Expr::Identifier(name) if is_free(&name, locals) => {
            Expr::static_member(Expr::ident(SCOPE), &name)
        }
        Expr::This if bind_this => Expr::ident(SCOPE),
        Expr::Identifier(_) | Expr::This | Expr::Literal(_) => expr,
        Expr::Template(template) => Expr::Template(TemplateLiteral {
            quasis: template.quasis,
            expressions: template
                .expressions
                .into_iter()
                .map(|e| rewrite(e, locals, bind_this))
                .collect(),
        }),
        Expr::Array(elements) => Expr::Array(rewrite_elements(elements, locals, bind_this)),
        Expr::Object(members) => Expr::Object(
            members
                .into_iter()
                .map(|member| match member {
                    ObjectMember::Property { key, value } => ObjectMember::Property {
                        key: rewrite_key(key, locals, bind_this),
                        value: rewrite(value, locals, bind_this),
                    },
                    ObjectMember::Method { key, function } => ObjectMember::Method {
                        key: rewrite_key(key, locals, bind_this),
                        function: rewrite_function(function, locals, bind_this),
                    },
                    ObjectMember::Spread(e) => ObjectMember::Spread(rewrite(e, locals, bind_this)),
                })
                .collect(),
        ),
        Expr::Member {
            object,
            property,
            optional,
        } => Expr::Member {
            object: rewrite_box(object, locals, bind_this),
            property: match property {
                MemberProperty::Computed(e) => {
                    MemberProperty::Computed(rewrite_box(e, locals, bind_this))
                }
                property => property,
            },
            optional,
        },
        Expr::Call {
            callee,
            arguments,
            optional,
        } => Expr::Call {
            callee: rewrite_box(callee, locals, bind_this),
            arguments: rewrite_elements(arguments, locals, bind_this),
            optional,
        },
        Expr::New { callee, arguments } => Expr::New {
            callee: rewrite_box(callee, locals, bind_this),
            arguments: rewrite_elements(arguments, locals, bind_this),
        },
        Expr::Unary { op, argument } => Expr::Unary {
            op,
            argument: rewrite_box(argument, locals, bind_this),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: rewrite_box(left, locals, bind_this),
            right: rewrite_box(right, locals, bind_this),
        },
        Expr::Logical { op, left, right } => Expr::Logical {
            op,
            left: rewrite_box(left, locals, bind_this),
            right: rewrite_box(right, locals, bind_this),
        },
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => Expr::Conditional {
            test: rewrite_box(test, locals, bind_this),
            consequent: rewrite_box(consequent, locals, bind_this),
            alternate: rewrite_box(alternate, locals, bind_this),
        },
        Expr::Sequence(expressions) => Expr::Sequence(
            expressions
                .into_iter()
                .map(|e| rewrite(e, locals, bind_this))
                .collect(),
        ),
        Expr::Assignment { op, target, value } => Expr::Assignment {
            op,
            target: rewrite_box(target, locals, bind_this),
            value: rewrite_box(value, locals, bind_this),
        },
        Expr::Update {
            op,
            prefix,
            argument,
        } => Expr::Update {
            op,
            prefix,
            argument: rewrite_box(argument, locals, bind_this),
        },
        Expr::Function(function) => {
            Expr::Function(Box::new(rewrite_function(*function, locals, bind_this)))
        }
        Expr::Class(class) => Expr::Class(Box::new(rewrite_class(*class, locals, bind_this))),
        Expr::Paren(inner) => Expr::Paren(rewrite_box(inner, locals, bind_this)),
    }
}

fn rewrite_elements(elements: Vec<ArrayElement>, locals: &Locals, bind_this: bool) -> Vec<ArrayElement> {
    elements
        .into_iter()
        .map(|element| match element {
            ArrayElement::Expr(e) => ArrayElement::Expr(rewrite(e, locals, bind_this)),
            ArrayElement::Spread(e) => ArrayElement::Spread(rewrite(e, locals, bind_this)),
            ArrayElement::Hole => ArrayElement::Hole,
        })
        .collect()
}

fn rewrite_key(key: PropertyKey, locals: &Locals, bind_this: bool) -> PropertyKey {
    match key {
        PropertyKey::Computed(e) => PropertyKey::Computed(rewrite(e, locals, bind_this)),
        key => key,
    }
}

fn collect_pattern_names(pattern: &Pattern, names: &mut Locals) {
    match pattern {
        Pattern::Identifier(name) => {
            names.insert(name.clone());
        }
        Pattern::Object { properties, rest } => {
            for property in properties {
                collect_pattern_names(&property.value, names);
            }
            if let Some(rest) = rest {
                collect_pattern_names(rest, names);
            }
        }
        Pattern::Array { elements, rest } => {
            for element in elements.iter().flatten() {
                collect_pattern_names(element, names);
            }
            if let Some(rest) = rest {
                collect_pattern_names(rest, names);
            }
        }
        Pattern::Default { target, .. } => collect_pattern_names(target, names),
    }
}

fn rewrite_pattern(pattern: Pattern, locals: &Locals, bind_this: bool) -> Pattern {
    match pattern {
        Pattern::Identifier(_) => pattern,
        Pattern::Object { properties, rest } => Pattern::Object {
            properties: properties
                .into_iter()
                .map(|property| PatternProperty {
                    key: rewrite_key(property.key, locals, bind_this),
                    value: rewrite_pattern(property.value, locals, bind_this),
                })
                .collect(),
            rest: rest.map(|rest| Box::new(rewrite_pattern(*rest, locals, bind_this))),
        },
        Pattern::Array { elements, rest } => Pattern::Array {
            elements: elements
                .into_iter()
                .map(|element| element.map(|p| rewrite_pattern(p, locals, bind_this)))
                .collect(),
            rest: rest.map(|rest| Box::new(rewrite_pattern(*rest, locals, bind_this))),
        },
        Pattern::Default { target, value } => Pattern::Default {
            target: Box::new(rewrite_pattern(*target, locals, bind_this)),
            value: rewrite_box(value, locals, bind_this),
        },
    }
}

fn rewrite_function(function: Function, locals: &Locals, bind_this: bool) -> Function {
    let mut inner = locals.clone();
    if let Some(name) = &function.name {
        inner.insert(name.clone());
    }
    for param in &function.params {
        collect_pattern_names(param, &mut inner);
    }
    let bind_this = bind_this && function.is_arrow;

    Function {
        params: function
            .params
            .into_iter()
            .map(|param| rewrite_pattern(param, &inner, bind_this))
            .collect(),
        body: match function.body {
            FunctionBody::Expression(e) => FunctionBody::Expression(rewrite_box(e, &inner, bind_this)),
            FunctionBody::Block(statements) => FunctionBody::Block(
                statements
                    .into_iter()
                    .map(|statement| match statement {
                        Statement::Expression(e) => Statement::Expression(rewrite(e, &inner, bind_this)),
                        Statement::Return(e) => {
                            Statement::Return(e.map(|e| rewrite(e, &inner, bind_this)))
                        }
                    })
                    .collect(),
            ),
        },
        ..function
    }
}

fn rewrite_class(class: Class, locals: &Locals, bind_this: bool) -> Class {
    let super_class = class.super_class.map(|e| rewrite(e, locals, bind_this));

    let mut inner = locals.clone();
    if let Some(name) = &class.name {
        inner.insert(name.clone());
    }

    Class {
        name: class.name,
        super_class,
        methods: class
            .methods
            .into_iter()
            .map(|method| ClassMethod {
                key: rewrite_key(method.key, &inner, bind_this),
                function: rewrite_function(method.function, &inner, false),
                is_static: method.is_static,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> String {
        scopeify(source).unwrap().expression_source()
    }

    #[test]
    fn test_simple_identifier() {
        assert_eq!(render("foo"), "scope.foo");
        assert_eq!(render("foo + bar"), "scope.foo + scope.bar");
    }

    #[test]
    fn test_primitives_are_untouched() {
        assert_eq!(render("true"), "true");
        assert_eq!(render("1 > 2"), "1 > 2");
        assert_eq!(render("null"), "null");
        assert_eq!(render("'hello'"), "'hello'");
        assert_eq!(render("undefined"), "undefined");
        assert_eq!(render("RegExp"), "RegExp");
        assert_eq!(render("Number"), "Number");
        assert_eq!(render("Boolean"), "Boolean");
    }

    #[test]
    fn test_this_is_the_scope() {
        assert_eq!(render("this.foo + this.bar"), "scope.foo + scope.bar");
        assert_eq!(render("this + this"), "scope + scope");
    }

    #[test]
    fn test_objects_and_arrays() {
        assert_eq!(render("{ foo: bar, buz: baz }"), "{ foo: scope.bar, buz: scope.baz }");
        assert_eq!(
            render("{ foo: { foo: bar, buz: baz }, buz: baz }"),
            "{ foo: { foo: scope.bar, buz: scope.baz }, buz: scope.baz }"
        );
        assert_eq!(render("{ foo }"), "{ foo: scope.foo }");
        assert_eq!(render("[foo, 'bar', baz]"), "[scope.foo, 'bar', scope.baz]");
    }

    #[test]
    fn test_member_properties_are_not_rewritten() {
        assert_eq!(render("opts.isVisible"), "scope.opts.isVisible");
        assert_eq!(render("items[index]"), "scope.items[scope.index]");
    }

    #[test]
    fn test_functions_keep_their_parameters() {
        assert_eq!(render("(foo) => bar + foo"), "(foo) => scope.bar + foo");
        assert_eq!(
            render("(foo) => (bar) => foo + bar + baz"),
            "(foo) => (bar) => foo + bar + scope.baz"
        );
        assert_eq!(
            render("({ a, b: [c] }) => a + c + d"),
            "({ a, b: [c] }) => a + c + scope.d"
        );
    }

    #[test]
    fn test_default_parameter_values_are_rewritten() {
        assert_eq!(render("(x = 1) => x + foo"), "(x = 1) => x + scope.foo");
        assert_eq!(render("(x = y) => x"), "(x = scope.y) => x");
        assert_eq!(
            render("function foo(x = y) { return foo }"),
            "function foo(x = scope.y) { return foo; }"
        );
    }

    #[test]
    fn test_grouped_optional_chain() {
        assert_eq!(render("(a?.b)()"), "(scope.a?.b)()");
        assert_eq!(render("(a?.[k]).c"), "(scope.a?.[scope.k]).c");
    }

    #[test]
    fn test_this_inside_function_belongs_to_function() {
        assert_eq!(
            render("function () { return this.x + y }"),
            "function() { return this.x + scope.y; }"
        );
        assert_eq!(render("() => this.x"), "() => scope.x");
    }

    #[test]
    fn test_classes() {
        assert_eq!(render("class Foo {}"), "class Foo {}");
        assert_eq!(render("new Foo()"), "new scope.Foo()");
        assert_eq!(
            render("class Foo { bar() { return Foo } }"),
            "class Foo { bar() { return Foo; } }"
        );
    }

    #[test]
    fn test_empty_expression_fails() {
        assert_eq!(scopeify(""), Err(ScopeError::Empty));
        assert_eq!(scopeify("   \n"), Err(ScopeError::Empty));
    }

    #[test]
    fn test_merge_interleaved_text() {
        let merged = merge_segments(&[
            Segment::Expression("foo"),
            Segment::Literal(" + "),
            Segment::Expression("bar"),
        ])
        .unwrap();
        assert_eq!(merged.expression_source(), "`${scope.foo} + ${scope.bar}`");
    }

    #[test]
    fn test_merge_preserves_whitespace() {
        let merged = merge_segments(&[
            Segment::Expression("foo"),
            Segment::Literal(" + "),
            Segment::Expression("bar"),
            Segment::Literal("\n      foo bar   "),
            Segment::Expression("baz"),
            Segment::Literal("\n      "),
        ])
        .unwrap();
        assert_eq!(
            merged.expression_source(),
            "`${scope.foo} + ${scope.bar}\n      foo bar   ${scope.baz}\n      `"
        );
    }

    #[test]
    fn test_merge_single_expression_stays_bare() {
        let merged = merge_segments(&[Segment::Expression("foo")]).unwrap();
        assert_eq!(merged.source(), "scope => scope.foo");
    }

    #[test]
    fn test_merge_escapes_backticks() {
        let merged = merge_segments(&[Segment::Literal("`${x}` "), Segment::Expression("y")]).unwrap();
        assert_eq!(merged.expression_source(), "`\\`\\${x}\\` ${scope.y}`");
    }

    #[test]
    fn test_evaluator_wraps_object_body() {
        assert_eq!(scopeify("{ a: 1 }").unwrap().source(), "scope => ({ a: 1 })");
    }
}
