//! Minimal expression AST for template expressions and its JavaScript printer.
//!
//! Only the subset of the expression language that templates use is modelled.
//! The printer is deterministic and inserts parentheses from operator precedence,
//! so a tree always prints the same way regardless of how it was authored.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(String),
    This,
    Literal(Literal),
    Template(TemplateLiteral),
    Array(Vec<ArrayElement>),
    Object(Vec<ObjectMember>),
    Member {
        object: Box<Expr>,
        property: MemberProperty,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<ArrayElement>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        arguments: Vec<ArrayElement>,
    },
    Unary {
        op: UnaryOp,
        argument: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Sequence(Vec<Expr>),
    Assignment {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        argument: Box<Expr>,
    },
    Function(Box<Function>),
    Class(Box<Class>),
    /// Explicit grouping that ends an optional chain, as in `(a?.b).c`.
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

/// `quasis` always holds one more entry than `expressions`. Quasis are raw source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLiteral {
    pub quasis: Vec<String>,
    pub expressions: Vec<Expr>,
}

/// Array element or call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    Property { key: PropertyKey, value: Expr },
    Method { key: PropertyKey, function: Function },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Identifier(String),
    String(String),
    Number(f64),
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Static(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Identifier(String),
    Object {
        properties: Vec<PatternProperty>,
        rest: Option<Box<Pattern>>,
    },
    Array {
        elements: Vec<Option<Pattern>>,
        rest: Option<Box<Pattern>>,
    },
    Default {
        target: Box<Pattern>,
        value: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternProperty {
    pub key: PropertyKey,
    pub value: Pattern,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expression(Box<Expr>),
    Block(Vec<Statement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expr),
    Return(Option<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: Option<String>,
    pub super_class: Option<Expr>,
    pub methods: Vec<ClassMethod>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMethod {
    pub key: PropertyKey,
    pub function: Function,
    pub is_static: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATORS
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! operator_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn from_source(text: &str) -> Option<Self> {
                match text {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

operator_enum!(UnaryOp {
    Minus => "-",
    Plus => "+",
    Not => "!",
    BitNot => "~",
    Typeof => "typeof",
    Void => "void",
    Delete => "delete",
});

operator_enum!(BinaryOp {
    Eq => "==",
    NotEq => "!=",
    StrictEq => "===",
    StrictNotEq => "!==",
    Lt => "<",
    LtEq => "<=",
    Gt => ">",
    GtEq => ">=",
    Add => "+",
    Sub => "-",
    Mul => "*",
    Div => "/",
    Rem => "%",
    Exp => "**",
    Shl => "<<",
    Shr => ">>",
    UShr => ">>>",
    BitOr => "|",
    BitXor => "^",
    BitAnd => "&",
    In => "in",
    Instanceof => "instanceof",
});

operator_enum!(LogicalOp {
    And => "&&",
    Or => "||",
    Coalesce => "??",
});

operator_enum!(AssignOp {
    Assign => "=",
    Add => "+=",
    Sub => "-=",
    Mul => "*=",
    Div => "/=",
    Rem => "%=",
    Exp => "**=",
    Shl => "<<=",
    Shr => ">>=",
    UShr => ">>>=",
    BitOr => "|=",
    BitXor => "^=",
    BitAnd => "&=",
    And => "&&=",
    Or => "||=",
    Coalesce => "??=",
});

operator_enum!(UpdateOp {
    Increment => "++",
    Decrement => "--",
});

// ═══════════════════════════════════════════════════════════════════════════════
// PRECEDENCE
// ═══════════════════════════════════════════════════════════════════════════════

const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_OR: u8 = 4;
const PREC_AND: u8 = 5;
const PREC_BIT_OR: u8 = 6;
const PREC_BIT_XOR: u8 = 7;
const PREC_BIT_AND: u8 = 8;
const PREC_EQUALITY: u8 = 9;
const PREC_RELATIONAL: u8 = 10;
const PREC_SHIFT: u8 = 11;
const PREC_ADDITIVE: u8 = 12;
const PREC_MULTIPLICATIVE: u8 = 13;
const PREC_EXPONENT: u8 = 14;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_MEMBER: u8 = 18;
const PREC_PRIMARY: u8 = 20;

impl BinaryOp {
    fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            Eq | NotEq | StrictEq | StrictNotEq => PREC_EQUALITY,
            Lt | LtEq | Gt | GtEq | In | Instanceof => PREC_RELATIONAL,
            Shl | Shr | UShr => PREC_SHIFT,
            Add | Sub => PREC_ADDITIVE,
            Mul | Div | Rem => PREC_MULTIPLICATIVE,
            Exp => PREC_EXPONENT,
            BitOr => PREC_BIT_OR,
            BitXor => PREC_BIT_XOR,
            BitAnd => PREC_BIT_AND,
        }
    }
}

impl LogicalOp {
    fn precedence(self) -> u8 {
        match self {
            LogicalOp::And => PREC_AND,
            LogicalOp::Or | LogicalOp::Coalesce => PREC_OR,
        }
    }
}

impl Expr {
    pub fn ident(name: &str) -> Expr {
        Expr::Identifier(name.to_string())
    }

    pub fn string(value: &str) -> Expr {
        Expr::Literal(Literal::String(value.to_string()))
    }

    pub fn static_member(object: Expr, property: &str) -> Expr {
        Expr::Member {
            object: Box::new(object),
            property: MemberProperty::Static(property.to_string()),
            optional: false,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Sequence(_) => PREC_SEQUENCE,
            Expr::Assignment { .. } => PREC_ASSIGN,
            Expr::Function(function) if function.is_arrow => PREC_ASSIGN,
            Expr::Conditional { .. } => PREC_CONDITIONAL,
            Expr::Logical { op, .. } => op.precedence(),
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary { .. } => PREC_UNARY,
            Expr::Update { prefix: true, .. } => PREC_UNARY,
            Expr::Update { prefix: false, .. } => PREC_POSTFIX,
            Expr::Member { .. } | Expr::Call { .. } | Expr::New { .. } => PREC_MEMBER,
            _ => PREC_PRIMARY,
        }
    }

    /// Prints the expression as JavaScript source.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        print_expr(&mut out, self, PREC_SEQUENCE);
        out
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_source())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════════

fn print_expr(out: &mut String, expr: &Expr, min_precedence: u8) {
    if expr.precedence() < min_precedence {
        out.push('(');
        print_bare(out, expr);
        out.push(')');
    } else {
        print_bare(out, expr);
    }
}

fn print_parenthesized(out: &mut String, expr: &Expr) {
    out.push('(');
    print_bare(out, expr);
    out.push(')');
}

fn print_bare(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Identifier(name) => out.push_str(name),
        Expr::This => out.push_str("this"),
        Expr::Literal(literal) => print_literal(out, literal),
        Expr::Template(template) => print_template(out, template),
        Expr::Array(elements) => {
            out.push('[');
            print_elements(out, elements);
            if matches!(elements.last(), Some(ArrayElement::Hole)) {
                out.push(',');
            }
            out.push(']');
        }
        Expr::Object(members) => print_object(out, members),
        Expr::Member {
            object,
            property,
            optional,
        } => {
            print_callee(out, object);
            match property {
                MemberProperty::Static(name) => {
                    out.push_str(if *optional { "?." } else { "." });
                    out.push_str(name);
                }
                MemberProperty::Computed(property) => {
                    if *optional {
                        out.push_str("?.");
                    }
                    out.push('[');
                    print_expr(out, property, PREC_SEQUENCE);
                    out.push(']');
                }
            }
        }
        Expr::Call {
            callee,
            arguments,
            optional,
        } => {
            print_callee(out, callee);
            if *optional {
                out.push_str("?.");
            }
            out.push('(');
            print_elements(out, arguments);
            out.push(')');
        }
        Expr::New { callee, arguments } => {
            out.push_str("new ");
            if contains_call(callee) {
                print_parenthesized(out, callee);
            } else {
                print_callee(out, callee);
            }
            out.push('(');
            print_elements(out, arguments);
            out.push(')');
        }
        Expr::Unary { op, argument } => {
            out.push_str(op.as_str());
            let mut operand = String::new();
            print_expr(&mut operand, argument, PREC_UNARY);
            let needs_space = match op {
                UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete => true,
                UnaryOp::Minus => operand.starts_with('-'),
                UnaryOp::Plus => operand.starts_with('+'),
                _ => false,
            };
            if needs_space {
                out.push(' ');
            }
            out.push_str(&operand);
        }
        Expr::Update {
            op,
            prefix,
            argument,
        } => {
            if *prefix {
                out.push_str(op.as_str());
                print_expr(out, argument, PREC_POSTFIX);
            } else {
                print_expr(out, argument, PREC_POSTFIX);
                out.push_str(op.as_str());
            }
        }
        Expr::Binary { op, left, right } => {
            let precedence = op.precedence();
            if *op == BinaryOp::Exp {
                print_expr(out, left, PREC_POSTFIX);
                out.push_str(" ** ");
                print_expr(out, right, precedence);
            } else {
                print_expr(out, left, precedence);
                out.push(' ');
                out.push_str(op.as_str());
                out.push(' ');
                print_expr(out, right, precedence + 1);
            }
        }
        Expr::Logical { op, left, right } => {
            let precedence = op.precedence();
            print_logical_operand(out, *op, left, precedence);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            print_logical_operand(out, *op, right, precedence + 1);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            print_expr(out, test, PREC_OR);
            out.push_str(" ? ");
            print_expr(out, consequent, PREC_ASSIGN);
            out.push_str(" : ");
            print_expr(out, alternate, PREC_ASSIGN);
        }
        Expr::Sequence(expressions) => {
            for (i, expression) in expressions.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_expr(out, expression, PREC_ASSIGN);
            }
        }
        Expr::Assignment { op, target, value } => {
            print_expr(out, target, PREC_POSTFIX);
            out.push(' ');
            out.push_str(op.as_str());
            out.push(' ');
            print_expr(out, value, PREC_ASSIGN);
        }
        Expr::Function(function) => print_function(out, function),
        Expr::Class(class) => print_class(out, class),
        Expr::Paren(inner) => print_parenthesized(out, inner),
    }
}

/// `??` cannot be mixed with `&&`/`||` without parentheses.
fn print_logical_operand(out: &mut String, parent: LogicalOp, operand: &Expr, min_precedence: u8) {
    let mixes_coalesce = match operand {
        Expr::Logical { op, .. } => {
            (parent == LogicalOp::Coalesce) != (*op == LogicalOp::Coalesce)
        }
        _ => false,
    };
    if mixes_coalesce {
        print_parenthesized(out, operand);
    } else {
        print_expr(out, operand, min_precedence);
    }
}

fn print_callee(out: &mut String, callee: &Expr) {
    match callee {
        Expr::Literal(Literal::Number(_)) => print_parenthesized(out, callee),
        _ => print_expr(out, callee, PREC_MEMBER),
    }
}

fn contains_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. } => true,
        Expr::Member { object, .. } => contains_call(object),
        _ => false,
    }
}

fn print_elements(out: &mut String, elements: &[ArrayElement]) {
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match element {
            ArrayElement::Expr(expr) => print_expr(out, expr, PREC_ASSIGN),
            ArrayElement::Spread(expr) => {
                out.push_str("...");
                print_expr(out, expr, PREC_ASSIGN);
            }
            ArrayElement::Hole => {}
        }
    }
}

fn print_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Null => out.push_str("null"),
        Literal::Boolean(value) => out.push_str(if *value { "true" } else { "false" }),
        Literal::Number(value) => out.push_str(&format_number(*value)),
        Literal::String(value) => out.push_str(&quote_string(value)),
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{}", value)
    }
}

/// Quotes a string with single quotes, escaping what a JS string literal requires.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn print_template(out: &mut String, template: &TemplateLiteral) {
    out.push('`');
    for (i, quasi) in template.quasis.iter().enumerate() {
        out.push_str(quasi);
        if let Some(expression) = template.expressions.get(i) {
            out.push_str("${");
            print_expr(out, expression, PREC_SEQUENCE);
            out.push('}');
        }
    }
    out.push('`');
}

fn print_key(out: &mut String, key: &PropertyKey) {
    match key {
        PropertyKey::Identifier(name) => out.push_str(name),
        PropertyKey::String(value) => out.push_str(&quote_string(value)),
        PropertyKey::Number(value) => out.push_str(&format_number(*value)),
        PropertyKey::Computed(expr) => {
            out.push('[');
            print_expr(out, expr, PREC_ASSIGN);
            out.push(']');
        }
    }
}

fn print_object(out: &mut String, members: &[ObjectMember]) {
    if members.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push_str("{ ");
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match member {
            ObjectMember::Property { key, value } => {
                let shorthand = matches!(
                    (key, value),
                    (PropertyKey::Identifier(k), Expr::Identifier(v)) if k == v
                );
                print_key(out, key);
                if !shorthand {
                    out.push_str(": ");
                    print_expr(out, value, PREC_ASSIGN);
                }
            }
            ObjectMember::Method { key, function } => {
                if function.is_async {
                    out.push_str("async ");
                }
                print_key(out, key);
                print_params(out, &function.params);
                out.push(' ');
                print_body(out, &function.body);
            }
            ObjectMember::Spread(expr) => {
                out.push_str("...");
                print_expr(out, expr, PREC_ASSIGN);
            }
        }
    }
    out.push_str(" }");
}

fn print_pattern(out: &mut String, pattern: &Pattern) {
    match pattern {
        Pattern::Identifier(name) => out.push_str(name),
        Pattern::Default { target, value } => {
            print_pattern(out, target);
            out.push_str(" = ");
            print_expr(out, value, PREC_ASSIGN);
        }
        Pattern::Object { properties, rest } => {
            if properties.is_empty() && rest.is_none() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            let mut first = true;
            for property in properties {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                let shorthand_name = match (&property.key, &property.value) {
                    (PropertyKey::Identifier(key), Pattern::Identifier(name)) if key == name => true,
                    (PropertyKey::Identifier(key), Pattern::Default { target, .. }) => {
                        matches!(target.as_ref(), Pattern::Identifier(name) if name == key)
                    }
                    _ => false,
                };
                if !shorthand_name {
                    print_key(out, &property.key);
                    out.push_str(": ");
                }
                print_pattern(out, &property.value);
            }
            if let Some(rest) = rest {
                if !first {
                    out.push_str(", ");
                }
                out.push_str("...");
                print_pattern(out, rest);
            }
            out.push_str(" }");
        }
        Pattern::Array { elements, rest } => {
            out.push('[');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(element) = element {
                    print_pattern(out, element);
                }
            }
            if let Some(rest) = rest {
                if !elements.is_empty() {
                    out.push_str(", ");
                }
                out.push_str("...");
                print_pattern(out, rest);
            } else if matches!(elements.last(), Some(None)) {
                out.push(',');
            }
            out.push(']');
        }
    }
}

fn print_params(out: &mut String, params: &[Pattern]) {
    out.push('(');
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        print_pattern(out, param);
    }
    out.push(')');
}

/// Wraps source that would otherwise be read as a block or declaration.
fn guard_leading_brace(source: String, guard_declarations: bool) -> String {
    let ambiguous = source.starts_with('{')
        || (guard_declarations
            && (source.starts_with("function") || source.starts_with("class")));
    if ambiguous {
        format!("({})", source)
    } else {
        source
    }
}

fn print_body(out: &mut String, body: &FunctionBody) {
    match body {
        FunctionBody::Expression(expr) => {
            let mut source = String::new();
            print_expr(&mut source, expr, PREC_ASSIGN);
            out.push_str(&guard_leading_brace(source, false));
        }
        FunctionBody::Block(statements) if statements.is_empty() => out.push_str("{}"),
        FunctionBody::Block(statements) => {
            out.push_str("{ ");
            for statement in statements {
                match statement {
                    Statement::Expression(expr) => {
                        out.push_str(&guard_leading_brace(expr.to_source(), true));
                    }
                    Statement::Return(None) => out.push_str("return"),
                    Statement::Return(Some(expr)) => {
                        out.push_str("return ");
                        out.push_str(&expr.to_source());
                    }
                }
                out.push_str("; ");
            }
            out.push('}');
        }
    }
}

fn print_function(out: &mut String, function: &Function) {
    if function.is_async {
        out.push_str("async ");
    }
    if function.is_arrow {
        print_params(out, &function.params);
        out.push_str(" => ");
    } else {
        out.push_str("function");
        if let Some(name) = &function.name {
            out.push(' ');
            out.push_str(name);
        }
        print_params(out, &function.params);
        out.push(' ');
    }
    print_body(out, &function.body);
}

fn print_class(out: &mut String, class: &Class) {
    out.push_str("class");
    if let Some(name) = &class.name {
        out.push(' ');
        out.push_str(name);
    }
    if let Some(super_class) = &class.super_class {
        out.push_str(" extends ");
        print_callee(out, super_class);
    }
    if class.methods.is_empty() {
        out.push_str(" {}");
        return;
    }
    out.push_str(" { ");
    for method in &class.methods {
        if method.is_static {
            out.push_str("static ");
        }
        if method.function.is_async {
            out.push_str("async ");
        }
        print_key(out, &method.key);
        print_params(out, &method.function.params);
        out.push(' ');
        print_body(out, &method.function.body);
        out.push(' ');
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn number(value: f64) -> Expr {
        Expr::Literal(Literal::Number(value))
    }

    #[test]
    fn test_precedence_parentheses() {
        let sum = binary(BinaryOp::Add, Expr::ident("a"), Expr::ident("b"));
        let product = binary(BinaryOp::Mul, sum.clone(), Expr::ident("c"));
        assert_eq!(product.to_source(), "(a + b) * c");

        let left_assoc = binary(BinaryOp::Sub, sum.clone(), Expr::ident("c"));
        assert_eq!(left_assoc.to_source(), "a + b - c");

        let right_nested = binary(BinaryOp::Sub, Expr::ident("c"), sum);
        assert_eq!(right_nested.to_source(), "c - (a + b)");
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let inner = binary(BinaryOp::Exp, Expr::ident("b"), Expr::ident("c"));
        let outer = binary(BinaryOp::Exp, Expr::ident("a"), inner);
        assert_eq!(outer.to_source(), "a ** b ** c");

        let negated = Expr::Unary {
            op: UnaryOp::Minus,
            argument: Box::new(Expr::ident("a")),
        };
        assert_eq!(binary(BinaryOp::Exp, negated, number(2.0)).to_source(), "(-a) ** 2");
    }

    #[test]
    fn test_strings_are_single_quoted() {
        assert_eq!(Expr::string("it's").to_source(), "'it\\'s'");
        assert_eq!(Expr::string("a\nb").to_source(), "'a\\nb'");
    }

    #[test]
    fn test_numbers_print_like_js() {
        assert_eq!(number(1.0).to_source(), "1");
        assert_eq!(number(0.5).to_source(), "0.5");
        assert_eq!(Expr::static_member(number(1.0), "toFixed").to_source(), "(1).toFixed");
    }

    #[test]
    fn test_arrow_object_body_is_wrapped() {
        let arrow = Expr::Function(Box::new(Function {
            name: None,
            params: vec![Pattern::Identifier("x".to_string())],
            body: FunctionBody::Expression(Box::new(Expr::Object(vec![ObjectMember::Property {
                key: PropertyKey::Identifier("a".to_string()),
                value: Expr::ident("x"),
            }]))),
            is_arrow: true,
            is_async: false,
        }));
        assert_eq!(arrow.to_source(), "(x) => ({ a: x })");
    }

    #[test]
    fn test_coalesce_mixing_keeps_parentheses() {
        let or = Expr::Logical {
            op: LogicalOp::Or,
            left: Box::new(Expr::ident("a")),
            right: Box::new(Expr::ident("b")),
        };
        let coalesce = Expr::Logical {
            op: LogicalOp::Coalesce,
            left: Box::new(or),
            right: Box::new(Expr::ident("c")),
        };
        assert_eq!(coalesce.to_source(), "(a || b) ?? c");
    }

    #[test]
    fn test_new_with_call_callee() {
        let call = Expr::Call {
            callee: Box::new(Expr::ident("factory")),
            arguments: vec![],
            optional: false,
        };
        let new = Expr::New {
            callee: Box::new(call),
            arguments: vec![],
        };
        assert_eq!(new.to_source(), "new (factory())()");
    }

    #[test]
    fn test_operator_text_round_trips() {
        assert_eq!(BinaryOp::from_source("instanceof"), Some(BinaryOp::Instanceof));
        assert_eq!(AssignOp::from_source("??="), Some(AssignOp::Coalesce));
        assert_eq!(UnaryOp::from_source("@"), None);
    }
}
