//! Lowers `oxc_parser` output into the crate's own expression AST.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, AssignmentTarget, BindingPattern, ChainElement,
    ClassElement, Expression, FormalParameters, MethodDefinitionKind, ObjectPropertyKind,
    PropertyKind, SimpleAssignmentTarget, Statement,
};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::ast::{
    ArrayElement, AssignOp, BinaryOp, Class, ClassMethod, Expr, Function, FunctionBody, Literal,
    LogicalOp, MemberProperty, ObjectMember, Pattern, PatternProperty, PropertyKey,
    TemplateLiteral, UnaryOp, UpdateOp,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LowerError {
    #[error("{0}")]
    Syntax(String),
    #[error("{0} is not supported in template expressions")]
    Unsupported(&'static str),
}

type LowerResult<T> = Result<T, LowerError>;

/// Parses one expression and lowers it.
pub fn parse_expression(source: &str) -> LowerResult<Expr> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);

    let expression = Parser::new(&allocator, source, source_type)
        .parse_expression()
        .map_err(|errors| {
            LowerError::Syntax(
                errors
                    .iter()
                    .map(|error| error.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

    lower_expression(&expression)
}

pub fn lower_expression(expr: &Expression<'_>) -> LowerResult<Expr> {
    let lowered = match expr {
        Expression::Identifier(id) => Expr::Identifier(id.name.to_string()),
        Expression::ThisExpression(_) => Expr::This,
        Expression::NullLiteral(_) => Expr::Literal(Literal::Null),
        Expression::BooleanLiteral(b) => Expr::Literal(Literal::Boolean(b.value)),
        Expression::NumericLiteral(n) => Expr::Literal(Literal::Number(n.value)),
        Expression::StringLiteral(s) => Expr::Literal(Literal::String(s.value.to_string())),
        Expression::TemplateLiteral(tpl) => Expr::Template(TemplateLiteral {
            quasis: tpl.quasis.iter().map(|q| q.value.raw.to_string()).collect(),
            expressions: tpl
                .expressions
                .iter()
                .map(lower_expression)
                .collect::<LowerResult<_>>()?,
        }),
        Expression::ParenthesizedExpression(paren) => {
            let inner = lower_expression(&paren.expression)?;
            if closes_chain(&paren.expression) {
                Expr::Paren(Box::new(inner))
            } else {
                inner
            }
        }
        Expression::ArrayExpression(arr) => {
            let mut elements = Vec::with_capacity(arr.elements.len());
            for element in &arr.elements {
                elements.push(match element {
                    ArrayExpressionElement::SpreadElement(spread) => {
                        ArrayElement::Spread(lower_expression(&spread.argument)?)
                    }
                    ArrayExpressionElement::Elision(_) => ArrayElement::Hole,
                    other => match other.as_expression() {
                        Some(e) => ArrayElement::Expr(lower_expression(e)?),
                        None => return Err(LowerError::Unsupported("this array element")),
                    },
                });
            }
            Expr::Array(elements)
        }
        Expression::ObjectExpression(obj) => {
            let mut members = Vec::with_capacity(obj.properties.len());
            for property in &obj.properties {
                members.push(match property {
                    ObjectPropertyKind::ObjectProperty(p) => {
                        if p.kind != PropertyKind::Init {
                            return Err(LowerError::Unsupported("a getter or setter"));
                        }
                        let key = lower_property_key(&p.key, p.computed)?;
                        match &p.value {
                            Expression::FunctionExpression(func) if p.method => {
                                ObjectMember::Method {
                                    key,
                                    function: lower_function(func)?,
                                }
                            }
                            value => ObjectMember::Property {
                                key,
                                value: lower_expression(value)?,
                            },
                        }
                    }
                    ObjectPropertyKind::SpreadProperty(spread) => {
                        ObjectMember::Spread(lower_expression(&spread.argument)?)
                    }
                });
            }
            Expr::Object(members)
        }
        Expression::StaticMemberExpression(m) => Expr::Member {
            object: Box::new(lower_expression(&m.object)?),
            property: MemberProperty::Static(m.property.name.to_string()),
            optional: m.optional,
        },
        Expression::ComputedMemberExpression(m) => Expr::Member {
            object: Box::new(lower_expression(&m.object)?),
            property: MemberProperty::Computed(Box::new(lower_expression(&m.expression)?)),
            optional: m.optional,
        },
        Expression::CallExpression(call) => Expr::Call {
            callee: Box::new(lower_expression(&call.callee)?),
            arguments: lower_arguments(&call.arguments)?,
            optional: call.optional,
        },
        Expression::NewExpression(new_expr) => Expr::New {
            callee: Box::new(lower_expression(&new_expr.callee)?),
            arguments: lower_arguments(&new_expr.arguments)?,
        },
        Expression::ChainExpression(chain) => match &chain.expression {
            ChainElement::CallExpression(call) => Expr::Call {
                callee: Box::new(lower_expression(&call.callee)?),
                arguments: lower_arguments(&call.arguments)?,
                optional: call.optional,
            },
            ChainElement::StaticMemberExpression(m) => Expr::Member {
                object: Box::new(lower_expression(&m.object)?),
                property: MemberProperty::Static(m.property.name.to_string()),
                optional: m.optional,
            },
            ChainElement::ComputedMemberExpression(m) => Expr::Member {
                object: Box::new(lower_expression(&m.object)?),
                property: MemberProperty::Computed(Box::new(lower_expression(&m.expression)?)),
                optional: m.optional,
            },
            _ => return Err(LowerError::Unsupported("this optional chain")),
        },
        Expression::UnaryExpression(unary) => Expr::Unary {
            op: UnaryOp::from_source(unary.operator.as_str())
                .ok_or(LowerError::Unsupported("this unary operator"))?,
            argument: Box::new(lower_expression(&unary.argument)?),
        },
        Expression::BinaryExpression(bin) => Expr::Binary {
            op: BinaryOp::from_source(bin.operator.as_str())
                .ok_or(LowerError::Unsupported("this binary operator"))?,
            left: Box::new(lower_expression(&bin.left)?),
            right: Box::new(lower_expression(&bin.right)?),
        },
        Expression::LogicalExpression(logical) => Expr::Logical {
            op: LogicalOp::from_source(logical.operator.as_str())
                .ok_or(LowerError::Unsupported("this logical operator"))?,
            left: Box::new(lower_expression(&logical.left)?),
            right: Box::new(lower_expression(&logical.right)?),
        },
        Expression::ConditionalExpression(cond) => Expr::Conditional {
            test: Box::new(lower_expression(&cond.test)?),
            consequent: Box::new(lower_expression(&cond.consequent)?),
            alternate: Box::new(lower_expression(&cond.alternate)?),
        },
        Expression::SequenceExpression(seq) => Expr::Sequence(
            seq.expressions
                .iter()
                .map(lower_expression)
                .collect::<LowerResult<_>>()?,
        ),
        Expression::AssignmentExpression(assign) => Expr::Assignment {
            op: AssignOp::from_source(assign.operator.as_str())
                .ok_or(LowerError::Unsupported("this assignment operator"))?,
            target: Box::new(lower_assignment_target(&assign.left)?),
            value: Box::new(lower_expression(&assign.right)?),
        },
        Expression::UpdateExpression(update) => Expr::Update {
            op: UpdateOp::from_source(update.operator.as_str())
                .ok_or(LowerError::Unsupported("this update operator"))?,
            prefix: update.prefix,
            argument: Box::new(lower_simple_target(&update.argument)?),
        },
        Expression::ArrowFunctionExpression(arrow) => {
            let body = if arrow.expression {
                match arrow.body.statements.first() {
                    Some(Statement::ExpressionStatement(stmt)) => {
                        FunctionBody::Expression(Box::new(lower_expression(&stmt.expression)?))
                    }
                    _ => return Err(LowerError::Unsupported("this arrow function body")),
                }
            } else {
                FunctionBody::Block(lower_statements(&arrow.body.statements)?)
            };
            Expr::Function(Box::new(Function {
                name: None,
                params: lower_params(&arrow.params)?,
                body,
                is_arrow: true,
                is_async: arrow.r#async,
            }))
        }
        Expression::FunctionExpression(func) => Expr::Function(Box::new(lower_function(func)?)),
        Expression::ClassExpression(class) => {
            let mut methods = Vec::with_capacity(class.body.body.len());
            for element in &class.body.body {
                match element {
                    ClassElement::MethodDefinition(method) => {
                        if matches!(method.kind, MethodDefinitionKind::Get | MethodDefinitionKind::Set) {
                            return Err(LowerError::Unsupported("a class getter or setter"));
                        }
                        methods.push(ClassMethod {
                            key: lower_property_key(&method.key, method.computed)?,
                            function: lower_function(&method.value)?,
                            is_static: method.r#static,
                        });
                    }
                    _ => return Err(LowerError::Unsupported("this class member")),
                }
            }
            Expr::Class(Box::new(Class {
                name: class.id.as_ref().map(|id| id.name.to_string()),
                super_class: match &class.super_class {
                    Some(super_class) => Some(lower_expression(super_class)?),
                    None => None,
                },
                methods,
            }))
        }
        Expression::RegExpLiteral(_) => return Err(LowerError::Unsupported("a regular expression literal")),
        Expression::BigIntLiteral(_) => return Err(LowerError::Unsupported("a bigint literal")),
        Expression::TaggedTemplateExpression(_) => {
            return Err(LowerError::Unsupported("a tagged template"))
        }
        Expression::AwaitExpression(_) => return Err(LowerError::Unsupported("`await`")),
        Expression::YieldExpression(_) => return Err(LowerError::Unsupported("`yield`")),
        _ => return Err(LowerError::Unsupported("this syntax")),
    };
    Ok(lowered)
}

fn lower_arguments(arguments: &[Argument<'_>]) -> LowerResult<Vec<ArrayElement>> {
    let mut lowered = Vec::with_capacity(arguments.len());
    for argument in arguments {
        lowered.push(match argument {
            Argument::SpreadElement(spread) => ArrayElement::Spread(lower_expression(&spread.argument)?),
            other => match other.as_expression() {
                Some(e) => ArrayElement::Expr(lower_expression(e)?),
                None => return Err(LowerError::Unsupported("this call argument")),
            },
        });
    }
    Ok(lowered)
}

fn lower_property_key(key: &oxc_ast::ast::PropertyKey<'_>, computed: bool) -> LowerResult<PropertyKey> {
    use oxc_ast::ast::PropertyKey as OxcKey;

    match key {
        OxcKey::StaticIdentifier(id) => Ok(PropertyKey::Identifier(id.name.to_string())),
        OxcKey::PrivateIdentifier(_) => Err(LowerError::Unsupported("a private name")),
        other => {
            let expr = other
                .as_expression()
                .ok_or(LowerError::Unsupported("this property key"))?;
            if computed {
                return Ok(PropertyKey::Computed(lower_expression(expr)?));
            }
            match expr {
                Expression::StringLiteral(s) => Ok(PropertyKey::String(s.value.to_string())),
                Expression::NumericLiteral(n) => Ok(PropertyKey::Number(n.value)),
                _ => Err(LowerError::Unsupported("this property key")),
            }
        }
    }
}

fn lower_assignment_target(target: &AssignmentTarget<'_>) -> LowerResult<Expr> {
    match target {
        AssignmentTarget::AssignmentTargetIdentifier(id) => Ok(Expr::Identifier(id.name.to_string())),
        AssignmentTarget::StaticMemberExpression(m) => Ok(Expr::Member {
            object: Box::new(lower_expression(&m.object)?),
            property: MemberProperty::Static(m.property.name.to_string()),
            optional: false,
        }),
        AssignmentTarget::ComputedMemberExpression(m) => Ok(Expr::Member {
            object: Box::new(lower_expression(&m.object)?),
            property: MemberProperty::Computed(Box::new(lower_expression(&m.expression)?)),
            optional: false,
        }),
        _ => Err(LowerError::Unsupported("a destructuring assignment")),
    }
}

fn lower_simple_target(target: &SimpleAssignmentTarget<'_>) -> LowerResult<Expr> {
    match target {
        SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => Ok(Expr::Identifier(id.name.to_string())),
        SimpleAssignmentTarget::StaticMemberExpression(m) => Ok(Expr::Member {
            object: Box::new(lower_expression(&m.object)?),
            property: MemberProperty::Static(m.property.name.to_string()),
            optional: false,
        }),
        SimpleAssignmentTarget::ComputedMemberExpression(m) => Ok(Expr::Member {
            object: Box::new(lower_expression(&m.object)?),
            property: MemberProperty::Computed(Box::new(lower_expression(&m.expression)?)),
            optional: false,
        }),
        _ => Err(LowerError::Unsupported("this update target")),
    }
}

fn lower_function(func: &oxc_ast::ast::Function<'_>) -> LowerResult<Function> {
    if func.generator {
        return Err(LowerError::Unsupported("a generator function"));
    }
    let body = match &func.body {
        Some(body) => lower_statements(&body.statements)?,
        None => Vec::new(),
    };
    Ok(Function {
        name: func.id.as_ref().map(|id| id.name.to_string()),
        params: lower_params(&func.params)?,
        body: FunctionBody::Block(body),
        is_arrow: false,
        is_async: func.r#async,
    })
}

fn lower_params(params: &FormalParameters<'_>) -> LowerResult<Vec<Pattern>> {
    if params.rest.is_some() {
        return Err(LowerError::Unsupported("a rest parameter"));
    }
    params
        .items
        .iter()
        .map(|param| {
            let pattern = lower_pattern(&param.pattern)?;
            match &param.initializer {
                Some(initializer) => Ok(Pattern::Default {
                    target: Box::new(pattern),
                    value: Box::new(lower_expression(initializer)?),
                }),
                None => Ok(pattern),
            }
        })
        .collect()
}

/// Grouping around an optional chain ends the chain, so it must survive printing.
fn closes_chain(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::ChainExpression(_) => true,
        Expression::ParenthesizedExpression(paren) => closes_chain(&paren.expression),
        _ => false,
    }
}

fn lower_pattern(pattern: &BindingPattern<'_>) -> LowerResult<Pattern> {
    match pattern {
        BindingPattern::BindingIdentifier(id) => Ok(Pattern::Identifier(id.name.to_string())),
        BindingPattern::ObjectPattern(obj) => {
            let mut properties = Vec::with_capacity(obj.properties.len());
            for property in &obj.properties {
                properties.push(PatternProperty {
                    key: lower_property_key(&property.key, property.computed)?,
                    value: lower_pattern(&property.value)?,
                });
            }
            let rest = match &obj.rest {
                Some(rest) => Some(Box::new(lower_pattern(&rest.argument)?)),
                None => None,
            };
            Ok(Pattern::Object { properties, rest })
        }
        BindingPattern::ArrayPattern(arr) => {
            let mut elements = Vec::with_capacity(arr.elements.len());
            for element in &arr.elements {
                elements.push(match element {
                    Some(p) => Some(lower_pattern(p)?),
                    None => None,
                });
            }
            let rest = match &arr.rest {
                Some(rest) => Some(Box::new(lower_pattern(&rest.argument)?)),
                None => None,
            };
            Ok(Pattern::Array { elements, rest })
        }
        BindingPattern::AssignmentPattern(assign) => Ok(Pattern::Default {
            target: Box::new(lower_pattern(&assign.left)?),
            value: Box::new(lower_expression(&assign.right)?),
        }),
    }
}

fn lower_statements(statements: &[Statement<'_>]) -> LowerResult<Vec<crate::ast::Statement>> {
    statements
        .iter()
        .map(|statement| match statement {
            Statement::ExpressionStatement(stmt) => {
                Ok(crate::ast::Statement::Expression(lower_expression(&stmt.expression)?))
            }
            Statement::ReturnStatement(ret) => Ok(crate::ast::Statement::Return(
                match &ret.argument {
                    Some(argument) => Some(lower_expression(argument)?),
                    None => None,
                },
            )),
            _ => Err(LowerError::Unsupported("a statement other than an expression or return")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(source: &str) -> String {
        parse_expression(source).unwrap().to_source()
    }

    #[test]
    fn test_lowers_common_shapes() {
        assert_eq!(round_trip("a + b * c"), "a + b * c");
        assert_eq!(round_trip("(a + b) * c"), "(a + b) * c");
        assert_eq!(round_trip("a ? b : c"), "a ? b : c");
        assert_eq!(round_trip("\"hello\""), "'hello'");
        assert_eq!(round_trip("{ foo: bar, buz }"), "{ foo: bar, buz }");
        assert_eq!(round_trip("[1, 'a', b]"), "[1, 'a', b]");
        assert_eq!(round_trip("a?.b?.[c]"), "a?.b?.[c]");
        assert_eq!(round_trip("foo(...args, 1)"), "foo(...args, 1)");
    }

    #[test]
    fn test_arrow_params_always_parenthesized() {
        assert_eq!(round_trip("x => x + 1"), "(x) => x + 1");
        assert_eq!(round_trip("({ a, b = 2 }) => a"), "({ a, b = 2 }) => a");
    }

    #[test]
    fn test_default_parameters_are_kept() {
        assert_eq!(round_trip("(x = 1) => x"), "(x = 1) => x");
        assert_eq!(round_trip("(x = y) => x"), "(x = y) => x");
        assert_eq!(
            round_trip("function (a = b) { return a }"),
            "function(a = b) { return a; }"
        );
    }

    #[test]
    fn test_grouped_optional_chain_keeps_parens() {
        assert_eq!(round_trip("(a?.b)()"), "(a?.b)()");
        assert_eq!(round_trip("(a?.b).c"), "(a?.b).c");
        assert_eq!(round_trip("((a?.b)).c"), "(a?.b).c");
        assert_eq!(round_trip("(a.b).c"), "a.b.c");
    }

    #[test]
    fn test_template_literal_keeps_raw_quasis() {
        assert_eq!(round_trip("`a\\n${b}c`"), "`a\\n${b}c`");
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        assert!(matches!(parse_expression("/ab+c/"), Err(LowerError::Unsupported(_))));
        assert!(matches!(parse_expression("10n"), Err(LowerError::Unsupported(_))));
        assert!(matches!(parse_expression("tag`x`"), Err(LowerError::Unsupported(_))));
        assert!(matches!(
            parse_expression("function () { var a = 1; return a }"),
            Err(LowerError::Unsupported(_))
        ));
    }

    #[test]
    fn test_reports_syntax_errors() {
        assert!(matches!(parse_expression("a +"), Err(LowerError::Syntax(_))));
    }
}
