//! Static evaluator for compiled expressions.
//!
//! Interprets an evaluator body against a JSON scope object, following JavaScript
//! semantics over the JSON value domain. `undefined` and missing properties read
//! as `null`. Anything that would run user code (calls, `new`, functions,
//! classes, assignments) is reported as unsupported.

use serde_json::{Map, Value};

use crate::ast::{
    format_number, ArrayElement, BinaryOp, Expr, Literal, LogicalOp, MemberProperty, ObjectMember,
    PropertyKey, UnaryOp,
};
use crate::scope::{Evaluator, SCOPE};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("{0} cannot be evaluated statically")]
    Unsupported(String),
    #[error("TypeError: {0}")]
    Type(String),
}

type EvalResult<T> = Result<T, EvalError>;

impl Evaluator {
    /// Runs the evaluator with `scope` bound to the given value.
    pub fn evaluate(&self, scope: &Value) -> EvalResult<Value> {
        Interpreter { scope }.eval(self.body())
    }
}

struct Interpreter<'s> {
    scope: &'s Value,
}

impl Interpreter<'_> {
    fn eval(&self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Identifier(name) => match name.as_str() {
                SCOPE => Ok(self.scope.clone()),
                "undefined" | "NaN" | "Infinity" => Ok(Value::Null),
                other => Err(EvalError::Unsupported(format!("global `{}`", other))),
            },
            Expr::This => Err(EvalError::Unsupported("`this`".to_string())),
            Expr::Literal(literal) => Ok(match literal {
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::Bool(*b),
                Literal::Number(n) => number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expr::Template(template) => {
                let mut out = String::new();
                for (i, quasi) in template.quasis.iter().enumerate() {
                    out.push_str(&unescape_string(quasi));
                    if let Some(expression) = template.expressions.get(i) {
                        out.push_str(&to_js_string(&self.eval(expression)?));
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Array(elements) => Ok(Value::Array(self.eval_elements(elements)?)),
            Expr::Object(members) => {
                let mut object = Map::new();
                for member in members {
                    match member {
                        ObjectMember::Property { key, value } => {
                            let key = self.eval_key(key)?;
                            object.insert(key, self.eval(value)?);
                        }
                        ObjectMember::Spread(source) => match self.eval(source)? {
                            Value::Object(entries) => object.extend(entries),
                            Value::Array(items) => {
                                for (i, item) in items.into_iter().enumerate() {
                                    object.insert(i.to_string(), item);
                                }
                            }
                            Value::String(s) => {
                                for (i, c) in s.chars().enumerate() {
                                    object.insert(i.to_string(), Value::String(c.to_string()));
                                }
                            }
                            _ => {}
                        },
                        ObjectMember::Method { .. } => {
                            return Err(EvalError::Unsupported("an object method".to_string()))
                        }
                    }
                }
                Ok(Value::Object(object))
            }
            Expr::Member { .. } => Ok(self.eval_access(expr)?.unwrap_or(Value::Null)),
            Expr::Unary { op, argument } => {
                if *op == UnaryOp::Delete {
                    return Err(EvalError::Unsupported("`delete`".to_string()));
                }
                let value = self.eval(argument)?;
                Ok(match op {
                    UnaryOp::Minus => number(-to_number(&value)),
                    UnaryOp::Plus => number(to_number(&value)),
                    UnaryOp::Not => Value::Bool(!is_truthy(&value)),
                    UnaryOp::BitNot => number(!to_int32(&value) as f64),
                    UnaryOp::Typeof => Value::String(type_of(&value).to_string()),
                    UnaryOp::Void | UnaryOp::Delete => Value::Null,
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuits = match op {
                    LogicalOp::And => !is_truthy(&left),
                    LogicalOp::Or => is_truthy(&left),
                    LogicalOp::Coalesce => !left.is_null(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if is_truthy(&self.eval(test)?) {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Sequence(expressions) => {
                let mut last = Value::Null;
                for expression in expressions {
                    last = self.eval(expression)?;
                }
                Ok(last)
            }
            Expr::Call { .. } => Err(EvalError::Unsupported("a function call".to_string())),
            Expr::New { .. } => Err(EvalError::Unsupported("`new`".to_string())),
            Expr::Assignment { .. } | Expr::Update { .. } => {
                Err(EvalError::Unsupported("an assignment".to_string()))
            }
            Expr::Function(_) => Err(EvalError::Unsupported("a function".to_string())),
            Expr::Class(_) => Err(EvalError::Unsupported("a class".to_string())),
            Expr::Paren(inner) => self.eval(inner),
        }
    }

    /// Member access with optional chaining. `None` means the chain short-circuited.
    fn eval_access(&self, expr: &Expr) -> EvalResult<Option<Value>> {
        let Expr::Member {
            object,
            property,
            optional,
        } = expr
        else {
            return self.eval(expr).map(Some);
        };

        let Some(object) = self.eval_access(object)? else {
            return Ok(None);
        };
        if object.is_null() && *optional {
            return Ok(None);
        }

        let key = match property {
            MemberProperty::Static(name) => name.clone(),
            MemberProperty::Computed(expr) => to_property_key(&self.eval(expr)?),
        };
        get_property(&object, &key).map(Some)
    }

    fn eval_elements(&self, elements: &[ArrayElement]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                ArrayElement::Expr(expr) => values.push(self.eval(expr)?),
                ArrayElement::Hole => values.push(Value::Null),
                ArrayElement::Spread(expr) => match self.eval(expr)? {
                    Value::Array(items) => values.extend(items),
                    Value::String(s) => {
                        values.extend(s.chars().map(|c| Value::String(c.to_string())))
                    }
                    other => {
                        return Err(EvalError::Type(format!(
                            "{} is not iterable",
                            to_js_string(&other)
                        )))
                    }
                },
            }
        }
        Ok(values)
    }

    fn eval_key(&self, key: &PropertyKey) -> EvalResult<String> {
        Ok(match key {
            PropertyKey::Identifier(name) | PropertyKey::String(name) => name.clone(),
            PropertyKey::Number(n) => format_number(*n),
            PropertyKey::Computed(expr) => to_property_key(&self.eval(expr)?),
        })
    }
}

fn get_property(object: &Value, key: &str) -> EvalResult<Value> {
    match object {
        Value::Null => Err(EvalError::Type(format!(
            "Cannot read properties of null (reading '{}')",
            key
        ))),
        Value::Object(entries) => Ok(entries.get(key).cloned().unwrap_or(Value::Null)),
        Value::Array(items) => Ok(match key {
            "length" => Value::from(items.len()),
            _ => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null),
        }),
        Value::String(s) => Ok(match key {
            "length" => Value::from(s.encode_utf16().count()),
            _ => key
                .parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null),
        }),
        Value::Bool(_) | Value::Number(_) => Ok(Value::Null),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    use BinaryOp::*;

    Ok(match op {
        Add => {
            let left = to_primitive(left);
            let right = to_primitive(right);
            if left.is_string() || right.is_string() {
                Value::String(format!("{}{}", to_js_string(&left), to_js_string(&right)))
            } else {
                number(to_number(&left) + to_number(&right))
            }
        }
        Sub => number(to_number(left) - to_number(right)),
        Mul => number(to_number(left) * to_number(right)),
        Div => number(to_number(left) / to_number(right)),
        Rem => number(to_number(left) % to_number(right)),
        Exp => number(to_number(left).powf(to_number(right))),
        Eq => Value::Bool(loose_equals(left, right)),
        NotEq => Value::Bool(!loose_equals(left, right)),
        StrictEq => Value::Bool(strict_equals(left, right)),
        StrictNotEq => Value::Bool(!strict_equals(left, right)),
        Lt => Value::Bool(compare(left, right, |o| o.is_lt())),
        LtEq => Value::Bool(compare(left, right, |o| o.is_le())),
        Gt => Value::Bool(compare(left, right, |o| o.is_gt())),
        GtEq => Value::Bool(compare(left, right, |o| o.is_ge())),
        Shl => number((to_int32(left).wrapping_shl(to_uint32(right) & 31)) as f64),
        Shr => number((to_int32(left) >> (to_uint32(right) & 31)) as f64),
        UShr => number((to_uint32(left) >> (to_uint32(right) & 31)) as f64),
        BitOr => number((to_int32(left) | to_int32(right)) as f64),
        BitXor => number((to_int32(left) ^ to_int32(right)) as f64),
        BitAnd => number((to_int32(left) & to_int32(right)) as f64),
        In => {
            let key = to_property_key(left);
            match right {
                Value::Object(entries) => Value::Bool(entries.contains_key(&key)),
                Value::Array(items) => Value::Bool(
                    key == "length" || key.parse::<usize>().map_or(false, |i| i < items.len()),
                ),
                other => {
                    return Err(EvalError::Type(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        key,
                        to_js_string(other)
                    )))
                }
            }
        }
        Instanceof => return Err(EvalError::Unsupported("`instanceof`".to_string())),
    })
}

fn compare(left: &Value, right: &Value, accept: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    let left = to_primitive(left);
    let right = to_primitive(right);
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return accept(a.encode_utf16().cmp(b.encode_utf16()));
    }
    to_number(&left)
        .partial_cmp(&to_number(&right))
        .map_or(false, accept)
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => to_number(left) == to_number(right),
        _ => left == right,
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => to_number(left) == to_number(right),
        (Value::Object(_) | Value::Array(_), Value::String(_) | Value::Number(_)) => {
            loose_equals(&to_primitive(left), right)
        }
        (Value::String(_) | Value::Number(_), Value::Object(_) | Value::Array(_)) => {
            loose_equals(left, &to_primitive(right))
        }
        _ => strict_equals(left, right),
    }
}

/// Converts a float result back into JSON, keeping integers integral.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        if n == 0.0 {
            return Value::from(0);
        }
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(to_js_string(value)),
        other => other.clone(),
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => to_number(&to_primitive(value)),
    }
}

fn to_int32(value: &Value) -> i32 {
    to_uint32(value) as i32
}

fn to_uint32(value: &Value) -> u32 {
    let n = to_number(value);
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn to_property_key(value: &Value) -> String {
    to_js_string(value)
}

pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Unescape basic string escape sequences in raw template text
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some('`') => result.push('`'),
                Some('$') => result.push('$'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::scopeify;
    use serde_json::json;

    fn eval(source: &str, scope: Value) -> EvalResult<Value> {
        scopeify(source).unwrap().evaluate(&scope)
    }

    #[test]
    fn test_comparison_is_not_coerced() {
        assert_eq!(eval("1 > 2", json!({})), Ok(json!(false)));
        assert_eq!(eval("'foo bar'", json!({})), Ok(json!("foo bar")));
    }

    #[test]
    fn test_member_access() {
        let scope = json!({ "opts": { "isVisible": false }, "items": [1, 2, 3] });
        assert_eq!(eval("opts.isVisible", scope.clone()), Ok(json!(false)));
        assert_eq!(eval("items", scope.clone()), Ok(json!([1, 2, 3])));
        assert_eq!(eval("items.length", scope.clone()), Ok(json!(3)));
        assert_eq!(eval("items[1]", scope.clone()), Ok(json!(2)));
        assert_eq!(eval("missing", scope), Ok(Value::Null));
    }

    #[test]
    fn test_optional_chain_short_circuits() {
        assert_eq!(eval("user?.name.first", json!({})), Ok(Value::Null));
        assert!(matches!(eval("user.name", json!({})), Err(EvalError::Type(_))));
    }

    #[test]
    fn test_grouping_ends_optional_chain() {
        assert_eq!(eval("user?.name.first", json!({})), Ok(Value::Null));
        assert!(matches!(eval("(user?.name).first", json!({})), Err(EvalError::Type(_))));
        assert_eq!(
            eval("(user?.name).first", json!({ "user": { "name": { "first": "ada" } } })),
            Ok(json!("ada"))
        );
    }

    #[test]
    fn test_string_concatenation() {
        let scope = json!({ "foo": "a", "bar": "b", "n": 2 });
        assert_eq!(eval("foo + ' + ' + bar", scope.clone()), Ok(json!("a + b")));
        assert_eq!(eval("n + 1", scope.clone()), Ok(json!(3)));
        assert_eq!(eval("'n' + n", scope.clone()), Ok(json!("n2")));
        assert_eq!(eval("`${foo}-${n * 2}`", scope), Ok(json!("a-4")));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        let scope = json!({ "a": 0, "b": "x", "c": null });
        assert_eq!(eval("a || b", scope.clone()), Ok(json!("x")));
        assert_eq!(eval("a && b", scope.clone()), Ok(json!(0)));
        assert_eq!(eval("c ?? a", scope.clone()), Ok(json!(0)));
        assert_eq!(eval("!c", scope), Ok(json!(true)));
    }

    #[test]
    fn test_equality() {
        let scope = json!({ "n": 1, "s": "1" });
        assert_eq!(eval("n == s", scope.clone()), Ok(json!(true)));
        assert_eq!(eval("n === s", scope.clone()), Ok(json!(false)));
        assert_eq!(eval("missing == null", scope), Ok(json!(true)));
    }

    #[test]
    fn test_literals_and_spread() {
        let scope = json!({ "base": { "a": 1 }, "list": [2, 3] });
        assert_eq!(
            eval("{ ...base, b: list[0] }", scope.clone()),
            Ok(json!({ "a": 1, "b": 2 }))
        );
        assert_eq!(eval("[1, ...list]", scope), Ok(json!([1, 2, 3])));
    }

    #[test]
    fn test_calls_are_unsupported() {
        assert!(matches!(
            eval("items()", json!({ "items": [] })),
            Err(EvalError::Unsupported(_))
        ));
        assert!(matches!(eval("() => 1", json!({})), Err(EvalError::Unsupported(_))));
    }

    #[test]
    fn test_unescape_string() {
        assert_eq!(unescape_string("a\\nb\\`"), "a\nb`");
    }
}
