//! Expression evaluation against a data scope.
//!
//! Identifier-rooted member chains (`user.address.city`, `items[idx]`) are
//! resolved as a whole path through [`Scope::resolve`], so a tracking scope
//! sees every key the expression walks through. Evaluation never fails from
//! the caller's point of view: [`evaluate`] turns every fault into
//! `Value::Undefined`.

use core::cmp::Ordering;
use core::fmt;

use tracing::debug;
use weft_core::{Path, Value};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::globals;
use crate::parser::parse;

/// Source of identifier values for an expression.
pub trait Scope {
    /// Resolves an identifier-rooted path. Returns None when any key misses.
    fn resolve(&self, path: &Path) -> Option<Value>;
}

impl Scope for Value {
    fn resolve(&self, path: &Path) -> Option<Value> {
        self.get_path(path.keys()).cloned()
    }
}

/// Error raised while evaluating a parsed expression.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub(crate) fn not_callable(callee: impl fmt::Display) -> Self {
        Self {
            message: format!("{callee} is not a function"),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvalError {}

/// Parses and evaluates `source`. Any parse or evaluation fault yields
/// `Value::Undefined`.
pub fn evaluate<S: Scope + ?Sized>(scope: &S, source: &str) -> Value {
    match parse(source) {
        Ok(expr) => evaluate_expr(scope, &expr),
        Err(err) => {
            debug!(expression = source, error = %err, "expression failed to parse");
            Value::Undefined
        }
    }
}

/// Evaluates a parsed expression. Faults yield `Value::Undefined`.
pub fn evaluate_expr<S: Scope + ?Sized>(scope: &S, expr: &Expr) -> Value {
    match try_evaluate(scope, expr) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "expression evaluation failed");
            Value::Undefined
        }
    }
}

/// Evaluates a parsed expression, reporting faults.
pub fn try_evaluate<S: Scope + ?Sized>(scope: &S, expr: &Expr) -> Result<Value, EvalError> {
    Evaluator { scope }.eval(expr)
}

struct Evaluator<'s, S: Scope + ?Sized> {
    scope: &'s S,
}

impl<S: Scope + ?Sized> Evaluator<'_, S> {
    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => {
                if globals::is_global(name) {
                    return Ok(Value::Undefined);
                }
                Ok(self.resolve_keys(&[name.clone()]))
            }
            Expr::Member { object, property } => {
                if let Expr::Identifier(global) = object.as_ref() {
                    if globals::is_global(global) {
                        return Ok(globals::constant(global, property).unwrap_or_default());
                    }
                }
                if let Some(keys) = self.member_path(expr)? {
                    return Ok(self.resolve_keys(&keys));
                }
                let base = self.eval(object)?;
                Ok(member_of(&base, property))
            }
            Expr::Index { object, index } => {
                if let Some(keys) = self.member_path(expr)? {
                    return Ok(self.resolve_keys(&keys));
                }
                let base = self.eval(object)?;
                let key = property_key(&self.eval(index)?);
                Ok(member_of(&base, &key))
            }
            Expr::Call { callee, args } => self.eval_call(callee, args),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Unary { op, expr } => {
                let value = self.eval(expr)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            Expr::Binary { left, op, right } => self.eval_binary(left, *op, right),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
        }
    }

    /// Collects the keys of an identifier-rooted member chain, evaluating
    /// computed indices along the way. None if the chain is rooted at
    /// anything else (a literal, a call, a global).
    fn member_path(&self, expr: &Expr) -> Result<Option<Vec<String>>, EvalError> {
        match expr {
            Expr::Identifier(name) if !globals::is_global(name) => Ok(Some(vec![name.clone()])),
            Expr::Member { object, property } => Ok(self.member_path(object)?.map(|mut keys| {
                keys.push(property.clone());
                keys
            })),
            Expr::Index { object, index } => match self.member_path(object)? {
                Some(mut keys) => {
                    keys.push(property_key(&self.eval(index)?));
                    Ok(Some(keys))
                }
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// Resolves a key chain through the scope. When the full chain misses,
    /// falls back to the parent value's built-in members (`length`).
    fn resolve_keys(&self, keys: &[String]) -> Value {
        if let Some(value) = self.scope.resolve(&Path::from_keys(keys.iter().cloned())) {
            return value;
        }
        match keys.split_last() {
            Some((last, parent)) if !parent.is_empty() => {
                member_of(&self.resolve_keys(parent), last)
            }
            _ => Value::Undefined,
        }
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        let (global, name) = match callee {
            Expr::Member { object, property } => match object.as_ref() {
                Expr::Identifier(global) if globals::is_global(global) => {
                    (global.as_str(), property.as_str())
                }
                _ => return Err(EvalError::not_callable(describe(callee))),
            },
            _ => return Err(EvalError::not_callable(describe(callee))),
        };
        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        globals::call(global, name, &values)
    }

    fn eval_binary(&self, left: &Expr, op: BinaryOp, right: &Expr) -> Result<Value, EvalError> {
        // Logical operators short-circuit and yield an operand.
        match op {
            BinaryOp::And => {
                let l = self.eval(left)?;
                return if l.truthy() { self.eval(right) } else { Ok(l) };
            }
            BinaryOp::Or => {
                let l = self.eval(left)?;
                return if l.truthy() { Ok(l) } else { self.eval(right) };
            }
            _ => {}
        }

        let l = self.eval(left)?;
        let r = self.eval(right)?;
        Ok(match op {
            BinaryOp::Add => match (&l, &r) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Value::String(l.to_js_string() + &r.to_js_string())
                }
                _ => Value::Number(l.to_number() + r.to_number()),
            },
            BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
            BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
            BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
            BinaryOp::Mod => Value::Number(l.to_number() % r.to_number()),
            BinaryOp::Eq => Value::Bool(loose_eq(&l, &r)),
            BinaryOp::Ne => Value::Bool(!loose_eq(&l, &r)),
            BinaryOp::StrictEq => Value::Bool(strict_eq(&l, &r)),
            BinaryOp::StrictNe => Value::Bool(!strict_eq(&l, &r)),
            BinaryOp::Lt => Value::Bool(compare(&l, &r) == Some(Ordering::Less)),
            BinaryOp::Le => Value::Bool(matches!(
                compare(&l, &r),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::Gt => Value::Bool(compare(&l, &r) == Some(Ordering::Greater)),
            BinaryOp::Ge => Value::Bool(matches!(
                compare(&l, &r),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        })
    }
}

/// Built-in member lookup on a plain value.
fn member_of(value: &Value, key: &str) -> Value {
    if let Some(member) = value.get(key) {
        return member.clone();
    }
    match (value, key) {
        (Value::Array(items), "length") => Value::from(items.len()),
        (Value::String(s), "length") => Value::from(s.chars().count()),
        (Value::String(s), _) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        _ => Value::Undefined,
    }
}

/// Converts a computed index into a property key.
fn property_key(index: &Value) -> String {
    match index {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => format!("{n:.0}"),
        other => other.to_js_string(),
    }
}

fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        _ => a == b,
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        _ if a.is_nullish() && b.is_nullish() => true,
        _ if a.is_nullish() || b.is_nullish() => false,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            a.to_number() == b.to_number()
        }
        (Value::Bool(_), _) => loose_eq(&Value::Number(a.to_number()), b),
        (_, Value::Bool(_)) => loose_eq(a, &Value::Number(b.to_number())),
        _ => strict_eq(a, b),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    }
}

fn describe(expr: &Expr) -> String {
    expr.static_path()
        .map(|path| path.to_string())
        .unwrap_or_else(|| "expression".to_string())
}
