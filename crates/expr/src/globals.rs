//! Ambient globals visible to every expression.
//!
//! Only `Math` and `Date` exist. Data keys with the same names never shadow
//! them.

use web_time::{SystemTime, UNIX_EPOCH};
use weft_core::Value;

use crate::eval::EvalError;

/// Names of the ambient globals.
pub const GLOBALS: &[&str] = &["Math", "Date"];

/// Returns true if `name` is an ambient global.
#[inline]
pub fn is_global(name: &str) -> bool {
    GLOBALS.contains(&name)
}

/// Reads a constant member of a global (`Math.PI`).
pub fn constant(global: &str, name: &str) -> Option<Value> {
    let value = match (global, name) {
        ("Math", "PI") => core::f64::consts::PI,
        ("Math", "E") => core::f64::consts::E,
        ("Math", "LN2") => core::f64::consts::LN_2,
        ("Math", "LN10") => core::f64::consts::LN_10,
        ("Math", "SQRT2") => core::f64::consts::SQRT_2,
        _ => return None,
    };
    Some(Value::Number(value))
}

/// Calls a function member of a global (`Math.max(a, b)`, `Date.now()`).
pub fn call(global: &str, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match global {
        "Math" => call_math(name, args),
        "Date" => call_date(name),
        _ => Err(EvalError::not_callable(format!("{global}.{name}"))),
    }
}

fn call_math(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let arg = |i: usize| args.get(i).map(Value::to_number).unwrap_or(f64::NAN);
    let result = match name {
        "abs" => arg(0).abs(),
        "floor" => arg(0).floor(),
        "ceil" => arg(0).ceil(),
        "round" => (arg(0) + 0.5).floor(),
        "trunc" => arg(0).trunc(),
        "sqrt" => arg(0).sqrt(),
        "pow" => arg(0).powf(arg(1)),
        "sign" => {
            let x = arg(0);
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        "max" => fold_numbers(args, f64::NEG_INFINITY, f64::max),
        "min" => fold_numbers(args, f64::INFINITY, f64::min),
        _ => return Err(EvalError::not_callable(format!("Math.{name}"))),
    };
    Ok(Value::Number(result))
}

fn fold_numbers(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for arg in args {
        let n = arg.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        acc = pick(acc, n);
    }
    acc
}

fn call_date(name: &str) -> Result<Value, EvalError> {
    match name {
        "now" => {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as f64)
                .unwrap_or(0.0);
            Ok(Value::Number(millis))
        }
        _ => Err(EvalError::not_callable(format!("Date.{name}"))),
    }
}
