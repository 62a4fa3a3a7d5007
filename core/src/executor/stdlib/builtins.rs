//! `$` built-in functions

use super::arg;
use crate::error::{ExpressionError, ExpressionResult};
use crate::executor::types::Value;

/// `$ifEmpty(value, default)`
pub fn if_empty(args: &[Value]) -> Value {
    let value = arg(args, 0);
    let is_blank = match value {
        Value::Undefined | Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    if is_blank {
        arg(args, 1).clone()
    } else {
        value.clone()
    }
}

/// `$isEmpty(value)`: null, undefined, empty string, empty array or an
/// object without own keys
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        // Key enumeration of a host function is not meaningful: treat as not empty
        Value::Function(_) => false,
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// `$number(value)`
pub fn to_number(value: &Value) -> ExpressionResult<Value> {
    let n = value.to_number();
    if n.is_nan() {
        return Err(ExpressionError::evaluation("Cannot convert to number"));
    }
    Ok(Value::Number(n))
}

/// `$length(value)`
pub fn length(value: &Value) -> ExpressionResult<Value> {
    match value {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(items) => Ok(Value::Number(items.len() as f64)),
        _ => Err(ExpressionError::evaluation("$length requires string or array")),
    }
}

/// `$first(array)`
pub fn first(value: &Value) -> ExpressionResult<Value> {
    match value {
        Value::Array(items) => Ok(items.first().cloned().unwrap_or_default()),
        _ => Err(ExpressionError::evaluation("$first requires an array")),
    }
}

/// `$last(array)`
pub fn last(value: &Value) -> ExpressionResult<Value> {
    match value {
        Value::Array(items) => Ok(items.last().cloned().unwrap_or_default()),
        _ => Err(ExpressionError::evaluation("$last requires an array")),
    }
}

/// Single-argument math function; rejects non-numbers and NaN
pub fn unary_math(name: &str, value: &Value, op: fn(f64) -> f64) -> ExpressionResult<Value> {
    match value {
        Value::Number(n) if !n.is_nan() => Ok(Value::Number(op(*n))),
        _ => Err(ExpressionError::evaluation(format!(
            "{} requires a valid number",
            name
        ))),
    }
}

/// Rounds half-way cases towards positive infinity
pub fn round_half_up(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    let rounded = if x - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 && x < 0.0 {
        -0.0
    } else {
        rounded
    }
}

/// Variadic `$min` / `$max`
pub fn extremum(name: &str, args: &[Value], pick: fn(f64, f64) -> f64) -> ExpressionResult<Value> {
    if args.is_empty() {
        return Err(ExpressionError::evaluation(format!(
            "{} requires at least one argument",
            name
        )));
    }

    let mut result: Option<f64> = None;
    for (i, value) in args.iter().enumerate() {
        let n = match value {
            Value::Number(n) if !n.is_nan() => *n,
            _ => {
                return Err(ExpressionError::evaluation(format!(
                    "{} argument {} must be a valid number",
                    name,
                    i + 1
                )))
            }
        };
        result = Some(result.map_or(n, |acc| pick(acc, n)));
    }

    Ok(Value::Number(result.unwrap_or(f64::NAN)))
}
