//! Array methods
//!
//! Callback-taking methods are allow-listed so they reach a well-defined
//! failure, but no expression value is callable: invoking one always fails.

use std::sync::Arc;

use super::{arg, opt_number, relative_index, too_long, MethodError, MethodResult};
use crate::error::ExpressionError;
use crate::executor::session::MAX_COLLECTION_SIZE;
use crate::executor::types::number::to_integer_or_infinity;
use crate::executor::types::Value;

pub fn call(items: &Arc<Vec<Value>>, method: &str, args: &[Value]) -> MethodResult {
    match method {
        "join" => join(items, arg(args, 0)),
        "concat" => concat(items, args),
        "slice" => {
            let len = items.len();
            let from = relative_index(arg(args, 0), len, 0);
            let to = relative_index(arg(args, 1), len, len);
            let sliced = if from < to { items[from..to].to_vec() } else { Vec::new() };
            Ok(Value::array(sliced))
        }
        "indexOf" => Ok(Value::Number(index_of(items, args))),
        "lastIndexOf" => Ok(Value::Number(last_index_of(items, args))),
        "includes" => {
            let needle = arg(args, 0);
            let from = relative_index(arg(args, 1), items.len(), 0);
            Ok(Value::Bool(items[from..].iter().any(|item| item.same_value_zero(needle))))
        }
        "find" | "findIndex" | "filter" | "map" | "reduce" | "some" | "every" => {
            Err(MethodError::Failed(format!(
                "{} is not a function",
                arg(args, 0).to_js_string()
            )))
        }
        // `length` is a property, not a method
        _ => Err(MethodError::NotAFunction),
    }
}

fn join(items: &[Value], separator: &Value) -> MethodResult {
    let separator = match separator {
        Value::Undefined => ",".to_string(),
        value => value.to_js_string(),
    };
    let parts: Vec<String> = items.iter().map(Value::to_js_string).collect();

    let separators = parts.len().saturating_sub(1) as u128 * separator.chars().count() as u128;
    let total = parts
        .iter()
        .map(|part| part.chars().count() as u128)
        .sum::<u128>()
        + separators;
    if total > MAX_COLLECTION_SIZE as u128 {
        return Err(too_long());
    }

    Ok(Value::String(parts.join(&separator)))
}

fn concat(items: &Arc<Vec<Value>>, args: &[Value]) -> MethodResult {
    let added: usize = args
        .iter()
        .map(|value| match value {
            Value::Array(more) => more.len(),
            _ => 1,
        })
        .sum();
    if items.len() + added > MAX_COLLECTION_SIZE {
        return Err(MethodError::Security(ExpressionError::security(
            "Result array size exceeds maximum allowed",
        )));
    }

    let mut out = Vec::with_capacity(items.len() + added);
    out.extend(items.iter().cloned());
    for value in args {
        match value {
            Value::Array(more) => out.extend(more.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::array(out))
}

fn index_of(items: &[Value], args: &[Value]) -> f64 {
    let needle = arg(args, 0);
    let from = relative_index(arg(args, 1), items.len(), 0);
    items[from..]
        .iter()
        .position(|item| item.strict_equals(needle))
        .map_or(-1.0, |i| (from + i) as f64)
}

fn last_index_of(items: &[Value], args: &[Value]) -> f64 {
    if items.is_empty() {
        return -1.0;
    }
    let needle = arg(args, 0);
    let len = items.len() as f64;
    let start = match opt_number(args, 1) {
        None => len - 1.0,
        Some(n) => {
            let n = to_integer_or_infinity(n);
            if n < 0.0 {
                len + n
            } else {
                n.min(len - 1.0)
            }
        }
    };
    if start < 0.0 {
        return -1.0;
    }
    (0..=start as usize)
        .rev()
        .find(|&i| items[i].strict_equals(needle))
        .map_or(-1.0, |i| i as f64)
}
