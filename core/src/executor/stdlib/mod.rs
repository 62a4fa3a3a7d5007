//! Standard library function implementations
//!
//! Built-in `$` functions and the allow-listed receiver methods, organized
//! by category. Allow-list enforcement happens in the evaluator before
//! anything here is reached.

pub mod array;
pub mod builtins;
pub mod number;
pub mod string;

use super::types::Value;
use crate::error::{ExpressionError, ExpressionResult};

/* ===================== Built-in Function Types ===================== */

/// Built-in function identifiers
///
/// Each variant represents one entry of the fixed `$` catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFunc {
    Json,
    Input,
    IfEmpty,
    IsNull,
    IsUndefined,
    IsEmpty,
    String,
    Number,
    Boolean,
    Length,
    First,
    Last,
    Abs,
    Ceil,
    Floor,
    Round,
    Min,
    Max,
}

impl BuiltinFunc {
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "$json" => BuiltinFunc::Json,
            "$input" => BuiltinFunc::Input,
            "$ifEmpty" => BuiltinFunc::IfEmpty,
            "$isNull" => BuiltinFunc::IsNull,
            "$isUndefined" => BuiltinFunc::IsUndefined,
            "$isEmpty" => BuiltinFunc::IsEmpty,
            "$string" => BuiltinFunc::String,
            "$number" => BuiltinFunc::Number,
            "$boolean" => BuiltinFunc::Boolean,
            "$length" => BuiltinFunc::Length,
            "$first" => BuiltinFunc::First,
            "$last" => BuiltinFunc::Last,
            "$abs" => BuiltinFunc::Abs,
            "$ceil" => BuiltinFunc::Ceil,
            "$floor" => BuiltinFunc::Floor,
            "$round" => BuiltinFunc::Round,
            "$min" => BuiltinFunc::Min,
            "$max" => BuiltinFunc::Max,
            _ => return None,
        };
        Some(func)
    }
}

/// Data slots exposed through `$json` and `$input`
pub struct DataSlots<'a> {
    pub current_node_data: &'a Value,
    pub input_data: &'a Value,
}

/* ===================== Dispatchers ===================== */

/// Call a built-in function with already evaluated arguments
pub fn call_builtin(
    func: BuiltinFunc,
    args: &[Value],
    slots: &DataSlots<'_>,
) -> ExpressionResult<Value> {
    match func {
        BuiltinFunc::Json => Ok(slots.current_node_data.clone()),
        BuiltinFunc::Input => Ok(slots.input_data.clone()),
        BuiltinFunc::IfEmpty => Ok(builtins::if_empty(args)),
        BuiltinFunc::IsNull => Ok(Value::Bool(matches!(arg(args, 0), Value::Null))),
        BuiltinFunc::IsUndefined => Ok(Value::Bool(matches!(arg(args, 0), Value::Undefined))),
        BuiltinFunc::IsEmpty => Ok(Value::Bool(builtins::is_empty(arg(args, 0)))),
        BuiltinFunc::String => Ok(Value::String(arg(args, 0).to_js_string())),
        BuiltinFunc::Number => builtins::to_number(arg(args, 0)),
        BuiltinFunc::Boolean => Ok(Value::Bool(arg(args, 0).is_truthy())),
        BuiltinFunc::Length => builtins::length(arg(args, 0)),
        BuiltinFunc::First => builtins::first(arg(args, 0)),
        BuiltinFunc::Last => builtins::last(arg(args, 0)),
        BuiltinFunc::Abs => builtins::unary_math("$abs", arg(args, 0), f64::abs),
        BuiltinFunc::Ceil => builtins::unary_math("$ceil", arg(args, 0), f64::ceil),
        BuiltinFunc::Floor => builtins::unary_math("$floor", arg(args, 0), f64::floor),
        BuiltinFunc::Round => builtins::unary_math("$round", arg(args, 0), builtins::round_half_up),
        BuiltinFunc::Min => builtins::extremum("$min", args, f64::min),
        BuiltinFunc::Max => builtins::extremum("$max", args, f64::max),
    }
}

/// Call an allow-listed method on a receiver
///
/// Failures raised by the method itself are evaluation faults of the form
/// `Method "name" failed: ...`.
pub fn call_method(receiver: &Value, method: &str, args: &[Value]) -> ExpressionResult<Value> {
    let outcome = match receiver {
        Value::String(s) => string::call(s, method, args),
        Value::Array(items) => array::call(items, method, args),
        Value::Number(n) => number::call(*n, method, args),
        Value::Object(_) => match method {
            "toString" => Ok(Value::String(receiver.to_js_string())),
            "valueOf" => Ok(receiver.clone()),
            _ => Err(MethodError::NotAFunction),
        },
        _ => Err(MethodError::NotAFunction),
    };

    outcome.map_err(|err| match err {
        MethodError::NotAFunction => {
            ExpressionError::evaluation(format!("\"{}\" is not a function", method))
        }
        MethodError::Failed(msg) => {
            ExpressionError::evaluation(format!("Method \"{}\" failed: {}", method, msg))
        }
        MethodError::Security(err) => err,
    })
}

/* ===================== Helpers ===================== */

/// Error raised inside a method implementation
#[derive(Debug)]
pub enum MethodError {
    /// The receiver has no callable member with this name
    NotAFunction,
    /// The method threw (range or type error)
    Failed(String),
    /// A size cap was hit before the result was built
    Security(ExpressionError),
}

pub type MethodResult = Result<Value, MethodError>;

/// Fault for a string result that would exceed the size cap
pub(crate) fn too_long() -> MethodError {
    MethodError::Security(ExpressionError::security(
        "Result string length exceeds maximum allowed",
    ))
}

static UNDEFINED: Value = Value::Undefined;

/// Positional argument, `undefined` when missing
pub fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&UNDEFINED)
}

/// Positional argument as an optional number, `None` when `undefined`
pub fn opt_number(args: &[Value], index: usize) -> Option<f64> {
    match arg(args, index) {
        Value::Undefined => None,
        value => Some(value.to_number()),
    }
}

/// Resolve a relative index (negative counts from the end) against `len`
pub fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = super::types::number::to_integer_or_infinity(value.to_number());
    let len_f = len as f64;
    if n < 0.0 {
        (len_f + n).max(0.0) as usize
    } else {
        n.min(len_f) as usize
    }
}
