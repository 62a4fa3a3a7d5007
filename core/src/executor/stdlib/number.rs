//! Number methods

use super::{arg, opt_number, MethodError, MethodResult};
use crate::executor::types::number::{to_exponential, to_fixed, to_precision, to_radix_string};
use crate::executor::types::Value;

pub fn call(n: f64, method: &str, args: &[Value]) -> MethodResult {
    let formatted = match method {
        "toFixed" => to_fixed(n, arg(args, 0).to_number()),
        "toPrecision" => to_precision(n, opt_number(args, 0)),
        "toExponential" => to_exponential(n, opt_number(args, 0)),
        "toString" => to_radix_string(n, opt_number(args, 0)),
        _ => return Err(MethodError::NotAFunction),
    };
    formatted.map(Value::String).map_err(MethodError::Failed)
}
