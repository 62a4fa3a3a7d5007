//! Sandbox rules
//!
//! Deny-lists for identifiers and properties, per-receiver method allow-lists
//! and deep validation of data entering the evaluator.

use std::collections::HashSet;
use std::sync::Arc;

use super::session::MAX_CONTEXT_DEPTH;
use super::types::Value;
use crate::error::{ExpressionError, ExpressionResult};

/* ===================== Deny-lists ===================== */

/// Names that may never be read, called, used as a property or appear as a
/// context key
pub const BLOCKED_IDENTIFIERS: &[&str] = &[
    "eval",
    "Function",
    "constructor",
    "__proto__",
    "prototype",
    "process",
    "require",
    "import",
    "global",
    "globalThis",
    "window",
    "document",
    "location",
    "localStorage",
    "sessionStorage",
];

const PROTOTYPE_PROPERTIES: &[&str] = &["__proto__", "constructor", "prototype"];

/* ===================== Allow-lists ===================== */

pub const SAFE_STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "slice",
    "substring",
    "charAt",
    "charCodeAt",
    "indexOf",
    "lastIndexOf",
    "split",
    "replace",
    "startsWith",
    "endsWith",
    "includes",
    "repeat",
    "padStart",
    "padEnd",
    "concat",
    "toString",
    "valueOf",
];

pub const SAFE_ARRAY_METHODS: &[&str] = &[
    "join",
    "concat",
    "slice",
    "indexOf",
    "lastIndexOf",
    "includes",
    "find",
    "findIndex",
    "filter",
    "map",
    "reduce",
    "some",
    "every",
    "length",
];

pub const SAFE_NUMBER_METHODS: &[&str] = &["toFixed", "toPrecision", "toExponential", "toString"];

pub const SAFE_OBJECT_METHODS: &[&str] = &["toString", "valueOf"];

/// Methods that take a callback; their arguments are checked for smuggled
/// functions
pub const CALLBACK_METHODS: &[&str] = &[
    "map",
    "filter",
    "reduce",
    "find",
    "findIndex",
    "some",
    "every",
    "forEach",
];

/// Methods that count against the session iteration cap
pub const ITERATIVE_METHODS: &[&str] = &[
    "map",
    "filter",
    "reduce",
    "forEach",
    "find",
    "findIndex",
    "some",
    "every",
];

/* ===================== Checks ===================== */

pub fn validate_identifier(name: &str) -> ExpressionResult<()> {
    if BLOCKED_IDENTIFIERS.contains(&name) {
        tracing::debug!(identifier = name, "blocked identifier");
        return Err(ExpressionError::security(format!(
            "Identifier \"{}\" is not allowed",
            name
        )));
    }
    Ok(())
}

/// Property keys go through the identifier deny-list when they are strings
pub fn validate_property(property: &Value) -> ExpressionResult<()> {
    match property {
        Value::String(name) => validate_identifier(name),
        _ => Ok(()),
    }
}

/// Unconditional block applied at the point of property lookup
pub fn check_prototype_access(key: &str) -> ExpressionResult<()> {
    if PROTOTYPE_PROPERTIES.contains(&key) {
        return Err(ExpressionError::security(
            "Access to prototype properties is not allowed",
        ));
    }
    Ok(())
}

pub fn is_method_allowed(receiver: &Value, method: &str) -> bool {
    let allowed = match receiver {
        Value::String(_) => SAFE_STRING_METHODS,
        Value::Array(_) => SAFE_ARRAY_METHODS,
        Value::Number(_) => SAFE_NUMBER_METHODS,
        Value::Object(_) => SAFE_OBJECT_METHODS,
        _ => return false,
    };
    allowed.contains(&method)
}

pub fn is_callback_method(method: &str) -> bool {
    CALLBACK_METHODS.contains(&method)
}

pub fn is_iterative_method(method: &str) -> bool {
    ITERATIVE_METHODS.contains(&method)
}

/// Rejects function arguments to callback-taking methods, including
/// functions nested inside array or object arguments
pub fn validate_callback_arguments(args: &[Value]) -> ExpressionResult<()> {
    for arg in args {
        match arg {
            Value::Function(_) => {
                return Err(ExpressionError::security(
                    "Callback functions are not supported. Array methods with callbacks cannot be used.",
                ))
            }
            Value::Array(_) | Value::Object(_) => validate_context_data(arg)?,
            _ => {}
        }
    }
    Ok(())
}

/* ===================== Context Validation ===================== */

/// Deep validation of data admitted into the evaluator.
///
/// Rejects functions, collections reachable more than once (reported as
/// circular), nesting deeper than [`MAX_CONTEXT_DEPTH`] and keys on the
/// identifier deny-list.
pub fn validate_context_data(value: &Value) -> ExpressionResult<()> {
    ContextValidator::default().validate(value, 0)
}

#[derive(Default)]
struct ContextValidator {
    seen: HashSet<usize>,
}

impl ContextValidator {
    fn validate(&mut self, value: &Value, depth: usize) -> ExpressionResult<()> {
        if depth > MAX_CONTEXT_DEPTH {
            return Err(ExpressionError::security(format!(
                "Context nesting depth exceeds maximum allowed ({} levels)",
                MAX_CONTEXT_DEPTH
            )));
        }

        match value {
            Value::Function(_) => Err(ExpressionError::security(
                "Functions are not allowed in context data",
            )),
            Value::Array(items) => {
                self.visit(Arc::as_ptr(items) as *const () as usize)?;
                for item in items.iter() {
                    self.validate(item, depth + 1)?;
                }
                Ok(())
            }
            Value::Object(map) => {
                self.visit(Arc::as_ptr(map) as *const () as usize)?;
                for (key, item) in map.iter() {
                    validate_identifier(key)?;
                    self.validate(item, depth + 1)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn visit(&mut self, addr: usize) -> ExpressionResult<()> {
        if !self.seen.insert(addr) {
            return Err(ExpressionError::security(
                "Circular references are not allowed in context data",
            ));
        }
        Ok(())
    }
}
