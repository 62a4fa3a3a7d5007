//! Expression evaluation
//!
//! Walks an [`Expr`] tree against a read-only [`Scope`]. Every node visit is
//! accounted in the [`Session`], which is the only mutable state of a walk.

use indexmap::IndexMap;

use super::interpolation::stringify;
use super::security::{
    check_prototype_access, is_callback_method, is_iterative_method, is_method_allowed,
    validate_callback_arguments, validate_identifier, validate_property,
};
use super::session::{Session, MAX_COLLECTION_SIZE};
use super::stdlib::{self, BuiltinFunc, DataSlots};
use super::types::{BinaryOp, Expr, LitValue, LogicalOp, UnaryOp, Value};
use crate::error::{ExpressionError, ExpressionResult};

/// Data visible to one evaluation
pub struct Scope<'a> {
    pub context: &'a IndexMap<String, Value>,
    pub current_node_data: &'a Value,
    pub input_data: &'a Value,
}

impl Scope<'_> {
    fn slots(&self) -> DataSlots<'_> {
        DataSlots {
            current_node_data: self.current_node_data,
            input_data: self.input_data,
        }
    }
}

/// Evaluate an expression to a value
pub fn eval_expr(expr: &Expr, scope: &Scope<'_>, session: &mut Session) -> ExpressionResult<Value> {
    session.enter()?;
    let result = eval_node(expr, scope, session);
    session.exit();
    result
}

fn eval_node(expr: &Expr, scope: &Scope<'_>, session: &mut Session) -> ExpressionResult<Value> {
    match expr {
        Expr::Literal { value, .. } => Ok(match value {
            LitValue::Null => Value::Null,
            LitValue::Bool(b) => Value::Bool(*b),
            LitValue::Num(n) => Value::Number(*n),
            LitValue::Str(s) => Value::String(s.clone()),
        }),

        Expr::Identifier { name, .. } => eval_identifier(name, scope),

        Expr::Member {
            object,
            property,
            computed,
            ..
        } => {
            let object = eval_expr(object, scope, session)?;
            if object.is_nullish() {
                return Ok(Value::Undefined);
            }
            let key = if *computed {
                eval_expr(property, scope, session)?
            } else {
                match property.as_ref() {
                    Expr::Identifier { name, .. } => Value::String(name.clone()),
                    other => eval_expr(other, scope, session)?,
                }
            };
            validate_property(&key)?;
            get_property(&object, &key)
        }

        Expr::Call {
            callee, arguments, ..
        } => {
            let mut args = Vec::with_capacity(arguments.len());
            for arg in arguments {
                args.push(eval_expr(arg, scope, session)?);
            }
            eval_call(callee, args, scope, session)
        }

        Expr::Binary {
            operator,
            left,
            right,
            ..
        } => match operator {
            BinaryOp::And => eval_logical(LogicalOp::And, left, right, scope, session),
            BinaryOp::Or => eval_logical(LogicalOp::Or, left, right, scope, session),
            op => {
                let left = eval_expr(left, scope, session)?;
                let right = eval_expr(right, scope, session)?;
                eval_binary(*op, &left, &right)
            }
        },

        Expr::Logical {
            operator,
            left,
            right,
            ..
        } => eval_logical(*operator, left, right, scope, session),

        Expr::Unary {
            operator, argument, ..
        } => {
            let argument = eval_expr(argument, scope, session)?;
            match operator {
                UnaryOp::Neg => Ok(Value::Number(-argument.to_number())),
                UnaryOp::Plus => Ok(Value::Number(argument.to_number())),
                UnaryOp::Not => Ok(Value::Bool(!argument.is_truthy())),
                UnaryOp::BitNot => Err(ExpressionError::security(format!(
                    "Unsupported unary operator: {}",
                    operator
                ))),
            }
        }

        Expr::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => {
            if eval_expr(test, scope, session)?.is_truthy() {
                eval_expr(consequent, scope, session)
            } else {
                eval_expr(alternate, scope, session)
            }
        }

        Expr::Array { elements, .. } => {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                items.push(eval_expr(element, scope, session)?);
            }
            if items.len() > MAX_COLLECTION_SIZE {
                return Err(ExpressionError::security("Array size exceeds maximum allowed"));
            }
            Ok(Value::array(items))
        }

        Expr::Template {
            quasis,
            expressions,
            ..
        } => {
            let mut out = String::new();
            for (i, chunk) in quasis.iter().enumerate() {
                out.push_str(chunk);
                if let Some(sub) = expressions.get(i) {
                    out.push_str(&stringify(&eval_expr(sub, scope, session)?));
                }
            }
            Ok(Value::String(out))
        }
    }
}

/* ===================== Identifiers & Properties ===================== */

fn eval_identifier(name: &str, scope: &Scope<'_>) -> ExpressionResult<Value> {
    validate_identifier(name)?;
    Ok(match name {
        "$json" => scope.current_node_data.clone(),
        "$input" => scope.input_data.clone(),
        _ => Value::Undefined,
    })
}

/// Property lookup on a non-nullish receiver
fn get_property(object: &Value, key: &Value) -> ExpressionResult<Value> {
    let key = key.to_js_string();
    check_prototype_access(&key)?;

    let value = match object {
        Value::Object(map) => map.get(&key).cloned(),
        Value::Array(items) => {
            if key == "length" {
                Some(Value::Number(items.len() as f64))
            } else {
                array_index(&key).and_then(|i| items.get(i).cloned())
            }
        }
        Value::String(s) => {
            if key == "length" {
                Some(Value::Number(s.chars().count() as f64))
            } else {
                array_index(&key).and_then(|i| s.chars().nth(i).map(|c| Value::String(c.to_string())))
            }
        }
        _ => None,
    };
    Ok(value.unwrap_or_default())
}

/// Canonical index key (`"0"`, `"12"`, not `"01"` or `"1.0"`)
fn array_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

/* ===================== Calls ===================== */

fn eval_call(
    callee: &Expr,
    args: Vec<Value>,
    scope: &Scope<'_>,
    session: &mut Session,
) -> ExpressionResult<Value> {
    match callee {
        Expr::Identifier { name, .. } if name == "$" => node_access(&args, scope),
        Expr::Identifier { name, .. } => match BuiltinFunc::from_name(name) {
            Some(func) => stdlib::call_builtin(func, &args, &scope.slots()),
            None => {
                validate_identifier(name)?;
                Err(ExpressionError::security(format!("Unknown function: {}", name)))
            }
        },
        Expr::Member {
            object,
            property,
            computed,
            ..
        } => {
            let receiver = eval_expr(object, scope, session)?;
            if receiver.is_nullish() {
                return Err(ExpressionError::evaluation(
                    "Cannot call method on null or undefined",
                ));
            }
            match (property.as_ref(), *computed) {
                (Expr::Identifier { name, .. }, false) => {
                    call_method(&receiver, name, &args, session)
                }
                _ => Err(ExpressionError::security(
                    "Computed method calls are not allowed",
                )),
            }
        }
        _ => Err(ExpressionError::security("Invalid function call")),
    }
}

/// `$('Node title')`
fn node_access(args: &[Value], scope: &Scope<'_>) -> ExpressionResult<Value> {
    let [Value::String(title)] = args else {
        return Err(ExpressionError::evaluation(
            "$() requires exactly one string argument",
        ));
    };
    validate_identifier(title)?;
    scope.context.get(title).cloned().ok_or_else(|| {
        ExpressionError::evaluation(format!("Node \"{}\" not found in context", title))
    })
}

fn call_method(
    receiver: &Value,
    method: &str,
    args: &[Value],
    session: &mut Session,
) -> ExpressionResult<Value> {
    validate_identifier(method)?;

    if !is_method_allowed(receiver, method) {
        tracing::debug!(method, receiver = receiver.type_name(), "method not allowed");
        return Err(ExpressionError::security(format!(
            "Method \"{}\" is not allowed",
            method
        )));
    }
    if is_callback_method(method) {
        validate_callback_arguments(args)?;
    }
    if is_iterative_method(method) {
        session.count_iteration()?;
    }

    let result = stdlib::call_method(receiver, method, args)?;
    match &result {
        Value::String(s) if s.chars().count() > MAX_COLLECTION_SIZE => Err(
            ExpressionError::security("Result string length exceeds maximum allowed"),
        ),
        Value::Array(items) if items.len() > MAX_COLLECTION_SIZE => Err(
            ExpressionError::security("Result array size exceeds maximum allowed"),
        ),
        _ => Ok(result),
    }
}

/* ===================== Operators ===================== */

fn eval_logical(
    op: LogicalOp,
    left: &Expr,
    right: &Expr,
    scope: &Scope<'_>,
    session: &mut Session,
) -> ExpressionResult<Value> {
    let left = eval_expr(left, scope, session)?;
    match (op, left.is_truthy()) {
        (LogicalOp::And, true) | (LogicalOp::Or, false) => eval_expr(right, scope, session),
        _ => Ok(left),
    }
}

fn numbers(left: &Value, right: &Value, message: &str) -> ExpressionResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(ExpressionError::evaluation(message)),
    }
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> ExpressionResult<Value> {
    const COMPARISON: &str = "Comparison operators require both operands to be numbers";

    let value = match op {
        BinaryOp::Add => {
            let (l, r) = numbers(
                left,
                right,
                "Arithmetic addition requires both operands to be numbers. Use concat() for strings.",
            )?;
            Value::Number(l + r)
        }
        BinaryOp::Sub => {
            let (l, r) = numbers(left, right, "Subtraction requires both operands to be numbers")?;
            Value::Number(l - r)
        }
        BinaryOp::Mul => {
            let (l, r) = numbers(left, right, "Multiplication requires both operands to be numbers")?;
            Value::Number(l * r)
        }
        BinaryOp::Div => {
            let (l, r) = numbers(left, right, "Division requires both operands to be numbers")?;
            // Also catches -0
            if r == 0.0 {
                return Err(ExpressionError::evaluation("Division by zero"));
            }
            let result = l / r;
            if !result.is_finite() {
                return Err(ExpressionError::evaluation(
                    "Division result is too large (Infinity)",
                ));
            }
            Value::Number(result)
        }
        BinaryOp::Mod => {
            let (l, r) = numbers(left, right, "Modulo requires both operands to be numbers")?;
            if r == 0.0 {
                return Err(ExpressionError::evaluation("Modulo by zero"));
            }
            // Rust `%` on f64 truncates like JavaScript
            Value::Number(l % r)
        }
        BinaryOp::Eq | BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::Ne | BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt => {
            let (l, r) = numbers(left, right, COMPARISON)?;
            Value::Bool(l < r)
        }
        BinaryOp::Gt => {
            let (l, r) = numbers(left, right, COMPARISON)?;
            Value::Bool(l > r)
        }
        BinaryOp::Lte => {
            let (l, r) = numbers(left, right, COMPARISON)?;
            Value::Bool(l <= r)
        }
        BinaryOp::Gte => {
            let (l, r) = numbers(left, right, COMPARISON)?;
            Value::Bool(l >= r)
        }
        BinaryOp::And
        | BinaryOp::Or
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::BitAnd
        | BinaryOp::Shl
        | BinaryOp::Shr
        | BinaryOp::UShr
        | BinaryOp::Pow => {
            return Err(ExpressionError::security(format!(
                "Unsupported operator: {}",
                op
            )))
        }
    };
    Ok(value)
}
