//! Tests for binary, logical, unary and conditional operators

use super::helpers::{eval, eval_with, evaluation_fault, sample_evaluator, security_fault};
use crate::executor::types::Value;
use crate::executor::ExpressionEvaluator;

/* ===================== Arithmetic Operators ===================== */

#[test]
fn test_arithmetic() {
    assert_eq!(eval("1 + 2"), Value::Number(3.0));
    assert_eq!(eval("5 - 3"), Value::Number(2.0));
    assert_eq!(eval("3 * 4"), Value::Number(12.0));
    assert_eq!(eval("10 / 4"), Value::Number(2.5));
    assert_eq!(eval("2 + 3 * 4"), Value::Number(14.0));
    assert_eq!(eval("(2 + 3) * 4"), Value::Number(20.0));
    assert_eq!(eval("10 - 2 - 3"), Value::Number(5.0));
}

#[test]
fn test_remainder_truncates() {
    assert_eq!(eval("-5 % 3"), Value::Number(-2.0));
    assert_eq!(eval("5 % -3"), Value::Number(2.0));
    assert_eq!(eval("7.5 % 2"), Value::Number(1.5));
}

#[test]
fn test_addition_never_concatenates() {
    let evaluator = ExpressionEvaluator::new();
    assert_eq!(
        evaluation_fault(&evaluator, "'a' + 'b'"),
        "Arithmetic addition requires both operands to be numbers. Use concat() for strings."
    );
    assert!(evaluation_fault(&evaluator, "1 + '2'").contains("numbers"));
    assert!(evaluation_fault(&evaluator, "true * 2").contains("numbers"));
    assert!(evaluation_fault(&evaluator, "null - 1").contains("numbers"));
    assert!(evaluation_fault(&evaluator, "'6' / 2").contains("numbers"));
    assert!(evaluation_fault(&evaluator, "[] % 2").contains("numbers"));
}

#[test]
fn test_division_faults() {
    let evaluator = ExpressionEvaluator::new();
    assert_eq!(evaluation_fault(&evaluator, "10 / 0"), "Division by zero");
    assert_eq!(evaluation_fault(&evaluator, "10 / -0"), "Division by zero");
    assert_eq!(evaluation_fault(&evaluator, "10 % 0"), "Modulo by zero");
    assert_eq!(
        evaluation_fault(&evaluator, "1e308 / 1e-308"),
        "Division result is too large (Infinity)"
    );
}

/* ===================== Comparison Operators ===================== */

#[test]
fn test_equality_is_strict() {
    assert_eq!(eval("1 == 1"), Value::Bool(true));
    assert_eq!(eval("1 == '1'"), Value::Bool(false));
    assert_eq!(eval("1 != '1'"), Value::Bool(true));
    assert_eq!(eval("null === null"), Value::Bool(true));
    assert_eq!(eval("'a' !== 'a'"), Value::Bool(false));
}

#[test]
fn test_collections_compare_by_identity() {
    assert_eq!(eval("[1] === [1]"), Value::Bool(false));

    let evaluator = sample_evaluator();
    assert_eq!(eval_with(&evaluator, "$('User') === $('User')"), Value::Bool(true));
    assert_eq!(eval_with(&evaluator, "$('User').tags == $('User').tags"), Value::Bool(true));
    assert_eq!(eval_with(&evaluator, "$('User') === $('Order')"), Value::Bool(false));
}

#[test]
fn test_ordering_requires_numbers() {
    assert_eq!(eval("1 < 2"), Value::Bool(true));
    assert_eq!(eval("2 <= 2"), Value::Bool(true));
    assert_eq!(eval("3 > 4"), Value::Bool(false));
    assert_eq!(eval("4 >= 5"), Value::Bool(false));
    assert_eq!(
        evaluation_fault(&ExpressionEvaluator::new(), "'a' < 'b'"),
        "Comparison operators require both operands to be numbers"
    );
}

#[test]
fn test_unsupported_operators() {
    let evaluator = ExpressionEvaluator::new();
    assert_eq!(security_fault(&evaluator, "2 ** 3"), "Unsupported operator: **");
    assert_eq!(security_fault(&evaluator, "1 & 2"), "Unsupported operator: &");
    assert_eq!(security_fault(&evaluator, "1 | 2"), "Unsupported operator: |");
    assert_eq!(security_fault(&evaluator, "1 << 2"), "Unsupported operator: <<");
    assert_eq!(security_fault(&evaluator, "~1"), "Unsupported unary operator: ~");
}

/* ===================== Logical & Unary Operators ===================== */

#[test]
fn test_logical_operators_return_deciding_operand() {
    assert_eq!(eval("0 || 'fallback'"), Value::from("fallback"));
    assert_eq!(eval("'set' || 'fallback'"), Value::from("set"));
    assert_eq!(eval("1 && 2"), Value::Number(2.0));
    assert_eq!(eval("'' && 2"), Value::from(""));
}

#[test]
fn test_logical_operators_short_circuit() {
    let evaluator = sample_evaluator();
    // The right operand would fault if evaluated
    assert_eq!(eval_with(&evaluator, "false && $('Missing')"), Value::Bool(false));
    assert_eq!(eval_with(&evaluator, "true || $('Missing')"), Value::Bool(true));
}

#[test]
fn test_unary_operators() {
    assert_eq!(eval("-5"), Value::Number(-5.0));
    assert_eq!(eval("-'5'"), Value::Number(-5.0));
    assert_eq!(eval("+'3.5'"), Value::Number(3.5));
    assert_eq!(eval("+true"), Value::Number(1.0));
    assert_eq!(eval("!0"), Value::Bool(true));
    assert_eq!(eval("!'x'"), Value::Bool(false));
    assert_eq!(eval("!!null"), Value::Bool(false));
    assert!(matches!(eval("+'abc'"), Value::Number(n) if n.is_nan()));
}

#[test]
fn test_conditional_is_lazy() {
    let evaluator = sample_evaluator();
    assert_eq!(
        eval_with(&evaluator, "$('User').age >= 18 ? 'adult' : 'minor'"),
        Value::from("adult")
    );
    assert_eq!(eval_with(&evaluator, "true ? 1 : $('Missing')"), Value::Number(1.0));
    assert_eq!(eval_with(&evaluator, "null ? $('Missing') : 2"), Value::Number(2.0));
    assert_eq!(eval("false ? 1 : true ? 2 : 3"), Value::Number(2.0));
}
