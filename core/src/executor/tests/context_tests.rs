//! Tests for context replacement and validation

use super::helpers::{eval_with, sample_evaluator};
use crate::error::ExpressionError;
use crate::executor::types::{HostFunction, Value};
use crate::executor::ExpressionEvaluator;
use maplit::btreemap;
use serde_json::json;

fn nested(levels: usize) -> Value {
    let mut value = Value::Number(1.0);
    for _ in 0..levels {
        value = Value::object([("next", value)]);
    }
    value
}

#[test]
fn test_context_must_be_an_object() {
    let mut evaluator = ExpressionEvaluator::new();
    for value in [Value::Null, Value::Number(1.0), Value::from("x"), Value::from(json!([1]))] {
        assert_eq!(
            evaluator.set_context(value),
            Err(ExpressionError::evaluation("Context must be a non-null object"))
        );
    }
}

#[test]
fn test_context_is_replaced_wholesale() {
    let mut evaluator = sample_evaluator();
    evaluator
        .set_context(Value::from(json!({ "Other": { "v": 1 } })))
        .unwrap();

    assert_eq!(evaluator.context().len(), 1);
    assert_eq!(eval_with(&evaluator, "$('Other').v"), Value::Number(1.0));
    assert!(evaluator.evaluate("$('User')").is_err());
}

#[test]
fn test_rejected_context_keeps_previous() {
    let mut evaluator = sample_evaluator();
    let bad = Value::object([("eval", Value::Number(1.0))]);
    assert!(evaluator.set_context(bad).unwrap_err().is_security());
    assert_eq!(eval_with(&evaluator, "$('User').age"), Value::Number(25.0));
}

#[test]
fn test_nested_function_is_rejected() {
    let mut evaluator = ExpressionEvaluator::new();
    let context = Value::object([(
        "Node",
        Value::object([(
            "list",
            Value::array(vec![Value::Number(1.0), Value::Function(HostFunction::new("run"))]),
        )]),
    )]);
    assert_eq!(
        evaluator.set_context(context),
        Err(ExpressionError::security("Functions are not allowed in context data"))
    );
}

#[test]
fn test_revisited_collection_is_rejected() {
    let mut evaluator = ExpressionEvaluator::new();
    let shared = Value::from(json!({ "id": 1 }));
    let context = Value::object(btreemap! {
        "A" => shared.clone(),
        "B" => Value::array(vec![shared]),
    });
    assert_eq!(
        evaluator.set_context(context),
        Err(ExpressionError::security(
            "Circular references are not allowed in context data"
        ))
    );
}

#[test]
fn test_context_depth_limit() {
    let mut evaluator = ExpressionEvaluator::new();
    // The root object is level 0, the innermost scalar sits at level 10
    assert!(evaluator.set_context(nested(10)).is_ok());
    assert_eq!(
        evaluator.set_context(nested(11)),
        Err(ExpressionError::security(
            "Context nesting depth exceeds maximum allowed (10 levels)"
        ))
    );
}

#[test]
fn test_dangerous_keys_are_rejected() {
    let mut evaluator = ExpressionEvaluator::new();
    for key in ["eval", "Function", "constructor"] {
        let context = Value::object([("Node", Value::object([(key, Value::Null)]))]);
        let err = evaluator.set_context(context).unwrap_err();
        assert!(err.is_security(), "{} should be rejected", key);
    }
}

#[test]
fn test_evaluator_is_shareable_across_threads() {
    let evaluator = sample_evaluator();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let evaluator = &evaluator;
                scope.spawn(move || evaluator.evaluate(&format!("$('User').age + {}", i)))
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let value = handle.join().expect("thread panicked").unwrap();
            assert_eq!(value, Value::Number(25.0 + i as f64));
        }
    });
}
