//! Test helpers for evaluator tests

use crate::error::ExpressionError;
use crate::executor::types::Value;
use crate::executor::ExpressionEvaluator;
use serde_json::json;

/// Evaluator with the given JSON object as context
pub fn evaluator_with(context: serde_json::Value) -> ExpressionEvaluator {
    let mut evaluator = ExpressionEvaluator::new();
    evaluator
        .set_context(Value::from(context))
        .expect("Context rejected");
    evaluator
}

/// Evaluator with a small context shared by most tests
pub fn sample_evaluator() -> ExpressionEvaluator {
    evaluator_with(json!({
        "User": {
            "name": "Ann Lee",
            "age": 25,
            "email": "ann@example.com",
            "nickname": "",
            "tags": ["admin", "editor"],
            "address": { "city": "Oslo", "zip code": "0150" },
            "manager": null
        },
        "Order": {
            "total": 99.5,
            "items": [
                { "sku": "A1", "qty": 2 },
                { "sku": "B2", "qty": 1 }
            ]
        }
    }))
}

/// Evaluate against an empty context, panicking on failure
pub fn eval(source: &str) -> Value {
    eval_with(&ExpressionEvaluator::new(), source)
}

pub fn eval_with(evaluator: &ExpressionEvaluator, source: &str) -> Value {
    evaluator
        .evaluate(source)
        .unwrap_or_else(|e| panic!("Evaluation of {:?} failed: {:?}", source, e))
}

/// Evaluate expecting a security fault, returning its message
pub fn security_fault(evaluator: &ExpressionEvaluator, source: &str) -> String {
    match evaluator.evaluate(source) {
        Err(ExpressionError::Security(msg)) => msg,
        other => panic!("Expected security fault for {:?}, got {:?}", source, other),
    }
}

/// Evaluate expecting an evaluation fault, returning its message
pub fn evaluation_fault(evaluator: &ExpressionEvaluator, source: &str) -> String {
    match evaluator.evaluate(source) {
        Err(ExpressionError::Evaluation(msg)) => msg,
        other => panic!("Expected evaluation fault for {:?}, got {:?}", source, other),
    }
}
