//! Tests for `process_string`

use super::helpers::sample_evaluator;
use crate::error::ExpressionError;
use crate::executor::types::Value;
use crate::executor::ExpressionEvaluator;
use serde_json::json;

#[test]
fn test_simple_interpolation() {
    let evaluator = ExpressionEvaluator::new();
    assert_eq!(evaluator.process_string("{{ 1 + 1 }}").unwrap(), "2");
    assert_eq!(evaluator.process_string("plain text").unwrap(), "plain text");
    assert_eq!(evaluator.process_string("").unwrap(), "");
}

#[test]
fn test_consecutive_calls_are_independent() {
    let evaluator = ExpressionEvaluator::new();
    assert_eq!(evaluator.process_string("{{1+1}}").unwrap(), "2");
    assert_eq!(evaluator.process_string("{{2+2}}").unwrap(), "4");
}

#[test]
fn test_multiple_spans() {
    let evaluator = sample_evaluator();
    assert_eq!(
        evaluator
            .process_string("Hello {{ $('User').name }}, you are {{ $('User').age }}!")
            .unwrap(),
        "Hello Ann Lee, you are 25!"
    );
}

#[test]
fn test_value_stringification() {
    let evaluator = sample_evaluator();
    assert_eq!(evaluator.process_string("[{{ $('User').manager }}]").unwrap(), "[]");
    assert_eq!(evaluator.process_string("[{{ $('User').missing }}]").unwrap(), "[]");
    assert_eq!(
        evaluator.process_string("{{ $('User').tags }}").unwrap(),
        "[\"admin\",\"editor\"]"
    );
    assert_eq!(
        evaluator.process_string("{{ $('User').address }}").unwrap(),
        "{\"city\":\"Oslo\",\"zip code\":\"0150\"}"
    );
    assert_eq!(evaluator.process_string("{{ 1 / 4 }}").unwrap(), "0.25");
    assert_eq!(evaluator.process_string("{{ 1 < 2 }}").unwrap(), "true");
}

#[test]
fn test_triple_brace() {
    let evaluator = sample_evaluator();
    assert_eq!(
        evaluator.process_string("{{{ $('User').address.city }}}").unwrap(),
        "{Oslo}"
    );
}

#[test]
fn test_unclosed_and_empty_placeholders_pass_through() {
    let evaluator = ExpressionEvaluator::new();
    assert_eq!(evaluator.process_string("{{}} and {{ open").unwrap(), "{{}} and {{ open");
}

#[test]
fn test_first_failing_span_aborts() {
    let evaluator = ExpressionEvaluator::new();
    assert_eq!(
        evaluator.process_string("ok {{ 1 }} then {{ 'a' + 1 }}"),
        Err(ExpressionError::evaluation(
            "Arithmetic addition requires both operands to be numbers. Use concat() for strings."
        ))
    );
    assert!(evaluator.process_string("{{ process }}").unwrap_err().is_security());
}

#[test]
fn test_each_span_gets_a_fresh_session() {
    // Each span sits just under the recursion cap; together they would not
    let span = format!("{{{{ 1{} }}}}", " + 1".repeat(98));
    let text = format!("{} {} {}", span, span, span);
    assert_eq!(ExpressionEvaluator::new().process_string(&text).unwrap(), "99 99 99");
}

#[test]
fn test_json_slot_in_template() {
    let mut evaluator = ExpressionEvaluator::new();
    evaluator.set_current_node_data(Value::from(json!({ "title": "Report" })));
    assert_eq!(
        evaluator.process_string("Title: {{ $json.title }}").unwrap(),
        "Title: Report"
    );
}
