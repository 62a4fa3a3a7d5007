//! `{{ ... }}` interpolation
//!
//! The scanner keeps no state between calls: every call walks the text from
//! the start.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

use super::types::number::format_number;
use super::types::Value;
use crate::error::ExpressionResult;

/// One `{{ expression }}` occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Byte range of the whole `{{ ... }}` in the source text
    pub range: Range<usize>,
    /// Expression text with surrounding whitespace removed
    pub expression: &'a str,
}

/// `{{`, a non-empty run of characters other than braces, then `}}`
fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Find all placeholders in `text`.
///
/// When a candidate does not close, matching resumes one character after its
/// opening brace, so `{{{a}}` yields `{` followed by the placeholder `{{a}}`.
/// An all-blank body keeps its last whitespace character.
pub fn find_spans(text: &str) -> Vec<Placeholder<'_>> {
    placeholder_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let expression = caps.get(1)?;
            Some(Placeholder {
                range: whole.range(),
                expression: expression.as_str(),
            })
        })
        .collect()
}

/// Text form of a value when spliced into a string
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => value
            .to_json_string()
            .unwrap_or_else(|| "[Object]".to_string()),
        Value::Function(_) => value.to_js_string(),
    }
}

/// Replace every placeholder with the stringified result of `evaluate`.
///
/// Text outside placeholders is copied unchanged. The first failing
/// placeholder aborts the whole render.
pub fn render<F>(text: &str, mut evaluate: F) -> ExpressionResult<String>
where
    F: FnMut(&str) -> ExpressionResult<Value>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for span in find_spans(text) {
        out.push_str(&text[last..span.range.start]);
        let value = evaluate(span.expression).map_err(|err| {
            tracing::error!(expression = span.expression, error = %err, "expression evaluation error");
            err
        })?;
        out.push_str(&stringify(&value));
        last = span.range.end;
    }
    out.push_str(&text[last..]);

    Ok(out)
}
