//! Sandboxed expression evaluator
//!
//! [`ExpressionEvaluator`] holds the named node outputs (the context) and the
//! `$json` / `$input` slots. Evaluation takes `&self`: all per-run counters
//! live in a [`session::Session`] created at the start of each evaluation.
//!
//! ```text
//! text ──parse_expression──▶ Expr ──eval_expr(scope, session)──▶ Value
//! ```

pub mod expressions;
pub mod interpolation;
pub mod security;
pub mod session;
pub mod stdlib;
pub mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{ExpressionError, ExpressionResult};
use crate::parser::parse_expression;
use expressions::{eval_expr, Scope};
use session::Session;
use types::Value;

/// Evaluates `{{ }}` expressions against workflow node outputs
#[derive(Debug, Clone)]
pub struct ExpressionEvaluator {
    context: Arc<IndexMap<String, Value>>,
    current_node_data: Value,
    input_data: Value,
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self {
            context: Arc::default(),
            current_node_data: Value::Null,
            input_data: Value::Null,
        }
    }
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the node context.
    ///
    /// `context` must be an object keyed by node title. The whole graph is
    /// validated first; on failure the previous context is kept.
    pub fn set_context(&mut self, context: Value) -> ExpressionResult<()> {
        let Value::Object(map) = &context else {
            return Err(ExpressionError::evaluation(
                "Context must be a non-null object",
            ));
        };
        security::validate_context_data(&context)?;

        tracing::debug!(nodes = map.len(), "context replaced");
        self.context = map.clone();
        Ok(())
    }

    /// Value returned by `$json`
    pub fn set_current_node_data(&mut self, data: Value) {
        self.current_node_data = data;
    }

    /// Value returned by `$input`
    pub fn set_input_data(&mut self, data: Value) {
        self.input_data = data;
    }

    pub fn context(&self) -> &IndexMap<String, Value> {
        &self.context
    }

    /// Evaluate a single expression (without `{{ }}`)
    pub fn evaluate(&self, expression: &str) -> ExpressionResult<Value> {
        let ast = parse_expression(expression).map_err(|err| {
            let err = ExpressionError::from(err);
            if err.is_security() {
                tracing::debug!(expression, error = %err, "expression rejected");
            }
            err
        })?;

        let scope = Scope {
            context: &self.context,
            current_node_data: &self.current_node_data,
            input_data: &self.input_data,
        };
        let mut session = Session::new();
        eval_expr(&ast, &scope, &mut session).map_err(|err| {
            if err.is_security() {
                tracing::debug!(expression, error = %err, "security fault");
            }
            err
        })
    }

    /// Replace every `{{ expression }}` in `text` with its string form.
    ///
    /// Each placeholder gets its own session. The first failing placeholder
    /// fails the whole call.
    pub fn process_string(&self, text: &str) -> ExpressionResult<String> {
        interpolation::render(text, |expression| self.evaluate(expression))
    }
}
