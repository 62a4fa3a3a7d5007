//! Error types for expression evaluation

use thiserror::Error;

use crate::parser::ParseError;

/// The two fault kinds an expression can raise.
///
/// A security fault means the expression tried to leave the sandbox
/// (blocked identifier, property or method, injected function, exceeded
/// resource cap). An evaluation fault means it was well formed but
/// semantically invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("{0}")]
    Security(String),

    #[error("{0}")]
    Evaluation(String),
}

impl ExpressionError {
    pub fn security(message: impl Into<String>) -> Self {
        ExpressionError::Security(message.into())
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        ExpressionError::Evaluation(message.into())
    }

    pub fn is_security(&self) -> bool {
        matches!(self, ExpressionError::Security(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ExpressionError::Security(msg) | ExpressionError::Evaluation(msg) => msg,
        }
    }
}

impl From<ParseError> for ExpressionError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Syntax(msg, _) => {
                ExpressionError::Evaluation(format!("Failed to evaluate expression: {}", msg))
            }
            unsupported @ ParseError::Unsupported(..) => {
                ExpressionError::Security(unsupported.to_string())
            }
            nesting @ ParseError::NestingTooDeep => ExpressionError::Security(nesting.to_string()),
        }
    }
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;
