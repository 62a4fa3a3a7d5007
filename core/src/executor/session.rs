//! Per-evaluation resource accounting

use crate::error::{ExpressionError, ExpressionResult};

/// Maximum AST depth visited by one evaluation
pub const MAX_RECURSION_DEPTH: usize = 100;

/// Maximum length of array literals and of string/array method results
pub const MAX_COLLECTION_SIZE: usize = 10_000;

/// Maximum number of iterative array method calls in one evaluation
pub const MAX_ITERATIONS: usize = 1_000;

/// Maximum nesting depth of values accepted by `set_context`
pub const MAX_CONTEXT_DEPTH: usize = 10;

/// Counters for a single evaluation.
///
/// A fresh session is created for every `evaluate` call and for every span
/// of `process_string`, so evaluations never observe each other's usage.
#[derive(Debug, Default)]
pub struct Session {
    recursion_depth: usize,
    iteration_count: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) -> ExpressionResult<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(ExpressionError::security("Maximum recursion depth exceeded"));
        }
        Ok(())
    }

    pub fn exit(&mut self) {
        self.recursion_depth = self.recursion_depth.saturating_sub(1);
    }

    pub fn count_iteration(&mut self) -> ExpressionResult<()> {
        self.iteration_count += 1;
        if self.iteration_count > MAX_ITERATIONS {
            return Err(ExpressionError::security("Maximum iteration count exceeded"));
        }
        Ok(())
    }

    pub fn recursion_depth(&self) -> usize {
        self.recursion_depth
    }

    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursion_cap() {
        let mut session = Session::new();
        for _ in 0..MAX_RECURSION_DEPTH {
            session.enter().expect("within cap");
        }
        let err = session.enter().unwrap_err();
        assert!(err.is_security());
        session.exit();
        session.exit();
        assert_eq!(session.recursion_depth(), MAX_RECURSION_DEPTH - 1);
    }

    #[test]
    fn test_iteration_cap() {
        let mut session = Session::new();
        for _ in 0..MAX_ITERATIONS {
            session.count_iteration().expect("within cap");
        }
        assert_eq!(
            session.count_iteration().unwrap_err().message(),
            "Maximum iteration count exceeded"
        );
    }
}
