//! Tests for the expression evaluator
//!
//! Organized by feature area

mod context_tests;
mod helpers;
mod interpolation_tests;
mod operator_tests;
