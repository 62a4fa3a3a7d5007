pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod parser;
pub mod variables;

// Re-export main types
pub use classifier::{extract_data_type, DataType};
pub use error::{ExpressionError, ExpressionResult};
pub use executor::types::Value;
pub use executor::ExpressionEvaluator;
pub use parser::parse_expression;
pub use variables::{VariableDefinition, VariableType};
