//! Shared AST and runtime value vocabulary

pub mod ast;
pub mod number;
pub mod values;

pub use ast::{BinaryOp, Expr, LitValue, LogicalOp, Span, UnaryOp};
pub use values::{HostFunction, Value};
