//! Static type classifier
//!
//! Infers the result type of a field that holds exactly one `{{ ... }}`
//! expression, without evaluating it. Used by the editor to pick filter
//! operators. Unknown shapes fall back to TEXT; the classifier never fails.

pub mod return_types;

use serde::{Deserialize, Serialize};

use crate::executor::types::number::format_number;
use crate::executor::types::{BinaryOp, Expr, LitValue, UnaryOp};
use crate::parser::parse_expression;
use crate::variables::{find_variable, VariableDefinition, VariableType};

use return_types::{builtin_return_type, member_return_type, method_return_type};

/// Filter data type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Text,
    Number,
    Boolean,
    Date,
    #[serde(rename = "DATETIME")]
    DateTime,
    MultiSelect,
    Select,
    Json,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "TEXT",
            DataType::Number => "NUMBER",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::DateTime => "DATETIME",
            DataType::MultiSelect => "MULTI_SELECT",
            DataType::Select => "SELECT",
            DataType::Json => "JSON",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ===================== Entry Point ===================== */

/// Classify a field value.
///
/// `None` when the text holds no expression, or when the expression's type
/// is unknowable (a `null` literal, an object variable with children).
/// Mixed text, several spans or unparsable input all yield TEXT.
pub fn extract_data_type(text: &str, variables: &[VariableDefinition]) -> Option<DataType> {
    if text.is_empty() || !text.contains("{{") {
        return None;
    }
    if text.matches("{{").count() != 1 || text.matches("}}").count() != 1 {
        return Some(DataType::Text);
    }

    let Some(expression) = pure_expression(text.trim()) else {
        return Some(DataType::Text);
    };

    match parse_expression(expression) {
        Ok(expr) => classify(&expr, variables),
        Err(err) => {
            tracing::warn!(expression, error = %err, "failed to parse expression for type detection");
            Some(DataType::Text)
        }
    }
}

/// Body of `{{ ... }}` when the trimmed text is exactly one placeholder
fn pure_expression(trimmed: &str) -> Option<&str> {
    let body = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
    if body.is_empty() || body.contains('}') {
        return None;
    }
    Some(body.trim())
}

/* ===================== Type Rules ===================== */

fn classify(expr: &Expr, variables: &[VariableDefinition]) -> Option<DataType> {
    match expr {
        Expr::Literal { value, .. } => match value {
            LitValue::Num(_) => Some(DataType::Number),
            LitValue::Str(_) => Some(DataType::Text),
            LitValue::Bool(_) => Some(DataType::Boolean),
            LitValue::Null => None,
        },

        Expr::Identifier { .. } => Some(DataType::Text),

        Expr::Call {
            callee, arguments, ..
        } => {
            if let Some(node) = node_reference(callee, arguments) {
                if let Some(variable) = find_variable(&node, variables) {
                    return declared_type(variable);
                }
            }

            let resolved = match callee.as_ref() {
                Expr::Identifier { name, .. } if name.starts_with('$') => builtin_return_type(name),
                Expr::Member {
                    property,
                    computed: false,
                    ..
                } => match property.as_ref() {
                    Expr::Identifier { name, .. } => method_return_type(name),
                    _ => None,
                },
                _ => None,
            };
            Some(resolved.unwrap_or(DataType::Text))
        }

        Expr::Member {
            property, computed, ..
        } => {
            if let (Expr::Identifier { name, .. }, false) = (property.as_ref(), *computed) {
                if let Some(data_type) = member_return_type(name) {
                    return Some(data_type);
                }
            }
            let path = variable_path(expr);
            if path.is_empty() {
                return Some(DataType::Text);
            }
            match find_variable(&path, variables) {
                Some(variable) => declared_type(variable),
                None => Some(DataType::Text),
            }
        }

        Expr::Unary { operator, .. } => match operator {
            UnaryOp::Neg => Some(DataType::Number),
            UnaryOp::Not => Some(DataType::Boolean),
            UnaryOp::Plus | UnaryOp::BitNot => None,
        },

        Expr::Binary { operator, .. } => Some(binary_type(*operator)),

        Expr::Logical { .. } => Some(DataType::Boolean),

        Expr::Conditional {
            consequent,
            alternate,
            ..
        } => {
            let consequent = classify(consequent, variables);
            match consequent {
                Some(data_type) if consequent == classify(alternate, variables) => Some(data_type),
                _ => Some(DataType::Text),
            }
        }

        Expr::Array { .. } | Expr::Template { .. } => Some(DataType::Text),
    }
}

fn binary_type(operator: BinaryOp) -> DataType {
    match operator {
        op if op.is_comparison() => DataType::Boolean,
        BinaryOp::Add => DataType::Number,
        BinaryOp::BitAnd => DataType::Text,
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
            DataType::Number
        }
        _ => DataType::Text,
    }
}

/// Declared type of a resolved variable
fn declared_type(variable: &VariableDefinition) -> Option<DataType> {
    match variable.var_type {
        VariableType::String => Some(DataType::Text),
        VariableType::Number | VariableType::Integer => Some(DataType::Number),
        VariableType::Boolean => Some(DataType::Boolean),
        VariableType::Date => Some(DataType::Date),
        VariableType::DateTime => Some(DataType::DateTime),
        VariableType::Object if variable.is_array() => Some(DataType::MultiSelect),
        VariableType::Object if !variable.children().is_empty() => None,
        VariableType::Object => Some(DataType::Text),
        VariableType::Array => Some(DataType::MultiSelect),
    }
}

/* ===================== Variable Paths ===================== */

/// `$('Title')` for a `$` call whose first argument is a literal
fn node_reference(callee: &Expr, arguments: &[Expr]) -> Option<String> {
    match (callee, arguments.first()) {
        (Expr::Identifier { name, .. }, Some(Expr::Literal { value, .. })) if name == "$" => {
            Some(format!("$('{}')", literal_text(value)))
        }
        _ => None,
    }
}

/// Directory key addressed by a member chain.
///
/// A `$(title)` root with a truthy literal title prefixes the path; any other
/// root is dropped and the path starts at the first segment.
fn variable_path(expr: &Expr) -> String {
    let mut segments = Vec::new();
    let mut current = expr;
    while let Expr::Member {
        object,
        property,
        computed,
        ..
    } = current
    {
        match (property.as_ref(), *computed) {
            (Expr::Identifier { name, .. }, false) => segments.push((name.clone(), false)),
            (Expr::Literal { value, .. }, true) => segments.push((literal_text(value), true)),
            _ => {}
        }
        current = object.as_ref();
    }
    segments.reverse();

    let root = match current {
        Expr::Call {
            callee, arguments, ..
        } => match arguments.first() {
            Some(Expr::Literal { value, .. }) if is_truthy_literal(value) => {
                node_reference(callee, arguments)
            }
            _ => None,
        },
        _ => None,
    };

    let mut path = root.clone().unwrap_or_default();
    for (i, (segment, bracket)) in segments.iter().enumerate() {
        if *bracket {
            path.push_str(&format!("['{}']", segment));
        } else if i == 0 && root.is_none() {
            path.push_str(segment);
        } else {
            path.push('.');
            path.push_str(segment);
        }
    }
    path
}

fn is_truthy_literal(value: &LitValue) -> bool {
    match value {
        LitValue::Null => false,
        LitValue::Bool(b) => *b,
        LitValue::Num(n) => *n != 0.0 && !n.is_nan(),
        LitValue::Str(s) => !s.is_empty(),
    }
}

fn literal_text(value: &LitValue) -> String {
    match value {
        LitValue::Null => "null".to_string(),
        LitValue::Bool(b) => b.to_string(),
        LitValue::Num(n) => format_number(*n),
        LitValue::Str(s) => s.clone(),
    }
}
