//! Builders for variable trees

use super::{VariableDefinition, VariableExtra, VariableGroupKey, VariableType};
use crate::executor::types::Value;

/// `prefix.name`, or `prefix['name']` when the name is not a plain identifier
pub fn build_property_key(prefix: &str, name: &str) -> String {
    let needs_brackets = name.starts_with(|c: char| c.is_ascii_digit())
        || name
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'));

    if needs_brackets {
        format!("{}['{}']", prefix, name)
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Prefix the key of `variable` and of all its descendants with `prefix.`
pub fn prefix_variable_keys(variable: &VariableDefinition, prefix: &str) -> VariableDefinition {
    VariableDefinition {
        key: format!("{}.{}", prefix, variable.key),
        children: variable.children.as_ref().map(|children| {
            children
                .iter()
                .map(|child| prefix_variable_keys(child, prefix))
                .collect()
        }),
        ..variable.clone()
    }
}

/// Give every childless array variable a `length` child, recursively
pub fn append_array_length_variables(variables: Vec<VariableDefinition>) -> Vec<VariableDefinition> {
    variables
        .into_iter()
        .map(|mut variable| {
            match variable.children.take() {
                None if variable.is_array() => {
                    let length = VariableDefinition::new(
                        format!("{}.length", variable.key),
                        "length",
                        VariableType::Number,
                    )
                    .with_group(VariableGroupKey::Meta)
                    .with_extra(VariableExtra::described(format!(
                        "Number of {}",
                        variable.name.to_lowercase()
                    )));
                    variable.children = Some(vec![length]);
                }
                Some(children) => {
                    variable.children = Some(append_array_length_variables(children));
                }
                None => {}
            }
            variable
        })
        .collect()
}

/// Record meta variables (`id`) under an optional prefix
pub fn meta_variables(prefix: &str) -> Vec<VariableDefinition> {
    let key = if prefix.is_empty() {
        "id".to_string()
    } else {
        format!("{}.id", prefix)
    };
    vec![VariableDefinition::new(key, "id", VariableType::String)
        .with_group(VariableGroupKey::Meta)
        .with_extra(VariableExtra::described("Record ID"))]
}

/// Root a node's variables under `$('title')`
pub fn node_variables(title: &str, variables: &[VariableDefinition]) -> Vec<VariableDefinition> {
    let root = format!("$('{}')", title);
    variables
        .iter()
        .map(|variable| prefix_variable_keys(variable, &root))
        .collect()
}

/// Derive variables from a sample output value.
///
/// Arrays are described by their first item, addressed as `prefix[i]`.
pub fn general_variables(output: &Value, prefix: &str) -> Vec<VariableDefinition> {
    match output {
        Value::Undefined | Value::Null | Value::Function(_) => Vec::new(),
        Value::Array(items) => {
            let Some(first) = items.first() else {
                return Vec::new();
            };
            let name = prefix.rsplit('.').next().filter(|s| !s.is_empty()).unwrap_or("items");
            vec![array_variable(prefix, name, first)]
        }
        Value::Object(map) => {
            let variables = map
                .iter()
                .filter_map(|(key, value)| {
                    let full_key = if prefix.is_empty() {
                        key.clone()
                    } else {
                        build_property_key(prefix, key)
                    };
                    property_variable(&full_key, key, value)
                })
                .collect();
            append_array_length_variables(variables)
        }
        scalar => {
            let key = if prefix.is_empty() { "value" } else { prefix };
            let var_type = scalar_type(scalar).unwrap_or(VariableType::String);
            vec![VariableDefinition::new(key, key, var_type).with_group(VariableGroupKey::Fields)]
        }
    }
}

fn property_variable(full_key: &str, name: &str, value: &Value) -> Option<VariableDefinition> {
    let variable = match value {
        Value::Undefined | Value::Function(_) => return None,
        Value::Array(items) => match items.first() {
            Some(first) => array_variable(full_key, name, first),
            None => VariableDefinition::new(full_key, name, VariableType::Array)
                .with_group(VariableGroupKey::Fields)
                .array(true),
        },
        Value::Object(_) => VariableDefinition::new(full_key, name, VariableType::Object)
            .with_group(VariableGroupKey::Fields)
            .array(false)
            .with_children(general_variables(value, full_key)),
        Value::Null => VariableDefinition::new(full_key, name, VariableType::Object)
            .with_group(VariableGroupKey::Fields)
            .array(false),
        scalar => {
            let var_type = scalar_type(scalar).unwrap_or(VariableType::String);
            VariableDefinition::new(full_key, name, var_type)
                .with_group(VariableGroupKey::Fields)
                .array(false)
        }
    };
    Some(variable)
}

fn array_variable(key: &str, name: &str, first: &Value) -> VariableDefinition {
    let mut children = general_variables(first, &format!("{}[i]", key));
    children.push(
        VariableDefinition::new(format!("{}.length", key), "length", VariableType::Number)
            .with_group(VariableGroupKey::Meta)
            .with_extra(VariableExtra::described("Number of items")),
    );
    VariableDefinition::new(key, name, VariableType::Array)
        .with_group(VariableGroupKey::Fields)
        .array(true)
        .with_children(children)
}

fn scalar_type(value: &Value) -> Option<VariableType> {
    match value {
        Value::String(_) => Some(VariableType::String),
        Value::Number(_) => Some(VariableType::Number),
        Value::Bool(_) => Some(VariableType::Boolean),
        _ => None,
    }
}
