//! Variable directory
//!
//! Declarative catalog of the fields a workflow node exposes, addressed by
//! full path keys such as `$('Node').trigger.timestamp`. Used only for static
//! type inference; nothing here touches runtime values except the
//! sample-based builders in [`builders`].

pub mod builders;

use serde::{Deserialize, Serialize};

pub use builders::{
    append_array_length_variables, build_property_key, general_variables, meta_variables,
    node_variables, prefix_variable_keys,
};

/* ===================== Types ===================== */

/// Declared type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    #[serde(rename = "datetime")]
    DateTime,
    Object,
    Array,
}

/// UI grouping of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableGroupKey {
    Fields,
    Meta,
}

/// Presentation hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl VariableExtra {
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            icon: None,
        }
    }
}

/// One addressable field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    /// Full path, e.g. `$('Node').user.email`
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_array: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<VariableDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<VariableGroupKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<VariableExtra>,
}

impl VariableDefinition {
    pub fn new(key: impl Into<String>, name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            var_type,
            is_array: None,
            children: None,
            group_key: None,
            extra: None,
        }
    }

    pub fn with_children(mut self, children: Vec<VariableDefinition>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_group(mut self, group: VariableGroupKey) -> Self {
        self.group_key = Some(group);
        self
    }

    pub fn with_extra(mut self, extra: VariableExtra) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn array(mut self, is_array: bool) -> Self {
        self.is_array = Some(is_array);
        self
    }

    pub fn is_array(&self) -> bool {
        self.is_array.unwrap_or(false)
    }

    /// Declared children, empty when none
    pub fn children(&self) -> &[VariableDefinition] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/* ===================== Lookup ===================== */

/// Resolve a path against a variable tree.
///
/// Tries an exact key among the top-level entries, then a depth-first search
/// through declared children, then a loose match on a top-level key that
/// ends with `.path` or starts with `path`.
pub fn find_variable<'a>(path: &str, variables: &'a [VariableDefinition]) -> Option<&'a VariableDefinition> {
    if let Some(found) = variables.iter().find(|v| v.key == path) {
        return Some(found);
    }
    if let Some(found) = search_children(path, variables) {
        return Some(found);
    }

    let suffix = format!(".{}", path);
    variables
        .iter()
        .find(|v| v.key.ends_with(&suffix) || v.key.starts_with(path))
}

fn search_children<'a>(path: &str, variables: &'a [VariableDefinition]) -> Option<&'a VariableDefinition> {
    for variable in variables {
        if variable.key == path {
            return Some(variable);
        }
        if let Some(found) = search_children(path, variable.children()) {
            return Some(found);
        }
    }
    None
}
