//! Return-type tables for calls the classifier can see through
//!
//! Kept apart from the executor's allow-lists: these describe what a name
//! returns, not whether it may run.

use super::DataType;

/// `(methods, result)` pairs, consulted in order. String methods come first,
/// so names shared with arrays (`slice`, `concat`, `includes`, ...) take the
/// string result.
const METHOD_RETURN_TYPES: &[(&[&str], DataType)] = &[
    (
        &[
            "toUpperCase",
            "toLowerCase",
            "trim",
            "slice",
            "substring",
            "charAt",
            "concat",
            "replace",
            "repeat",
            "padStart",
            "padEnd",
        ],
        DataType::Text,
    ),
    (&["indexOf", "lastIndexOf", "charCodeAt"], DataType::Number),
    (&["startsWith", "endsWith", "includes"], DataType::Boolean),
    (&["split"], DataType::MultiSelect),
    (&["join"], DataType::Text),
    (&["indexOf", "lastIndexOf", "findIndex"], DataType::Number),
    (&["some", "every", "includes"], DataType::Boolean),
    (&["map", "filter", "slice", "concat", "flat"], DataType::MultiSelect),
    (&["toFixed", "toExponential", "toPrecision"], DataType::Text),
];

const BUILTIN_RETURN_TYPES: &[(&str, DataType)] = &[
    ("$isNull", DataType::Boolean),
    ("$isUndefined", DataType::Boolean),
    ("$isEmpty", DataType::Boolean),
    ("$string", DataType::Text),
    ("$number", DataType::Number),
    ("$boolean", DataType::Boolean),
    ("$length", DataType::Number),
    ("$abs", DataType::Number),
    ("$ceil", DataType::Number),
    ("$floor", DataType::Number),
    ("$round", DataType::Number),
    ("$min", DataType::Number),
    ("$max", DataType::Number),
    ("$first", DataType::Text),
    ("$last", DataType::Text),
    ("$ifEmpty", DataType::Text),
];

pub fn method_return_type(method: &str) -> Option<DataType> {
    METHOD_RETURN_TYPES
        .iter()
        .find(|(methods, _)| methods.contains(&method))
        .map(|(_, data_type)| *data_type)
}

pub fn builtin_return_type(name: &str) -> Option<DataType> {
    BUILTIN_RETURN_TYPES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, data_type)| *data_type)
}

/// Properties whose type does not depend on the receiver
pub fn member_return_type(property: &str) -> Option<DataType> {
    match property {
        "length" => Some(DataType::Number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_tables_win_on_shared_names() {
        assert_eq!(method_return_type("slice"), Some(DataType::Text));
        assert_eq!(method_return_type("concat"), Some(DataType::Text));
        assert_eq!(method_return_type("includes"), Some(DataType::Boolean));
        assert_eq!(method_return_type("indexOf"), Some(DataType::Number));
    }

    #[test]
    fn test_array_and_number_methods() {
        assert_eq!(method_return_type("split"), Some(DataType::MultiSelect));
        assert_eq!(method_return_type("flat"), Some(DataType::MultiSelect));
        assert_eq!(method_return_type("findIndex"), Some(DataType::Number));
        assert_eq!(method_return_type("every"), Some(DataType::Boolean));
        assert_eq!(method_return_type("toFixed"), Some(DataType::Text));
        assert_eq!(method_return_type("valueOf"), None);
    }

    #[test]
    fn test_builtins() {
        assert_eq!(builtin_return_type("$isEmpty"), Some(DataType::Boolean));
        assert_eq!(builtin_return_type("$round"), Some(DataType::Number));
        assert_eq!(builtin_return_type("$ifEmpty"), Some(DataType::Text));
        assert_eq!(builtin_return_type("$now"), None);
        assert_eq!(builtin_return_type("isEmpty"), None);
    }
}
