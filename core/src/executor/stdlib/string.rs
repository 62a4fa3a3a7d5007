//! String methods
//!
//! Positions and lengths are counted in characters.

use super::{arg, opt_number, relative_index, too_long, MethodError, MethodResult};
use crate::executor::session::MAX_COLLECTION_SIZE;
use crate::executor::types::number::to_integer_or_infinity;
use crate::executor::types::Value;

pub fn call(s: &str, method: &str, args: &[Value]) -> MethodResult {
    match method {
        "toUpperCase" => Ok(Value::String(s.to_uppercase())),
        "toLowerCase" => Ok(Value::String(s.to_lowercase())),
        "trim" => Ok(Value::String(s.trim().to_string())),
        "slice" => Ok(Value::String(slice(s, args))),
        "substring" => Ok(Value::String(substring(s, args))),
        "charAt" => Ok(Value::String(char_at(s, arg(args, 0)).map(String::from).unwrap_or_default())),
        "charCodeAt" => Ok(Value::Number(
            char_at(s, arg(args, 0))
                .map(|c| {
                    let mut units = [0u16; 2];
                    c.encode_utf16(&mut units)[0] as f64
                })
                .unwrap_or(f64::NAN),
        )),
        "indexOf" => Ok(Value::Number(index_of(s, args))),
        "lastIndexOf" => Ok(Value::Number(last_index_of(s, args))),
        "split" => Ok(split(s, args)),
        "replace" => Ok(Value::String(replace(s, args))),
        "startsWith" => Ok(Value::Bool(starts_with(s, args))),
        "endsWith" => Ok(Value::Bool(ends_with(s, args))),
        "includes" => Ok(Value::Bool(index_of(s, args) >= 0.0)),
        "repeat" => repeat(s, arg(args, 0)),
        "padStart" => pad(s, args, true),
        "padEnd" => pad(s, args, false),
        "concat" => concat(s, args),
        "toString" | "valueOf" => Ok(Value::String(s.to_string())),
        _ => Err(MethodError::NotAFunction),
    }
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// Search argument coerced to a string (`undefined` becomes "undefined")
fn search_arg(args: &[Value]) -> Vec<char> {
    chars(&arg(args, 0).to_js_string())
}

/// Clamp a position argument into `0..=len`, NaN and undefined as 0
fn clamp_position(value: &Value, len: usize) -> usize {
    let n = to_integer_or_infinity(value.to_number());
    n.max(0.0).min(len as f64) as usize
}

fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn slice(s: &str, args: &[Value]) -> String {
    let chars = chars(s);
    let len = chars.len();
    let from = relative_index(arg(args, 0), len, 0);
    let to = relative_index(arg(args, 1), len, len);
    if from >= to {
        return String::new();
    }
    chars[from..to].iter().collect()
}

fn substring(s: &str, args: &[Value]) -> String {
    let chars = chars(s);
    let len = chars.len();
    let start = clamp_position(arg(args, 0), len);
    let end = match arg(args, 1) {
        Value::Undefined => len,
        value => clamp_position(value, len),
    };
    let (from, to) = if start <= end { (start, end) } else { (end, start) };
    chars[from..to].iter().collect()
}

fn char_at(s: &str, position: &Value) -> Option<char> {
    let pos = to_integer_or_infinity(position.to_number());
    if pos < 0.0 {
        return None;
    }
    s.chars().nth(pos as usize)
}

fn index_of(s: &str, args: &[Value]) -> f64 {
    let haystack = chars(s);
    let needle = search_arg(args);
    let from = clamp_position(arg(args, 1), haystack.len());
    find_from(&haystack, &needle, from).map_or(-1.0, |i| i as f64)
}

fn last_index_of(s: &str, args: &[Value]) -> f64 {
    let haystack = chars(s);
    let needle = search_arg(args);
    let len = haystack.len();
    let from = match opt_number(args, 1) {
        Some(n) if !n.is_nan() => to_integer_or_infinity(n).max(0.0).min(len as f64) as usize,
        _ => len,
    };
    if needle.len() > len {
        return -1.0;
    }
    let start = from.min(len - needle.len());
    (0..=start)
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
        .map_or(-1.0, |i| i as f64)
}

fn split(s: &str, args: &[Value]) -> Value {
    let limit = match opt_number(args, 1) {
        Some(n) => {
            let n = to_integer_or_infinity(n);
            if n.is_finite() {
                n.rem_euclid(4_294_967_296.0) as usize
            } else {
                0
            }
        }
        None => usize::MAX,
    };
    if limit == 0 {
        return Value::array(vec![]);
    }

    let parts: Vec<Value> = match arg(args, 0) {
        Value::Undefined => vec![Value::from(s)],
        separator => {
            let separator = separator.to_js_string();
            if separator.is_empty() {
                s.chars().take(limit).map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator.as_str()).take(limit).map(Value::from).collect()
            }
        }
    };
    Value::array(parts)
}

fn replace(s: &str, args: &[Value]) -> String {
    let pattern = arg(args, 0).to_js_string();
    let replacement = arg(args, 1).to_js_string();
    let Some(pos) = s.find(pattern.as_str()) else {
        return s.to_string();
    };

    let before = &s[..pos];
    let after = &s[pos + pattern.len()..];

    // Substitution patterns: $$, $&, $` and $'
    let mut expanded = String::with_capacity(replacement.len());
    let mut rest = replacement.chars().peekable();
    while let Some(c) = rest.next() {
        if c != '$' {
            expanded.push(c);
            continue;
        }
        match rest.peek() {
            Some('$') => expanded.push('$'),
            Some('&') => expanded.push_str(&pattern),
            Some('`') => expanded.push_str(before),
            Some('\'') => expanded.push_str(after),
            _ => {
                expanded.push('$');
                continue;
            }
        }
        rest.next();
    }

    format!("{}{}{}", before, expanded, after)
}

fn starts_with(s: &str, args: &[Value]) -> bool {
    let haystack = chars(s);
    let needle = search_arg(args);
    let start = clamp_position(arg(args, 1), haystack.len());
    haystack[start..].starts_with(&needle)
}

fn ends_with(s: &str, args: &[Value]) -> bool {
    let haystack = chars(s);
    let needle = search_arg(args);
    let end = match arg(args, 1) {
        Value::Undefined => haystack.len(),
        value => clamp_position(value, haystack.len()),
    };
    haystack[..end].ends_with(&needle)
}

fn repeat(s: &str, count: &Value) -> MethodResult {
    let n = to_integer_or_infinity(count.to_number());
    if n < 0.0 || n.is_infinite() {
        return Err(MethodError::Failed(format!(
            "Invalid count value: {}",
            count.to_js_string()
        )));
    }
    let len = s.chars().count();
    if len as f64 * n > MAX_COLLECTION_SIZE as f64 {
        return Err(too_long());
    }
    Ok(Value::String(s.repeat(n as usize)))
}

fn pad(s: &str, args: &[Value], at_start: bool) -> MethodResult {
    let target = to_integer_or_infinity(arg(args, 0).to_number()).max(0.0);
    let len = s.chars().count();
    if target <= len as f64 {
        return Ok(Value::from(s));
    }
    let filler: Vec<char> = match arg(args, 1) {
        Value::Undefined => vec![' '],
        value => chars(&value.to_js_string()),
    };
    if filler.is_empty() {
        return Ok(Value::from(s));
    }
    if target > MAX_COLLECTION_SIZE as f64 {
        return Err(too_long());
    }

    let fill: String = filler.iter().cycle().take(target as usize - len).collect();
    let padded = if at_start {
        format!("{}{}", fill, s)
    } else {
        format!("{}{}", s, fill)
    };
    Ok(Value::String(padded))
}

fn concat(s: &str, args: &[Value]) -> MethodResult {
    let pieces: Vec<String> = args.iter().map(Value::to_js_string).collect();
    let total = s.chars().count() + pieces.iter().map(|p| p.chars().count()).sum::<usize>();
    if total > MAX_COLLECTION_SIZE {
        return Err(too_long());
    }
    let mut out = s.to_string();
    for piece in pieces {
        out.push_str(&piece);
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_str(s: &str, method: &str, args: &[Value]) -> Value {
        call(s, method, args).unwrap_or_else(|e| panic!("{} failed: {:?}", method, e))
    }

    #[test]
    fn test_slice_and_substring() {
        assert_eq!(call_str("hello world", "slice", &[Value::Number(-5.0)]), Value::from("world"));
        assert_eq!(call_str("hello", "slice", &[Value::Number(1.0), Value::Number(3.0)]), Value::from("el"));
        assert_eq!(call_str("hello", "slice", &[Value::Number(3.0), Value::Number(1.0)]), Value::from(""));
        assert_eq!(call_str("hello", "substring", &[Value::Number(3.0), Value::Number(1.0)]), Value::from("el"));
        assert_eq!(call_str("hello", "substring", &[Value::Number(-2.0)]), Value::from("hello"));
    }

    #[test]
    fn test_search_methods() {
        assert_eq!(call_str("banana", "indexOf", &[Value::from("an")]), Value::Number(1.0));
        assert_eq!(call_str("banana", "indexOf", &[Value::from("an"), Value::Number(2.0)]), Value::Number(3.0));
        assert_eq!(call_str("banana", "lastIndexOf", &[Value::from("an")]), Value::Number(3.0));
        assert_eq!(call_str("banana", "indexOf", &[Value::from("x")]), Value::Number(-1.0));
        assert_eq!(call_str("banana", "includes", &[Value::from("nan")]), Value::Bool(true));
        assert_eq!(call_str("banana", "startsWith", &[Value::from("ban")]), Value::Bool(true));
        assert_eq!(call_str("banana", "endsWith", &[Value::from("ban"), Value::Number(3.0)]), Value::Bool(true));
    }

    #[test]
    fn test_char_access_counts_characters() {
        assert_eq!(call_str("héllo", "charAt", &[Value::Number(1.0)]), Value::from("é"));
        assert_eq!(call_str("abc", "charAt", &[Value::Number(5.0)]), Value::from(""));
        assert_eq!(call_str("A", "charCodeAt", &[]), Value::Number(65.0));
        assert!(matches!(call_str("A", "charCodeAt", &[Value::Number(3.0)]), Value::Number(n) if n.is_nan()));
    }

    #[test]
    fn test_split() {
        let Value::Array(parts) = call_str("john@example.com", "split", &[Value::from("@")]) else {
            unreachable!("Expected array");
        };
        assert_eq!(parts.as_slice(), &[Value::from("john"), Value::from("example.com")]);

        let Value::Array(parts) = call_str("abc", "split", &[Value::from(""), Value::Number(2.0)]) else {
            unreachable!("Expected array");
        };
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_replace_first_occurrence_with_patterns() {
        assert_eq!(call_str("a-b-c", "replace", &[Value::from("-"), Value::from("+")]), Value::from("a+b-c"));
        assert_eq!(call_str("cost", "replace", &[Value::from("cost"), Value::from("$$&")]), Value::from("$&"));
        assert_eq!(call_str("ab", "replace", &[Value::from("b"), Value::from("[$&]")]), Value::from("a[b]"));
    }

    #[test]
    fn test_padding_and_repeat() {
        assert_eq!(call_str("5", "padStart", &[Value::Number(3.0), Value::from("0")]), Value::from("005"));
        assert_eq!(call_str("ab", "padEnd", &[Value::Number(5.0), Value::from("xy")]), Value::from("abxyx"));
        assert_eq!(call_str("ab", "repeat", &[Value::Number(3.0)]), Value::from("ababab"));
    }

    #[test]
    fn test_size_caps_fault_before_allocating() {
        assert!(matches!(call("a", "repeat", &[Value::Number(15000.0)]), Err(MethodError::Security(_))));
        assert!(matches!(
            call("a", "padStart", &[Value::Number(20000.0)]),
            Err(MethodError::Security(_))
        ));
        assert!(matches!(call("a", "repeat", &[Value::Number(-1.0)]), Err(MethodError::Failed(_))));
    }
}
