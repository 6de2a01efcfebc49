//! The engine's runtime value representation and dotted/indexed path access.
//!
//! Variables, captured values, request/response bodies, and assertion
//! operands all share one representation: `serde_json::Value`. Reusing it
//! rather than inventing a parallel `null|bool|int|float|string|array|object`
//! enum keeps every crate that touches a `Value` free to use `serde_json`'s
//! own traversal, (de)serialization, and comparison directly.

pub use serde_json::Value;

/// A single segment of a dotted/indexed path, e.g. `body.items.0.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn segments(path: &str) -> Vec<Segment<'_>> {
    path.split('.')
        .map(|part| match part.parse::<usize>() {
            Ok(idx) => Segment::Index(idx),
            Err(_) => Segment::Key(part),
        })
        .collect()
}

/// Resolve a dotted/indexed path against a `Value` tree.
///
/// `"count"` looks up a top-level key; `"items.0.name"` traverses an array
/// then an object. Returns `None` if any segment fails to resolve — callers
/// decide whether that's a warning, an empty string, or a hard error.
pub fn get_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for seg in segments(path) {
        current = match (seg, current) {
            (Segment::Key(k), Value::Object(map)) => map.get(k)?,
            (Segment::Index(i), Value::Array(arr)) => arr.get(i)?,
            // A numeric segment against an object is still a valid key
            // (e.g. suites sometimes capture numeric-looking field names).
            (Segment::Index(i), Value::Object(map)) => map.get(&i.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set a value at a dotted/indexed path, creating intermediate objects as
/// needed. Existing arrays are not auto-extended: indexing past the end of
/// an array is an error.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<(), String> {
    if path.is_empty() {
        *root = value;
        return Ok(());
    }
    let segs = segments(path);
    let mut current = root;
    for (i, seg) in segs.iter().enumerate() {
        let is_last = i == segs.len() - 1;
        match seg {
            Segment::Key(k) => {
                if !current.is_object() {
                    *current = Value::Object(Default::default());
                }
                let map = current.as_object_mut().unwrap();
                if is_last {
                    map.insert((*k).to_string(), value);
                    return Ok(());
                }
                current = map.entry((*k).to_string()).or_insert(Value::Null);
            }
            Segment::Index(idx) => {
                let arr = current
                    .as_array_mut()
                    .ok_or_else(|| format!("cannot index non-array at segment {idx}"))?;
                if *idx >= arr.len() {
                    return Err(format!("index {idx} out of bounds (len {})", arr.len()));
                }
                if is_last {
                    arr[*idx] = value;
                    return Ok(());
                }
                current = &mut arr[*idx];
            }
        }
    }
    Ok(())
}

/// The engine's type-name vocabulary for the `type` assertion rule.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_path_traverses_objects_and_arrays() {
        let v = json!({"items": [{"name": "a"}, {"name": "b"}], "count": 2});
        assert_eq!(get_path(&v, "count"), Some(&json!(2)));
        assert_eq!(get_path(&v, "items.1.name"), Some(&json!("b")));
        assert_eq!(get_path(&v, "items.5.name"), None);
        assert_eq!(get_path(&v, "missing"), None);
    }

    #[test]
    fn get_path_empty_returns_root() {
        let v = json!({"a": 1});
        assert_eq!(get_path(&v, ""), Some(&v));
    }

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut v = json!({});
        set_path(&mut v, "a.b.c", json!(42)).unwrap();
        assert_eq!(get_path(&v, "a.b.c"), Some(&json!(42)));
    }

    #[test]
    fn set_path_array_index_out_of_bounds_errors() {
        let mut v = json!({"items": [1, 2]});
        assert!(set_path(&mut v, "items.5", json!(9)).is_err());
    }

    #[test]
    fn type_name_covers_all_variants() {
        assert_eq!(type_name(&Value::Null), "null");
        assert_eq!(type_name(&json!(true)), "boolean");
        assert_eq!(type_name(&json!(1)), "number");
        assert_eq!(type_name(&json!("s")), "string");
        assert_eq!(type_name(&json!([1])), "array");
        assert_eq!(type_name(&json!({})), "object");
    }
}
