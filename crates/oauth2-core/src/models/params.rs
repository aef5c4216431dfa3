use serde_json::{Map, Value};

/// Free-form, insertion-ordered parameter map.
pub type Params = Map<String, Value>;

/// Deep-merge `source` into `target`, last writer wins.
///
/// Nested objects merge recursively; any other value from `source` replaces
/// the one in `target`. `null` in `source` never overwrites.
pub fn merge_params(target: &mut Params, source: Params) {
    for (key, value) in source {
        match value {
            Value::Null => {}
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge_params(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Merge into an optional map, creating it when there is something to merge.
pub fn merge_into(target: &mut Option<Params>, source: Option<Params>) {
    if let Some(source) = source {
        merge_params(target.get_or_insert_with(Params::new), source);
    }
}

/// Truthiness of a loosely-typed form value.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn later_values_win_and_objects_merge() {
        let mut target = params(json!({ "a": 1, "nested": { "x": 1, "y": 1 } }));
        merge_params(
            &mut target,
            params(json!({ "a": 2, "b": 3, "nested": { "y": 2, "z": 2 } })),
        );
        assert_eq!(
            Value::Object(target),
            json!({ "a": 2, "nested": { "x": 1, "y": 2, "z": 2 }, "b": 3 })
        );
    }

    #[test]
    fn null_never_overwrites() {
        let mut target = params(json!({ "a": 1 }));
        merge_params(&mut target, params(json!({ "a": null })));
        assert_eq!(target["a"], json!(1));
    }

    #[test]
    fn merge_into_creates_lazily() {
        let mut locals = None;
        merge_into(&mut locals, None);
        assert!(locals.is_none());
        merge_into(&mut locals, Some(params(json!({ "service": "s1" }))));
        assert_eq!(locals.unwrap()["service"], json!("s1"));
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(is_truthy(Some(&json!("Deny"))));
        assert!(is_truthy(Some(&json!(true))));
    }
}
