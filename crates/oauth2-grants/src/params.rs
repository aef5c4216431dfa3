//! Request parameter validation shared by grants and exchanges.

use serde_json::Value;

use oauth2_core::OAuth2Error;

/// Which endpoint a malformed parameter is reported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Authorization,
    Token,
}

impl Endpoint {
    pub fn invalid_request(self, description: &str) -> OAuth2Error {
        match self {
            Endpoint::Authorization => OAuth2Error::invalid_request(description),
            Endpoint::Token => OAuth2Error::token(description, "invalid_request"),
        }
    }
}

/// A parameter that must be a string when present.
pub fn optional_str<'a>(
    endpoint: Endpoint,
    name: &str,
    value: Option<&'a Value>,
) -> Result<Option<&'a str>, OAuth2Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(endpoint.invalid_request(&format!(
            "Invalid parameter: {} must be a string",
            name
        ))),
    }
}

/// A non-empty string parameter.
pub fn required_str<'a>(
    endpoint: Endpoint,
    name: &str,
    value: Option<&'a Value>,
) -> Result<&'a str, OAuth2Error> {
    optional_str(endpoint, name, value)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            endpoint.invalid_request(&format!("Missing required parameter: {}", name))
        })
}

/// Split a scope string on any of `separators`, dropping empty entries.
pub fn split_scope(
    endpoint: Endpoint,
    value: Option<&Value>,
    separators: &[String],
) -> Result<Option<Vec<String>>, OAuth2Error> {
    let Some(scope) = optional_str(endpoint, "scope", value)? else {
        return Ok(None);
    };
    let scope = scope
        .split(|c: char| separators.iter().any(|sep| sep.contains(c)))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some(scope))
}

pub(crate) fn default_separators() -> Vec<String> {
    vec![" ".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2_core::ErrorKind;
    use serde_json::json;

    #[test]
    fn scope_splits_on_every_separator() {
        let seps = vec![" ".to_string(), ",".to_string()];
        let value = json!("read,write profile");
        let scope = split_scope(Endpoint::Authorization, Some(&value), &seps).unwrap();
        assert_eq!(scope.unwrap(), vec!["read", "write", "profile"]);

        let value = json!("read write");
        let scope = split_scope(Endpoint::Authorization, Some(&value), &default_separators());
        assert_eq!(scope.unwrap().unwrap(), vec!["read", "write"]);
    }

    #[test]
    fn non_string_scope_is_rejected_per_endpoint() {
        let value = json!(["read"]);
        let err = split_scope(Endpoint::Authorization, Some(&value), &default_separators())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.message(), "Invalid parameter: scope must be a string");

        let err = split_scope(Endpoint::Token, Some(&value), &default_separators()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Token);
        assert_eq!(err.code(), "invalid_request");
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn missing_and_empty_required_values() {
        let err = required_str(Endpoint::Token, "code", None).unwrap_err();
        assert_eq!(err.message(), "Missing required parameter: code");
        let empty = json!("");
        assert!(required_str(Endpoint::Token, "code", Some(&empty)).is_err());
        let ok = json!("abc");
        assert_eq!(required_str(Endpoint::Token, "code", Some(&ok)).unwrap(), "abc");
    }
}
