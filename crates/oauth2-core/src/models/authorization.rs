use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::{merge_params, Params};
use super::type_set::TypeSet;

/// The accumulated authorization request ("areq").
///
/// Every parser whose type matches contributes fields; contributions are
/// deep-merged. The requested `type` is fixed at construction and can never
/// be replaced by a parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    #[serde(rename = "type")]
    response_type: TypeSet,
    #[serde(flatten)]
    fields: Params,
}

impl AuthorizationRequest {
    pub const TYPE_FIELD: &'static str = "type";

    pub fn new(response_type: TypeSet) -> Self {
        Self {
            response_type,
            fields: Params::new(),
        }
    }

    pub fn response_type(&self) -> &TypeSet {
        &self.response_type
    }

    pub fn fields(&self) -> &Params {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Merge a parser's partial result. A `type` key is ignored.
    pub fn merge(&mut self, mut partial: Params) {
        partial.remove(Self::TYPE_FIELD);
        merge_params(&mut self.fields, partial);
    }

    /// Deliberately set a field, replacing whatever was there.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if key != Self::TYPE_FIELD {
            self.fields.insert(key, value);
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        self.get_str("client_id")
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.get_str("redirect_uri")
    }

    pub fn state(&self) -> Option<&str> {
        self.get_str("state")
    }

    pub fn response_mode(&self) -> Option<&str> {
        self.get_str("response_mode")
    }

    /// Requested scope, whether stored as a list or a space-delimited string.
    pub fn scope(&self) -> Option<Vec<String>> {
        scope_of(self.fields.get("scope"))
    }
}

/// The resource owner's decision ("ares").
///
/// `allow` is always set; everything else is grant-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub allow: bool,
    #[serde(flatten)]
    pub fields: Params,
}

impl AuthorizationResponse {
    pub fn allow() -> Self {
        Self::with_fields(true, Params::new())
    }

    pub fn deny() -> Self {
        Self::with_fields(false, Params::new())
    }

    pub fn with_fields(allow: bool, mut fields: Params) -> Self {
        fields.remove("allow");
        Self { allow, fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn scope(&self) -> Option<Vec<String>> {
        scope_of(self.fields.get("scope"))
    }
}

fn scope_of(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::String(s) => Some(s.split_whitespace().map(str::to_string).collect()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_never_replaces_type() {
        let mut areq = AuthorizationRequest::new(TypeSet::parse("code"));
        let partial = json!({ "type": "token", "client_id": "c123" });
        areq.merge(partial.as_object().cloned().unwrap());
        areq.insert("type", json!("token"));

        assert_eq!(areq.response_type().to_string(), "code");
        assert_eq!(areq.client_id(), Some("c123"));
    }

    #[test]
    fn scope_accepts_list_or_string() {
        let mut areq = AuthorizationRequest::new(TypeSet::parse("code"));
        areq.insert("scope", json!("read write"));
        assert_eq!(areq.scope().unwrap(), vec!["read", "write"]);
        areq.insert("scope", json!(["email"]));
        assert_eq!(areq.scope().unwrap(), vec!["email"]);
    }

    #[test]
    fn response_roundtrips_with_flattened_fields() {
        let mut fields = Params::new();
        fields.insert("scope".into(), json!("no-email"));
        fields.insert("allow".into(), json!(false));
        let ares = AuthorizationResponse::with_fields(true, fields);
        assert!(ares.allow);
        assert!(ares.get("allow").is_none());

        let json = serde_json::to_value(&ares).unwrap();
        assert_eq!(json, json!({ "allow": true, "scope": "no-email" }));
    }
}
