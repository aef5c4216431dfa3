use serde::{Deserialize, Serialize};

/// How transactions are located and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Request parameter carrying the transaction id.
    pub transaction_field: String,
    /// Session key under which the session store keeps transactions.
    pub session_key: String,
    /// Random bytes per generated id (hex encoded, so ids are twice as long).
    pub id_length: usize,
    /// Request property holding the authenticated principal.
    pub user_property: String,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            transaction_field: "transaction_id".to_string(),
            session_key: "authorize".to_string(),
            id_length: 8,
            user_property: "user".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionOptions {
    /// Body field whose presence means the resource owner denied access.
    pub cancel_field: String,
}

impl Default for DecisionOptions {
    fn default() -> Self {
        Self {
            cancel_field: "cancel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// JSON body with the error status.
    #[default]
    Direct,
    /// Redirect back to the client.
    Indirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlerOptions {
    pub mode: ErrorMode,
    /// Response types whose errors go in the URI fragment.
    pub fragment: Vec<String>,
}

impl Default for ErrorHandlerOptions {
    fn default() -> Self {
        Self {
            mode: ErrorMode::Direct,
            fragment: vec!["token".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let txn = TransactionOptions::default();
        assert_eq!(txn.transaction_field, "transaction_id");
        assert_eq!(txn.session_key, "authorize");
        assert_eq!(txn.id_length, 8);
        assert_eq!(DecisionOptions::default().cancel_field, "cancel");
        assert_eq!(ErrorHandlerOptions::default().fragment, vec!["token"]);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let opts: ErrorHandlerOptions = serde_json::from_str(r#"{"mode":"indirect"}"#).unwrap();
        assert_eq!(opts.mode, ErrorMode::Indirect);
        assert_eq!(opts.fragment, vec!["token"]);
    }
}
