//! How authorization response parameters reach the client.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use oauth2_core::{OAuth2Error, OAuthResponse, Params, Transaction};

pub const QUERY: &str = "query";
pub const FRAGMENT: &str = "fragment";

/// Encodes response parameters onto the client's redirect.
pub trait ResponseMode: Send + Sync {
    /// Check the transaction can be answered in this mode at all.
    fn validate(&self, _txn: &Transaction) -> Result<(), OAuth2Error> {
        Ok(())
    }

    fn render(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        params: &Params,
    ) -> Result<(), OAuth2Error>;
}

/// Parameters in the query component of the redirect URI.
pub struct QueryMode;

/// Parameters in the fragment of the redirect URI.
pub struct FragmentMode;

impl ResponseMode for QueryMode {
    fn validate(&self, txn: &Transaction) -> Result<(), OAuth2Error> {
        redirect_uri(txn).map(|_| ())
    }

    fn render(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        params: &Params,
    ) -> Result<(), OAuth2Error> {
        let location = append_query(redirect_uri(txn)?, params);
        res.redirect(location);
        Ok(())
    }
}

impl ResponseMode for FragmentMode {
    fn validate(&self, txn: &Transaction) -> Result<(), OAuth2Error> {
        redirect_uri(txn).map(|_| ())
    }

    fn render(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        params: &Params,
    ) -> Result<(), OAuth2Error> {
        let location = replace_fragment(redirect_uri(txn)?, params);
        res.redirect(location);
        Ok(())
    }
}

struct ModeFn<F>(F);

impl<F> ResponseMode for ModeFn<F>
where
    F: Fn(&Transaction, &mut OAuthResponse, &Params) -> Result<(), OAuth2Error> + Send + Sync,
{
    fn render(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        params: &Params,
    ) -> Result<(), OAuth2Error> {
        (self.0)(txn, res, params)
    }
}

/// Wrap a closure as a custom response mode.
pub fn mode_fn<F>(f: F) -> Arc<dyn ResponseMode>
where
    F: Fn(&Transaction, &mut OAuthResponse, &Params) -> Result<(), OAuth2Error>
        + Send
        + Sync
        + 'static,
{
    Arc::new(ModeFn(f))
}

/// Named response modes. `query` and `fragment` are always present.
#[derive(Clone)]
pub struct ResponseModes {
    modes: HashMap<String, Arc<dyn ResponseMode>>,
}

impl Default for ResponseModes {
    fn default() -> Self {
        let mut modes: HashMap<String, Arc<dyn ResponseMode>> = HashMap::new();
        modes.insert(QUERY.to_string(), Arc::new(QueryMode));
        modes.insert(FRAGMENT.to_string(), Arc::new(FragmentMode));
        Self { modes }
    }
}

impl fmt::Debug for ResponseModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.modes.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ResponseModes").field("modes", &names).finish()
    }
}

impl ResponseModes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, mode: Arc<dyn ResponseMode>) -> Self {
        self.insert(name, mode);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, mode: Arc<dyn ResponseMode>) {
        self.modes.insert(name.into(), mode);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ResponseMode>> {
        self.modes.get(name).cloned()
    }

    /// The mode the request asked for, or `default` when it asked for none.
    pub fn select(
        &self,
        requested: Option<&str>,
        default: &str,
    ) -> Result<Arc<dyn ResponseMode>, OAuth2Error> {
        let name = requested.unwrap_or(default);
        self.get(name)
            .ok_or_else(|| OAuth2Error::unsupported_response_mode(name))
    }

    /// Validate and render in one step.
    pub fn respond(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        params: &Params,
        default: &str,
    ) -> Result<(), OAuth2Error> {
        let mode = self.select(txn.req.response_mode(), default)?;
        mode.validate(txn)?;
        mode.render(txn, res, params)
    }
}

/// Parameters describing `err` to the client, with the request's `state`.
pub fn error_params(err: &OAuth2Error, txn: &Transaction) -> Params {
    let mut params = Params::new();
    params.insert("error".into(), Value::from(err.code()));
    if let Some(description) = &err.error_description {
        params.insert("error_description".into(), Value::from(description.as_str()));
    }
    if let Some(uri) = &err.error_uri {
        params.insert("error_uri".into(), Value::from(uri.as_str()));
    }
    if let Some(state) = txn.req.state() {
        params.insert("state".into(), Value::from(state));
    }
    params
}

fn redirect_uri(txn: &Transaction) -> Result<&str, OAuth2Error> {
    txn.redirect_uri.as_deref().ok_or_else(|| {
        OAuth2Error::authorization(
            "Unable to issue redirect for OAuth 2.0 transaction",
            "server_error",
        )
    })
}

/// `application/x-www-form-urlencoded`-style serialization, `%20` for spaces.
/// `null` values are left out; arrays repeat the key.
pub fn encode_params(params: &Params) -> String {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    pairs.push(pair(key, item));
                }
            }
            other => pairs.push(pair(key, other)),
        }
    }
    pairs.join("&")
}

fn pair(key: &str, value: &Value) -> String {
    let value = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!("{}={}", urlencoding::encode(key), urlencoding::encode(&value))
}

/// Append to the query of `uri`, keeping any existing query and fragment.
pub fn append_query(uri: &str, params: &Params) -> String {
    let encoded = encode_params(params);
    if encoded.is_empty() {
        return uri.to_string();
    }
    let (base, fragment) = match uri.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (uri, None),
    };
    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };
    let mut location = format!("{}{}{}", base, separator, encoded);
    if let Some(fragment) = fragment {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

/// Replace the fragment of `uri` with the encoded parameters.
pub fn replace_fragment(uri: &str, params: &Params) -> String {
    let base = uri.split_once('#').map_or(uri, |(base, _)| base);
    format!("{}#{}", base, encode_params(params))
}
