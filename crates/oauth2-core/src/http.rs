//! Transport boundary.
//!
//! The toolkit never talks to a web framework directly. A host adapter
//! converts its inbound request into an [`OAuthRequest`], lets the toolkit
//! write into an [`OAuthResponse`], then calls [`OAuthResponse::finish`]
//! right before it sends the response on the wire.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::models::{OAuth2Error, Params, Transaction};

/// Inbound request as seen by the toolkit.
#[derive(Debug, Clone, Default)]
pub struct OAuthRequest {
    pub query: Params,
    /// Parsed body parameters, `None` when the body was not parsed.
    pub body: Option<Params>,
    /// Host session map, `None` when the host has no session support.
    pub session: Option<Params>,
    /// Authenticated principal.
    pub user: Option<Value>,
    /// Other request-scoped values the host wants to expose.
    pub attributes: Params,
    /// Transaction attached by the authorization flows.
    pub oauth2: Option<Transaction>,
}

impl OAuthRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: Params) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Params) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_session(mut self, session: Params) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.user = Some(user);
        self
    }

    /// Look a parameter up in the query string, then in the body.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.query
            .get(name)
            .or_else(|| self.body.as_ref().and_then(|b| b.get(name)))
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Value::as_str)
    }

    pub fn body_str(&self, name: &str) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.get(name))
            .and_then(Value::as_str)
    }

    /// The principal stored under `property`: `"user"` is the dedicated
    /// field, anything else is read from the attributes.
    pub fn principal(&self, property: &str) -> Option<&Value> {
        if property == "user" {
            self.user.as_ref()
        } else {
            self.attributes.get(property)
        }
    }
}

/// Runs once, after the response has been written and before it is sent.
#[async_trait]
pub trait FinishHook: Send + Sync {
    /// Identifies the hook for [`OAuthResponse::has_finish_hook`].
    fn key(&self) -> Option<&str> {
        None
    }

    async fn on_finish(self: Box<Self>, req: &mut OAuthRequest) -> Result<(), OAuth2Error>;
}

/// Outbound response sink.
pub struct OAuthResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<String>,
    written: bool,
    finished: bool,
    /// Side-channel data the host wants merged into the transaction.
    pub locals: Option<Params>,
    hooks: Vec<Box<dyn FinishHook>>,
}

impl Default for OAuthResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuthResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: None,
            written: false,
            finished: false,
            locals: None,
            hooks: Vec::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any previous value under the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 302 to `location`.
    pub fn redirect(&mut self, location: impl Into<String>) {
        self.status = 302;
        self.set_header("Location", location);
        self.written = true;
    }

    pub fn send_json<T: Serialize>(&mut self, status: u16, body: &T) -> Result<(), OAuth2Error> {
        let body = serde_json::to_string(body)?;
        self.status = status;
        self.set_header("Content-Type", "application/json");
        self.body = Some(body);
        self.written = true;
        Ok(())
    }

    pub fn send_text(&mut self, status: u16, body: impl Into<String>) {
        self.status = status;
        self.body = Some(body.into());
        self.written = true;
    }

    /// Install a hook. Existing hooks are kept and run first.
    pub fn add_finish_hook(&mut self, hook: Box<dyn FinishHook>) {
        self.hooks.push(hook);
    }

    pub fn has_finish_hook(&self, key: &str) -> bool {
        self.hooks.iter().any(|h| h.key() == Some(key))
    }

    /// Run the finish hooks.
    ///
    /// The transport calls this right before sending. Hooks only run when a
    /// response was actually written, and never more than once. A failing hook
    /// does not stop the rest; the first failure is returned.
    pub async fn finish(&mut self, req: &mut OAuthRequest) -> Result<(), OAuth2Error> {
        if self.finished || !self.written {
            return Ok(());
        }
        self.finished = true;
        let mut first_err = None;
        for hook in std::mem::take(&mut self.hooks) {
            if let Err(err) = hook.on_finish(req).await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for OAuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("written", &self.written)
            .field("finished", &self.finished)
            .field("locals", &self.locals)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Count {
        key: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FinishHook for Count {
        fn key(&self) -> Option<&str> {
            self.key
        }

        async fn on_finish(self: Box<Self>, req: &mut OAuthRequest) -> Result<(), OAuth2Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            req.attributes.insert("finished".into(), json!(true));
            Ok(())
        }
    }

    struct Failing(&'static str);

    #[async_trait]
    impl FinishHook for Failing {
        async fn on_finish(self: Box<Self>, _req: &mut OAuthRequest) -> Result<(), OAuth2Error> {
            Err(OAuth2Error::server(self.0))
        }
    }

    #[test]
    fn param_prefers_query_over_body() {
        let mut query = Params::new();
        query.insert("transaction_id".into(), json!("q"));
        let mut body = Params::new();
        body.insert("transaction_id".into(), json!("b"));
        body.insert("cancel".into(), json!("Deny"));

        let req = OAuthRequest::new().with_query(query).with_body(body);
        assert_eq!(req.param_str("transaction_id"), Some("q"));
        assert_eq!(req.param_str("cancel"), Some("Deny"));
        assert_eq!(req.param_str("missing"), None);
    }

    #[test]
    fn principal_reads_user_or_attribute() {
        let mut req = OAuthRequest::new().with_user(json!({ "id": "u1" }));
        req.attributes.insert("account".into(), json!({ "id": "a1" }));
        assert_eq!(req.principal("user").unwrap()["id"], json!("u1"));
        assert_eq!(req.principal("account").unwrap()["id"], json!("a1"));
        assert!(req.principal("other").is_none());
    }

    #[test]
    fn headers_are_case_insensitive() {
        let mut res = OAuthResponse::new();
        res.set_header("content-type", "text/plain");
        res.set_header("Content-Type", "application/json");
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[tokio::test]
    async fn hooks_run_once_and_only_after_a_write() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut req = OAuthRequest::new();
        let mut res = OAuthResponse::new();
        res.add_finish_hook(Box::new(Count { key: None, calls: calls.clone() }));
        res.add_finish_hook(Box::new(Count { key: Some("k"), calls: calls.clone() }));

        res.finish(&mut req).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        res.redirect("https://cb");
        res.finish(&mut req).await.unwrap();
        res.finish(&mut req).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(req.attributes["finished"], json!(true));
        assert!(res.is_finished());
    }

    #[tokio::test]
    async fn hooks_survive_until_a_later_write() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut req = OAuthRequest::new();
        let mut res = OAuthResponse::new();
        res.add_finish_hook(Box::new(Count { key: Some("k"), calls: calls.clone() }));
        assert!(res.has_finish_hook("k"));
        assert!(!res.has_finish_hook("other"));

        res.finish(&mut req).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        res.send_json(200, &json!({ "ok": true })).unwrap();
        res.finish(&mut req).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(res.body(), Some(r#"{"ok":true}"#));
    }

    #[tokio::test]
    async fn a_failing_hook_does_not_skip_the_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut req = OAuthRequest::new();
        let mut res = OAuthResponse::new();
        res.add_finish_hook(Box::new(Failing("first")));
        res.add_finish_hook(Box::new(Count { key: None, calls: calls.clone() }));
        res.add_finish_hook(Box::new(Failing("second")));

        res.redirect("https://cb");
        let err = res.finish(&mut req).await.unwrap_err();
        assert_eq!(err.message(), "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(res.finish(&mut req).await.is_ok());
    }
}
