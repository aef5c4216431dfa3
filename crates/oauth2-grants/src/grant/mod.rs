//! Authorization endpoint grants, one per `response_type`.

mod code;
mod token;

pub use code::{code, code_with, IssueCodeFn};
pub use token::{token, token_with, IssueTokenFn};

use async_trait::async_trait;
use serde_json::{json, Value};

use oauth2_core::{
    AuthorizationRequest, AuthorizationResponse, OAuth2Error, OAuthRequest, OAuthResponse,
    Params, Transaction,
};
use oauth2_server::{error_params, Flow, RespondError, ResponseModes};

use crate::params::{default_separators, optional_str, required_str, split_scope, Endpoint};

/// Settings shared by the bundled grants.
#[derive(Debug, Clone)]
pub struct GrantOptions {
    /// Any character of any entry splits the `scope` parameter.
    pub scope_separators: Vec<String>,
    /// Extra response modes on top of `query` and `fragment`.
    pub modes: ResponseModes,
}

impl Default for GrantOptions {
    fn default() -> Self {
        Self {
            scope_separators: default_separators(),
            modes: ResponseModes::default(),
        }
    }
}

/// Everything an issuing callback may need about the decided transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueContext {
    pub client: Option<Value>,
    pub redirect_uri: Option<String>,
    pub user: Option<Value>,
    pub res: AuthorizationResponse,
    pub req: AuthorizationRequest,
    pub locals: Option<Params>,
}

impl IssueContext {
    fn from_transaction(txn: &Transaction) -> Result<Self, OAuth2Error> {
        let res = txn
            .res()
            .cloned()
            .ok_or_else(|| OAuth2Error::server("OAuth 2.0 transaction has not been decided"))?;
        Ok(Self {
            client: txn.client.clone(),
            redirect_uri: txn.redirect_uri.clone(),
            user: txn.user.clone(),
            res,
            req: txn.req.clone(),
            locals: txn.locals.clone(),
        })
    }
}

/// Fields every redirect-based grant reads off the authorization request.
fn parse_request(req: &OAuthRequest, separators: &[String]) -> Result<Params, OAuth2Error> {
    let endpoint = Endpoint::Authorization;
    let client_id = required_str(endpoint, "client_id", req.param("client_id"))?;
    let redirect_uri = optional_str(endpoint, "redirect_uri", req.param("redirect_uri"))?;
    let scope = split_scope(endpoint, req.param("scope"), separators)?;
    let state = optional_str(endpoint, "state", req.param("state"))?;
    let response_mode = optional_str(endpoint, "response_mode", req.param("response_mode"))?;

    let mut fields = Params::new();
    fields.insert("client_id".into(), json!(client_id));
    if let Some(uri) = redirect_uri {
        fields.insert("redirect_uri".into(), json!(uri));
    }
    if let Some(scope) = scope {
        fields.insert("scope".into(), json!(scope));
    }
    if let Some(state) = state {
        fields.insert("state".into(), json!(state));
    }
    if let Some(mode) = response_mode {
        fields.insert("response_mode".into(), json!(mode));
    }
    Ok(fields)
}

/// `error=access_denied` plus the request's `state`.
fn denied_params(txn: &Transaction) -> Params {
    let mut params = Params::new();
    params.insert("error".into(), json!("access_denied"));
    if let Some(state) = txn.req.state() {
        params.insert("state".into(), json!(state));
    }
    params
}

fn with_state(mut params: Params, txn: &Transaction) -> Params {
    if let Some(state) = txn.req.state() {
        params.insert("state".into(), json!(state));
    }
    params
}

fn not_issued() -> OAuth2Error {
    OAuth2Error::access_denied("Request denied by authorization server")
}

/// Sends protocol errors back to the client through the grant's response
/// mode. Errors that cannot be redirected are passed on unchanged.
struct RedirectErrors {
    modes: ResponseModes,
    default_mode: &'static str,
}

#[async_trait]
impl RespondError for RedirectErrors {
    async fn respond_error(
        &self,
        err: &OAuth2Error,
        txn: &Transaction,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error> {
        if txn.redirect_uri.is_none() {
            return Ok(Flow::Next);
        }
        let Ok(mode) = self.modes.select(txn.req.response_mode(), self.default_mode) else {
            return Ok(Flow::Next);
        };
        if mode.validate(txn).is_err() {
            return Ok(Flow::Next);
        }
        mode.render(txn, res, &error_params(err, txn))?;
        Ok(Flow::Done)
    }
}
