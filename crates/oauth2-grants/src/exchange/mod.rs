//! Token endpoint exchanges, one per `grant_type`.

mod authorization_code;
mod client_credentials;
mod password;
mod refresh_token;

pub use authorization_code::{authorization_code, authorization_code_with, AuthorizationCodeRequest};
pub use client_credentials::{client_credentials, client_credentials_with, ClientCredentialsRequest};
pub use password::{password, password_with, PasswordRequest};
pub use refresh_token::{refresh_token, refresh_token_with, RefreshTokenRequest};

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

use oauth2_core::{merge_params, OAuth2Error, OAuthRequest, OAuthResponse, Params};
use oauth2_server::callbacks::CallbackFuture;
use oauth2_server::{Exchange, ExchangeHandler, ExchangeModule, Flow};

use crate::params::default_separators;

/// Tokens handed out by an issuing callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Issued {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Extra response fields such as `expires_in`.
    pub params: Params,
}

impl Issued {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// The token response body. `token_type` defaults to `Bearer`.
    pub fn to_params(&self) -> Params {
        let mut body = Params::new();
        body.insert("access_token".into(), json!(self.access_token));
        if let Some(refresh) = &self.refresh_token {
            body.insert("refresh_token".into(), json!(refresh));
        }
        merge_params(&mut body, self.params.clone());
        if !body.contains_key("token_type") {
            body.insert("token_type".into(), json!("Bearer"));
        }
        body
    }
}

/// Write a successful token response.
pub fn write_token(res: &mut OAuthResponse, issued: &Issued) -> Result<(), OAuth2Error> {
    res.send_json(200, &issued.to_params())?;
    res.set_header("Cache-Control", "no-store");
    res.set_header("Pragma", "no-cache");
    Ok(())
}

/// Settings shared by the bundled exchanges.
#[derive(Debug, Clone)]
pub struct ExchangeOptions {
    /// Where the authenticated client is found on the request.
    pub user_property: String,
    pub scope_separators: Vec<String>,
}

impl Default for ExchangeOptions {
    fn default() -> Self {
        Self {
            user_property: "user".to_string(),
            scope_separators: default_separators(),
        }
    }
}

type ParseFn<R> = fn(&OAuthRequest, &Params, &ExchangeOptions) -> Result<R, OAuth2Error>;
type IssueFn<R> = Arc<dyn Fn(R) -> CallbackFuture<Option<Issued>> + Send + Sync>;

/// Parses the token request, hands it to the host and writes what comes back.
struct IssuingExchange<R> {
    parse: ParseFn<R>,
    issue: IssueFn<R>,
    options: ExchangeOptions,
    refused: &'static str,
}

#[async_trait]
impl<R: Send + 'static> Exchange for IssuingExchange<R> {
    async fn exchange(
        &self,
        req: &OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error> {
        let body = req.body.as_ref().ok_or_else(|| {
            OAuth2Error::server("Token request body was not parsed by the host")
        })?;
        let request = (self.parse)(req, body, &self.options)?;
        let issued = (self.issue)(request)
            .await?
            .ok_or_else(|| OAuth2Error::invalid_grant(self.refused))?;
        write_token(res, &issued)?;
        Ok(Flow::Done)
    }
}

fn issuing<R, F, Fut>(
    name: &str,
    options: ExchangeOptions,
    parse: ParseFn<R>,
    refused: &'static str,
    issue: F,
) -> ExchangeModule
where
    R: Send + 'static,
    F: Fn(R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    let issue: IssueFn<R> = Arc::new(move |request| issue(request).boxed());
    ExchangeModule::new(
        name,
        ExchangeHandler::new(IssuingExchange {
            parse,
            issue,
            options,
            refused,
        }),
    )
}

fn client_of(req: &OAuthRequest, options: &ExchangeOptions) -> Option<Value> {
    req.principal(&options.user_property).cloned()
}
