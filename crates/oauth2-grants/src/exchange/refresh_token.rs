use serde_json::Value;
use std::future::Future;

use oauth2_core::{OAuth2Error, OAuthRequest, Params};
use oauth2_server::ExchangeModule;

use super::{client_of, issuing, ExchangeOptions, Issued};
use crate::params::{required_str, split_scope, Endpoint};

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenRequest {
    pub client: Option<Value>,
    pub refresh_token: String,
    /// Narrower scope requested for the new access token.
    pub scope: Option<Vec<String>>,
    pub body: Params,
}

fn parse(
    req: &OAuthRequest,
    body: &Params,
    options: &ExchangeOptions,
) -> Result<RefreshTokenRequest, OAuth2Error> {
    let refresh_token = required_str(Endpoint::Token, "refresh_token", body.get("refresh_token"))?;
    let scope = split_scope(Endpoint::Token, body.get("scope"), &options.scope_separators)?;
    Ok(RefreshTokenRequest {
        client: client_of(req, options),
        refresh_token: refresh_token.to_string(),
        scope,
        body: body.clone(),
    })
}

pub fn refresh_token<F, Fut>(issue: F) -> ExchangeModule
where
    F: Fn(RefreshTokenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    refresh_token_with(ExchangeOptions::default(), issue)
}

pub fn refresh_token_with<F, Fut>(options: ExchangeOptions, issue: F) -> ExchangeModule
where
    F: Fn(RefreshTokenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    issuing("refresh_token", options, parse, "Invalid refresh token", issue)
}
