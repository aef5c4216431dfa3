use serde_json::Value;
use std::future::Future;

use oauth2_core::{OAuth2Error, OAuthRequest, Params};
use oauth2_server::ExchangeModule;

use super::{client_of, issuing, ExchangeOptions, Issued};
use crate::params::{optional_str, required_str, Endpoint};

/// An authorization code presented at the token endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationCodeRequest {
    pub client: Option<Value>,
    pub code: String,
    /// Must match the URI the code was issued for, when one was sent.
    pub redirect_uri: Option<String>,
    pub body: Params,
}

fn parse(
    req: &OAuthRequest,
    body: &Params,
    options: &ExchangeOptions,
) -> Result<AuthorizationCodeRequest, OAuth2Error> {
    let code = required_str(Endpoint::Token, "code", body.get("code"))?;
    let redirect_uri = optional_str(Endpoint::Token, "redirect_uri", body.get("redirect_uri"))?;
    Ok(AuthorizationCodeRequest {
        client: client_of(req, options),
        code: code.to_string(),
        redirect_uri: redirect_uri.map(str::to_string),
        body: body.clone(),
    })
}

/// Exchanges an authorization code for an access token.
pub fn authorization_code<F, Fut>(issue: F) -> ExchangeModule
where
    F: Fn(AuthorizationCodeRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    authorization_code_with(ExchangeOptions::default(), issue)
}

pub fn authorization_code_with<F, Fut>(options: ExchangeOptions, issue: F) -> ExchangeModule
where
    F: Fn(AuthorizationCodeRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    issuing(
        "authorization_code",
        options,
        parse,
        "Invalid authorization code",
        issue,
    )
}
