use serde_json::Value;
use std::future::Future;

use oauth2_core::{OAuth2Error, OAuthRequest, Params};
use oauth2_server::ExchangeModule;

use super::{client_of, issuing, ExchangeOptions, Issued};
use crate::params::{split_scope, Endpoint};

/// A client asking for a token on its own behalf.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCredentialsRequest {
    pub client: Option<Value>,
    pub scope: Option<Vec<String>>,
    pub body: Params,
}

fn parse(
    req: &OAuthRequest,
    body: &Params,
    options: &ExchangeOptions,
) -> Result<ClientCredentialsRequest, OAuth2Error> {
    let scope = split_scope(Endpoint::Token, body.get("scope"), &options.scope_separators)?;
    Ok(ClientCredentialsRequest {
        client: client_of(req, options),
        scope,
        body: body.clone(),
    })
}

pub fn client_credentials<F, Fut>(issue: F) -> ExchangeModule
where
    F: Fn(ClientCredentialsRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    client_credentials_with(ExchangeOptions::default(), issue)
}

pub fn client_credentials_with<F, Fut>(options: ExchangeOptions, issue: F) -> ExchangeModule
where
    F: Fn(ClientCredentialsRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    issuing(
        "client_credentials",
        options,
        parse,
        "Invalid client credentials",
        issue,
    )
}
