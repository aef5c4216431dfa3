//! In-memory clients and codes backing the demo application.
//!
//! Nothing here is meant for production; it exists so the authorize, decision
//! and token endpoints can be exercised end to end.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use oauth2_core::{ChainOutcome, OAuth2Error, Params};
use oauth2_grants::{
    authorization_code, client_credentials, code, token, AuthorizationCodeRequest,
    ClientCredentialsRequest, ExchangeKind, GrantKind, IssueContext, Issued, PluginRegistry,
};
use oauth2_server::{Server, Validate, Validated};

/// Grants installed by [`Demo::install`] when run from the binary.
pub const DEMO_GRANTS: [&str; 2] = ["code", "implicit"];
pub const DEMO_EXCHANGES: [&str; 2] = ["authorization_code", "client_credentials"];

const TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoClient {
    pub id: String,
    pub secret: String,
    pub name: String,
    pub redirect_uris: Vec<String>,
}

impl DemoClient {
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        name: impl Into<String>,
        redirect_uris: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            name: name.into(),
            redirect_uris,
        }
    }

    /// The client as seen by grants and exchanges. The secret stays behind.
    pub fn to_value(&self) -> Value {
        json!({ "id": self.id, "name": self.name })
    }
}

/// Registered clients, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ClientDirectory {
    clients: Arc<HashMap<String, DemoClient>>,
}

impl ClientDirectory {
    pub fn new(clients: Vec<DemoClient>) -> Self {
        Self {
            clients: Arc::new(clients.into_iter().map(|c| (c.id.clone(), c)).collect()),
        }
    }

    pub fn demo() -> Self {
        Self::new(vec![DemoClient::new(
            "demo-client",
            "demo-secret",
            "Demo Client",
            vec!["http://localhost:3000/callback".to_string()],
        )])
    }

    pub fn get(&self, id: &str) -> Option<&DemoClient> {
        self.clients.get(id)
    }

    pub fn authenticate(&self, id: &str, secret: &str) -> Option<&DemoClient> {
        self.get(id).filter(|c| c.secret == secret)
    }

    /// Accept registered clients whose redirect URI is on file. Without a
    /// redirect URI the first registered one is used.
    pub fn validator(&self) -> Validate {
        let clients = self.clone();
        Validate::client(move |client_id, redirect_uri| {
            let clients = clients.clone();
            async move {
                let Some(client) = client_id.as_deref().and_then(|id| clients.get(id)) else {
                    tracing::info!(client_id = client_id.as_deref().unwrap_or_default(), "unknown client");
                    return Ok(Validated::unauthorized(None));
                };
                let uri = match redirect_uri {
                    Some(uri) if client.redirect_uris.contains(&uri) => uri,
                    Some(_) => return Err(OAuth2Error::invalid_request("Invalid redirect_uri")),
                    None => client.redirect_uris.first().cloned().ok_or_else(|| {
                        OAuth2Error::invalid_request("Client has no registered redirect_uri")
                    })?,
                };
                Ok(Validated::client(client.to_value(), uri))
            }
        })
    }

    /// Keep only the client id in the transaction store and look the client
    /// up again on load. Removed clients load as deauthorized.
    pub fn install_serializers(&self, server: &mut Server) {
        server.serialize_client(|client: &Value| match client.get("id") {
            Some(id) => ChainOutcome::Matched(id.clone()),
            None => ChainOutcome::Skip,
        });
        let clients = self.clone();
        server.deserialize_client(move |stored: &Value| match stored.as_str() {
            Some(id) => ChainOutcome::Matched(clients.get(id).map(DemoClient::to_value)),
            None => ChainOutcome::Skip,
        });
    }
}

/// An issued, not yet exchanged, authorization code.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantedCode {
    pub client_id: String,
    pub redirect_uri: Option<String>,
    pub user: Option<Value>,
    pub scope: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct CodeBook {
    codes: Arc<Mutex<HashMap<String, GrantedCode>>>,
}

impl CodeBook {
    pub async fn insert(&self, code: String, granted: GrantedCode) {
        self.codes.lock().await.insert(code, granted);
    }

    /// Codes are single use.
    pub async fn take(&self, code: &str) -> Option<GrantedCode> {
        self.codes.lock().await.remove(code)
    }

    pub async fn len(&self) -> usize {
        self.codes.lock().await.len()
    }
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn token_params(scope: Option<&[String]>) -> Params {
    let mut params = Params::new();
    params.insert("expires_in".into(), json!(TOKEN_LIFETIME_SECS));
    if let Some(scope) = scope.filter(|s| !s.is_empty()) {
        params.insert("scope".into(), json!(scope.join(" ")));
    }
    params
}

fn client_id_of(client: Option<&Value>) -> Option<String> {
    client
        .and_then(|c| c.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Issuing callbacks for the bundled plugins.
#[derive(Debug, Clone, Default)]
pub struct Demo {
    pub clients: ClientDirectory,
    pub codes: CodeBook,
}

impl Demo {
    pub fn new(clients: ClientDirectory) -> Self {
        Self {
            clients,
            codes: CodeBook::default(),
        }
    }

    /// Register the named grants and exchanges, resolving aliases.
    pub fn install(
        &self,
        server: &mut Server,
        grants: &[&str],
        exchanges: &[&str],
    ) -> Result<(), OAuth2Error> {
        let registry = PluginRegistry::new();
        for name in grants {
            let kind = registry
                .grant(name)
                .ok_or_else(|| OAuth2Error::server(&format!("Unknown grant: {}", name)))?;
            match kind {
                GrantKind::Code => server.grant_module(self.code_grant()),
                GrantKind::Token => server.grant_module(self.token_grant()),
            };
            tracing::debug!(grant = *name, response_type = kind.response_type(), "grant installed");
        }
        for name in exchanges {
            let kind = registry
                .exchange(name)
                .ok_or_else(|| OAuth2Error::server(&format!("Unknown exchange: {}", name)))?;
            match kind {
                ExchangeKind::AuthorizationCode => server.exchange_module(self.code_exchange()),
                ExchangeKind::ClientCredentials => {
                    server.exchange_module(client_credentials(issue_client_credentials))
                }
                ExchangeKind::Password | ExchangeKind::RefreshToken => {
                    return Err(OAuth2Error::server(&format!(
                        "Exchange not available in the demo: {}",
                        name
                    )));
                }
            };
            tracing::debug!(exchange = *name, grant_type = kind.grant_type(), "exchange installed");
        }
        Ok(())
    }

    fn code_grant(&self) -> oauth2_server::GrantModule {
        let codes = self.codes.clone();
        code(move |cx: IssueContext| {
            let codes = codes.clone();
            async move {
                let Some(client_id) = client_id_of(cx.client.as_ref()) else {
                    return Ok(None);
                };
                let issued = new_token();
                let scope = cx.res.scope().or_else(|| cx.req.scope());
                codes
                    .insert(
                        issued.clone(),
                        GrantedCode {
                            client_id,
                            redirect_uri: cx.redirect_uri,
                            user: cx.user,
                            scope,
                        },
                    )
                    .await;
                Ok(Some(issued))
            }
        })
    }

    fn token_grant(&self) -> oauth2_server::GrantModule {
        token(|cx: IssueContext| async move {
            if cx.client.is_none() {
                return Ok(None);
            }
            let scope = cx.res.scope().or_else(|| cx.req.scope());
            Ok(Some(
                Issued::new(new_token()).with_params(token_params(scope.as_deref())),
            ))
        })
    }

    fn code_exchange(&self) -> oauth2_server::ExchangeModule {
        let codes = self.codes.clone();
        authorization_code(move |request: AuthorizationCodeRequest| {
            let codes = codes.clone();
            async move {
                let Some(granted) = codes.take(&request.code).await else {
                    return Ok(None);
                };
                if client_id_of(request.client.as_ref()).as_deref() != Some(granted.client_id.as_str()) {
                    tracing::warn!("authorization code presented by another client");
                    return Ok(None);
                }
                if request.redirect_uri.is_some() && request.redirect_uri != granted.redirect_uri {
                    return Ok(None);
                }
                Ok(Some(
                    Issued::new(new_token())
                        .with_refresh_token(new_token())
                        .with_params(token_params(granted.scope.as_deref())),
                ))
            }
        })
    }
}

async fn issue_client_credentials(
    request: ClientCredentialsRequest,
) -> Result<Option<Issued>, OAuth2Error> {
    if request.client.is_none() {
        return Ok(None);
    }
    Ok(Some(
        Issued::new(new_token()).with_params(token_params(request.scope.as_deref())),
    ))
}
