use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::authorization::{AuthorizationRequest, AuthorizationResponse};
use super::error::OAuth2Error;
use super::params::{merge_into, Params};

/// Where a transaction is in its round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TransactionPhase {
    /// Request fields parsed, no client yet.
    #[default]
    Parsed,
    ClientValidated,
    /// Stored and waiting for the resource owner.
    Persisted,
    /// `res` has been populated.
    Decided,
    Responded,
}

/// Persisted state of one authorization request across the consent round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transactionID", skip_serializing_if = "Option::is_none", default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub client: Option<Value>,
    #[serde(rename = "redirectURI", skip_serializing_if = "Option::is_none", default)]
    pub redirect_uri: Option<String>,
    #[serde(rename = "webOrigin", skip_serializing_if = "Option::is_none", default)]
    pub web_origin: Option<String>,
    pub req: AuthorizationRequest,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    res: Option<AuthorizationResponse>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub info: Option<Params>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub locals: Option<Params>,
    #[serde(skip)]
    phase: TransactionPhase,
    #[serde(skip)]
    removal_scheduled: bool,
}

impl Transaction {
    pub fn new(req: AuthorizationRequest) -> Self {
        Self {
            transaction_id: None,
            client: None,
            redirect_uri: None,
            web_origin: None,
            req,
            user: None,
            res: None,
            info: None,
            locals: None,
            phase: TransactionPhase::Parsed,
            removal_scheduled: false,
        }
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    pub fn res(&self) -> Option<&AuthorizationResponse> {
        self.res.as_ref()
    }

    /// Record the outcome of client validation.
    pub fn validated(
        &mut self,
        client: Option<Value>,
        redirect_uri: Option<String>,
        web_origin: Option<String>,
    ) {
        self.client = client;
        self.redirect_uri = redirect_uri;
        self.web_origin = web_origin;
        self.phase = TransactionPhase::ClientValidated;
    }

    /// Mark the transaction as stored (or loaded) under `id`.
    pub fn persisted(&mut self, id: impl Into<String>) {
        self.transaction_id = Some(id.into());
        if self.phase < TransactionPhase::Persisted {
            self.phase = TransactionPhase::Persisted;
        }
    }

    /// Attach the resource owner's decision. A transaction is decided once.
    pub fn decide(&mut self, res: AuthorizationResponse) -> Result<(), OAuth2Error> {
        if self.res.is_some() {
            return Err(OAuth2Error::server(
                "OAuth 2.0 transaction has already been decided",
            ));
        }
        self.res = Some(res);
        self.phase = TransactionPhase::Decided;
        Ok(())
    }

    pub fn responded(&mut self) {
        self.phase = TransactionPhase::Responded;
    }

    /// Replace the deferred-decision info. `None` clears it.
    pub fn set_info(&mut self, info: Option<Params>) {
        self.info = info;
    }

    /// Merge side-channel data, last writer wins.
    pub fn merge_locals(&mut self, locals: Option<Params>) {
        merge_into(&mut self.locals, locals);
    }

    /// Flag the transaction for removal once the response is written.
    ///
    /// Returns `false` if removal was already scheduled.
    pub fn schedule_removal(&mut self) -> bool {
        if self.removal_scheduled {
            return false;
        }
        self.removal_scheduled = true;
        true
    }

    pub fn removal_scheduled(&self) -> bool {
        self.removal_scheduled
    }

    pub fn cancel_removal(&mut self) {
        self.removal_scheduled = false;
    }
}
