use std::sync::Arc;

use oauth2_core::{
    guard, AuthorizationResponse, OAuth2Error, OAuthRequest, OAuthResponse, Transaction, TypeSet,
};

use crate::callbacks::{CompleteFn, Immediate, Validated, Validate};
use crate::handlers::Completion;
use crate::server::Server;

use super::respond;

/// How an authorization request ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The transaction was persisted; the host should now ask the resource
    /// owner, carrying this id through the consent form.
    Pending { transaction_id: String },
    /// A response was written to the client.
    Responded,
}

/// Authorization endpoint: parse the request, validate the client, then either
/// answer immediately or persist the transaction for a later decision.
///
/// On error the transaction built so far is left in `req.oauth2`.
#[derive(Clone)]
pub struct Authorization {
    server: Arc<Server>,
    validate: Validate,
    immediate: Option<Immediate>,
    completion: Completion,
}

impl Authorization {
    pub(crate) fn new(server: Arc<Server>, validate: Validate) -> Self {
        Self {
            server,
            validate,
            immediate: None,
            completion: Completion::default(),
        }
    }

    pub fn immediate(mut self, immediate: Immediate) -> Self {
        self.immediate = Some(immediate);
        self
    }

    pub fn complete(mut self, complete: CompleteFn) -> Self {
        self.completion = Completion::new(Some(complete));
        self
    }

    pub async fn handle(
        &self,
        req: &mut OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<AuthorizationOutcome, OAuth2Error> {
        let outcome = self.run(req, res).await;
        if let Err(err) = &outcome {
            tracing::warn!(error = %err.code(), description = %err.message(), "authorization failed");
            self.server.record_error(err);
        }
        outcome
    }

    async fn run(
        &self,
        req: &mut OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<AuthorizationOutcome, OAuth2Error> {
        let ty = req
            .param_str("response_type")
            .map(TypeSet::parse)
            .filter(|ty| !ty.is_empty())
            .ok_or_else(|| {
                OAuth2Error::invalid_request("Missing required parameter: response_type")
            })?;

        let parsed = self.server.dispatcher().parse(&ty, req).await?;
        if !parsed.recognized {
            return Err(OAuth2Error::unsupported_response_type(&ty.to_string()));
        }

        let mut txn = Transaction::new(parsed.request);
        txn.user = req
            .principal(&self.server.options().user_property)
            .cloned();

        let validated = match guard(async { self.validate.call(&txn.req).await }).await {
            Ok(validated) => validated,
            Err(err) => {
                req.oauth2 = Some(txn);
                return Err(err);
            }
        };
        let Validated {
            client,
            redirect_uri,
            web_origin,
        } = validated;
        let authorized = client.is_some();
        txn.validated(client, redirect_uri, web_origin);
        if !authorized {
            req.oauth2 = Some(txn);
            return Err(OAuth2Error::unauthorized_client());
        }
        txn.merge_locals(res.locals.clone());
        tracing::debug!(
            response_type = %ty,
            client_id = txn.req.client_id().unwrap_or_default(),
            "client validated"
        );

        if let Some(immediate) = &self.immediate {
            let verdict = match guard(async { immediate.call(&txn).await }).await {
                Ok(verdict) => verdict,
                Err(err) => {
                    req.oauth2 = Some(txn);
                    return Err(err);
                }
            };
            txn.merge_locals(verdict.locals);
            if verdict.allow {
                let decided = txn.decide(AuthorizationResponse::with_fields(
                    true,
                    verdict.info.unwrap_or_default(),
                ));
                req.oauth2 = Some(txn);
                decided?;
                self.server.record_decision(true);
                tracing::info!(response_type = %ty, "authorization granted immediately");
                respond(&self.server, req, res, &self.completion).await?;
                return Ok(AuthorizationOutcome::Responded);
            }
            txn.set_info(verdict.info);
        }

        let stored = self
            .server
            .store()
            .store(self.server.store_context(), req, &txn)
            .await;
        let id = match stored {
            Ok(id) => id,
            Err(err) => {
                req.oauth2 = Some(txn);
                return Err(err);
            }
        };
        txn.persisted(id.clone());
        req.oauth2 = Some(txn);
        self.server.record_started();
        tracing::info!(transaction_id = %id, response_type = %ty, "transaction persisted");
        Ok(AuthorizationOutcome::Pending { transaction_id: id })
    }
}
