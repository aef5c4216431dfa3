use std::sync::Arc;

use oauth2_core::{guard, AuthorizationResponse, OAuth2Error, OAuthRequest, OAuthResponse};

use crate::callbacks::{CompleteFn, Immediate};
use crate::handlers::Completion;
use crate::server::Server;

use super::authorization::AuthorizationOutcome;
use super::removal::schedule_removal;
use super::{missing_transaction, respond};

/// Re-runs the immediate decision against a loaded transaction.
///
/// On allow the transaction is answered and scheduled for removal; otherwise
/// it is updated in the store with the new info.
#[derive(Clone)]
pub struct Resume {
    server: Arc<Server>,
    immediate: Immediate,
    completion: Completion,
}

impl Resume {
    pub(crate) fn new(server: Arc<Server>, immediate: Immediate) -> Self {
        Self {
            server,
            immediate,
            completion: Completion::default(),
        }
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
            tracing::warn!(error = %err.code(), description = %err.message(), "resume failed");
            self.server.record_error(err);
        }
        outcome
    }

    async fn run(
        &self,
        req: &mut OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<AuthorizationOutcome, OAuth2Error> {
        let user = req
            .principal(&self.server.options().user_property)
            .cloned();
        let txn = req.oauth2.as_mut().ok_or_else(missing_transaction)?;
        txn.user = user;
        txn.merge_locals(res.locals.clone());
        self.server.record_resumed();

        let verdict = guard(async { self.immediate.call(&*txn).await }).await?;
        txn.merge_locals(verdict.locals);

        if verdict.allow {
            txn.decide(AuthorizationResponse::with_fields(
                true,
                verdict.info.unwrap_or_default(),
            ))?;
            self.server.record_decision(true);
            tracing::info!(
                transaction_id = txn.transaction_id.as_deref().unwrap_or_default(),
                "resumed transaction granted"
            );
            schedule_removal(&self.server, req, res);
            respond(&self.server, req, res, &self.completion).await?;
            return Ok(AuthorizationOutcome::Responded);
        }

        txn.set_info(verdict.info);
        let snapshot = txn.clone();
        let cx = self.server.store_context();
        let store = self.server.store();
        let id = match snapshot.transaction_id.as_deref() {
            Some(id) => store.update(cx, req, id, &snapshot).await?,
            None => store.store(cx, req, &snapshot).await?,
        };
        if let Some(txn) = req.oauth2.as_mut() {
            txn.persisted(id.clone());
        }
        tracing::info!(transaction_id = %id, "resumed transaction deferred");
        Ok(AuthorizationOutcome::Pending { transaction_id: id })
    }
}
