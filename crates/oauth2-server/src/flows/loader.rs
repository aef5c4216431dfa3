use std::sync::Arc;

use oauth2_core::{OAuth2Error, OAuthRequest};

use crate::server::Server;

/// Loads the transaction named by the request into `req.oauth2`.
///
/// A request that already carries a transaction is left alone.
#[derive(Clone)]
pub struct TransactionLoader {
    server: Arc<Server>,
}

impl TransactionLoader {
    pub(crate) fn new(server: Arc<Server>) -> Self {
        Self { server }
    }

    pub async fn handle(&self, req: &mut OAuthRequest) -> Result<(), OAuth2Error> {
        if req.oauth2.is_some() {
            return Ok(());
        }
        let loaded = self
            .server
            .store()
            .load(self.server.store_context(), req)
            .await;
        let txn = match loaded {
            Ok(txn) => txn,
            Err(err) => {
                tracing::warn!(error = %err.code(), description = %err.message(), "transaction load failed");
                self.server.record_error(&err);
                return Err(err);
            }
        };

        if txn.client.is_none() {
            // The client was deauthorized while the transaction was pending.
            if let Some(id) = txn.transaction_id.as_deref() {
                let removed = self
                    .server
                    .store()
                    .remove(self.server.options(), req, id)
                    .await;
                if let Err(err) = removed {
                    tracing::warn!(transaction_id = %id, error = %err, "failed to remove transaction");
                }
            }
            tracing::warn!("transaction client deauthorized");
            let err = OAuth2Error::unauthorized_client();
            self.server.record_error(&err);
            return Err(err);
        }

        tracing::debug!(
            transaction_id = txn.transaction_id.as_deref().unwrap_or_default(),
            "transaction loaded"
        );
        req.oauth2 = Some(txn);
        Ok(())
    }
}
