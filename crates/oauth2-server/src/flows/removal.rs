use async_trait::async_trait;

use oauth2_core::{FinishHook, OAuth2Error, OAuthRequest, OAuthResponse, TransactionOptions};
use oauth2_ports::DynTransactionStore;

use crate::server::Server;

pub const REMOVE_TRANSACTION: &str = "oauth2.remove_transaction";

/// Deletes a persisted transaction once its final response is written.
/// A failed removal never fails the response.
struct RemoveTransaction {
    store: DynTransactionStore,
    options: TransactionOptions,
    id: String,
}

#[async_trait]
impl FinishHook for RemoveTransaction {
    fn key(&self) -> Option<&str> {
        Some(REMOVE_TRANSACTION)
    }

    async fn on_finish(self: Box<Self>, req: &mut OAuthRequest) -> Result<(), OAuth2Error> {
        match self.store.remove(&self.options, req, &self.id).await {
            Ok(()) => {
                tracing::info!(transaction_id = %self.id, "transaction removed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(transaction_id = %self.id, error = %err, "failed to remove transaction");
                Ok(())
            }
        }
    }
}

/// Arrange for the request's transaction to be removed after the response is
/// written. Does nothing for transactions that were never persisted or whose
/// removal is already arranged.
pub(crate) fn schedule_removal(
    server: &Server,
    req: &mut OAuthRequest,
    res: &mut OAuthResponse,
) {
    let Some(txn) = req.oauth2.as_mut() else {
        return;
    };
    let Some(id) = txn.transaction_id.clone() else {
        return;
    };
    if !txn.schedule_removal() || res.has_finish_hook(REMOVE_TRANSACTION) {
        return;
    }
    res.add_finish_hook(Box::new(RemoveTransaction {
        store: server.store().clone(),
        options: server.options().clone(),
        id,
    }));
}
