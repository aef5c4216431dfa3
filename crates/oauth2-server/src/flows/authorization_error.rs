use std::sync::Arc;

use oauth2_core::{OAuth2Error, OAuthRequest, OAuthResponse};

use crate::server::{is_client_error, Server};

use super::removal::schedule_removal;

/// Renders an authorization error through the grant error responders.
///
/// Returns `Ok(())` when a responder wrote a response. Otherwise the error is
/// handed back so the host can pass it on, e.g. to [`super::ErrorRenderer`].
/// Without a loaded transaction there is no client to answer, so the error is
/// always handed back.
#[derive(Clone)]
pub struct AuthorizationErrorHandler {
    server: Arc<Server>,
}

impl AuthorizationErrorHandler {
    pub(crate) fn new(server: Arc<Server>) -> Self {
        Self { server }
    }

    pub async fn handle(
        &self,
        err: OAuth2Error,
        req: &mut OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<(), OAuth2Error> {
        let Some(txn) = req.oauth2.as_ref() else {
            return Err(err);
        };
        if is_client_error(&err) {
            tracing::info!(error = %err.code(), "rendering authorization error");
        } else {
            tracing::error!(error = %err.code(), description = %err.message(), "rendering authorization error");
        }
        let txn = txn.clone();
        schedule_removal(&self.server, req, res);
        self.server.dispatcher().respond_error(err, &txn, res).await
    }
}
