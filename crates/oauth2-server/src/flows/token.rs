use std::sync::Arc;

use oauth2_core::{OAuth2Error, OAuthRequest, OAuthResponse};

use crate::handlers::Flow;
use crate::server::Server;

/// Token endpoint: dispatches on the body's `grant_type`.
#[derive(Clone)]
pub struct TokenEndpoint {
    server: Arc<Server>,
}

impl TokenEndpoint {
    pub(crate) fn new(server: Arc<Server>) -> Self {
        Self { server }
    }

    pub async fn handle(
        &self,
        req: &mut OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<(), OAuth2Error> {
        let grant_type = req.body_str("grant_type").map(str::to_string);
        let outcome = match self
            .server
            .dispatcher()
            .exchange(grant_type.as_deref(), req, res)
            .await
        {
            Ok(Flow::Done) => {
                self.server
                    .record_exchange(grant_type.as_deref().unwrap_or_default());
                Ok(())
            }
            Ok(Flow::Next) => Err(OAuth2Error::unsupported_grant_type(
                grant_type.as_deref().unwrap_or_default(),
            )),
            Err(err) => Err(err),
        };
        if let Err(err) = &outcome {
            tracing::warn!(
                grant_type = grant_type.as_deref().unwrap_or_default(),
                error = %err.code(),
                "token request failed"
            );
            self.server.record_error(err);
        }
        outcome
    }
}
