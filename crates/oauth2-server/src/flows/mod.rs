//! Endpoints that drive a transaction through its phases.
//!
//! Each endpoint takes the host's [`OAuthRequest`] and [`OAuthResponse`].
//! The transaction being worked on travels in `req.oauth2`, so an error
//! returned by one endpoint can be rendered by the next one the host calls
//! (usually [`AuthorizationErrorHandler`] followed by [`ErrorRenderer`]).

mod authorization;
mod authorization_error;
mod decision;
mod error_handler;
mod loader;
mod removal;
mod resume;
mod token;

pub use authorization::{Authorization, AuthorizationOutcome};
pub use authorization_error::AuthorizationErrorHandler;
pub use decision::Decision;
pub use error_handler::ErrorRenderer;
pub use loader::TransactionLoader;
pub use removal::REMOVE_TRANSACTION;
pub use resume::Resume;
pub use token::TokenEndpoint;

use oauth2_core::{OAuth2Error, OAuthRequest, OAuthResponse};

use crate::handlers::{Completion, Flow};
use crate::server::Server;

pub(crate) fn missing_transaction() -> OAuth2Error {
    OAuth2Error::server(
        "OAuth 2.0 transaction support is required. Load the transaction before this endpoint.",
    )
}

/// Run the response pipeline for the request's transaction.
///
/// A type no responder handles is an `unsupported_response_type` error.
pub(crate) async fn respond(
    server: &Server,
    req: &mut OAuthRequest,
    res: &mut OAuthResponse,
    completion: &Completion,
) -> Result<(), OAuth2Error> {
    let txn = req.oauth2.as_ref().ok_or_else(missing_transaction)?;
    match server.dispatcher().respond(txn, res, completion).await? {
        Flow::Done => {
            if let Some(txn) = req.oauth2.as_mut() {
                txn.responded();
            }
            Ok(())
        }
        Flow::Next => Err(OAuth2Error::unsupported_response_type(
            &txn.req.response_type().to_string(),
        )),
    }
}
