//! Protocol runtime of the OAuth2 toolkit.
//!
//! A [`Server`] holds the registered grants (keyed by response type),
//! exchanges (keyed by grant type) and client serializers, and is bound to a
//! single transaction store. The endpoints in [`flows`] drive a
//! [`oauth2_core::Transaction`] from the initial authorization request,
//! through the resource owner's decision, to the final redirect.

pub mod callbacks;
pub mod dispatch;
pub mod flows;
pub mod handlers;
pub mod response_mode;
pub mod server;

pub use callbacks::*;
pub use dispatch::{Dispatcher, Parsed, WILDCARD};
pub use flows::*;
pub use handlers::*;
pub use response_mode::{error_params, mode_fn, FragmentMode, QueryMode, ResponseMode, ResponseModes};
pub use server::Server;
