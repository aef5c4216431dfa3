//! Library exports.
//!
//! The toolkit is split into `crates/oauth2-*` members; this package
//! re-exports them under one name so hosts and integration tests can depend
//! on a single crate.

pub use oauth2_actix as actix;
pub use oauth2_config as config;
pub use oauth2_core as core;
pub use oauth2_grants as grants;
pub use oauth2_observability as observability;
pub use oauth2_ports as ports;
pub use oauth2_server as server;
pub use oauth2_storage_factory as storage;

pub use oauth2_core::{
    AuthorizationRequest, AuthorizationResponse, OAuth2Error, OAuthRequest, OAuthResponse,
    Transaction, TypeSet,
};
pub use oauth2_server::Server;
