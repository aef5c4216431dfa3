//! Grants and exchanges bundled with the OAuth2 toolkit.
//!
//! Each constructor takes the host's issuing callback and returns a module
//! ready for [`oauth2_server::Server::grant_module`] or
//! [`oauth2_server::Server::exchange_module`]. [`PluginRegistry`] resolves a
//! configured name, aliases included, to the plugin it stands for.

pub mod exchange;
pub mod grant;
pub mod params;
pub mod registry;

pub use exchange::{
    authorization_code, authorization_code_with, client_credentials, client_credentials_with,
    password, password_with, refresh_token, refresh_token_with, write_token,
    AuthorizationCodeRequest, ClientCredentialsRequest, ExchangeOptions, Issued,
    PasswordRequest, RefreshTokenRequest,
};
pub use grant::{code, code_with, token, token_with, GrantOptions, IssueCodeFn, IssueContext, IssueTokenFn};
pub use registry::{ExchangeKind, GrantKind, Plugin, PluginRegistry};
