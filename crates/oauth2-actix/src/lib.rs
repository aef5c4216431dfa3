//! Actix-web transport for the OAuth2 toolkit.
//!
//! [`transport`] converts between actix requests/responses and the neutral
//! `OAuthRequest`/`OAuthResponse`, [`session`] bridges `actix-session`, and
//! [`app`] wires a runnable demo: authorize, consent, decision and token.

pub mod app;
pub mod demo;
pub mod session;
pub mod transport;

pub use app::{configure, run, session_key, session_middleware, AppState};
pub use demo::{ClientDirectory, Demo, DemoClient};
