//! Framework-agnostic building blocks of the OAuth2 toolkit.
//!
//! This crate holds the types every other crate speaks: the order-independent
//! [`TypeSet`] used to match response types, the [`OAuth2Error`] taxonomy, the
//! [`Transaction`] carried across the consent round trip, the transport
//! boundary ([`OAuthRequest`] / [`OAuthResponse`]) and the client
//! [`ClientSerialization`] chain.

pub mod guard;
pub mod http;
pub mod models;
pub mod options;
pub mod serialization;

pub use guard::*;
pub use http::*;
pub use models::*;
pub use options::*;
pub use serialization::*;
