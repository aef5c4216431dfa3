//! Integration ports for the OAuth2 toolkit.
//!
//! Implement [`TransactionStore`] (or the session-embedded
//! [`LegacyTransactionStore`]) in your own crate to persist authorization
//! transactions however you like, then hand it to the server through the
//! matching adapter.

pub mod storage;

pub use storage::*;
