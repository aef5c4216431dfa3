//! Transaction store selection for the OAuth2 toolkit.
//!
//! This crate centralizes config-driven store selection, picks the matching
//! adapter (legacy session shape vs modern shape) and wraps the result with
//! `ObservedTransactionStore` for tracing.

use std::sync::Arc;
use std::time::Duration;

use oauth2_config::{Config, StoreKind};
use oauth2_core::OAuth2Error;

pub use oauth2_observability::ObservedTransactionStore;
pub use oauth2_ports::{DynTransactionStore, LegacyStore, ModernStore, TransactionPersistence};
pub use oauth2_storage_session::{MemoryStore, SessionStore};

/// Build the store named by `transactions.store`.
///
/// Supported:
/// - `session` -> [`SessionStore`] through the legacy adapter
/// - `memory` -> [`MemoryStore`] through the modern adapter, expiring entries
///   after `transactions.ttl_seconds` when set
pub fn create_transaction_store(config: &Config) -> Result<DynTransactionStore, OAuth2Error> {
    let kind = config
        .store_kind()
        .map_err(|e| OAuth2Error::server(&e))?;
    let ttl = config.transactions.ttl_seconds.map(Duration::from_secs);
    Ok(observed(kind, ttl))
}

pub fn create_store(kind: StoreKind) -> DynTransactionStore {
    observed(kind, None)
}

fn observed(kind: StoreKind, ttl: Option<Duration>) -> DynTransactionStore {
    let (inner, backend) = match kind {
        StoreKind::Session => (LegacyStore::shared(SessionStore::new()), "session"),
        StoreKind::Memory => {
            let store = ttl.map_or_else(MemoryStore::new, MemoryStore::with_ttl);
            (ModernStore::shared(store), "memory")
        }
    };
    tracing::info!(store_backend = backend, legacy = inner.is_legacy(), "transaction store selected");
    Arc::new(ObservedTransactionStore::new(inner, backend))
}
