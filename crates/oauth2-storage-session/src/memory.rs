use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use oauth2_core::{OAuth2Error, OAuthRequest, Transaction};
use oauth2_ports::TransactionStore;

#[derive(Debug, Clone)]
struct Entry {
    txn: Transaction,
    touched: Instant,
}

/// In-process transaction store.
///
/// Transactions are kept as-is, client included, so nothing is serialized.
/// Without a ttl an entry lives until it is removed, so transactions that are
/// never decided accumulate. [`MemoryStore::with_ttl`] bounds that: entries
/// older than the ttl (counted from the last store or update) are treated as
/// missing and purged on the next write. A restart loses every pending
/// transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: RwLock<HashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            transactions: RwLock::default(),
            ttl: Some(ttl),
        }
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }

    fn expired(&self, entry: &Entry) -> bool {
        self.ttl.is_some_and(|ttl| entry.touched.elapsed() >= ttl)
    }

    fn purge(&self, map: &mut HashMap<String, Entry>) {
        if self.ttl.is_none() {
            return;
        }
        let before = map.len();
        map.retain(|_, entry| !self.expired(entry));
        let purged = before - map.len();
        if purged > 0 {
            tracing::debug!(purged, "expired transactions purged");
        }
    }

    async fn put(&self, id: String, txn: &Transaction) {
        let mut map = self.transactions.write().await;
        self.purge(&mut map);
        map.insert(
            id,
            Entry {
                txn: txn.clone(),
                touched: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn load(
        &self,
        _req: &mut OAuthRequest,
        id: &str,
    ) -> Result<Option<Transaction>, OAuth2Error> {
        let map = self.transactions.read().await;
        Ok(map
            .get(id)
            .filter(|entry| !self.expired(entry))
            .map(|entry| entry.txn.clone()))
    }

    async fn store(
        &self,
        _req: &mut OAuthRequest,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        let id = Uuid::new_v4().simple().to_string();
        self.put(id.clone(), txn).await;
        tracing::debug!(transaction_id = %id, "transaction stored in memory");
        Ok(id)
    }

    async fn update(
        &self,
        _req: &mut OAuthRequest,
        id: &str,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        self.put(id.to_string(), txn).await;
        Ok(id.to_string())
    }

    async fn remove(&self, _req: &mut OAuthRequest, id: &str) -> Result<(), OAuth2Error> {
        self.transactions.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2_core::{AuthorizationRequest, TypeSet};
    use serde_json::json;

    #[tokio::test]
    async fn keeps_the_client_unserialized() {
        let store = MemoryStore::new();
        let mut txn = Transaction::new(AuthorizationRequest::new(TypeSet::parse("code token")));
        txn.validated(Some(json!({ "id": "c1", "secret": "s" })), None, None);

        let mut req = OAuthRequest::new();
        let id = store.store(&mut req, &txn).await.unwrap();
        assert_eq!(id.len(), 32);
        assert_eq!(store.len().await, 1);

        let loaded = store.load(&mut req, &id).await.unwrap().unwrap();
        assert_eq!(loaded.client, Some(json!({ "id": "c1", "secret": "s" })));
        assert!(loaded.req.response_type().equal_to(&TypeSet::parse("token code")));

        store.remove(&mut req, &id).await.unwrap();
        store.remove(&mut req, &id).await.unwrap();
        assert!(store.load(&mut req, &id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let store = MemoryStore::new();
        let txn = Transaction::new(AuthorizationRequest::new(TypeSet::parse("code")));
        let mut req = OAuthRequest::new();
        let a = store.store(&mut req, &txn).await.unwrap();
        let b = store.store(&mut req, &txn).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn expired_transactions_are_missing_and_purged() {
        let store = MemoryStore::with_ttl(Duration::ZERO);
        let txn = Transaction::new(AuthorizationRequest::new(TypeSet::parse("code")));
        let mut req = OAuthRequest::new();

        let stale = store.store(&mut req, &txn).await.unwrap();
        assert!(store.load(&mut req, &stale).await.unwrap().is_none());

        store.store(&mut req, &txn).await.unwrap();
        assert_eq!(store.len().await, 1, "the stale entry is purged on write");
    }

    #[tokio::test]
    async fn live_transactions_survive_a_ttl() {
        let store = MemoryStore::with_ttl(Duration::from_secs(600));
        let txn = Transaction::new(AuthorizationRequest::new(TypeSet::parse("code")));
        let mut req = OAuthRequest::new();
        let id = store.store(&mut req, &txn).await.unwrap();
        assert!(store.load(&mut req, &id).await.unwrap().is_some());
    }
}
