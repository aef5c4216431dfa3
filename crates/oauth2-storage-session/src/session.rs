use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;

use oauth2_core::{OAuth2Error, OAuthRequest, Params, Transaction, TransactionOptions};
use oauth2_ports::{transaction_id_param, LegacyTransactionStore, StoreContext};

/// Keeps pending transactions in the host session under
/// `options.session_key`, one entry per transaction id.
///
/// Clients go through the server's serialization chain on the way in and
/// out, so only their compact form lives in the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStore;

impl SessionStore {
    pub fn new() -> Self {
        Self
    }

    fn session_required() -> OAuth2Error {
        OAuth2Error::server(
            "OAuth 2.0 transaction support requires a session. Install session middleware before the authorization endpoints.",
        )
    }

    fn generate_id(len: usize) -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..len).map(|_| rng.random::<u8>()).collect();
        hex::encode(bytes)
    }

    async fn record(cx: StoreContext<'_>, txn: &Transaction) -> Result<Value, OAuth2Error> {
        let mut record = txn.clone();
        record.transaction_id = None;
        if let Some(client) = &txn.client {
            record.client = Some(cx.clients.serialize(client).await?);
        }
        Ok(serde_json::to_value(record)?)
    }

    fn put(
        req: &mut OAuthRequest,
        key: &str,
        id: &str,
        record: Value,
    ) -> Result<(), OAuth2Error> {
        let session = req.session.as_mut().ok_or_else(Self::session_required)?;
        let slot = session
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Params::new()));
        if !slot.is_object() {
            *slot = Value::Object(Params::new());
        }
        if let Some(transactions) = slot.as_object_mut() {
            transactions.insert(id.to_string(), record);
        }
        Ok(())
    }
}

#[async_trait]
impl LegacyTransactionStore for SessionStore {
    async fn load(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
    ) -> Result<Transaction, OAuth2Error> {
        let key = &cx.options.session_key;
        let session = req.session.as_ref().ok_or_else(Self::session_required)?;
        let transactions = session
            .get(key)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                OAuth2Error::forbidden("Unable to load OAuth 2.0 transactions from session")
            })?;

        let id = transaction_id_param(cx.options, req)?;
        let stored = transactions.get(&id).cloned().ok_or_else(|| {
            OAuth2Error::forbidden(&format!("Unable to load OAuth 2.0 transaction: {}", id))
        })?;

        let mut txn: Transaction = serde_json::from_value(stored)?;
        let client = match txn.client.take() {
            Some(stored) => cx.clients.deserialize(&stored).await?,
            None => None,
        };
        if client.is_none() {
            tracing::warn!(transaction_id = %id, "client no longer authorized");
        }
        txn.client = client;
        txn.persisted(id);
        Ok(txn)
    }

    async fn store(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        if req.session.is_none() {
            return Err(Self::session_required());
        }
        let record = Self::record(cx, txn).await?;
        let id = Self::generate_id(cx.options.id_length);
        Self::put(req, &cx.options.session_key, &id, record)?;
        tracing::debug!(transaction_id = %id, "transaction stored in session");
        Ok(id)
    }

    async fn update(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        id: &str,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        let record = Self::record(cx, txn).await?;
        Self::put(req, &cx.options.session_key, id, record)?;
        Ok(id.to_string())
    }

    async fn remove(
        &self,
        options: &TransactionOptions,
        req: &mut OAuthRequest,
        id: &str,
    ) -> Result<(), OAuth2Error> {
        let session = req.session.as_mut().ok_or_else(Self::session_required)?;
        if let Some(transactions) = session
            .get_mut(&options.session_key)
            .and_then(Value::as_object_mut)
        {
            transactions.remove(id);
        }
        Ok(())
    }
}
