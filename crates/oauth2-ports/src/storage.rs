use async_trait::async_trait;
use std::sync::Arc;

use oauth2_core::{ClientSerialization, OAuth2Error, OAuthRequest, Transaction, TransactionOptions};

/// What a store needs from the server besides the request itself.
#[derive(Clone, Copy)]
pub struct StoreContext<'a> {
    pub clients: &'a ClientSerialization,
    pub options: &'a TransactionOptions,
}

impl<'a> StoreContext<'a> {
    pub fn new(clients: &'a ClientSerialization, options: &'a TransactionOptions) -> Self {
        Self { clients, options }
    }
}

/// Storage-agnostic transaction store.
///
/// Lookup is by id only; serializing the client is the store's own concern.
/// Removing an id that is already gone must succeed.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// `Ok(None)` when no transaction exists under `id`.
    async fn load(
        &self,
        req: &mut OAuthRequest,
        id: &str,
    ) -> Result<Option<Transaction>, OAuth2Error>;

    /// Persist a new transaction and return its id.
    async fn store(&self, req: &mut OAuthRequest, txn: &Transaction)
        -> Result<String, OAuth2Error>;

    async fn update(
        &self,
        req: &mut OAuthRequest,
        id: &str,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error>;

    async fn remove(&self, req: &mut OAuthRequest, id: &str) -> Result<(), OAuth2Error>;
}

/// Session-embedded transaction store.
///
/// The store locates the transaction id on the request itself and runs the
/// client through the serialization chain on the way in and out.
#[async_trait]
pub trait LegacyTransactionStore: Send + Sync {
    /// A loaded transaction whose client was deauthorized has `client: None`.
    async fn load(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
    ) -> Result<Transaction, OAuth2Error>;

    async fn store(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error>;

    async fn update(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        id: &str,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error>;

    async fn remove(
        &self,
        options: &TransactionOptions,
        req: &mut OAuthRequest,
        id: &str,
    ) -> Result<(), OAuth2Error>;
}

/// The one interface the server talks to. Pick the adapter when building the
/// server: [`ModernStore`] or [`LegacyStore`].
#[async_trait]
pub trait TransactionPersistence: Send + Sync {
    async fn load(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
    ) -> Result<Transaction, OAuth2Error>;

    async fn store(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error>;

    async fn update(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        id: &str,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error>;

    async fn remove(
        &self,
        options: &TransactionOptions,
        req: &mut OAuthRequest,
        id: &str,
    ) -> Result<(), OAuth2Error>;

    fn is_legacy(&self) -> bool;
}

pub type DynTransactionStore = Arc<dyn TransactionPersistence>;

/// Adapts a [`TransactionStore`].
pub struct ModernStore<S>(pub S);

impl<S: TransactionStore + 'static> ModernStore<S> {
    pub fn shared(store: S) -> DynTransactionStore {
        Arc::new(Self(store))
    }
}

/// Read the transaction id from the query string, then the body.
pub fn transaction_id_param(
    options: &TransactionOptions,
    req: &OAuthRequest,
) -> Result<String, OAuth2Error> {
    req.param_str(&options.transaction_field)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            OAuth2Error::bad_request(&format!(
                "Missing required parameter: {}",
                options.transaction_field
            ))
        })
}

#[async_trait]
impl<S: TransactionStore> TransactionPersistence for ModernStore<S> {
    async fn load(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
    ) -> Result<Transaction, OAuth2Error> {
        let id = transaction_id_param(cx.options, req)?;
        let mut txn = self.0.load(req, &id).await?.ok_or_else(|| {
            OAuth2Error::forbidden(&format!("Unable to load OAuth 2.0 transaction: {}", id))
        })?;
        txn.persisted(id);
        Ok(txn)
    }

    async fn store(
        &self,
        _cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        self.0.store(req, txn).await
    }

    async fn update(
        &self,
        _cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        id: &str,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        self.0.update(req, id, txn).await
    }

    async fn remove(
        &self,
        _options: &TransactionOptions,
        req: &mut OAuthRequest,
        id: &str,
    ) -> Result<(), OAuth2Error> {
        self.0.remove(req, id).await
    }

    fn is_legacy(&self) -> bool {
        false
    }
}

/// Adapts a [`LegacyTransactionStore`].
pub struct LegacyStore<S>(pub S);

impl<S: LegacyTransactionStore + 'static> LegacyStore<S> {
    pub fn shared(store: S) -> DynTransactionStore {
        Arc::new(Self(store))
    }
}

#[async_trait]
impl<S: LegacyTransactionStore> TransactionPersistence for LegacyStore<S> {
    async fn load(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
    ) -> Result<Transaction, OAuth2Error> {
        self.0.load(cx, req).await
    }

    async fn store(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        self.0.store(cx, req, txn).await
    }

    async fn update(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        id: &str,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        self.0.update(cx, req, id, txn).await
    }

    async fn remove(
        &self,
        options: &TransactionOptions,
        req: &mut OAuthRequest,
        id: &str,
    ) -> Result<(), OAuth2Error> {
        self.0.remove(options, req, id).await
    }

    fn is_legacy(&self) -> bool {
        true
    }
}
