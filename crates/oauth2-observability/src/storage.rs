use async_trait::async_trait;
use tracing::{field, Instrument};

use oauth2_core::{OAuth2Error, OAuthRequest, Transaction, TransactionOptions};
use oauth2_ports::{DynTransactionStore, StoreContext, TransactionPersistence};

use crate::telemetry::annotate_span_with_trace_ids;

/// Wraps a transaction store and opens a tracing span per call.
///
/// Only a prefix of the transaction id is recorded; clients never are.
pub struct ObservedTransactionStore {
    inner: DynTransactionStore,
    backend: String,
}

impl ObservedTransactionStore {
    pub fn new(inner: DynTransactionStore, backend: impl Into<String>) -> Self {
        Self {
            inner,
            backend: backend.into(),
        }
    }

    fn span(&self, operation: &'static str, transaction_id: Option<&str>) -> tracing::Span {
        let span = tracing::info_span!(
            "txn_store",
            trace_id = field::Empty,
            span_id = field::Empty,
            store_backend = %self.backend,
            store_legacy = self.inner.is_legacy(),
            store_operation = operation,
            transaction_id = field::Empty,
        );
        if let Some(id) = transaction_id {
            span.record("transaction_id", field::display(Self::id_prefix(id)));
        }
        annotate_span_with_trace_ids(&span);
        span
    }

    fn id_prefix(id: &str) -> String {
        id.chars().take(8).collect::<String>()
    }
}

#[async_trait]
impl TransactionPersistence for ObservedTransactionStore {
    async fn load(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
    ) -> Result<Transaction, OAuth2Error> {
        let span = self.span("load", req.param_str(&cx.options.transaction_field));
        async move { self.inner.load(cx, req).await }
            .instrument(span)
            .await
    }

    async fn store(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        let span = self.span("store", None);
        async move {
            let id = self.inner.store(cx, req, txn).await?;
            tracing::Span::current().record("transaction_id", field::display(Self::id_prefix(&id)));
            Ok(id)
        }
        .instrument(span)
        .await
    }

    async fn update(
        &self,
        cx: StoreContext<'_>,
        req: &mut OAuthRequest,
        id: &str,
        txn: &Transaction,
    ) -> Result<String, OAuth2Error> {
        let span = self.span("update", Some(id));
        async move { self.inner.update(cx, req, id, txn).await }
            .instrument(span)
            .await
    }

    async fn remove(
        &self,
        options: &TransactionOptions,
        req: &mut OAuthRequest,
        id: &str,
    ) -> Result<(), OAuth2Error> {
        let span = self.span("remove", Some(id));
        async move { self.inner.remove(options, req, id).await }
            .instrument(span)
            .await
    }

    fn is_legacy(&self) -> bool {
        self.inner.is_legacy()
    }
}
