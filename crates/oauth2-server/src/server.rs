use std::sync::Arc;

use oauth2_core::{
    ClientDeserializer, ClientSerialization, ClientSerializer, DecisionOptions,
    ErrorHandlerOptions, ErrorKind, OAuth2Error, TransactionOptions,
};
use oauth2_observability::Metrics;
use oauth2_ports::{DynTransactionStore, StoreContext};

use crate::callbacks::{Immediate, Validate};
use crate::dispatch::Dispatcher;
use crate::flows::{
    Authorization, AuthorizationErrorHandler, Decision, ErrorRenderer, Resume, TokenEndpoint,
    TransactionLoader,
};
use crate::handlers::{ExchangeHandler, ExchangeModule, GrantHandler, GrantModule};

/// Registry of grants, exchanges and client serializers, bound to one
/// transaction store.
///
/// Register everything up front, then share the server behind an [`Arc`] and
/// build the endpoints from it.
pub struct Server {
    dispatcher: Dispatcher,
    clients: ClientSerialization,
    store: DynTransactionStore,
    options: TransactionOptions,
    metrics: Option<Metrics>,
}

impl Server {
    pub fn new(store: DynTransactionStore) -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            clients: ClientSerialization::new(),
            store,
            options: TransactionOptions::default(),
            metrics: None,
        }
    }

    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register one phase of a grant for `ty` (`"*"` matches every type).
    pub fn grant(&mut self, ty: &str, handler: impl Into<GrantHandler>) -> &mut Self {
        match handler.into() {
            GrantHandler::Request(parser) => self.dispatcher.add_parser(ty, parser),
            GrantHandler::Response(handler) => self.dispatcher.add_responder(ty, handler),
            GrantHandler::Error(handler) => self.dispatcher.add_error_handler(ty, handler),
        }
        self
    }

    /// Register every phase a module provides under the module's own name.
    pub fn grant_module(&mut self, module: GrantModule) -> &mut Self {
        let name = module.name.clone();
        self.grant_module_as(&name, module)
    }

    pub fn grant_module_as(&mut self, ty: &str, module: GrantModule) -> &mut Self {
        tracing::debug!(response_type = ty, grant = %module.name, "registering grant");
        if let Some(parser) = module.request {
            self.dispatcher.add_parser(ty, parser);
        }
        if let Some(handler) = module.response {
            self.dispatcher.add_responder(ty, handler);
        }
        if let Some(handler) = module.error {
            self.dispatcher.add_error_handler(ty, handler);
        }
        self
    }

    pub fn exchange(&mut self, ty: &str, handler: ExchangeHandler) -> &mut Self {
        tracing::debug!(grant_type = ty, "registering exchange");
        self.dispatcher.add_exchange(ty, handler);
        self
    }

    pub fn exchange_module(&mut self, module: ExchangeModule) -> &mut Self {
        self.exchange(&module.name, module.handler)
    }

    pub fn serialize_client(&mut self, serializer: impl ClientSerializer + 'static) -> &mut Self {
        self.clients.add_serializer(serializer);
        self
    }

    pub fn deserialize_client(
        &mut self,
        deserializer: impl ClientDeserializer + 'static,
    ) -> &mut Self {
        self.clients.add_deserializer(deserializer);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn clients(&self) -> &ClientSerialization {
        &self.clients
    }

    pub fn store(&self) -> &DynTransactionStore {
        &self.store
    }

    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    pub fn store_context(&self) -> StoreContext<'_> {
        StoreContext::new(&self.clients, &self.options)
    }

    pub(crate) fn record_error(&self, err: &OAuth2Error) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(err.kind());
        }
    }

    pub(crate) fn record_decision(&self, allow: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_decision(allow);
        }
    }

    pub(crate) fn record_started(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.transactions_started_total.inc();
        }
    }

    pub(crate) fn record_resumed(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.transactions_resumed_total.inc();
        }
    }

    pub(crate) fn record_exchange(&self, grant_type: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_exchange(grant_type);
        }
    }

    /// Authorization endpoint.
    pub fn authorization(self: &Arc<Self>, validate: Validate) -> Authorization {
        Authorization::new(self.clone(), validate)
    }

    /// Continue a persisted transaction, e.g. after the user logged in.
    pub fn resume(self: &Arc<Self>, immediate: Immediate) -> Resume {
        Resume::new(self.clone(), immediate)
    }

    /// Consent submission endpoint.
    pub fn decision(self: &Arc<Self>) -> Decision {
        Decision::new(self.clone(), DecisionOptions::default())
    }

    pub fn decision_with(self: &Arc<Self>, options: DecisionOptions) -> Decision {
        Decision::new(self.clone(), options)
    }

    pub fn transaction_loader(self: &Arc<Self>) -> TransactionLoader {
        TransactionLoader::new(self.clone())
    }

    pub fn authorization_error_handler(self: &Arc<Self>) -> AuthorizationErrorHandler {
        AuthorizationErrorHandler::new(self.clone())
    }

    /// Token endpoint.
    pub fn token(self: &Arc<Self>) -> TokenEndpoint {
        TokenEndpoint::new(self.clone())
    }

    pub fn error_handler(self: &Arc<Self>, options: ErrorHandlerOptions) -> ErrorRenderer {
        ErrorRenderer::new(options)
    }
}

/// Error kinds counted as client mistakes rather than server faults.
pub(crate) fn is_client_error(err: &OAuth2Error) -> bool {
    !matches!(err.kind(), ErrorKind::Server) && err.status() < 500
}
