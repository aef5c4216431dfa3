//! Handler signatures for every extension point.
//!
//! Each pipeline accepts a small, closed set of handler shapes. A plugin says
//! which shape it implements by the variant it is wrapped in.

use async_trait::async_trait;
use std::sync::Arc;

use oauth2_core::{
    guard, guard_sync, OAuth2Error, OAuthRequest, OAuthResponse, Params, Transaction,
};

use crate::callbacks::CompleteFn;

/// What a response, error or exchange handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The handler produced the final response; the pipeline stops.
    Done,
    /// Not handled here; continue with the next matching handler.
    Next,
}

/// Asynchronous request parser.
#[async_trait]
pub trait ParseRequest: Send + Sync {
    async fn parse(&self, req: &OAuthRequest) -> Result<Params, OAuth2Error>;
}

type SyncParseFn = dyn Fn(&OAuthRequest) -> Result<Params, OAuth2Error> + Send + Sync;

/// A request-phase handler: contributes fields to the authorization request.
#[derive(Clone)]
pub enum RequestParser {
    Sync(Arc<SyncParseFn>),
    Async(Arc<dyn ParseRequest>),
}

impl RequestParser {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&OAuthRequest) -> Result<Params, OAuth2Error> + Send + Sync + 'static,
    {
        RequestParser::Sync(Arc::new(f))
    }

    pub fn from_async(parser: impl ParseRequest + 'static) -> Self {
        RequestParser::Async(Arc::new(parser))
    }

    pub(crate) async fn run(&self, req: &OAuthRequest) -> Result<Params, OAuth2Error> {
        match self {
            RequestParser::Sync(f) => guard_sync(|| f(req)),
            RequestParser::Async(parser) => guard(parser.parse(req)).await,
        }
    }
}

/// Lets a responder run the host's completion callback before it responds.
#[derive(Clone, Default)]
pub struct Completion {
    hook: Option<CompleteFn>,
}

impl Completion {
    pub fn new(hook: Option<CompleteFn>) -> Self {
        Self { hook }
    }

    /// No-op when the host registered no completion callback.
    pub async fn run(&self, txn: &Transaction) -> Result<(), OAuth2Error> {
        match &self.hook {
            Some(hook) => guard(async { hook(txn.clone()).await }).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
pub trait Respond: Send + Sync {
    async fn respond(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error>;
}

#[async_trait]
pub trait RespondWithCompletion: Send + Sync {
    async fn respond(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        complete: &Completion,
    ) -> Result<Flow, OAuth2Error>;
}

/// A response-phase handler.
#[derive(Clone)]
pub enum ResponseHandler {
    Plain(Arc<dyn Respond>),
    /// Receives a [`Completion`] it must run before finalizing.
    Completing(Arc<dyn RespondWithCompletion>),
}

struct RespondFn<F>(F);

#[async_trait]
impl<F> Respond for RespondFn<F>
where
    F: Fn(&Transaction, &mut OAuthResponse) -> Result<Flow, OAuth2Error> + Send + Sync,
{
    async fn respond(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error> {
        (self.0)(txn, res)
    }
}

impl ResponseHandler {
    /// Wrap a synchronous responder.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Transaction, &mut OAuthResponse) -> Result<Flow, OAuth2Error>
            + Send
            + Sync
            + 'static,
    {
        ResponseHandler::Plain(Arc::new(RespondFn(f)))
    }

    pub fn plain(handler: impl Respond + 'static) -> Self {
        ResponseHandler::Plain(Arc::new(handler))
    }

    pub fn completing(handler: impl RespondWithCompletion + 'static) -> Self {
        ResponseHandler::Completing(Arc::new(handler))
    }

    pub(crate) async fn run(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        complete: &Completion,
    ) -> Result<Flow, OAuth2Error> {
        match self {
            ResponseHandler::Plain(h) => guard(h.respond(txn, res)).await,
            ResponseHandler::Completing(h) => guard(h.respond(txn, res, complete)).await,
        }
    }
}

/// An error-phase handler.
///
/// `Ok(Done)` ends the pipeline, `Ok(Next)` hands the same error on, and
/// `Err(other)` hands `other` on in its place.
#[async_trait]
pub trait RespondError: Send + Sync {
    async fn respond_error(
        &self,
        err: &OAuth2Error,
        txn: &Transaction,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error>;
}

struct RespondErrorFn<F>(F);

#[async_trait]
impl<F> RespondError for RespondErrorFn<F>
where
    F: Fn(&OAuth2Error, &Transaction, &mut OAuthResponse) -> Result<Flow, OAuth2Error>
        + Send
        + Sync,
{
    async fn respond_error(
        &self,
        err: &OAuth2Error,
        txn: &Transaction,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error> {
        (self.0)(err, txn, res)
    }
}

#[derive(Clone)]
pub struct ErrorHandler(pub Arc<dyn RespondError>);

impl ErrorHandler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&OAuth2Error, &Transaction, &mut OAuthResponse) -> Result<Flow, OAuth2Error>
            + Send
            + Sync
            + 'static,
    {
        ErrorHandler(Arc::new(RespondErrorFn(f)))
    }

    pub fn new(handler: impl RespondError + 'static) -> Self {
        ErrorHandler(Arc::new(handler))
    }

    pub(crate) async fn run(
        &self,
        err: &OAuth2Error,
        txn: &Transaction,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error> {
        guard(self.0.respond_error(err, txn, res)).await
    }
}

/// Token endpoint handler for one `grant_type`.
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn exchange(
        &self,
        req: &OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error>;
}

struct ExchangeFn<F>(F);

#[async_trait]
impl<F> Exchange for ExchangeFn<F>
where
    F: Fn(&OAuthRequest, &mut OAuthResponse) -> Result<Flow, OAuth2Error> + Send + Sync,
{
    async fn exchange(
        &self,
        req: &OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error> {
        (self.0)(req, res)
    }
}

#[derive(Clone)]
pub struct ExchangeHandler(pub Arc<dyn Exchange>);

impl ExchangeHandler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&OAuthRequest, &mut OAuthResponse) -> Result<Flow, OAuth2Error>
            + Send
            + Sync
            + 'static,
    {
        ExchangeHandler(Arc::new(ExchangeFn(f)))
    }

    pub fn new(handler: impl Exchange + 'static) -> Self {
        ExchangeHandler(Arc::new(handler))
    }

    pub(crate) async fn run(
        &self,
        req: &OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error> {
        guard(self.0.exchange(req, res)).await
    }
}

/// One phase of a grant, for registering a single handler.
#[derive(Clone)]
pub enum GrantHandler {
    Request(RequestParser),
    Response(ResponseHandler),
    Error(ErrorHandler),
}

impl From<RequestParser> for GrantHandler {
    fn from(parser: RequestParser) -> Self {
        GrantHandler::Request(parser)
    }
}

impl From<ResponseHandler> for GrantHandler {
    fn from(handler: ResponseHandler) -> Self {
        GrantHandler::Response(handler)
    }
}

impl From<ErrorHandler> for GrantHandler {
    fn from(handler: ErrorHandler) -> Self {
        GrantHandler::Error(handler)
    }
}

/// A grant implementing one `response_type`, registered under its name.
#[derive(Clone, Default)]
pub struct GrantModule {
    pub name: String,
    pub request: Option<RequestParser>,
    pub response: Option<ResponseHandler>,
    pub error: Option<ErrorHandler>,
}

impl GrantModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_request(mut self, parser: RequestParser) -> Self {
        self.request = Some(parser);
        self
    }

    pub fn with_response(mut self, handler: ResponseHandler) -> Self {
        self.response = Some(handler);
        self
    }

    pub fn with_error(mut self, handler: ErrorHandler) -> Self {
        self.error = Some(handler);
        self
    }
}

/// An exchange implementing one `grant_type`, registered under its name.
#[derive(Clone)]
pub struct ExchangeModule {
    pub name: String,
    pub handler: ExchangeHandler,
}

impl ExchangeModule {
    pub fn new(name: impl Into<String>, handler: ExchangeHandler) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}
