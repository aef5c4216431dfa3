//! Host-supplied callbacks used by the authorization flows.
//!
//! Each callback comes in a fixed number of shapes; the host picks the one
//! that receives the arguments it needs. Arguments are passed by value so the
//! returned future is free of borrows.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use oauth2_core::{AuthorizationRequest, OAuth2Error, OAuthRequest, Params, Transaction, TypeSet};

pub type CallbackFuture<T> = BoxFuture<'static, Result<T, OAuth2Error>>;

/// Outcome of client validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    /// `None` means the client is not authorized.
    pub client: Option<Value>,
    pub redirect_uri: Option<String>,
    pub web_origin: Option<String>,
}

impl Validated {
    pub fn client(client: Value, redirect_uri: impl Into<String>) -> Self {
        Self {
            client: Some(client),
            redirect_uri: Some(redirect_uri.into()),
            web_origin: None,
        }
    }

    /// The client is not authorized, but errors may still redirect to `redirect_uri`.
    pub fn unauthorized(redirect_uri: Option<String>) -> Self {
        Self {
            client: None,
            redirect_uri,
            web_origin: None,
        }
    }

    pub fn with_web_origin(mut self, origin: impl Into<String>) -> Self {
        self.web_origin = Some(origin.into());
        self
    }
}

type ClientFn = dyn Fn(Option<String>, Option<String>) -> CallbackFuture<Validated> + Send + Sync;
type ClientScopeFn = dyn Fn(Option<String>, Option<String>, Option<Vec<String>>) -> CallbackFuture<Validated>
    + Send
    + Sync;
type ClientScopeTypeFn = dyn Fn(Option<String>, Option<String>, Option<Vec<String>>, TypeSet) -> CallbackFuture<Validated>
    + Send
    + Sync;
type RequestFn = dyn Fn(AuthorizationRequest) -> CallbackFuture<Validated> + Send + Sync;

/// Validates the client and redirect URI of a new authorization request.
#[derive(Clone)]
pub enum Validate {
    /// `(client_id, redirect_uri)`
    Client(Arc<ClientFn>),
    /// `(client_id, redirect_uri, scope)`
    ClientScope(Arc<ClientScopeFn>),
    /// `(client_id, redirect_uri, scope, type)`
    ClientScopeType(Arc<ClientScopeTypeFn>),
    /// The whole authorization request.
    Request(Arc<RequestFn>),
}

impl Validate {
    pub fn client<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<String>, Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Validated, OAuth2Error>> + Send + 'static,
    {
        Validate::Client(Arc::new(move |id, uri| f(id, uri).boxed()))
    }

    pub fn client_scope<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<String>, Option<String>, Option<Vec<String>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Validated, OAuth2Error>> + Send + 'static,
    {
        Validate::ClientScope(Arc::new(move |id, uri, scope| f(id, uri, scope).boxed()))
    }

    pub fn client_scope_type<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<String>, Option<String>, Option<Vec<String>>, TypeSet) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<Validated, OAuth2Error>> + Send + 'static,
    {
        Validate::ClientScopeType(Arc::new(move |id, uri, scope, ty| {
            f(id, uri, scope, ty).boxed()
        }))
    }

    pub fn request<F, Fut>(f: F) -> Self
    where
        F: Fn(AuthorizationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Validated, OAuth2Error>> + Send + 'static,
    {
        Validate::Request(Arc::new(move |areq| f(areq).boxed()))
    }

    pub(crate) fn call(&self, areq: &AuthorizationRequest) -> CallbackFuture<Validated> {
        let client_id = areq.client_id().map(str::to_string);
        let redirect_uri = areq.redirect_uri().map(str::to_string);
        match self {
            Validate::Client(f) => f(client_id, redirect_uri),
            Validate::ClientScope(f) => f(client_id, redirect_uri, areq.scope()),
            Validate::ClientScopeType(f) => {
                f(client_id, redirect_uri, areq.scope(), areq.response_type().clone())
            }
            Validate::Request(f) => f(areq.clone()),
        }
    }
}

/// Result of an immediate-decision check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub allow: bool,
    /// On allow: extra response fields. On defer: info kept with the transaction.
    pub info: Option<Params>,
    pub locals: Option<Params>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            allow: true,
            ..Self::default()
        }
    }

    /// The resource owner has to be asked.
    pub fn defer() -> Self {
        Self::default()
    }

    pub fn with_info(mut self, info: Params) -> Self {
        self.info = Some(info);
        self
    }

    pub fn with_locals(mut self, locals: Params) -> Self {
        self.locals = Some(locals);
        self
    }
}

type Opt = Option<Value>;
type Scope = Option<Vec<String>>;
type TxnFn = dyn Fn(Transaction) -> CallbackFuture<Verdict> + Send + Sync;
type ClientUserFn = dyn Fn(Opt, Opt) -> CallbackFuture<Verdict> + Send + Sync;
type ClientUserScopeFn = dyn Fn(Opt, Opt, Scope) -> CallbackFuture<Verdict> + Send + Sync;
type ClientUserScopeTypeFn =
    dyn Fn(Opt, Opt, Scope, TypeSet) -> CallbackFuture<Verdict> + Send + Sync;
type ClientUserRequestFn =
    dyn Fn(Opt, Opt, Scope, TypeSet, AuthorizationRequest) -> CallbackFuture<Verdict> + Send + Sync;
type ClientUserRequestLocalsFn = dyn Fn(Opt, Opt, Scope, TypeSet, AuthorizationRequest, Option<Params>) -> CallbackFuture<Verdict>
    + Send
    + Sync;

/// Tries to decide without asking the resource owner.
#[derive(Clone)]
pub enum Immediate {
    /// The whole transaction.
    Transaction(Arc<TxnFn>),
    /// `(client, user)`
    ClientUser(Arc<ClientUserFn>),
    /// `(client, user, scope)`
    ClientUserScope(Arc<ClientUserScopeFn>),
    /// `(client, user, scope, type)`
    ClientUserScopeType(Arc<ClientUserScopeTypeFn>),
    /// `(client, user, scope, type, request)`
    ClientUserRequest(Arc<ClientUserRequestFn>),
    /// `(client, user, scope, type, request, locals)`
    ClientUserRequestLocals(Arc<ClientUserRequestLocalsFn>),
}

impl Immediate {
    pub fn transaction<F, Fut>(f: F) -> Self
    where
        F: Fn(Transaction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Verdict, OAuth2Error>> + Send + 'static,
    {
        Immediate::Transaction(Arc::new(move |txn| f(txn).boxed()))
    }

    pub fn client_user<F, Fut>(f: F) -> Self
    where
        F: Fn(Opt, Opt) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Verdict, OAuth2Error>> + Send + 'static,
    {
        Immediate::ClientUser(Arc::new(move |client, user| f(client, user).boxed()))
    }

    pub fn client_user_scope<F, Fut>(f: F) -> Self
    where
        F: Fn(Opt, Opt, Scope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Verdict, OAuth2Error>> + Send + 'static,
    {
        Immediate::ClientUserScope(Arc::new(move |client, user, scope| {
            f(client, user, scope).boxed()
        }))
    }

    pub fn client_user_scope_type<F, Fut>(f: F) -> Self
    where
        F: Fn(Opt, Opt, Scope, TypeSet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Verdict, OAuth2Error>> + Send + 'static,
    {
        Immediate::ClientUserScopeType(Arc::new(move |client, user, scope, ty| {
            f(client, user, scope, ty).boxed()
        }))
    }

    pub fn client_user_request<F, Fut>(f: F) -> Self
    where
        F: Fn(Opt, Opt, Scope, TypeSet, AuthorizationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Verdict, OAuth2Error>> + Send + 'static,
    {
        Immediate::ClientUserRequest(Arc::new(move |client, user, scope, ty, areq| {
            f(client, user, scope, ty, areq).boxed()
        }))
    }

    pub fn client_user_request_locals<F, Fut>(f: F) -> Self
    where
        F: Fn(Opt, Opt, Scope, TypeSet, AuthorizationRequest, Option<Params>) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<Verdict, OAuth2Error>> + Send + 'static,
    {
        Immediate::ClientUserRequestLocals(Arc::new(
            move |client, user, scope, ty, areq, locals| {
                f(client, user, scope, ty, areq, locals).boxed()
            },
        ))
    }

    pub(crate) fn call(&self, txn: &Transaction) -> CallbackFuture<Verdict> {
        let client = txn.client.clone();
        let user = txn.user.clone();
        let scope = txn.req.scope();
        let ty = txn.req.response_type().clone();
        match self {
            Immediate::Transaction(f) => f(txn.clone()),
            Immediate::ClientUser(f) => f(client, user),
            Immediate::ClientUserScope(f) => f(client, user, scope),
            Immediate::ClientUserScopeType(f) => f(client, user, scope, ty),
            Immediate::ClientUserRequest(f) => f(client, user, scope, ty, txn.req.clone()),
            Immediate::ClientUserRequestLocals(f) => {
                f(client, user, scope, ty, txn.req.clone(), txn.locals.clone())
            }
        }
    }
}

/// Fields parsed from a decision request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionInput {
    /// Becomes the authorization response. An `allow` entry overrides the
    /// cancel-field rule.
    pub fields: Params,
    pub locals: Option<Params>,
}

impl DecisionInput {
    pub fn new(fields: Params) -> Self {
        Self {
            fields,
            locals: None,
        }
    }

    pub fn with_locals(mut self, locals: Params) -> Self {
        self.locals = Some(locals);
        self
    }
}

/// Reads the consent fields off a decision request. The closure runs
/// synchronously against the request; only the returned future may suspend.
pub type ParseDecisionFn =
    Arc<dyn Fn(&OAuthRequest) -> CallbackFuture<DecisionInput> + Send + Sync>;

pub fn parse_decision<F, Fut>(f: F) -> ParseDecisionFn
where
    F: Fn(&OAuthRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<DecisionInput, OAuth2Error>> + Send + 'static,
{
    Arc::new(move |req: &OAuthRequest| f(req).boxed())
}

/// Runs right before a transaction is answered, e.g. to record consent.
pub type CompleteFn = Arc<dyn Fn(Transaction) -> CallbackFuture<()> + Send + Sync>;

pub fn complete_with<F, Fut>(f: F) -> CompleteFn
where
    F: Fn(Transaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), OAuth2Error>> + Send + 'static,
{
    Arc::new(move |txn| f(txn).boxed())
}
