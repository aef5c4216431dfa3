use actix_session::{config::CookieContentSecurity, storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, ResponseError};
use serde_json::{json, Value};
use std::sync::Arc;

use oauth2_config::Config;
use oauth2_core::{ErrorHandlerOptions, OAuth2Error, OAuthRequest, OAuthResponse};
use oauth2_observability::{encode_prometheus_text, init_telemetry, shutdown_telemetry, Metrics};
use oauth2_server::{
    Authorization, AuthorizationErrorHandler, AuthorizationOutcome, Decision, ErrorRenderer,
    Server, TokenEndpoint, TransactionLoader,
};
use oauth2_storage_factory::create_transaction_store;

use crate::demo::{ClientDirectory, Demo, DEMO_EXCHANGES, DEMO_GRANTS};
use crate::session::{load_session, save_session};
use crate::transport;

/// Endpoints and collaborators shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<Server>,
    pub authorization: Authorization,
    pub decision: Decision,
    pub loader: TransactionLoader,
    pub authorization_errors: AuthorizationErrorHandler,
    pub token: TokenEndpoint,
    pub errors: ErrorRenderer,
    /// Token endpoint errors are always rendered directly.
    pub token_errors: ErrorRenderer,
    pub clients: ClientDirectory,
    pub metrics: Metrics,
    pub session_key: String,
    pub transaction_field: String,
    pub cancel_field: String,
    /// Stands in for the logged-in resource owner.
    pub user: Value,
}

impl AppState {
    pub fn new(config: &Config, demo: Demo) -> Result<Self, OAuth2Error> {
        let store = create_transaction_store(config)?;
        let metrics = Metrics::new()
            .map_err(|e| OAuth2Error::server(&format!("Failed to create metrics: {}", e)))?;

        let mut server = Server::new(store)
            .with_options(config.transaction_options())
            .with_metrics(metrics.clone());
        demo.install(&mut server, &DEMO_GRANTS, &DEMO_EXCHANGES)?;
        demo.clients.install_serializers(&mut server);
        let server = Arc::new(server);

        Ok(Self {
            authorization: server.authorization(demo.clients.validator()),
            decision: server.decision_with(config.decision_options()),
            loader: server.transaction_loader(),
            authorization_errors: server.authorization_error_handler(),
            token: server.token(),
            errors: server.error_handler(config.error_options()),
            token_errors: server.error_handler(ErrorHandlerOptions::default()),
            server,
            clients: demo.clients,
            metrics,
            session_key: config.transactions.session_key.clone(),
            transaction_field: config.transactions.transaction_field.clone(),
            cancel_field: config.decision.cancel_field.clone(),
            user: json!({ "id": "demo-user", "name": "Demo User" }),
        })
    }

    fn request(
        &self,
        req: &HttpRequest,
        body: &web::Bytes,
        session: &Session,
    ) -> Result<OAuthRequest, OAuth2Error> {
        let mut oreq = transport::oauth_request(req, body)?;
        load_session(session, &self.session_key, &mut oreq)?;
        Ok(oreq)
    }

    async fn finish(
        &self,
        session: &Session,
        req: &mut OAuthRequest,
        mut res: OAuthResponse,
    ) -> HttpResponse {
        let http = transport::send(&mut res, req).await;
        if let Err(err) = save_session(session, &self.session_key, req) {
            tracing::warn!(error = %err.message(), "failed to save session");
        }
        http
    }

    /// Authorization-side failure: let the grants redirect it first.
    async fn fail(
        &self,
        err: OAuth2Error,
        session: &Session,
        req: &mut OAuthRequest,
        mut res: OAuthResponse,
    ) -> HttpResponse {
        match self.authorization_errors.handle(err, req, &mut res).await {
            Ok(()) => self.finish(session, req, res).await,
            Err(err) => self.render(&self.errors, err, session, req, res).await,
        }
    }

    async fn render(
        &self,
        renderer: &ErrorRenderer,
        err: OAuth2Error,
        session: &Session,
        req: &mut OAuthRequest,
        mut res: OAuthResponse,
    ) -> HttpResponse {
        match renderer.handle(err, req, &mut res) {
            Ok(()) => self.finish(session, req, res).await,
            Err(err) => err.error_response(),
        }
    }

    fn consent_page(&self, req: &OAuthRequest, transaction_id: &str) -> HttpResponse {
        let txn = req.oauth2.as_ref();
        let client = txn
            .and_then(|t| t.client.as_ref())
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown client");
        let scope = txn
            .and_then(|t| t.req.scope())
            .map(|s| s.join(" "))
            .unwrap_or_default();
        let page = format!(
            r#"<!DOCTYPE html>
<html>
<head><title>Authorize {client}</title></head>
<body>
<p><strong>{client}</strong> is requesting access{scope_note}.</p>
<form method="post" action="/oauth/decision">
<input type="hidden" name="{field}" value="{id}">
<button type="submit">Allow</button>
<button type="submit" name="{cancel}" value="deny">Deny</button>
</form>
</body>
</html>"#,
            client = escape_html(client),
            scope_note = if scope.is_empty() {
                String::new()
            } else {
                format!(" to <em>{}</em>", escape_html(&scope))
            },
            field = escape_html(&self.transaction_field),
            id = escape_html(transaction_id),
            cancel = escape_html(&self.cancel_field),
        );
        HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .insert_header(("X-Frame-Options", "DENY"))
            .insert_header(("Content-Security-Policy", "frame-ancestors 'none'"))
            .insert_header(("Referrer-Policy", "no-referrer"))
            .body(page)
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// GET /oauth/authorize
pub async fn authorize(
    req: HttpRequest,
    body: web::Bytes,
    session: Session,
    state: web::Data<AppState>,
) -> HttpResponse {
    let mut oreq = match state.request(&req, &body, &session) {
        Ok(oreq) => oreq,
        Err(err) => {
            return state
                .render(&state.errors, err, &session, &mut OAuthRequest::new(), OAuthResponse::new())
                .await
        }
    };
    oreq.user = Some(state.user.clone());
    let mut res = OAuthResponse::new();

    match state.authorization.handle(&mut oreq, &mut res).await {
        Ok(AuthorizationOutcome::Pending { transaction_id }) => {
            if let Err(err) = save_session(&session, &state.session_key, &oreq) {
                return state.render(&state.errors, err, &session, &mut oreq, res).await;
            }
            state.consent_page(&oreq, &transaction_id)
        }
        Ok(AuthorizationOutcome::Responded) => state.finish(&session, &mut oreq, res).await,
        Err(err) => state.fail(err, &session, &mut oreq, res).await,
    }
}

/// POST /oauth/decision
pub async fn decision(
    req: HttpRequest,
    body: web::Bytes,
    session: Session,
    state: web::Data<AppState>,
) -> HttpResponse {
    let mut oreq = match state.request(&req, &body, &session) {
        Ok(oreq) => oreq,
        Err(err) => {
            return state
                .render(&state.errors, err, &session, &mut OAuthRequest::new(), OAuthResponse::new())
                .await
        }
    };
    oreq.user = Some(state.user.clone());
    let mut res = OAuthResponse::new();

    if let Err(err) = state.loader.handle(&mut oreq).await {
        return state.fail(err, &session, &mut oreq, res).await;
    }
    match state.decision.handle(&mut oreq, &mut res).await {
        Ok(()) => state.finish(&session, &mut oreq, res).await,
        Err(err) => state.fail(err, &session, &mut oreq, res).await,
    }
}

/// POST /oauth/token
///
/// Clients authenticate with `client_id` and `client_secret` in the body.
pub async fn token(
    req: HttpRequest,
    body: web::Bytes,
    session: Session,
    state: web::Data<AppState>,
) -> HttpResponse {
    let mut oreq = match transport::oauth_request(&req, &body) {
        Ok(oreq) => oreq,
        Err(err) => return err.error_response(),
    };
    let mut res = OAuthResponse::new();

    let client = oreq
        .body_str("client_id")
        .zip(oreq.body_str("client_secret"))
        .and_then(|(id, secret)| state.clients.authenticate(id, secret))
        .map(|client| client.to_value());
    let Some(client) = client else {
        let err = OAuth2Error::token("Client authentication failed", "invalid_client");
        return state
            .render(&state.token_errors, err, &session, &mut oreq, res)
            .await;
    };
    oreq.user = Some(client);

    match state.token.handle(&mut oreq, &mut res).await {
        Ok(()) => state.finish(&session, &mut oreq, res).await,
        Err(err) => {
            state
                .render(&state.token_errors, err, &session, &mut oreq, res)
                .await
        }
    }
}

/// GET /metrics
pub async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    match encode_prometheus_text(&state.metrics.registry) {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/oauth")
            .route("/authorize", web::get().to(authorize))
            .route("/decision", web::post().to(decision))
            .route("/token", web::post().to(token)),
    )
    .route("/metrics", web::get().to(metrics))
    .route("/health", web::get().to(health));
}

/// The configured cookie signing key. Keys shorter than 64 bytes are
/// ignored in favour of a random one.
pub fn session_key(config: &Config) -> Key {
    config
        .session
        .as_ref()
        .and_then(|s| s.key.as_deref())
        .and_then(|raw| match Key::try_from(raw.as_bytes()) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("Ignoring configured session key: {}", e);
                None
            }
        })
        .unwrap_or_else(|| {
            tracing::warn!("No session key configured; sessions will not survive a restart");
            Key::generate()
        })
}

pub fn session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("oauth2_session".to_string())
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_secure(false)
        .build()
}

/// Start the demo server.
pub async fn run() -> std::io::Result<()> {
    let config = Config::load();

    if let Err(e) = init_telemetry(&config.telemetry.service_name) {
        eprintln!("Failed to initialize telemetry: {}", e);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
    }
    tracing::info!(config = ?config.sanitized(), "configuration loaded");

    let state = AppState::new(&config, Demo::new(ClientDirectory::demo()))
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = web::Data::new(state);

    let bind = (config.server.host.clone(), config.server.port);
    tracing::info!("Starting OAuth2 demo server at http://{}:{}", bind.0, bind.1);

    let key = session_key(&config);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(session_middleware(key.clone()))
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await;

    shutdown_telemetry();
    result
}
