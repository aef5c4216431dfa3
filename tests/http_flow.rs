use actix_web::cookie::{Cookie, Key};
use actix_web::{test, web, App};
use serde_json::Value;

use rust_oauth2_toolkit::actix::{configure, session_middleware, AppState, ClientDirectory, Demo};
use rust_oauth2_toolkit::config::Config;
use rust_oauth2_toolkit::OAuth2Error;

const REDIRECT: &str = "http://localhost:3000/callback";
const REDIRECT_ENCODED: &str = "http%3A%2F%2Flocalhost%3A3000%2Fcallback";

fn state(store: &str) -> web::Data<AppState> {
    let mut config = Config::default();
    config.transactions.store = store.to_string();
    web::Data::new(AppState::new(&config, Demo::new(ClientDirectory::demo())).expect("app state"))
}

macro_rules! demo_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .wrap(session_middleware(Key::generate()))
                .configure(configure),
        )
        .await
    };
}

fn hidden_transaction_id(page: &str) -> String {
    let marker = r#"name="transaction_id" value=""#;
    let start = page.find(marker).expect("transaction id field") + marker.len();
    let len = page[start..].find('"').expect("closing quote");
    page[start..start + len].to_string()
}

fn query_param(location: &str, key: &str) -> Option<String> {
    let query = location.split_once(['?', '#'])?.1;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[actix_web::test]
async fn code_flow_from_consent_to_token() {
    let state = state("session");
    let app = demo_app!(state);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/oauth/authorize?response_type=code&client_id=demo-client&redirect_uri={}&scope=read&state=xyz",
            REDIRECT_ENCODED
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    let cookie: Cookie<'static> = resp
        .response()
        .cookies()
        .next()
        .expect("session cookie")
        .into_owned();
    let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(page.contains("Demo Client"));
    let transaction_id = hidden_transaction_id(&page);
    assert_eq!(transaction_id.len(), 16);

    let req = test::TestRequest::post()
        .uri("/oauth/decision")
        .cookie(cookie)
        .set_form([("transaction_id", transaction_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();
    assert!(location.starts_with(&format!("{}?code=", REDIRECT)), "{location}");
    assert_eq!(query_param(&location, "state").as_deref(), Some("xyz"));
    let code = query_param(&location, "code").expect("code");

    let form = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", REDIRECT),
        ("client_id", "demo-client"),
        ("client_secret", "demo-secret"),
    ];
    let req = test::TestRequest::post()
        .uri("/oauth/token")
        .set_form(form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("cache-control").unwrap(), "no-store");
    assert_eq!(resp.headers().get("pragma").unwrap(), "no-cache");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["scope"], "read");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    // Codes are single use.
    let req = test::TestRequest::post()
        .uri("/oauth/token")
        .set_form(form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(body.error, "invalid_grant");
}

#[actix_web::test]
async fn denied_consent_redirects_with_access_denied() {
    let state = state("session");
    let app = demo_app!(state);

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?response_type=code&client_id=demo-client&state=s1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let cookie = resp.response().cookies().next().expect("session cookie").into_owned();
    let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let transaction_id = hidden_transaction_id(&page);

    let req = test::TestRequest::post()
        .uri("/oauth/decision")
        .cookie(cookie)
        .set_form([("transaction_id", transaction_id.as_str()), ("cancel", "deny")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(
        resp.headers().get("location").unwrap(),
        &format!("{}?error=access_denied&state=s1", REDIRECT)
    );
}

#[actix_web::test]
async fn implicit_flow_answers_in_the_fragment() {
    let state = state("memory");
    let app = demo_app!(state);

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?response_type=token&client_id=demo-client&state=f1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let transaction_id = hidden_transaction_id(&page);
    assert_eq!(transaction_id.len(), 32, "memory store ids");

    // The in-process store does not need the session cookie.
    let req = test::TestRequest::post()
        .uri("/oauth/decision")
        .set_form([("transaction_id", transaction_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    let location = resp.headers().get("location").unwrap().to_str().unwrap().to_string();
    assert!(location.starts_with(&format!("{}#access_token=", REDIRECT)), "{location}");
    assert_eq!(query_param(&location, "token_type").as_deref(), Some("Bearer"));
    assert_eq!(query_param(&location, "state").as_deref(), Some("f1"));
    assert!(query_param(&location, "refresh_token").is_none());
}

#[actix_web::test]
async fn authorize_rejects_unregistered_redirect_uri() {
    let state = state("session");
    let app = demo_app!(state);

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?response_type=code&client_id=demo-client&redirect_uri=https%3A%2F%2Fevil.example%2Fcb")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(resp.headers().get("location").is_none());
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(body.error, "invalid_request");
    assert_eq!(body.error_description.as_deref(), Some("Invalid redirect_uri"));
}

#[actix_web::test]
async fn authorize_rejects_duplicate_parameters() {
    let state = state("session");
    let app = demo_app!(state);

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?response_type=code&client_id=demo-client&client_id=other")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(
        body.error_description.as_deref(),
        Some("Duplicate query parameters are not allowed")
    );
}

#[actix_web::test]
async fn authorize_rejects_unknown_clients_and_types() {
    let state = state("session");
    let app = demo_app!(state);

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?response_type=code&client_id=nobody")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(body.error, "unauthorized_client");

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?response_type=id_token&client_id=demo-client")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 501);
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(body.error, "unsupported_response_type");

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?client_id=demo-client")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn decision_requires_a_known_transaction() {
    let state = state("session");
    let app = demo_app!(state);

    // Without any pending transaction the session holds nothing to look in.
    let req = test::TestRequest::post()
        .uri("/oauth/decision")
        .set_form([("transaction_id", "deadbeef")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(
        body.error_description.as_deref(),
        Some("Unable to load OAuth 2.0 transactions from session")
    );

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?response_type=code&client_id=demo-client")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let cookie = resp.response().cookies().next().expect("session cookie").into_owned();

    let req = test::TestRequest::post()
        .uri("/oauth/decision")
        .cookie(cookie.clone())
        .set_form([("allow", "true")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(
        body.error_description.as_deref(),
        Some("Missing required parameter: transaction_id")
    );

    let req = test::TestRequest::post()
        .uri("/oauth/decision")
        .cookie(cookie)
        .set_form([("transaction_id", "deadbeef")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(
        body.error_description.as_deref(),
        Some("Unable to load OAuth 2.0 transaction: deadbeef")
    );
}

#[actix_web::test]
async fn token_endpoint_authenticates_clients() {
    let state = state("session");
    let app = demo_app!(state);

    let req = test::TestRequest::post()
        .uri("/oauth/token")
        .set_form([
            ("grant_type", "client_credentials"),
            ("client_id", "demo-client"),
            ("client_secret", "wrong"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(
        resp.headers().get("www-authenticate").unwrap(),
        r#"Basic realm="Clients""#
    );
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(body.error, "invalid_client");

    let req = test::TestRequest::post()
        .uri("/oauth/token")
        .set_form([
            ("grant_type", "client_credentials"),
            ("client_id", "demo-client"),
            ("client_secret", "demo-secret"),
            ("scope", "read write"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["scope"], "read write");
    assert!(body.get("refresh_token").is_none());

    let req = test::TestRequest::post()
        .uri("/oauth/token")
        .set_form([
            ("grant_type", "password"),
            ("client_id", "demo-client"),
            ("client_secret", "demo-secret"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 501);
    let body: OAuth2Error = test::read_body_json(resp).await;
    assert_eq!(body.error, "unsupported_grant_type");
}

#[actix_web::test]
async fn metrics_and_health_are_exposed() {
    let state = state("session");
    let app = demo_app!(state);

    let req = test::TestRequest::get()
        .uri("/oauth/authorize?response_type=code&client_id=demo-client")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("oauth2_transactions_started_total 1"), "{body}");

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}
