//! Conversion between actix-web requests/responses and the framework-neutral
//! [`OAuthRequest`] / [`OAuthResponse`].

use actix_web::http::{header::HeaderName, header::HeaderValue, StatusCode};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde_json::Value;
use url::form_urlencoded;

use oauth2_core::{OAuth2Error, OAuthRequest, OAuthResponse, Params};

/// Decode `application/x-www-form-urlencoded` pairs, rejecting repeated keys.
fn parse_pairs(input: &[u8], what: &str) -> Result<Params, OAuth2Error> {
    let mut params = Params::new();
    for (k, v) in form_urlencoded::parse(input) {
        let key = k.into_owned();
        if params.contains_key(&key) {
            return Err(OAuth2Error::invalid_request(&format!(
                "Duplicate {} parameters are not allowed",
                what
            )));
        }
        params.insert(key, Value::String(v.into_owned()));
    }
    Ok(params)
}

pub fn query_params(req: &HttpRequest) -> Result<Params, OAuth2Error> {
    parse_pairs(req.query_string().as_bytes(), "query")
}

/// Parse the body by content type. Anything other than a form or JSON object
/// leaves the body unparsed.
pub fn body_params(req: &HttpRequest, body: &web::Bytes) -> Result<Option<Params>, OAuth2Error> {
    match req.content_type() {
        "application/x-www-form-urlencoded" => parse_pairs(body, "form").map(Some),
        "application/json" => serde_json::from_slice::<Params>(body)
            .map(Some)
            .map_err(|_| OAuth2Error::invalid_request("Request body must be a JSON object")),
        _ if body.is_empty() => Ok(None),
        other => {
            tracing::debug!(content_type = other, "request body left unparsed");
            Ok(None)
        }
    }
}

/// Build the neutral request. The session and authenticated principal are
/// attached by the caller.
pub fn oauth_request(req: &HttpRequest, body: &web::Bytes) -> Result<OAuthRequest, OAuth2Error> {
    let mut oreq = OAuthRequest::new().with_query(query_params(req)?);
    oreq.body = body_params(req, body)?;
    Ok(oreq)
}

/// Copy status, headers and body onto an actix response.
pub fn http_response(res: &OAuthResponse) -> HttpResponse {
    let status = StatusCode::from_u16(res.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);
    for (name, value) in res.headers() {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                builder.insert_header((name, value));
            }
            _ => tracing::warn!(header = %name, "dropping invalid response header"),
        }
    }
    match res.body() {
        Some(body) => builder.body(body.to_string()),
        None => builder.finish(),
    }
}

/// Run the response's finish hooks, then convert it.
pub async fn send(res: &mut OAuthResponse, req: &mut OAuthRequest) -> HttpResponse {
    if let Err(err) = res.finish(req).await {
        tracing::warn!(error = %err.code(), description = %err.message(), "finish hook failed");
    }
    http_response(res)
}
