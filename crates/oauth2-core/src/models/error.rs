use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "actix")]
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Which part of the taxonomy an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed request with no transaction context.
    BadRequest,
    /// No usable session or transaction.
    Forbidden,
    /// Protocol-level failure at the authorization endpoint.
    Authorization,
    /// Protocol-level failure at the token endpoint.
    Token,
    /// Anything else, including errors raised by host callbacks.
    #[default]
    Server,
}

/// Structured OAuth 2.0 error.
///
/// Serializes to the direct wire shape `{error, error_description, error_uri?}`;
/// the kind and HTTP status travel alongside but are not part of the body.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OAuth2Error {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
    #[serde(skip)]
    kind: ErrorKind,
    #[serde(skip, default = "default_status")]
    status: u16,
}

fn default_status() -> u16 {
    500
}

impl OAuth2Error {
    pub fn new(kind: ErrorKind, error: &str, description: Option<&str>, status: u16) -> Self {
        Self {
            error: error.to_string(),
            error_description: description.map(|s| s.to_string()),
            error_uri: None,
            kind,
            status,
        }
    }

    /// Authorization endpoint failure; the status defaults by code.
    pub fn authorization(description: &str, code: &str) -> Self {
        let status = match code {
            "invalid_request" | "invalid_scope" => 400,
            "unauthorized_client" | "access_denied" => 403,
            "unsupported_response_type" | "unsupported_response_mode" => 501,
            "temporarily_unavailable" => 503,
            _ => 500,
        };
        Self::new(ErrorKind::Authorization, code, Some(description), status)
    }

    /// Token endpoint failure; the status defaults by code.
    pub fn token(description: &str, code: &str) -> Self {
        let status = match code {
            "invalid_request" | "invalid_scope" => 400,
            "invalid_client" => 401,
            "invalid_grant" | "unauthorized_client" => 403,
            "unsupported_grant_type" => 501,
            _ => 500,
        };
        Self::new(ErrorKind::Token, code, Some(description), status)
    }

    pub fn bad_request(description: &str) -> Self {
        Self::new(ErrorKind::BadRequest, "invalid_request", Some(description), 400)
    }

    pub fn forbidden(description: &str) -> Self {
        Self::new(ErrorKind::Forbidden, "access_denied", Some(description), 403)
    }

    pub fn server(description: &str) -> Self {
        Self::new(ErrorKind::Server, "server_error", Some(description), 500)
    }

    pub fn invalid_request(description: &str) -> Self {
        Self::authorization(description, "invalid_request")
    }

    pub fn unauthorized_client() -> Self {
        Self::authorization("Unauthorized client", "unauthorized_client")
    }

    pub fn access_denied(description: &str) -> Self {
        Self::authorization(description, "access_denied")
    }

    pub fn unsupported_response_type(response_type: &str) -> Self {
        Self::authorization(
            &format!("Unsupported response type: {}", response_type),
            "unsupported_response_type",
        )
    }

    pub fn unsupported_response_mode(mode: &str) -> Self {
        Self::authorization(
            &format!("Unsupported response mode: {}", mode),
            "unsupported_response_mode",
        )
    }

    pub fn unsupported_grant_type(grant_type: &str) -> Self {
        Self::token(
            &format!("Unsupported grant type: {}", grant_type),
            "unsupported_grant_type",
        )
    }

    pub fn invalid_grant(description: &str) -> Self {
        Self::token(description, "invalid_grant")
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.error_uri = Some(uri.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.error
    }

    /// Human-readable message; falls back to the code.
    pub fn message(&self) -> &str {
        self.error_description.as_deref().unwrap_or(&self.error)
    }
}

impl fmt::Display for OAuth2Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for OAuth2Error {}

impl From<serde_json::Error> for OAuth2Error {
    fn from(err: serde_json::Error) -> Self {
        Self::server(&err.to_string())
    }
}

#[cfg(feature = "actix")]
impl ResponseError for OAuth2Error {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if self.status == 401 {
            builder.insert_header(("WWW-Authenticate", "Basic realm=\"Clients\""));
        }
        builder.json(self)
    }
}
