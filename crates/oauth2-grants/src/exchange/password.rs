use serde_json::Value;
use std::future::Future;

use oauth2_core::{OAuth2Error, OAuthRequest, Params};
use oauth2_server::ExchangeModule;

use super::{client_of, issuing, ExchangeOptions, Issued};
use crate::params::{required_str, split_scope, Endpoint};

/// Resource owner credentials presented by a client.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordRequest {
    pub client: Option<Value>,
    pub username: String,
    pub password: String,
    pub scope: Option<Vec<String>>,
    pub body: Params,
}

fn parse(
    req: &OAuthRequest,
    body: &Params,
    options: &ExchangeOptions,
) -> Result<PasswordRequest, OAuth2Error> {
    let username = required_str(Endpoint::Token, "username", body.get("username"))?;
    let password = required_str(Endpoint::Token, "password", body.get("password"))?;
    let scope = split_scope(Endpoint::Token, body.get("scope"), &options.scope_separators)?;
    Ok(PasswordRequest {
        client: client_of(req, options),
        username: username.to_string(),
        password: password.to_string(),
        scope,
        body: body.clone(),
    })
}

pub fn password<F, Fut>(issue: F) -> ExchangeModule
where
    F: Fn(PasswordRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    password_with(ExchangeOptions::default(), issue)
}

pub fn password_with<F, Fut>(options: ExchangeOptions, issue: F) -> ExchangeModule
where
    F: Fn(PasswordRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    issuing(
        "password",
        options,
        parse,
        "Invalid resource owner credentials",
        issue,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2_core::OAuthResponse;
    use oauth2_server::Exchange;
    use serde_json::json;

    fn request(body: Value) -> OAuthRequest {
        OAuthRequest::new()
            .with_user(json!({ "id": "c223" }))
            .with_body(body.as_object().cloned().unwrap())
    }

    fn module() -> ExchangeModule {
        password(|request| async move {
            if request.username != "bob" || request.password != "shh" {
                return Ok(None);
            }
            assert_eq!(request.client, Some(json!({ "id": "c223" })));
            let mut params = Params::new();
            params.insert("expires_in".into(), json!(3600));
            Ok(Some(Issued::new("s3cr1t").with_params(params)))
        })
    }

    #[tokio::test]
    async fn issues_for_valid_credentials() {
        let mut res = OAuthResponse::new();
        let req = request(json!({ "grant_type": "password", "username": "bob", "password": "shh" }));
        module().handler.0.exchange(&req, &mut res).await.unwrap();
        assert_eq!(res.header("Cache-Control"), Some("no-store"));
        assert_eq!(
            res.body(),
            Some(r#"{"access_token":"s3cr1t","expires_in":3600,"token_type":"Bearer"}"#)
        );
    }

    #[tokio::test]
    async fn scope_is_split_before_issuing() {
        let module = password(|request| async move {
            assert_eq!(request.scope, Some(vec!["read".to_string(), "write".to_string()]));
            Ok(Some(Issued::new("s3cr1t")))
        });
        let mut res = OAuthResponse::new();
        let req = request(json!({ "username": "bob", "password": "shh", "scope": "read write" }));
        module.handler.0.exchange(&req, &mut res).await.unwrap();
        assert!(res.is_written());
    }

    #[tokio::test]
    async fn wrong_credentials_are_an_invalid_grant() {
        let mut res = OAuthResponse::new();
        let req = request(json!({ "username": "bob", "password": "nope" }));
        let err = module().handler.0.exchange(&req, &mut res).await.unwrap_err();
        assert_eq!(err.code(), "invalid_grant");
        assert_eq!(err.message(), "Invalid resource owner credentials");
        assert_eq!(err.status(), 403);
    }

    #[tokio::test]
    async fn username_and_password_are_required() {
        let mut res = OAuthResponse::new();
        let err = module()
            .handler
            .0
            .exchange(&request(json!({ "password": "shh" })), &mut res)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Missing required parameter: username");
        assert_eq!(err.status(), 400);

        let err = module()
            .handler
            .0
            .exchange(&request(json!({ "username": "bob" })), &mut res)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Missing required parameter: password");
        assert_eq!(err.code(), "invalid_request");
    }

    #[tokio::test]
    async fn issuing_errors_propagate() {
        let module = password(|_request| async { Err(OAuth2Error::server("something is wrong")) });
        let mut res = OAuthResponse::new();
        let req = request(json!({ "username": "bob", "password": "shh" }));
        let err = module.handler.0.exchange(&req, &mut res).await.unwrap_err();
        assert_eq!(err.message(), "something is wrong");
    }
}
