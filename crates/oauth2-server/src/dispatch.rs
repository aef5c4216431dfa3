//! Ordered handler pipelines keyed by response type or grant type.

use oauth2_core::{
    AuthorizationRequest, OAuth2Error, OAuthRequest, OAuthResponse, Transaction, TypeSet,
};

use crate::handlers::{
    Completion, ErrorHandler, ExchangeHandler, Flow, RequestParser, ResponseHandler,
};

/// Registered type that matches every request.
pub const WILDCARD: &str = "*";

#[derive(Clone)]
struct Layer<H> {
    /// `None` is the wildcard.
    matches: Option<TypeSet>,
    handler: H,
}

impl<H> Layer<H> {
    fn applies_to(&self, ty: &TypeSet) -> bool {
        self.matches.as_ref().map_or(true, |m| m.equal_to(ty))
    }
}

/// What the parser pipeline produced.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub request: AuthorizationRequest,
    /// A parser registered for exactly this type ran, not only wildcards.
    pub recognized: bool,
}

/// Holds the handler pipelines and runs them in registration order.
#[derive(Clone, Default)]
pub struct Dispatcher {
    parsers: Vec<Layer<RequestParser>>,
    responders: Vec<Layer<ResponseHandler>>,
    error_handlers: Vec<Layer<ErrorHandler>>,
    exchanges: Vec<(Option<String>, ExchangeHandler)>,
}

/// `"*"` is the wildcard; everything else is a type set.
fn match_type(ty: &str) -> Option<TypeSet> {
    if ty == WILDCARD {
        None
    } else {
        Some(TypeSet::parse(ty))
    }
}

fn describe(matches: &Option<TypeSet>) -> String {
    matches
        .as_ref()
        .map_or_else(|| WILDCARD.to_string(), ToString::to_string)
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parser(&mut self, ty: &str, parser: RequestParser) {
        self.parsers.push(Layer {
            matches: match_type(ty),
            handler: parser,
        });
    }

    pub fn add_responder(&mut self, ty: &str, handler: ResponseHandler) {
        self.responders.push(Layer {
            matches: match_type(ty),
            handler,
        });
    }

    pub fn add_error_handler(&mut self, ty: &str, handler: ErrorHandler) {
        self.error_handlers.push(Layer {
            matches: match_type(ty),
            handler,
        });
    }

    pub fn add_exchange(&mut self, ty: &str, handler: ExchangeHandler) {
        let ty = (ty != WILDCARD).then(|| ty.to_string());
        self.exchanges.push((ty, handler));
    }

    /// Run every matching parser and merge their fields over `type`.
    ///
    /// The first error aborts the pipeline.
    pub async fn parse(&self, ty: &TypeSet, req: &OAuthRequest) -> Result<Parsed, OAuth2Error> {
        let mut request = AuthorizationRequest::new(ty.clone());
        let mut recognized = false;
        for layer in self.parsers.iter().filter(|l| l.applies_to(ty)) {
            tracing::debug!(response_type = %ty, handler = %describe(&layer.matches), "parse");
            let fields = layer.handler.run(req).await?;
            request.merge(fields);
            recognized |= layer.matches.is_some();
        }
        Ok(Parsed {
            request,
            recognized,
        })
    }

    /// Run matching responders until one of them answers.
    ///
    /// `Ok(Flow::Next)` means no responder handled the transaction.
    pub async fn respond(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        complete: &Completion,
    ) -> Result<Flow, OAuth2Error> {
        let ty = txn.req.response_type();
        for layer in self.responders.iter().filter(|l| l.applies_to(ty)) {
            tracing::debug!(response_type = %ty, handler = %describe(&layer.matches), "respond");
            if layer.handler.run(txn, res, complete).await? == Flow::Done {
                return Ok(Flow::Done);
            }
        }
        Ok(Flow::Next)
    }

    /// Run matching error responders.
    ///
    /// A handler that fails hands its own error to the rest of the chain. When
    /// no handler answers, the error still in play is returned.
    pub async fn respond_error(
        &self,
        err: OAuth2Error,
        txn: &Transaction,
        res: &mut OAuthResponse,
    ) -> Result<(), OAuth2Error> {
        let ty = txn.req.response_type();
        let mut current = err;
        for layer in self.error_handlers.iter().filter(|l| l.applies_to(ty)) {
            tracing::debug!(
                response_type = %ty,
                handler = %describe(&layer.matches),
                error = %current.code(),
                "error"
            );
            match layer.handler.run(&current, txn, res).await {
                Ok(Flow::Done) => return Ok(()),
                Ok(Flow::Next) => {}
                Err(next) => current = next,
            }
        }
        Err(current)
    }

    /// Run exchanges registered for `grant_type` or the wildcard.
    pub async fn exchange(
        &self,
        grant_type: Option<&str>,
        req: &OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<Flow, OAuth2Error> {
        for (ty, handler) in &self.exchanges {
            let applies = match ty {
                None => true,
                Some(ty) => Some(ty.as_str()) == grant_type,
            };
            if !applies {
                continue;
            }
            tracing::debug!(
                grant_type = grant_type.unwrap_or_default(),
                handler = ty.as_deref().unwrap_or(WILDCARD),
                "exchange"
            );
            if handler.run(req, res).await? == Flow::Done {
                return Ok(Flow::Done);
            }
        }
        Ok(Flow::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2_core::{AuthorizationResponse, Params};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn fields(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn txn(ty: &str) -> Transaction {
        let mut txn = Transaction::new(AuthorizationRequest::new(TypeSet::parse(ty)));
        txn.validated(Some(json!("c1")), Some("https://cb".into()), None);
        txn.decide(AuthorizationResponse::allow()).unwrap();
        txn
    }

    #[tokio::test]
    async fn parsers_merge_in_registration_order() {
        let mut d = Dispatcher::new();
        d.add_parser("*", RequestParser::sync(|_| Ok(fields(json!({ "a": 1, "b": 1 })))));
        d.add_parser("code", RequestParser::sync(|_| Ok(fields(json!({ "b": 2 })))));
        d.add_parser("token", RequestParser::sync(|_| Ok(fields(json!({ "c": 3 })))));

        let parsed = d.parse(&TypeSet::parse("code"), &OAuthRequest::new()).await.unwrap();
        assert!(parsed.recognized);
        assert_eq!(parsed.request.get("a"), Some(&json!(1)));
        assert_eq!(parsed.request.get("b"), Some(&json!(2)));
        assert_eq!(parsed.request.get("c"), None);
        assert_eq!(parsed.request.response_type().to_string(), "code");
    }

    #[tokio::test]
    async fn wildcard_only_is_not_recognized() {
        let mut d = Dispatcher::new();
        d.add_parser("*", RequestParser::sync(|_| Ok(fields(json!({ "a": 1 })))));
        d.add_parser("code", RequestParser::sync(|_| Ok(Params::new())));
        let parsed = d.parse(&TypeSet::parse("foo"), &OAuthRequest::new()).await.unwrap();
        assert!(!parsed.recognized);
        assert_eq!(parsed.request.get("a"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn multi_token_types_match_in_any_order() {
        let mut d = Dispatcher::new();
        d.add_parser("code id_token", RequestParser::sync(|_| Ok(fields(json!({ "nonce": "n" })))));
        let parsed = d
            .parse(&TypeSet::parse("id_token code"), &OAuthRequest::new())
            .await
            .unwrap();
        assert!(parsed.recognized);
        assert_eq!(parsed.request.get("nonce"), Some(&json!("n")));
    }

    #[tokio::test]
    async fn parser_panic_becomes_an_error() {
        let mut d = Dispatcher::new();
        d.add_parser("code", RequestParser::sync(|_| panic!("boom")));
        let err = d.parse(&TypeSet::parse("code"), &OAuthRequest::new()).await.unwrap_err();
        assert_eq!(err.code(), "server_error");
        assert_eq!(err.message(), "Internal server error");
    }

    #[tokio::test]
    async fn respond_stops_at_first_writer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new();
        let s = seen.clone();
        d.add_responder("*", ResponseHandler::sync(move |_, _| {
            s.lock().unwrap().push("wildcard");
            Ok(Flow::Next)
        }));
        let s = seen.clone();
        d.add_responder("code", ResponseHandler::sync(move |_, res| {
            s.lock().unwrap().push("code");
            res.redirect("https://cb?code=a1b1c1");
            Ok(Flow::Done)
        }));
        let s = seen.clone();
        d.add_responder("code", ResponseHandler::sync(move |_, _| {
            s.lock().unwrap().push("late");
            Ok(Flow::Done)
        }));

        let mut res = OAuthResponse::new();
        let flow = d.respond(&txn("code"), &mut res, &Completion::default()).await.unwrap();
        assert_eq!(flow, Flow::Done);
        assert_eq!(*seen.lock().unwrap(), vec!["wildcard", "code"]);
    }

    #[tokio::test]
    async fn respond_reports_unhandled_types() {
        let mut d = Dispatcher::new();
        d.add_responder("code", ResponseHandler::sync(|_, _| Ok(Flow::Done)));
        let mut res = OAuthResponse::new();
        let flow = d.respond(&txn("token"), &mut res, &Completion::default()).await.unwrap();
        assert_eq!(flow, Flow::Next);
    }

    #[tokio::test]
    async fn error_chain_continues_with_replacement_error() {
        let mut d = Dispatcher::new();
        d.add_error_handler("code", ErrorHandler::sync(|err, _, _| {
            assert_eq!(err.code(), "access_denied");
            Err(OAuth2Error::server("replaced"))
        }));
        d.add_error_handler("*", ErrorHandler::sync(|err, _, res| {
            assert_eq!(err.message(), "replaced");
            res.send_text(500, "handled");
            Ok(Flow::Done)
        }));
        let mut res = OAuthResponse::new();
        d.respond_error(OAuth2Error::access_denied("no"), &txn("code"), &mut res)
            .await
            .unwrap();
        assert_eq!(res.body(), Some("handled"));
    }

    #[tokio::test]
    async fn unhandled_errors_are_returned() {
        let mut d = Dispatcher::new();
        d.add_error_handler("code", ErrorHandler::sync(|_, _, _| Ok(Flow::Next)));
        let mut res = OAuthResponse::new();
        let err = d
            .respond_error(OAuth2Error::access_denied("no"), &txn("code"), &mut res)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "access_denied");
        assert!(!res.is_written());
    }

    #[tokio::test]
    async fn exchanges_match_exact_name_or_wildcard() {
        let mut d = Dispatcher::new();
        d.add_exchange("*", ExchangeHandler::sync(|_, res| {
            res.set_header("X-Seen", "1");
            Ok(Flow::Next)
        }));
        d.add_exchange("password", ExchangeHandler::sync(|_, res| {
            res.send_text(200, "password");
            Ok(Flow::Done)
        }));

        let mut res = OAuthResponse::new();
        let flow = d
            .exchange(Some("password"), &OAuthRequest::new(), &mut res)
            .await
            .unwrap();
        assert_eq!(flow, Flow::Done);
        assert_eq!(res.header("X-Seen"), Some("1"));

        let mut res = OAuthResponse::new();
        let flow = d
            .exchange(Some("passwordx"), &OAuthRequest::new(), &mut res)
            .await
            .unwrap();
        assert_eq!(flow, Flow::Next);
    }
}
