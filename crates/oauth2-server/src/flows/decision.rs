use std::sync::Arc;

use oauth2_core::{
    guard, is_truthy, AuthorizationResponse, DecisionOptions, OAuth2Error, OAuthRequest,
    OAuthResponse,
};

use crate::callbacks::{CompleteFn, DecisionInput, ParseDecisionFn};
use crate::handlers::Completion;
use crate::server::Server;

use super::removal::schedule_removal;
use super::{missing_transaction, respond};

/// Consent endpoint: records the resource owner's answer and responds.
///
/// The transaction is removed once the response is written, whether access
/// was granted or denied.
#[derive(Clone)]
pub struct Decision {
    server: Arc<Server>,
    options: DecisionOptions,
    parse: Option<ParseDecisionFn>,
    completion: Completion,
}

impl Decision {
    pub(crate) fn new(server: Arc<Server>, options: DecisionOptions) -> Self {
        Self {
            server,
            options,
            parse: None,
            completion: Completion::default(),
        }
    }

    /// Read grant-specific fields (e.g. a narrowed scope) off the request.
    pub fn parse(mut self, parse: ParseDecisionFn) -> Self {
        self.parse = Some(parse);
        self
    }

    pub fn complete(mut self, complete: CompleteFn) -> Self {
        self.completion = Completion::new(Some(complete));
        self
    }

    pub async fn handle(
        &self,
        req: &mut OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<(), OAuth2Error> {
        let outcome = self.run(req, res).await;
        if let Err(err) = &outcome {
            tracing::warn!(error = %err.code(), description = %err.message(), "decision failed");
            self.server.record_error(err);
        }
        outcome
    }

    async fn run(&self, req: &mut OAuthRequest, res: &mut OAuthResponse) -> Result<(), OAuth2Error> {
        let Some(body) = req.body.as_ref() else {
            return Err(OAuth2Error::server(
                "Decision requires a parsed request body.",
            ));
        };
        let cancelled = is_truthy(body.get(&self.options.cancel_field));
        if req.oauth2.is_none() {
            return Err(missing_transaction());
        }

        let DecisionInput { mut fields, locals } = match &self.parse {
            Some(parse) => guard(async { parse(&*req).await }).await?,
            None => DecisionInput::default(),
        };
        let allow = match fields.remove("allow") {
            Some(value) => is_truthy(Some(&value)),
            None => !cancelled,
        };

        let user = req
            .principal(&self.server.options().user_property)
            .cloned();
        let txn = req.oauth2.as_mut().ok_or_else(missing_transaction)?;
        txn.user = user;
        txn.merge_locals(res.locals.clone());
        txn.merge_locals(locals);
        txn.decide(AuthorizationResponse::with_fields(allow, fields))?;

        self.server.record_decision(allow);
        tracing::info!(
            transaction_id = txn.transaction_id.as_deref().unwrap_or_default(),
            allow,
            "decision recorded"
        );
        schedule_removal(&self.server, req, res);
        respond(&self.server, req, res, &self.completion).await
    }
}
