use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

use oauth2_core::{merge_params, OAuth2Error, OAuthResponse, Params, Transaction};
use oauth2_server::callbacks::CallbackFuture;
use oauth2_server::response_mode::FRAGMENT;
use oauth2_server::{
    Completion, ErrorHandler, Flow, GrantModule, RequestParser, RespondWithCompletion,
    ResponseHandler, ResponseModes,
};

use super::{
    denied_params, not_issued, parse_request, with_state, GrantOptions, IssueContext,
    RedirectErrors,
};
use crate::exchange::Issued;

/// Issues an access token; `None` refuses the request.
pub type IssueTokenFn = Arc<dyn Fn(IssueContext) -> CallbackFuture<Option<Issued>> + Send + Sync>;

/// The implicit grant (`response_type=token`). Tokens travel in the
/// fragment by default and refresh tokens are never handed out.
pub fn token<F, Fut>(issue: F) -> GrantModule
where
    F: Fn(IssueContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    token_with(GrantOptions::default(), issue)
}

pub fn token_with<F, Fut>(options: GrantOptions, issue: F) -> GrantModule
where
    F: Fn(IssueContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Issued>, OAuth2Error>> + Send + 'static,
{
    let issue: IssueTokenFn = Arc::new(move |cx| issue(cx).boxed());
    let separators = options.scope_separators;
    GrantModule::new("token")
        .with_request(RequestParser::sync(move |req| parse_request(req, &separators)))
        .with_response(ResponseHandler::completing(TokenResponder {
            issue,
            modes: options.modes.clone(),
        }))
        .with_error(ErrorHandler::new(RedirectErrors {
            modes: options.modes,
            default_mode: FRAGMENT,
        }))
}

struct TokenResponder {
    issue: IssueTokenFn,
    modes: ResponseModes,
}

impl TokenResponder {
    fn token_params(issued: Issued) -> Params {
        let mut params = Params::new();
        params.insert("access_token".into(), json!(issued.access_token));
        merge_params(&mut params, issued.params);
        if !params.contains_key("token_type") {
            params.insert("token_type".into(), json!("Bearer"));
        }
        params
    }
}

#[async_trait]
impl RespondWithCompletion for TokenResponder {
    async fn respond(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        complete: &Completion,
    ) -> Result<Flow, OAuth2Error> {
        let mode = self.modes.select(txn.req.response_mode(), FRAGMENT)?;
        mode.validate(txn)?;

        let cx = IssueContext::from_transaction(txn)?;
        if !cx.res.allow {
            mode.render(txn, res, &denied_params(txn))?;
            return Ok(Flow::Done);
        }

        let issued = (self.issue)(cx).await?.ok_or_else(not_issued)?;
        if issued.refresh_token.is_some() {
            tracing::debug!("refresh token dropped from implicit grant response");
        }
        let params = with_state(Self::token_params(issued), txn);

        complete.run(txn).await?;
        mode.render(txn, res, &params)?;
        Ok(Flow::Done)
    }
}
