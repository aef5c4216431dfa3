use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

use oauth2_core::{OAuth2Error, OAuthResponse, Params, Transaction};
use oauth2_server::callbacks::CallbackFuture;
use oauth2_server::response_mode::QUERY;
use oauth2_server::{
    Completion, ErrorHandler, Flow, GrantModule, RequestParser, RespondWithCompletion,
    ResponseHandler, ResponseModes,
};

use super::{
    denied_params, not_issued, parse_request, with_state, GrantOptions, IssueContext,
    RedirectErrors,
};

/// Issues an authorization code; `None` refuses the request.
pub type IssueCodeFn = Arc<dyn Fn(IssueContext) -> CallbackFuture<Option<String>> + Send + Sync>;

/// The authorization code grant (`response_type=code`), answering in the
/// query by default.
pub fn code<F, Fut>(issue: F) -> GrantModule
where
    F: Fn(IssueContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>, OAuth2Error>> + Send + 'static,
{
    code_with(GrantOptions::default(), issue)
}

pub fn code_with<F, Fut>(options: GrantOptions, issue: F) -> GrantModule
where
    F: Fn(IssueContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>, OAuth2Error>> + Send + 'static,
{
    let issue: IssueCodeFn = Arc::new(move |cx| issue(cx).boxed());
    let separators = options.scope_separators;
    GrantModule::new("code")
        .with_request(RequestParser::sync(move |req| parse_request(req, &separators)))
        .with_response(ResponseHandler::completing(CodeResponder {
            issue,
            modes: options.modes.clone(),
        }))
        .with_error(ErrorHandler::new(RedirectErrors {
            modes: options.modes,
            default_mode: QUERY,
        }))
}

struct CodeResponder {
    issue: IssueCodeFn,
    modes: ResponseModes,
}

#[async_trait]
impl RespondWithCompletion for CodeResponder {
    async fn respond(
        &self,
        txn: &Transaction,
        res: &mut OAuthResponse,
        complete: &Completion,
    ) -> Result<Flow, OAuth2Error> {
        let mode = self.modes.select(txn.req.response_mode(), QUERY)?;
        mode.validate(txn)?;

        let cx = IssueContext::from_transaction(txn)?;
        if !cx.res.allow {
            mode.render(txn, res, &denied_params(txn))?;
            return Ok(Flow::Done);
        }

        let code = (self.issue)(cx).await?.ok_or_else(not_issued)?;
        tracing::debug!("authorization code issued");
        let mut params = Params::new();
        params.insert("code".into(), json!(code));
        let params = with_state(params, txn);

        complete.run(txn).await?;
        mode.render(txn, res, &params)?;
        Ok(Flow::Done)
    }
}
