use std::sync::Arc;

use oauth2_core::{ErrorHandlerOptions, ErrorMode, OAuth2Error, OAuthRequest, OAuthResponse, TypeSet};

use crate::response_mode::{error_params, FragmentMode, QueryMode, ResponseMode, ResponseModes};

/// Last-resort renderer for errors that no grant handled.
///
/// `Direct` writes the JSON error body. `Indirect` redirects back to the
/// client when the request carries a transaction with a redirect URI; when
/// it cannot, the error is handed back untouched.
#[derive(Clone)]
pub struct ErrorRenderer {
    options: ErrorHandlerOptions,
    modes: ResponseModes,
}

impl ErrorRenderer {
    pub(crate) fn new(options: ErrorHandlerOptions) -> Self {
        Self {
            options,
            modes: ResponseModes::default(),
        }
    }

    /// Make a response mode selectable through the request's `response_mode`.
    pub fn with_mode(mut self, name: impl Into<String>, mode: Arc<dyn ResponseMode>) -> Self {
        self.modes.insert(name, mode);
        self
    }

    pub fn handle(
        &self,
        err: OAuth2Error,
        req: &OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<(), OAuth2Error> {
        match self.options.mode {
            ErrorMode::Direct => {
                tracing::debug!(error = %err.code(), status = err.status(), "rendering error body");
                res.send_json(err.status(), &err)?;
                if err.status() == 401 {
                    res.set_header("WWW-Authenticate", r#"Basic realm="Clients""#);
                }
                Ok(())
            }
            ErrorMode::Indirect => self.redirect(err, req, res),
        }
    }

    fn redirect(
        &self,
        err: OAuth2Error,
        req: &OAuthRequest,
        res: &mut OAuthResponse,
    ) -> Result<(), OAuth2Error> {
        let Some(txn) = req.oauth2.as_ref() else {
            return Err(err);
        };
        if txn.redirect_uri.is_none() {
            return Err(err);
        }

        let params = error_params(&err, txn);

        let ty = txn.req.response_type();
        let rendered = match txn.req.response_mode() {
            Some(name) => match self.modes.get(name) {
                Some(mode) => mode.render(txn, res, &params),
                None => {
                    tracing::debug!(response_mode = name, "unknown response mode for error");
                    return Err(err);
                }
            },
            None if self.uses_fragment(ty) => FragmentMode.render(txn, res, &params),
            None => QueryMode.render(txn, res, &params),
        };
        tracing::debug!(error = %err.code(), "redirecting error to client");
        rendered
    }

    fn uses_fragment(&self, ty: &TypeSet) -> bool {
        !ty.is_empty()
            && self
                .options
                .fragment
                .iter()
                .any(|f| TypeSet::parse(f).equal_to(ty))
    }
}
