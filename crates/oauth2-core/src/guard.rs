use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::models::OAuth2Error;

const PANIC_DESCRIPTION: &str = "Internal server error";

/// Await a plugin or host callback, turning a panic into a server error.
///
/// A panicking handler is treated the same as one that returned the error.
/// The panic message is logged, never sent to the client.
pub async fn guard<T, F>(fut: F) -> Result<T, OAuth2Error>
where
    F: Future<Output = Result<T, OAuth2Error>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(panic = %message, "handler panicked");
            Err(OAuth2Error::server(PANIC_DESCRIPTION))
        }
    }
}

/// Same as [`guard`] for a synchronous closure.
pub fn guard_sync<T>(f: impl FnOnce() -> Result<T, OAuth2Error>) -> Result<T, OAuth2Error> {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(panic = %message, "handler panicked");
            Err(OAuth2Error::server(PANIC_DESCRIPTION))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_results_through() {
        assert_eq!(guard(async { Ok::<_, OAuth2Error>(7) }).await.unwrap(), 7);
        let err = guard(async { Err::<(), _>(OAuth2Error::invalid_request("nope")) })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }

    #[tokio::test]
    async fn panics_become_server_errors() {
        let err = guard(async {
            if true {
                panic!("something went horribly wrong");
            }
            Ok::<(), OAuth2Error>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.code(), "server_error");
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn sync_panics_become_server_errors() {
        let err = guard_sync::<()>(|| panic!("{}", String::from("boom"))).unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(err.message(), "Internal server error");
        assert!(!err.to_string().contains("boom"));
    }
}
