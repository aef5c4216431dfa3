//! Bridge between `actix-session` and the neutral request session map.
//!
//! Only the entry under the transaction session key is copied across; the
//! rest of the host session is left alone.

use actix_session::Session;
use serde_json::Value;

use oauth2_core::{OAuth2Error, OAuthRequest, Params};

/// Attach `session[key]` to the request. The request always ends up with a
/// session map, empty when nothing was stored yet.
pub fn load_session(session: &Session, key: &str, req: &mut OAuthRequest) -> Result<(), OAuth2Error> {
    let stored = session
        .get::<Value>(key)
        .map_err(|e| OAuth2Error::server(&format!("Unable to read session: {}", e)))?;
    let mut params = Params::new();
    if let Some(value) = stored {
        params.insert(key.to_string(), value);
    }
    req.session = Some(params);
    Ok(())
}

/// Write `session[key]` back, dropping the entry once no transaction is left.
/// A request that never loaded the session leaves it untouched.
pub fn save_session(session: &Session, key: &str, req: &OAuthRequest) -> Result<(), OAuth2Error> {
    let Some(map) = req.session.as_ref() else {
        return Ok(());
    };
    match map.get(key) {
        Some(Value::Object(transactions)) if !transactions.is_empty() => session
            .insert(key, transactions)
            .map_err(|e| OAuth2Error::server(&format!("Unable to write session: {}", e))),
        Some(_) | None => {
            session.remove(key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_session::SessionExt;
    use actix_web::test::TestRequest;
    use serde_json::json;

    #[actix_web::test]
    async fn round_trips_the_transaction_entry() {
        let http = TestRequest::default().to_http_request();
        let session = http.get_session();

        let mut req = OAuthRequest::new();
        load_session(&session, "authorize", &mut req).unwrap();
        assert_eq!(req.session, Some(Params::new()));

        req.session
            .as_mut()
            .unwrap()
            .insert("authorize".into(), json!({ "t1": { "client": "c1" } }));
        save_session(&session, "authorize", &req).unwrap();

        let mut next = OAuthRequest::new();
        load_session(&session, "authorize", &mut next).unwrap();
        assert_eq!(
            next.session.unwrap()["authorize"],
            json!({ "t1": { "client": "c1" } })
        );
    }

    #[actix_web::test]
    async fn empty_entries_are_removed() {
        let http = TestRequest::default().to_http_request();
        let session = http.get_session();
        session.insert("authorize", json!({ "t1": {} })).unwrap();

        let mut req = OAuthRequest::new().with_session(Params::new());
        req.session
            .as_mut()
            .unwrap()
            .insert("authorize".into(), json!({}));
        save_session(&session, "authorize", &req).unwrap();
        assert!(session.get::<Value>("authorize").unwrap().is_none());
    }

    #[actix_web::test]
    async fn requests_without_a_session_map_leave_it_alone() {
        let http = TestRequest::default().to_http_request();
        let session = http.get_session();
        session.insert("authorize", json!({ "t1": {} })).unwrap();

        save_session(&session, "authorize", &OAuthRequest::new()).unwrap();
        assert_eq!(
            session.get::<Value>("authorize").unwrap(),
            Some(json!({ "t1": {} }))
        );
    }
}
