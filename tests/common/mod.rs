use serde_json::{json, Value};

use oauth2_core::{
    AuthorizationRequest, ChainOutcome, ClientSerialization, ErrorKind, OAuthRequest, Params,
    Transaction, TransactionOptions, TypeSet,
};
use oauth2_ports::{DynTransactionStore, StoreContext};

/// Client chain shared by the contract: only the id is stored.
pub fn clients() -> ClientSerialization {
    let mut clients = ClientSerialization::new();
    clients.add_serializer(|client: &Value| match client.get("id") {
        Some(id) => ChainOutcome::Matched(id.clone()),
        None => ChainOutcome::Skip,
    });
    clients.add_deserializer(|stored: &Value| match stored.as_str() {
        Some(id) => ChainOutcome::Matched(Some(json!({ "id": id, "name": "Contract Client" }))),
        None => ChainOutcome::Skip,
    });
    clients
}

pub fn pending_transaction() -> Transaction {
    let mut areq = AuthorizationRequest::new(TypeSet::parse("code"));
    areq.insert("client_id", json!("c123"));
    areq.insert("state", json!("xyz"));
    let mut txn = Transaction::new(areq);
    txn.validated(
        Some(json!({ "id": "c123", "name": "Contract Client" })),
        Some("https://cb".into()),
        None,
    );
    txn
}

fn with_id(req: &mut OAuthRequest, field: &str, id: &str) {
    req.query.insert(field.to_string(), json!(id));
}

/// A minimal contract test suite that every transaction store must satisfy.
///
/// This keeps the session-embedded and in-process stores at parity.
pub async fn run_transaction_store_contract(
    store: &DynTransactionStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let clients = clients();
    let options = TransactionOptions::default();
    let cx = StoreContext::new(&clients, &options);
    let field = options.transaction_field.as_str();

    let mut req = OAuthRequest::new().with_session(Params::new());

    // Store + load roundtrip
    let id = store.store(cx, &mut req, &pending_transaction()).await?;
    assert!(!id.is_empty(), "store must hand back an id");

    with_id(&mut req, field, &id);
    let loaded = store.load(cx, &mut req).await?;
    assert_eq!(loaded.transaction_id.as_deref(), Some(id.as_str()));
    assert_eq!(loaded.req.state(), Some("xyz"));
    assert_eq!(loaded.redirect_uri.as_deref(), Some("https://cb"));
    assert_eq!(
        loaded.client,
        Some(json!({ "id": "c123", "name": "Contract Client" }))
    );

    // Ids are unique per stored transaction
    let other = store.store(cx, &mut req, &pending_transaction()).await?;
    assert_ne!(other, id, "two stored transactions must not share an id");

    // Update keeps the id and replaces the content
    let mut changed = pending_transaction();
    let mut info = Params::new();
    info.insert("prompt".into(), json!("consent"));
    changed.set_info(Some(info));
    assert_eq!(store.update(cx, &mut req, &id, &changed).await?, id);
    let reloaded = store.load(cx, &mut req).await?;
    assert_eq!(
        reloaded.info.as_ref().and_then(|i| i.get("prompt")),
        Some(&json!("consent"))
    );

    // Remove is idempotent and the transaction is gone afterwards
    store.remove(&options, &mut req, &id).await?;
    store.remove(&options, &mut req, &id).await?;
    let err = store
        .load(cx, &mut req)
        .await
        .err()
        .ok_or_else(|| std::io::Error::other("removed transaction should not load"))?;
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(
        err.message(),
        format!("Unable to load OAuth 2.0 transaction: {}", id)
    );

    // The other transaction is untouched
    with_id(&mut req, field, &other);
    assert!(store.load(cx, &mut req).await.is_ok());

    // Missing id
    req.query.remove(field);
    let err = store
        .load(cx, &mut req)
        .await
        .err()
        .ok_or_else(|| std::io::Error::other("load without an id should fail"))?;
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    Ok(())
}
