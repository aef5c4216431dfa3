mod common;

use oauth2_config::StoreKind;
use oauth2_storage_factory::create_store;

#[tokio::test]
async fn session_store_satisfies_contract() {
    let store = create_store(StoreKind::Session);
    assert!(store.is_legacy());
    common::run_transaction_store_contract(&store)
        .await
        .expect("session store contract");
}

#[tokio::test]
async fn memory_store_satisfies_contract() {
    let store = create_store(StoreKind::Memory);
    assert!(!store.is_legacy());
    common::run_transaction_store_contract(&store)
        .await
        .expect("memory store contract");
}
