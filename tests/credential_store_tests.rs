// SqliteKvStore + CredentialStore: persistence across connections, sentinel handling

mod common;

use actuator_monitor::credential_store::{
    ACCESS_TOKEN_KEY, CredentialStore, KvStore, SqliteKvStore, USER_KEY,
};
use common::{ACCESS, REFRESH, user};
use std::sync::Arc;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> Arc<SqliteKvStore> {
    let path = dir.path().join("nested").join("monitor.db");
    let kv = SqliteKvStore::connect(path.to_str().unwrap()).await.unwrap();
    kv.init().await.unwrap();
    Arc::new(kv)
}

#[tokio::test]
async fn test_kv_set_get_remove() {
    let dir = TempDir::new().unwrap();
    let kv = open(&dir).await;
    assert_eq!(kv.get("k").await.unwrap(), None);
    kv.set("k", "v1").await.unwrap();
    kv.set("k", "v2").await.unwrap();
    assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v2"));
    kv.remove("k").await.unwrap();
    assert_eq!(kv.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_credentials_survive_reconnect() {
    let dir = TempDir::new().unwrap();
    {
        let store = CredentialStore::new(open(&dir).await);
        assert!(store.set(ACCESS, Some(REFRESH), Some(&user())).await.unwrap());
    }
    let store = CredentialStore::new(open(&dir).await);
    assert_eq!(store.access_token().await.as_deref(), Some(ACCESS));
    assert_eq!(store.refresh_token().await.as_deref(), Some(REFRESH));
    assert_eq!(store.user().await, Some(user()));
    assert!(store.is_authenticated().await);
}

#[tokio::test]
async fn test_sentinel_strings_read_as_absent() {
    let dir = TempDir::new().unwrap();
    let kv = open(&dir).await;
    let store = CredentialStore::new(kv.clone());
    for sentinel in ["undefined", "null", ""] {
        kv.set(ACCESS_TOKEN_KEY, sentinel).await.unwrap();
        assert_eq!(store.access_token().await, None, "sentinel {:?}", sentinel);
    }
}

#[tokio::test]
async fn test_corrupt_user_record_is_discarded_on_read() {
    let dir = TempDir::new().unwrap();
    let kv = open(&dir).await;
    let store = CredentialStore::new(kv.clone());
    store.set(ACCESS, Some(REFRESH), None).await.unwrap();
    kv.set(USER_KEY, "{not json").await.unwrap();

    assert_eq!(store.user().await, None);
    assert_eq!(kv.get(USER_KEY).await.unwrap(), None);
    assert!(!store.is_authenticated().await);
}

#[tokio::test]
async fn test_clear_removes_all_credentials() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::new(open(&dir).await);
    store.set(ACCESS, Some(REFRESH), Some(&user())).await.unwrap();
    store.clear().await.unwrap();
    assert_eq!(store.access_token().await, None);
    assert_eq!(store.refresh_token().await, None);
    assert_eq!(store.user().await, None);
}
