use medicare::navigation::{self, GuardDecision, StartRoute};
use medicare::storage::{FileStorage, KeyValueStorage};
use medicare::store::AUTH_STORAGE_KEY;
use medicare::test_utils::{app_context, FakeBackend};
use medicare::AppContext;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir, backend: &Arc<FakeBackend>) -> AppContext {
    let storage = FileStorage::new(dir.path()).expect("data dir");
    app_context(backend, Arc::new(storage))
}

fn persisted_auth(dir: &TempDir) -> Value {
    let storage = FileStorage::new(dir.path()).expect("data dir");
    let raw = storage
        .get(AUTH_STORAGE_KEY)
        .expect("readable")
        .expect("written");
    serde_json::from_str(&raw).expect("json")
}

#[tokio::test]
async fn test_start_route_waits_for_hydration() {
    let dir = TempDir::new().expect("temp dir");
    let backend = FakeBackend::new();
    let ctx = open(&dir, &backend);

    assert_eq!(navigation::start_route(&ctx.auth_store).await, None);

    ctx.hydrate();
    assert_eq!(
        navigation::start_route(&ctx.auth_store).await,
        Some(StartRoute::Login)
    );
}

#[tokio::test]
async fn test_login_survives_restart() {
    let dir = TempDir::new().expect("temp dir");
    let backend = FakeBackend::new();
    backend.seed_account("grey@example.com", "password1", "Meredith Grey");

    let ctx = open(&dir, &backend);
    ctx.hydrate();
    ctx.auth_store
        .login("grey@example.com", "password1")
        .await
        .expect("login");
    let user = ctx.auth_store.user();
    drop(ctx);

    let persisted = persisted_auth(&dir);
    assert_eq!(persisted["version"], 0);
    assert_eq!(persisted["state"]["isLoggedIn"], true);
    assert!(persisted["state"].get("isLoading").is_none());

    let restarted = open(&dir, &backend);
    restarted.hydrate();
    assert!(restarted.auth_store.has_hydrated());
    assert_eq!(restarted.auth_store.user(), user);
    assert!(!restarted.auth_store.is_loading());

    assert_eq!(
        navigation::start_route(&restarted.auth_store).await,
        Some(StartRoute::Home)
    );
    assert_eq!(
        navigation::guard(&restarted.auth_store.state()),
        GuardDecision::Render
    );
}

#[tokio::test]
async fn test_expired_session_routes_to_login_and_clears_storage() {
    let dir = TempDir::new().expect("temp dir");
    let backend = FakeBackend::new();
    backend.seed_account("grey@example.com", "password1", "Meredith Grey");

    let ctx = open(&dir, &backend);
    ctx.hydrate();
    ctx.auth_store
        .login("grey@example.com", "password1")
        .await
        .expect("login");
    drop(ctx);

    assert!(backend.expire_session());

    let restarted = open(&dir, &backend);
    restarted.hydrate();
    assert!(restarted.auth_store.is_logged_in());

    assert_eq!(
        navigation::start_route(&restarted.auth_store).await,
        Some(StartRoute::Login)
    );
    assert_eq!(
        navigation::guard(&restarted.auth_store.state()),
        GuardDecision::RedirectToLogin
    );

    let persisted = persisted_auth(&dir);
    assert_eq!(persisted["state"]["isLoggedIn"], false);
    assert!(persisted["state"]["user"].is_null());
}

#[tokio::test]
async fn test_corrupt_state_starts_signed_out() {
    let dir = TempDir::new().expect("temp dir");
    let storage = FileStorage::new(dir.path()).expect("data dir");
    storage
        .set(AUTH_STORAGE_KEY, "{\"state\": {\"user\": 42")
        .expect("write");

    let backend = FakeBackend::new();
    let ctx = open(&dir, &backend);
    ctx.hydrate();

    assert!(ctx.auth_store.has_hydrated());
    assert!(!ctx.auth_store.is_logged_in());
    assert_eq!(
        navigation::start_route(&ctx.auth_store).await,
        Some(StartRoute::Login)
    );
}

#[tokio::test]
async fn test_hydrate_twice_is_harmless() {
    let dir = TempDir::new().expect("temp dir");
    let backend = FakeBackend::new();
    let ctx = open(&dir, &backend);

    ctx.hydrate();
    ctx.hydrate();

    assert!(ctx.auth_store.has_hydrated());
    assert_eq!(backend.calls("get"), 0);
}
