mod common;

use client::error::ApiError;
use client::router::{Navigation, Route, navigate};
use client::state::auth::AuthState;
use client::storage::LocalStorage;
use client::ApiClient;
use common::{ADMIN_EMAIL, ANALYST_EMAIL, MockServer, PASSWORD};

async fn signed_in(server: &MockServer, email: &str) -> (ApiClient, AuthState) {
    let mut api = ApiClient::new(server.config()).unwrap();
    let token = api.login(email, PASSWORD).await.unwrap();
    api.set_token(Some(token.clone()));
    let mut auth = AuthState::default();
    auth.set_token(Some(token));
    assert!(auth.load_user(&api).await.unwrap());
    (api, auth)
}

#[tokio::test]
async fn login_issues_usable_token() {
    let server = MockServer::start().await;
    let (api, auth) = signed_in(&server, ADMIN_EMAIL).await;

    assert!(auth.is_authenticated());
    assert_eq!(auth.user.as_ref().unwrap().email, ADMIN_EMAIL);
    assert!(auth.has_permission("settings:write"));
    assert!(api.sidebar().await.is_ok());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let server = MockServer::start().await;
    let api = ApiClient::new(server.config()).unwrap();
    let err = api.login(ADMIN_EMAIL, "nope").await.unwrap_err();
    assert!(matches!(&err, ApiError::Unauthorized(message) if message == "invalid credentials"));
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn logout_invalidates_session() {
    let server = MockServer::start().await;
    let (mut api, mut auth) = signed_in(&server, ANALYST_EMAIL).await;

    auth.clear();
    api.set_token(None);
    assert!(!auth.load_user(&api).await.unwrap());
    assert_eq!(
        navigate("/dashboard", &auth),
        Navigation::Redirect("/login".to_owned())
    );
    assert!(matches!(api.sidebar().await, Err(ApiError::Unauthorized(_))));
}

#[tokio::test]
async fn stale_token_clears_state() {
    let server = MockServer::start().await;
    let (api, mut auth) = signed_in(&server, ANALYST_EMAIL).await;

    server.revoke_all_sessions();
    assert!(!auth.load_user(&api).await.unwrap());
    assert!(!auth.is_authenticated());
    assert!(auth.user.is_none());
}

#[tokio::test]
async fn analyst_permissions_drive_the_guard() {
    let server = MockServer::start().await;
    let (_api, auth) = signed_in(&server, ANALYST_EMAIL).await;

    assert!(auth.has_permission("ticket:read"));
    assert_eq!(navigate("/tasks", &auth), Navigation::Render(Route::Tasks));
    assert_eq!(
        navigate("/settings", &auth),
        Navigation::Redirect("/dashboard".to_owned())
    );
}

#[tokio::test]
async fn token_survives_restart_through_storage() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    {
        let (api, _auth) = signed_in(&server, ADMIN_EMAIL).await;
        let mut storage = LocalStorage::open_at(&path).unwrap();
        storage.set_token(api.token()).unwrap();
    }

    let storage = LocalStorage::open_at(&path).unwrap();
    let mut api = ApiClient::new(server.config()).unwrap();
    api.set_token(storage.token());
    let mut auth = AuthState::default();
    auth.set_token(storage.token());
    assert!(auth.load_user(&api).await.unwrap());
    assert_eq!(auth.user.unwrap().username, "admin");
}

#[tokio::test]
async fn password_reset_request_succeeds() {
    let server = MockServer::start().await;
    let api = ApiClient::new(server.config()).unwrap();
    api.request_password_reset(ADMIN_EMAIL).await.unwrap();
}
