//! Integration tests for sign-in, session restore, and forced sign-out.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use easybuy_core::UserId;
use easybuy_integration_tests::{TestContext, auth_json, build_state, user_json};
use easybuy_storefront::guard::GuardDecision;
use easybuy_storefront::models::{LoginCredentials, RegistrationData};
use easybuy_storefront::navigation::{Location, MemoryNavigator, Navigator};
use easybuy_storefront::notice::NoticeLog;
use easybuy_storefront::session::SessionError;
use easybuy_storefront::storage::{KeyValueStore, MemoryStore, keys};

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/users/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_json(
            &user_json(1, "awa@example.com"),
            "access-1",
            "refresh-1",
        )))
        .mount(server)
        .await;
}

async fn signed_in(ctx: &TestContext) {
    mount_login(&ctx.server).await;
    ctx.state
        .session()
        .login(&LoginCredentials::new("awa@example.com", "s3cret"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_login_persists_identity_and_returns_to_target() {
    let ctx = TestContext::starting_at(Location::with_from("/login", "/mes-commandes")).await;
    ctx.state.session().start().await;

    signed_in(&ctx).await;

    assert_eq!(ctx.stored(keys::AUTH_TOKEN).as_deref(), Some("access-1"));
    assert_eq!(ctx.stored(keys::REFRESH_TOKEN).as_deref(), Some("refresh-1"));
    assert!(ctx.stored(keys::AUTH_USER).unwrap().contains("awa@example.com"));
    assert!(ctx.messages().contains(&"Signed in successfully".to_string()));

    let decision = ctx.state.guard().apply(ctx.state.navigator());
    assert_eq!(
        decision,
        GuardDecision::Redirect(Location::new("/mes-commandes"))
    );
    assert_eq!(ctx.current_path(), "/mes-commandes");
}

#[tokio::test]
async fn test_login_field_errors_become_notices() {
    let ctx = TestContext::new().await;
    ctx.state.session().start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/login/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Invalid credentials",
            "errors": { "password": ["Wrong password"] }
        })))
        .mount(&ctx.server)
        .await;

    let err = ctx
        .state
        .session()
        .login(&LoginCredentials::new("awa@example.com", "nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Api(_)));
    assert_eq!(ctx.messages(), vec!["password: Wrong password".to_string()]);
    assert!(!ctx.state.session().is_authenticated());
    assert!(!ctx.state.session().is_loading());
}

#[tokio::test]
async fn test_register_signs_in_with_issued_tokens() {
    let ctx = TestContext::new().await;
    ctx.state.session().start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/register/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_json(
            &user_json(4, "fatou@example.com"),
            "access-4",
            "refresh-4",
        )))
        .mount(&ctx.server)
        .await;

    let data = RegistrationData {
        username: Some("fatou".to_string()),
        email: "fatou@example.com".to_string(),
        phone: "+2250700000004".to_string(),
        whatsapp: None,
        first_name: Some("Fatou".to_string()),
        last_name: None,
        address: None,
        city: Some("Abidjan".to_string()),
        password: "pw-123456".to_string().into(),
        password_confirmation: "pw-123456".to_string().into(),
        user_type: None,
    };
    let user = ctx.state.session().register(&data).await.unwrap();

    assert_eq!(user.id, UserId::new(4));
    assert!(ctx.state.session().is_authenticated());
    assert_eq!(ctx.stored(keys::AUTH_TOKEN).as_deref(), Some("access-4"));
    assert!(ctx.messages().contains(&"Account created successfully".to_string()));
}

#[tokio::test]
async fn test_register_mismatched_passwords_never_reach_backend() {
    let ctx = TestContext::new().await;
    ctx.state.session().start().await;

    let data = RegistrationData {
        username: None,
        email: "fatou@example.com".to_string(),
        phone: "+2250700000004".to_string(),
        whatsapp: None,
        first_name: None,
        last_name: None,
        address: None,
        city: None,
        password: "pw-123456".to_string().into(),
        password_confirmation: "pw-654321".to_string().into(),
        user_type: None,
    };
    let err = ctx.state.session().register(&data).await.unwrap_err();

    assert!(matches!(err, SessionError::Validation(_)));
    assert!(ctx.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_start_revalidates_persisted_session() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    store.set(keys::AUTH_TOKEN, "access-1").unwrap();
    store.set(keys::REFRESH_TOKEN, "refresh-1").unwrap();
    store
        .set(
            keys::AUTH_USER,
            &user_json(1, "old@example.com").to_string(),
        )
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/users/profile/"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(1, "awa@example.com")))
        .expect(1)
        .mount(&server)
        .await;

    let state = build_state(
        &server,
        store.clone(),
        Arc::new(NoticeLog::new()),
        Arc::new(MemoryNavigator::default()),
    );
    assert!(state.session().is_loading());

    state.session().start().await;

    assert!(!state.session().is_loading());
    assert_eq!(state.session().user().unwrap().email, "awa@example.com");
    assert!(store.get(keys::AUTH_USER).unwrap().unwrap().contains("awa@example.com"));
}

#[tokio::test]
async fn test_start_drops_rejected_session() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    store.set(keys::AUTH_TOKEN, "expired").unwrap();
    store.set(keys::REFRESH_TOKEN, "refresh-1").unwrap();
    store
        .set(keys::AUTH_USER, &user_json(1, "awa@example.com").to_string())
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/users/profile/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })),
        )
        .mount(&server)
        .await;

    let state = build_state(
        &server,
        store.clone(),
        Arc::new(NoticeLog::new()),
        Arc::new(MemoryNavigator::default()),
    );
    state.session().start().await;

    assert!(!state.session().is_authenticated());
    assert!(!state.session().is_loading());
    for key in keys::IDENTITY {
        assert!(!store.contains(key), "{key} should be cleared");
    }
}

#[tokio::test]
async fn test_unauthorized_reply_signs_out_everywhere() {
    let ctx = TestContext::new().await;
    ctx.state.session().start().await;
    signed_in(&ctx).await;
    ctx.navigator.navigate(Location::new("/mes-commandes"));

    Mock::given(method("GET"))
        .and(path("/api/orders/orders/history/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })),
        )
        .mount(&ctx.server)
        .await;

    let err = ctx.state.orders().order_history().await.unwrap_err();

    assert!(matches!(
        err,
        easybuy_storefront::checkout::OrderError::Api(ref e) if e.is_unauthorized()
    ));
    assert!(!ctx.state.session().is_authenticated());
    for key in keys::IDENTITY {
        assert!(ctx.stored(key).is_none(), "{key} should be cleared");
    }
    assert_eq!(ctx.current_path(), "/login");
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let ctx = TestContext::new().await;
    ctx.state.session().start().await;
    signed_in(&ctx).await;

    Mock::given(method("POST"))
        .and(path("/api/users/logout/"))
        .and(body_json(json!({ "refresh": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.state.session().logout().await;

    assert!(!ctx.state.session().is_authenticated());
    assert!(ctx.stored(keys::AUTH_TOKEN).is_none());
    assert!(ctx.messages().contains(&"Signed out".to_string()));
    assert_eq!(ctx.current_path(), "/");
}

#[tokio::test]
async fn test_logout_completes_when_backend_fails() {
    let ctx = TestContext::new().await;
    ctx.state.session().start().await;
    signed_in(&ctx).await;

    Mock::given(method("POST"))
        .and(path("/api/users/logout/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    ctx.state.session().logout().await;

    assert!(!ctx.state.session().is_authenticated());
    assert!(ctx.stored(keys::REFRESH_TOKEN).is_none());
}
