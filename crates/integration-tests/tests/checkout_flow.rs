//! Integration tests for the cart-to-WhatsApp order flow.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use easybuy_core::{OrderId, ProductId};
use easybuy_integration_tests::{
    SUPPORT_WHATSAPP, TestContext, auth_json, build_state, city_json, product_json, user_json,
};
use easybuy_storefront::api::ApiGateway;
use easybuy_storefront::checkout::OrderError;
use easybuy_storefront::models::{City, LoginCredentials};
use easybuy_storefront::navigation::{Location, MemoryNavigator, Navigator};
use easybuy_storefront::notice::NoticeLog;
use easybuy_storefront::storage::FileStore;

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/products/ventilateur/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(product_json(3, "ventilateur", "25000.00", 5)),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products/radio/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(product_json(8, "radio", "7500.00", 10)),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders/cities/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([city_json(
            1,
            "Abidjan",
            "+225 07 00 00 00 01",
            1
        )])))
        .mount(server)
        .await;
}

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

async fn abidjan(ctx: &TestContext) -> City {
    ctx.state
        .gateway()
        .list_cities()
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap()
}

#[tokio::test]
async fn test_sign_in_fill_cart_and_order_through_whatsapp() {
    let ctx = TestContext::new().await;
    mount_catalog(&ctx.server).await;
    mount_login(&ctx.server).await;
    ctx.state.session().start().await;

    let fan = ctx.state.gateway().fetch_product("ventilateur").await.unwrap();
    let radio = ctx.state.gateway().fetch_product("radio").await.unwrap();
    assert!(ctx.state.cart().add_to_cart(&fan, 2).is_applied());
    assert!(ctx.state.cart().add_to_cart(&radio, 1).is_applied());
    assert_eq!(ctx.state.cart().cart().item_count, 3);

    ctx.state
        .session()
        .login(&LoginCredentials::new("awa@example.com", "s3cret"))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/orders/orders/initiate_cart/"))
        .and(body_json(json!({
            "items": [
                { "product_id": 3, "quantity": 2 },
                { "product_id": 8, "quantity": 1 }
            ],
            "city_id": 1
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "order_ids": [41, 42],
            "whatsapp_url": "https://wa.me/2250700000001?text=Commande%20EasyBuy",
            "city": "Abidjan",
            "items_count": 3,
            "total_price": "57500.00"
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let city = abidjan(&ctx).await;
    let redirect = ctx.state.orders().order_cart(&city).await.unwrap();

    assert_eq!(redirect.url.host_str(), Some("wa.me"));
    assert_eq!(redirect.order_ids, vec![OrderId::new(41), OrderId::new(42)]);
    assert_eq!(redirect.total.to_string(), "57500.00");
    assert!(ctx.state.cart().cart().is_empty());
    assert!(
        ctx.messages()
            .contains(&"Redirecting to WhatsApp Abidjan...".to_string())
    );
}

#[tokio::test]
async fn test_anonymous_checkout_is_sent_to_login() {
    let ctx = TestContext::new().await;
    mount_catalog(&ctx.server).await;
    ctx.state.session().start().await;

    let fan = ctx.state.gateway().fetch_product("ventilateur").await.unwrap();
    ctx.state.cart().add_to_cart(&fan, 1);
    let city = abidjan(&ctx).await;

    let err = ctx.state.orders().order_cart(&city).await.unwrap_err();

    assert!(matches!(err, OrderError::NotAuthenticated));
    assert_eq!(
        ctx.navigator.current(),
        Location::with_from("/login", "/panier")
    );
    assert_eq!(ctx.state.cart().get_item_quantity(ProductId::new(3)), 1);
}

#[tokio::test]
async fn test_single_product_order_beyond_stock_is_refused_locally() {
    let ctx = TestContext::new().await;
    mount_catalog(&ctx.server).await;
    mount_login(&ctx.server).await;
    ctx.state.session().start().await;
    ctx.state
        .session()
        .login(&LoginCredentials::new("awa@example.com", "s3cret"))
        .await
        .unwrap();

    let fan = ctx.state.gateway().fetch_product("ventilateur").await.unwrap();
    let city = abidjan(&ctx).await;
    let err = ctx
        .state
        .orders()
        .order_product(&fan, &city, 6)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Validation(_)));
    let initiated = ctx
        .server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .any(|r| r.url.path().ends_with("/initiate/"));
    assert!(!initiated);
}

#[tokio::test]
async fn test_support_link_targets_configured_number() {
    let ctx = TestContext::new().await;

    let url = ctx.state.orders().support_link("Bonjour, une question").unwrap();

    let digits: String = SUPPORT_WHATSAPP.chars().filter(char::is_ascii_digit).collect();
    assert_eq!(url.path(), format!("/{digits}"));
    assert_eq!(
        url.query_pairs().next().unwrap().1,
        "Bonjour, une question"
    );
}

#[tokio::test]
async fn test_cart_and_session_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(1, "awa@example.com")))
        .mount(&server)
        .await;

    {
        let state = build_state(
            &server,
            Arc::new(FileStore::new(state_file.clone())),
            Arc::new(NoticeLog::new()),
            Arc::new(MemoryNavigator::default()),
        );
        state.session().start().await;
        let fan = state.gateway().fetch_product("ventilateur").await.unwrap();
        state.cart().add_to_cart(&fan, 2);
        state
            .session()
            .login(&LoginCredentials::new("awa@example.com", "s3cret"))
            .await
            .unwrap();
    }

    let state = build_state(
        &server,
        Arc::new(FileStore::new(state_file.clone())),
        Arc::new(NoticeLog::new()),
        Arc::new(MemoryNavigator::default()),
    );
    state.session().start().await;

    assert_eq!(state.cart().get_item_quantity(ProductId::new(3)), 2);
    assert_eq!(state.cart().cart().total.to_string(), "50000.00");
    assert!(state.session().is_authenticated());
}
