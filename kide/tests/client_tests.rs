//! HTTP-level tests for the kide client against a mock server

#![allow(clippy::unwrap_used)]

use salegate_kide::{KideClient, KideError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> KideClient {
    KideClient::new("test-token").with_api_url(format!("{}/api", server.uri()))
}

#[tokio::test]
async fn test_product_sends_bearer_and_parses_variants() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/42"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": {
                "product": { "name": "Spring Gala", "dateSalesFrom": "2025-04-01T12:00:00+03:00" },
                "variants": [
                    { "inventoryId": "a", "name": "GA", "description": "Standing",
                      "productVariantMaximumReservableQuantity": 1 },
                    { "inventoryId": "b", "name": "GA-VIP", "description": null,
                      "productVariantMaximumReservableQuantity": 2 }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let product = client_for(&server).product("42").await.unwrap();

    assert_eq!(product.product.name, "Spring Gala");
    assert_eq!(product.variants.len(), 2);
    assert_eq!(product.variants[1].inventory_id, "b");
    assert_eq!(product.variants[1].max_reservable_quantity, 2);
}

#[tokio::test]
async fn test_product_not_found_is_not_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).product("missing").await.unwrap_err();

    assert!(matches!(err, KideError::NotFound));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/42"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client_for(&server).product("42").await.unwrap_err();

    assert!(matches!(err, KideError::ApiError { status: 502, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_reserve_posts_expected_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reservations"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "toCreate": [{ "inventoryId": "b", "quantity": 2, "productVariantUserForm": null }],
            "toCancel": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": { "reservations": [{ "variantName": "GA-VIP", "quantity": 2 }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reserved = client_for(&server).reserve("b", 2).await.unwrap();

    assert_eq!(reserved.variant_name, "GA-VIP");
    assert_eq!(reserved.quantity, Some(2));
}

#[tokio::test]
async fn test_reserve_conflict_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reservations"))
        .respond_with(ResponseTemplate::new(409).set_body_string("sold out"))
        .mount(&server)
        .await;

    let err = client_for(&server).reserve("a", 1).await.unwrap_err();

    match err {
        KideError::ApiError { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "sold out");
        },
        other => unreachable!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_reserve_without_reservations_is_missing_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": { "reservations": [] }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).reserve("a", 1).await.unwrap_err();

    assert!(matches!(err, KideError::MissingField("reservations")));
}
