mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use payment_service::app_router;
use payment_service::models::TransactionStatus;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn charge_body(amount: f64) -> serde_json::Value {
    serde_json::json!({
        "amount": amount,
        "currency": "USD",
        "card": {
            "number": "4242424242424242",
            "exp_month": "12",
            "exp_year": "28",
            "cvv": "123",
            "cardholder_name": "Jane Doe"
        }
    })
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-Company-ID", TEST_COMPANY_ID)
        .header("X-User-ID", "u1")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn approved_charge_creates_a_local_transaction() {
    let server = MockServer::start().await;
    mock_approved_sale(&server, "tx_100", "12000").await;

    let store = std::sync::Arc::new(InMemoryTransactionStore::default());
    let router = app_router(test_state(&server.uri(), store.clone()));

    let response = router
        .oneshot(post_json("/payments", charge_body(120.0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "APPROVED");
    assert_eq!(json["data"]["amount"], 120.0);
    assert_eq!(json["data"]["gatewayTransactionId"], "tx_100");
    assert_eq!(json["data"]["card"], "VISA ****4242");

    let stored = store.by_gateway_id("tx_100").expect("transaction persisted");
    assert_eq!(stored.company_id, TEST_COMPANY_ID);
    assert_eq!(stored.status, TransactionStatus::Approved);
}

#[tokio::test]
async fn declined_charge_returns_402_with_the_mapped_message() {
    let server = MockServer::start().await;
    mock_declined_sale(&server, "302").await;

    let store = std::sync::Arc::new(InMemoryTransactionStore::default());
    let router = app_router(test_state(&server.uri(), store.clone()));

    let response = router
        .oneshot(post_json("/payments", charge_body(120.0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Insufficient funds");
    assert_eq!(json["errorCode"], "302");

    // The decline is still recorded locally.
    assert_eq!(store.count(), 1);
}

#[tokio::test]
async fn invalid_charge_payload_never_reaches_the_gateway() {
    let server = MockServer::start().await;

    let store = std::sync::Arc::new(InMemoryTransactionStore::default());
    let router = app_router(test_state(&server.uri(), store.clone()));

    let response = router
        .oneshot(post_json("/payments", charge_body(0.0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.count(), 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn charge_requires_the_company_header() {
    let server = MockServer::start().await;
    let store = std::sync::Arc::new(InMemoryTransactionStore::default());
    let router = app_router(test_state(&server.uri(), store));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments")
                .header("content-type", "application/json")
                .body(Body::from(charge_body(10.0).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn status_query_refreshes_from_the_gateway() {
    let server = MockServer::start().await;
    mock_status_query(&server, "tx_100", "voided").await;

    let transaction = approved_transaction("tx_100");
    let id = transaction.id;
    let store = InMemoryTransactionStore::with_transaction(transaction);
    let router = app_router(test_state(&server.uri(), store.clone()));

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/payments/{}", id))
                .header("X-Company-ID", TEST_COMPANY_ID)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "VOIDED");

    // The refresh was written back.
    assert_eq!(store.transaction(id).unwrap().status, TransactionStatus::Voided);
}

#[tokio::test]
async fn status_query_degrades_to_last_known_when_the_gateway_is_down() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let transaction = approved_transaction("tx_100");
    let id = transaction.id;
    let store = InMemoryTransactionStore::with_transaction(transaction);
    let router = app_router(test_state(&uri, store));

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/payments/{}", id))
                .header("X-Company-ID", TEST_COMPANY_ID)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "APPROVED");
}

#[tokio::test]
async fn unknown_transaction_is_not_found() {
    let server = MockServer::start().await;
    let store = std::sync::Arc::new(InMemoryTransactionStore::default());
    let router = app_router(test_state(&server.uri(), store));

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/payments/{}", Uuid::new_v4()))
                .header("X-Company-ID", TEST_COMPANY_ID)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn void_updates_the_local_record() {
    let server = MockServer::start().await;
    mock_followup(&server, "tx_100", "void", "voided").await;

    let transaction = approved_transaction("tx_100");
    let id = transaction.id;
    let store = InMemoryTransactionStore::with_transaction(transaction);
    let router = app_router(test_state(&server.uri(), store.clone()));

    let response = router
        .oneshot(post_json(
            &format!("/payments/{}", id),
            serde_json::json!({ "action": "void" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "VOIDED");
    assert_eq!(store.transaction(id).unwrap().status, TransactionStatus::Voided);
}

#[tokio::test]
async fn partial_refund_passes_the_amount_through() {
    let server = MockServer::start().await;
    mock_followup(&server, "tx_100", "refund", "refunded").await;

    let transaction = approved_transaction("tx_100");
    let id = transaction.id;
    let store = InMemoryTransactionStore::with_transaction(transaction);
    let router = app_router(test_state(&server.uri(), store.clone()));

    let response = router
        .oneshot(post_json(
            &format!("/payments/{}", id),
            serde_json::json!({ "action": "refund", "amount": 50.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "REFUNDED");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["amount"], "5000");
}

#[tokio::test]
async fn refund_over_the_original_amount_is_rejected_before_the_gateway() {
    let server = MockServer::start().await;

    let transaction = approved_transaction("tx_100"); // amount 120.0
    let id = transaction.id;
    let store = InMemoryTransactionStore::with_transaction(transaction);
    let router = app_router(test_state(&server.uri(), store.clone()));

    let response = router
        .oneshot(post_json(
            &format!("/payments/{}", id),
            serde_json::json!({ "action": "refund", "amount": 500.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);

    // Nothing reached the gateway and the local record is untouched.
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(store.transaction(id).unwrap().status, TransactionStatus::Approved);
}

#[tokio::test]
async fn unknown_action_is_a_bad_request() {
    let server = MockServer::start().await;

    let transaction = approved_transaction("tx_100");
    let id = transaction.id;
    let store = InMemoryTransactionStore::with_transaction(transaction);
    let router = app_router(test_state(&server.uri(), store));

    let response = router
        .oneshot(post_json(
            &format!("/payments/{}", id),
            serde_json::json!({ "action": "reverse" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn void_requires_an_approved_transaction() {
    let server = MockServer::start().await;

    let mut transaction = approved_transaction("tx_100");
    transaction.status = TransactionStatus::Refunded;
    let id = transaction.id;
    let store = InMemoryTransactionStore::with_transaction(transaction);
    let router = app_router(test_state(&server.uri(), store));

    let response = router
        .oneshot(post_json(
            &format!("/payments/{}", id),
            serde_json::json!({ "action": "void" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn health_check_works() {
    let server = MockServer::start().await;
    let store = std::sync::Arc::new(InMemoryTransactionStore::default());
    let router = app_router(test_state(&server.uri(), store));

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
