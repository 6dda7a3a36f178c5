//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ledger::{InMemoryLedger, InMemoryTransferStore};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (
    axum::Router,
    Arc<api::routes::transfers::AppState<InMemoryLedger, InMemoryTransferStore>>,
    ledger::Account,
    ledger::Account,
) {
    let config = api::Config::default();
    let runtime = api::create_default_state(&config);
    let (origin, destination) =
        api::seed_demo_accounts(&runtime.state.ledger, &runtime.state.directory).await;
    let app = api::create_app(runtime.state.clone(), get_metrics_handle());
    (app, runtime.state.clone(), origin, destination)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_transfer(origin_account_id: &str, destination_key: &str, amount_cents: i64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/transfers")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({
                "origin_account_id": origin_account_id,
                "destination_key": destination_key,
                "amount_cents": amount_cents,
            }))
            .unwrap(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_and_get_transfer() {
    let (app, _, origin, destination) = setup().await;

    let response = app
        .clone()
        .oneshot(post_transfer(
            &origin.id.to_string(),
            "rui@example.com",
            25_000,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["amount_cents"], 25_000);
    assert_eq!(json["receiver_name"], "Rui Costa");
    assert_eq!(
        json["destination_account_id"],
        destination.id.to_string()
    );
    // The raw key never appears in responses
    assert_eq!(json["destination_key"], "r****@example.com");

    let id = json["id"].as_str().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/transfers/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], id);
    assert_eq!(json["status"], "COMPLETED");
}

#[tokio::test]
async fn test_get_unknown_transfer_is_404() {
    let (app, _, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/transfers/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_zero_amount_is_bad_request() {
    let (app, _, origin, _) = setup().await;

    let response = app
        .oneshot(post_transfer(&origin.id.to_string(), "rui@example.com", 0))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_AMOUNT");
}

#[tokio::test]
async fn test_malformed_origin_id_is_bad_request() {
    let (app, _, _, _) = setup().await;

    let response = app
        .oneshot(post_transfer("not-a-uuid", "rui@example.com", 1_000))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_destination_key_is_404() {
    let (app, _, origin, _) = setup().await;

    let response = app
        .oneshot(post_transfer(
            &origin.id.to_string(),
            "nobody@example.com",
            1_000,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "DESTINATION_NOT_FOUND");
}

#[tokio::test]
async fn test_insufficient_funds_is_unprocessable() {
    let (app, _, _, destination) = setup().await;

    // The destination account holds R$ 500; send more than that from it
    let response = app
        .oneshot(post_transfer(
            &destination.id.to_string(),
            "ana@example.com",
            100_000,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INSUFFICIENT_FUNDS");
}

#[tokio::test]
async fn test_settlement_rejection_carries_the_authority_code() {
    let (app, _, origin, _) = setup().await;

    // The simulated authority refuses amounts at or above R$ 100 000
    let response = app
        .oneshot(post_transfer(
            &origin.id.to_string(),
            "rui@example.com",
            10_000_000,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "EXTERNAL_REJECTED");
    assert_eq!(json["settlement_code"], "LIMIT_EXCEEDED");
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (app, _, origin, _) = setup().await;

    // Generate some traffic first
    let _ = app
        .clone()
        .oneshot(post_transfer(&origin.id.to_string(), "rui@example.com", 500))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
