/// Advance endpoints exercised through the router
/// Covers the request paths that finish before the funding-config lookup,
/// including access-key and body rejections
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

use royalty_advance_api::config::{Config, DEFAULT_SALESFORCE_API_VERSION};
use royalty_advance_api::handlers::{self, AppState};
use royalty_advance_api::salesforce_auth::SalesforceConnector;
use royalty_advance_api::salesforce_client::SalesforceSession;

const API_KEY: &str = "test-key";

fn test_app() -> Router {
    let config = Config {
        database_url: "postgresql://localhost/royalty_test".to_string(),
        port: 3000,
        api_key: API_KEY.to_string(),
        salesforce_api_version: DEFAULT_SALESFORCE_API_VERSION.to_string(),
        salesforce_login_url: "https://test.salesforce.com".to_string(),
        salesforce_client_id: None,
        salesforce_username: None,
        salesforce_private_key_path: None,
        salesforce_access_token: None,
        salesforce_instance_url: None,
    };
    let salesforce = SalesforceConnector::with_static_session(
        SalesforceSession {
            access_token: "unused".to_string(),
            instance_url: "https://example.my.salesforce.com".to_string(),
        },
        DEFAULT_SALESFORCE_API_VERSION,
    )
    .unwrap();

    let state = Arc::new(AppState {
        db: PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap(),
        config,
        salesforce,
    });

    handlers::api_routes().with_state(state)
}

fn post(uri: &str, content_type: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .header("access-key", API_KEY)
        .body(Body::from(body))
        .unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_advance_amount_closed_form() {
    let (status, body) = send(post(
        "/api/royalty/advance-amount",
        "application/json",
        json!({
            "trended_annual": 2000.0,
            "cushion": 0.10,
            "decline_rate": 0.0,
            "term_years": 2.0,
            "frequency": "Monthly",
            "discount_rate": 0.05
        })
        .to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projected_advance"], 3420.0);
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["inputs"]["frequency"], "Monthly");
    assert_eq!(body["inputs"]["trended_annual"], 2000.0);
}

#[tokio::test]
async fn test_empty_json_ledger_is_insufficient_data() {
    let (status, body) = send(post(
        "/api/royalty/advance-estimate",
        "application/json",
        json!({"earnings": []}).to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient earnings data"));
}

#[tokio::test]
async fn test_header_only_csv_is_insufficient_data() {
    let (status, body) = send(post(
        "/api/royalty/advance-estimate/csv",
        "text/csv",
        "artist_id,partner_name,track_title,earning_amount,currency,date\n".to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient earnings data"));
}

#[tokio::test]
async fn test_non_numeric_amount_is_rejected() {
    let (status, body) = send(post(
        "/api/royalty/advance-estimate",
        "application/json",
        json!({"earnings": [{
            "artist_id": 17,
            "partner_name": "cinq",
            "track_title": "Song",
            "earning_amount": "lots",
            "currency": "USD",
            "date": "2024-05-01"
        }]})
        .to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Row 1"));
}

#[tokio::test]
async fn test_csv_missing_column_is_rejected() {
    let (status, body) = send(post(
        "/api/royalty/advance-estimate/csv",
        "text/csv",
        "artist_id,partner_name,track_title,currency,date\n\
         a1,cinq,Song,USD,2024-05-01\n"
            .to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("earning_amount"));
}

#[tokio::test]
async fn test_advance_routes_require_access_key() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/royalty/advance-estimate")
        .header("content-type", "application/json")
        .body(Body::from(json!({"earnings": []}).to_string()))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid API Key");
}

#[tokio::test]
async fn test_empty_csv_body_is_insufficient_data() {
    let (status, body) = send(post(
        "/api/royalty/advance-estimate/csv",
        "text/csv",
        String::new(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient earnings data"));
}

#[tokio::test]
async fn test_malformed_json_body_is_bad_request() {
    let (status, body) = send(post(
        "/api/royalty/advance-estimate",
        "application/json",
        "{\"earnings\": [".to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_mistyped_field_is_bad_request() {
    let (status, body) = send(post(
        "/api/royalty/advance-amount",
        "application/json",
        json!({
            "trended_annual": "lots",
            "cushion": 0.10,
            "decline_rate": 0.0,
            "term_years": 2.0,
            "frequency": "Monthly",
            "discount_rate": 0.05
        })
        .to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_wrong_key_wins_over_bad_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/royalty/advance-amount")
        .header("content-type", "application/json")
        .header("access-key", "not-the-key")
        .body(Body::from("not json"))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid API Key");
}
