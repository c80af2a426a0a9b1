use super::*;
use axum::{
    extract::RawQuery,
    http::{HeaderMap, StatusCode as HttpStatus},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use shared::error::{ErrorKind, INVALID_RESPONSE, NETWORK_ERROR};

use crate::test_support::{client_for, spawn_server, unreachable_url};

#[derive(Debug, Deserialize, PartialEq)]
struct Echo {
    query: Option<String>,
    content_type: Option<String>,
    accept: Option<String>,
    body: Option<Value>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn echo_get(RawQuery(query): RawQuery, headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "query": query,
        "accept": header(&headers, "accept"),
    }))
}

async fn echo_post(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "content_type": header(&headers, "content-type"),
        "accept": header(&headers, "accept"),
        "body": body,
    }))
}

fn backend() -> Router {
    Router::new()
        .route("/echo", get(echo_get).post(echo_post))
        .route(
            "/missing",
            get(|| async {
                (
                    HttpStatus::NOT_FOUND,
                    Json(json!({ "detail": "Worker wrk_9 not found" })),
                )
            }),
        )
        .route(
            "/locked",
            get(|| async {
                (
                    HttpStatus::PAYMENT_REQUIRED,
                    Json(json!({
                        "detail": {
                            "message": "Worker contact details are locked. Payment required to unlock.",
                            "worker_id": "wrk_1",
                            "unlock_price_idr": 50000
                        }
                    })),
                )
            }),
        )
        .route(
            "/structured",
            post(|| async {
                (
                    HttpStatus::BAD_REQUEST,
                    Json(json!({
                        "error": {
                            "message": "location is not served",
                            "code": "UNSUPPORTED_LOCATION",
                            "details": { "location": "Jakarta" }
                        }
                    })),
                )
            }),
        )
        .route(
            "/validation",
            post(|| async {
                (
                    HttpStatus::UNPROCESSABLE_ENTITY,
                    Json(json!({
                        "detail": [{ "loc": ["body", "project_type"], "msg": "field required" }]
                    })),
                )
            }),
        )
        .route(
            "/crash",
            get(|| async { (HttpStatus::INTERNAL_SERVER_ERROR, "upstream exploded <html>") }),
        )
        .route("/garbled", get(|| async { "this is not json" }))
        .route("/empty", post(|| async { HttpStatus::NO_CONTENT }))
}

#[tokio::test]
async fn get_wraps_parsed_body_as_data() {
    let client = client_for(spawn_server(backend()).await);

    let envelope: Envelope<Echo> = client
        .get("/echo", &[("category", Some("cement")), ("search", None)])
        .await;

    let echo = envelope.into_result().expect("data");
    assert_eq!(echo.query.as_deref(), Some("category=cement"));
    assert_eq!(echo.accept.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn get_without_filters_sends_no_query_string() {
    let client = client_for(spawn_server(backend()).await);

    let echo: Echo = client
        .get("echo", &[("category", None), ("search", None)])
        .await
        .into_result()
        .expect("data");
    assert_eq!(echo.query, None);
}

#[tokio::test]
async fn post_sends_json_payload() {
    let client = client_for(spawn_server(backend()).await);

    let echo: Echo = client
        .post("/echo", &json!({ "project_type": "pool", "location": "Canggu" }))
        .await
        .into_result()
        .expect("data");

    assert_eq!(echo.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        echo.body,
        Some(json!({ "project_type": "pool", "location": "Canggu" }))
    );
}

#[tokio::test]
async fn base_url_path_prefix_is_preserved() {
    let base = spawn_server(Router::new().nest("/api/v1", backend())).await;
    let client = client_for(base.join("/api/v1").expect("join"));

    let envelope: Envelope<Echo> = client.get("/echo", &[]).await;
    assert!(envelope.is_data(), "unexpected: {envelope:?}");
}

#[tokio::test]
async fn detail_string_becomes_error_message() {
    let client = client_for(spawn_server(backend()).await);

    let envelope: Envelope<Value> = client.get("/missing", &[]).await;
    let err = envelope.into_result().expect_err("error");

    assert_eq!(err.message, "Worker wrk_9 not found");
    assert_eq!(err.status, Some(404));
    assert_eq!(err.kind(), ErrorKind::Domain);
}

#[tokio::test]
async fn detail_object_is_kept_as_details() {
    let client = client_for(spawn_server(backend()).await);

    let err = client
        .get::<Value>("/locked", &[])
        .await
        .into_result()
        .expect_err("error");

    assert_eq!(
        err.message,
        "Worker contact details are locked. Payment required to unlock."
    );
    assert_eq!(err.status, Some(402));
    let details = err.details.expect("details");
    assert_eq!(details["unlock_price_idr"], json!(50000));
}

#[tokio::test]
async fn structured_error_is_passed_through_verbatim() {
    let client = client_for(spawn_server(backend()).await);

    let err = client
        .post::<_, Value>("/structured", &json!({}))
        .await
        .into_result()
        .expect_err("error");

    assert_eq!(err.message, "location is not served");
    assert_eq!(err.code(), Some("UNSUPPORTED_LOCATION"));
    assert_eq!(err.details, Some(json!({ "location": "Jakarta" })));
    assert_eq!(err.status, Some(400));
}

#[tokio::test]
async fn validation_list_uses_first_message() {
    let client = client_for(spawn_server(backend()).await);

    let err = client
        .post::<_, Value>("/validation", &json!({}))
        .await
        .into_result()
        .expect_err("error");

    assert_eq!(err.message, "field required");
    assert_eq!(err.status, Some(422));
    assert!(err.details.is_some());
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_status_message() {
    let client = client_for(spawn_server(backend()).await);

    let err = client
        .get::<Value>("/crash", &[])
        .await
        .into_result()
        .expect_err("error");

    assert!(err.message.contains("500"), "message: {}", err.message);
    assert_eq!(err.status, Some(500));
    assert_eq!(err.code, None);
}

#[tokio::test]
async fn malformed_success_body_is_an_invalid_response() {
    let client = client_for(spawn_server(backend()).await);

    let err = client
        .get::<Echo>("/garbled", &[])
        .await
        .into_result()
        .expect_err("error");

    assert_eq!(err.code(), Some(INVALID_RESPONSE));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn empty_success_body_decodes_as_unit() {
    let client = client_for(spawn_server(backend()).await);

    let envelope: Envelope<()> = client.post("/empty", &json!({})).await;
    assert_eq!(envelope, Envelope::Data(()));
}

#[tokio::test]
async fn unreachable_server_yields_network_error() {
    let client = client_for(unreachable_url().await);

    let envelope: Envelope<Value> = client.get("/echo", &[]).await;
    let err = envelope.into_result().expect_err("error");

    assert_eq!(err.code(), Some(NETWORK_ERROR));
    assert!(err.message.starts_with("Network error"));
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn every_outcome_sets_exactly_one_side() {
    let client = client_for(spawn_server(backend()).await);
    let offline = client_for(unreachable_url().await);

    let outcomes: Vec<Envelope<Value>> = vec![
        client.get("/echo", &[]).await,
        client.get("/missing", &[]).await,
        client.get("/locked", &[]).await,
        client.get("/crash", &[]).await,
        client.get("/garbled", &[]).await,
        client.post("/structured", &json!({})).await,
        offline.get("/echo", &[]).await,
    ];

    for outcome in outcomes {
        assert!(outcome.data().is_some() != outcome.error().is_some());
    }
}

#[test]
fn error_from_body_reads_top_level_message_and_numeric_code() {
    let err = error_from_body(
        StatusCode::CONFLICT,
        br#"{"message":"already unlocked","code":409}"#,
    );
    assert_eq!(err.message, "already unlocked");
    assert_eq!(err.code(), Some("409"));
    assert_eq!(err.status, Some(409));
}

#[test]
fn error_from_body_keeps_plain_string_error() {
    let err = error_from_body(
        StatusCode::NOT_FOUND,
        br#"{"error":"Worker not found","code":"NOT_FOUND"}"#,
    );
    assert_eq!(err.message, "Worker not found");
    assert_eq!(err.code(), Some("NOT_FOUND"));
    assert_eq!(err.status, Some(404));

    let blank = error_from_body(StatusCode::NOT_FOUND, br#"{"error":"  "}"#);
    assert_eq!(blank.message, "Request failed with status 404 (Not Found)");
}
