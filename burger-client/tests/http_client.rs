// burger-client/tests/http_client.rs
// Pull API client against a local axum server

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use burger_client::{ClientConfig, ClientError, CredentialStore, HttpClient, LiveFeed};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const FRESH_TOKEN: &str = "Bearer fresh-access-token";
const EXPIRED_TOKEN: &str = "Bearer expired-access-token";

#[derive(Default)]
struct Calls {
    refresh: AtomicUsize,
}

async fn all_orders() -> Json<Value> {
    Json(json!({
        "success": true,
        "orders": [
            { "_id": "a", "number": 1, "status": "done", "createdAt": "2024-05-01T08:00:00Z" },
            { "_id": "b", "number": 2, "status": "pending", "createdAt": "2024-05-01T09:00:00Z" }
        ],
        "total": 120,
        "totalToday": 7
    }))
}

async fn order_by_number(Path(number): Path<u64>) -> Json<Value> {
    match number {
        2 => Json(json!({
            "success": true,
            "orders": [{ "_id": "b", "number": 2, "createdAt": "2024-05-01T09:00:00Z" }]
        })),
        500 => Json(json!({ "success": false, "message": "Service under maintenance" })),
        _ => Json(json!({ "success": true, "orders": [] })),
    }
}

async fn user_orders(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match auth {
        FRESH_TOKEN => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "orders": [{ "_id": "mine", "number": 9, "createdAt": "2024-05-02T10:00:00Z" }]
            })),
        ),
        EXPIRED_TOKEN => (
            StatusCode::FORBIDDEN,
            Json(json!({ "success": false, "message": "jwt expired" })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "You should be authorised" })),
        ),
    }
}

async fn refresh(State(calls): State<Arc<Calls>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    calls.refresh.fetch_add(1, Ordering::SeqCst);
    if body["token"] == "refresh-1" {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "accessToken": FRESH_TOKEN,
                "refreshToken": "refresh-2"
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Token is invalid" })),
        )
    }
}

/// Start the fake API and return its base URL
async fn serve(calls: Arc<Calls>) -> String {
    let router = Router::new()
        .route("/api/orders/all", get(all_orders))
        .route("/api/orders/{number}", get(order_by_number))
        .route("/api/orders", get(user_orders))
        .route("/api/auth/token", post(refresh))
        .with_state(calls);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api", addr)
}

async fn client(credentials: CredentialStore) -> (HttpClient, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let base = serve(calls.clone()).await;
    let config = ClientConfig::new(base, "ws://unused").with_timeout(5);
    (config.build_http_client(credentials).unwrap(), calls)
}

#[tokio::test]
async fn test_get_feeds() {
    let (http, _) = client(CredentialStore::in_memory()).await;

    let snapshot = http.get_feeds().await.unwrap();
    assert_eq!(snapshot.total, 120);
    assert_eq!(snapshot.total_today, 7);
    assert_eq!(snapshot.orders.len(), 2);
}

#[tokio::test]
async fn test_get_order_by_number() {
    let (http, _) = client(CredentialStore::in_memory()).await;

    let found = http.get_order_by_number(2).await.unwrap();
    assert_eq!(found[0].id, "b");

    let missing = http.get_order_by_number(404).await.unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn test_profile_orders_refreshes_expired_token() {
    let credentials = CredentialStore::in_memory();
    credentials.set_access_token(EXPIRED_TOKEN);
    credentials.set_refresh_token("refresh-1").unwrap();
    let (http, calls) = client(credentials.clone()).await;

    let orders = http.get_profile_orders().await.unwrap();
    assert_eq!(orders[0].id, "mine");
    assert_eq!(calls.refresh.load(Ordering::SeqCst), 1);
    assert_eq!(credentials.access_token().as_deref(), Some(FRESH_TOKEN));
    assert_eq!(credentials.refresh_token().as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_profile_orders_refreshes_missing_access_token() {
    let credentials = CredentialStore::in_memory();
    credentials.set_refresh_token("refresh-1").unwrap();
    let (http, calls) = client(credentials.clone()).await;

    let orders = http.get_profile_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(calls.refresh.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_profile_orders_without_credentials() {
    let (http, calls) = client(CredentialStore::in_memory()).await;

    let result = http.get_profile_orders().await;
    assert!(matches!(result, Err(ClientError::Unauthorized)));
    assert_eq!(calls.refresh.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_refresh_token() {
    let credentials = CredentialStore::in_memory();
    credentials.set_refresh_token("stale").unwrap();
    let (http, _) = client(credentials).await;

    assert!(matches!(http.refresh_token().await, Err(ClientError::Unauthorized)));
}

#[tokio::test]
async fn test_unsuccessful_body_reaches_store() {
    let (http, _) = client(CredentialStore::in_memory()).await;

    let result = http.get_order_by_number(500).await;
    assert!(matches!(result, Err(ClientError::Rejected(ref m)) if m == "Service under maintenance"));

    let live = LiveFeed::connect_ws(
        ClientConfig::new("http://unused/api", "ws://unused"),
        CredentialStore::in_memory(),
    );
    live.fetch_order_by_number(&http, 500).await;
    assert_eq!(
        live.store().feed().error.as_deref(),
        Some("Service under maintenance")
    );

    live.fetch_order_by_number(&http, 404).await;
    assert_eq!(live.store().feed().error.as_deref(), Some("Order not found"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let calls = Arc::new(Calls::default());
    let base = serve(calls).await;
    let config = ClientConfig::new(format!("{}/missing", base), "ws://unused");
    let http = config.build_http_client(CredentialStore::in_memory()).unwrap();

    assert!(matches!(http.get_feeds().await, Err(ClientError::NotFound(_))));
}
