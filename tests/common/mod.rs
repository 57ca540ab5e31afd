//! In-process fake of the point-of-sale backend plus a client harness.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use pos_client::api::ApiClient;
use pos_client::config::ClientConfig;
use pos_client::context::BrowserContext;
use pos_client::navigator::MemoryNavigator;
use pos_client::session::{LocalCredentialPolicy, SessionGuard};
use pos_client::storage::MemoryStore;
use serde_json::{Value, json};

pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "aaa.bbb.ccc";
pub const SESSION_ID: &str = "s3ss10n";
pub const CSRF: &str = "csrf-tok";

#[derive(Default)]
pub struct FakeState {
    /// Forced status per request path (no query string).
    overrides: Mutex<HashMap<String, u16>>,
    /// Username of the last successful login.
    user: Mutex<Option<String>>,
    pub idempotency_keys: Mutex<Vec<String>>,
    /// Payment attempts to answer with 503 before accepting.
    pub payment_failures: AtomicUsize,
    pub metrics_periods: Mutex<Vec<String>>,
    pub order_queries: Mutex<Vec<HashMap<String, String>>>,
    pub logouts: AtomicUsize,
    /// Artificial latency in milliseconds, keyed `metrics:<period>` or `orders:<status|any>`.
    delays: Mutex<HashMap<String, u64>>,
    /// Verification answers with an `Expires`-in-the-past CSRF cookie.
    pub expire_csrf_on_verify: AtomicBool,
    next_payment_id: AtomicU64,
}

impl FakeState {
    pub fn fail(&self, path: &str, status: u16) {
        self.overrides.lock().unwrap().insert(path.to_owned(), status);
    }

    pub fn delay(&self, key: &str, millis: u64) {
        self.delays.lock().unwrap().insert(key.to_owned(), millis);
    }

    async fn pause(&self, key: &str) {
        let millis = self.delays.lock().unwrap().get(key).copied();
        if let Some(millis) = millis {
            tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.idempotency_keys.lock().unwrap().clone()
    }

    fn forced(&self, path: &str) -> Option<Response> {
        let status = *self.overrides.lock().unwrap().get(path)?;
        let status = StatusCode::from_u16(status).unwrap();
        Some((status, Json(json!({ "detail": format!("forced {}", status.as_u16()) }))).into_response())
    }
}

fn user_json(username: &str) -> Value {
    json!({
        "id": 7,
        "username": username,
        "role": username,
        "first_name": "Test",
        "last_name": "User",
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"));
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(&format!("sessionid={SESSION_ID}")));
    bearer || cookie
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Authentication credentials were not provided." }))).into_response()
}

macro_rules! guarded {
    ($state:expr, $headers:expr, $path:expr) => {
        if let Some(forced) = $state.forced($path) {
            return forced;
        }
        if !authorized(&$headers) {
            return unauthorized();
        }
    };
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    if let Some(forced) = state.forced("/api/auth/login/") {
        return forced;
    }
    let username = body["username"].as_str().unwrap_or_default().to_owned();
    if body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid username or password" }))).into_response();
    }
    *state.user.lock().unwrap() = Some(username.clone());
    (
        AppendHeaders([
            (header::SET_COOKIE, format!("sessionid={SESSION_ID}; Path=/; HttpOnly")),
            (header::SET_COOKIE, format!("csrftoken={CSRF}; Path=/")),
        ]),
        Json(json!({ "access": TOKEN, "user": user_json(&username) })),
    )
        .into_response()
}

async fn verify(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    guarded!(state, headers, "/api/auth/verify/");
    let username = state.user.lock().unwrap().clone().unwrap_or_else(|| "waiter".to_owned());
    let body = Json(json!({ "user": user_json(&username) }));
    if state.expire_csrf_on_verify.load(Ordering::SeqCst) {
        let expired = "csrftoken=gone; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/".to_owned();
        return (AppendHeaders([(header::SET_COOKIE, expired)]), body).into_response();
    }
    body.into_response()
}

async fn logout(State(state): State<Arc<FakeState>>) -> Response {
    state.logouts.fetch_add(1, Ordering::SeqCst);
    if let Some(forced) = state.forced("/api/auth/logout/") {
        return forced;
    }
    (
        AppendHeaders([(header::SET_COOKIE, "sessionid=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/".to_owned())]),
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn metrics(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    guarded!(state, headers, "/api/admin/metrics/");
    let period = query.get("period").cloned().unwrap_or_default();
    state.metrics_periods.lock().unwrap().push(period.clone());
    state.pause(&format!("metrics:{period}")).await;
    let total_orders = if period == "week" { 2 } else { 48 };
    Json(json!({
        "total_revenue": 1250.5,
        "total_orders": total_orders,
        "average_order_value": 26.05,
        "total_customers": 40,
    }))
    .into_response()
}

async fn profit(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    guarded!(state, headers, "/api/admin/profit/");
    Json(json!([
        { "item": "Burger", "quantity_sold": 20, "revenue": 300.0, "cost": 120.0, "profit": 180.0 },
    ]))
    .into_response()
}

async fn summary(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    guarded!(state, headers, "/api/dashboard/");
    Json(json!({ "active_orders": 5, "occupied_tables": 3, "available_tables": 9, "pending_payments": 2 }))
        .into_response()
}

async fn tables(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    guarded!(state, headers, "/api/tables/");
    Json(json!({
        "count": 2,
        "results": [
            { "id": 1, "number": 1, "capacity": 4, "status": "available" },
            { "id": 2, "number": 2, "capacity": 2, "status": "occupied" },
        ],
    }))
    .into_response()
}

async fn update_table(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    guarded!(state, headers, &format!("/api/tables/{id}/"));
    Json(json!({ "id": id, "number": id, "capacity": 4, "status": body["status"] })).into_response()
}

async fn orders(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    guarded!(state, headers, "/api/orders/");
    let status = query.get("status").cloned().unwrap_or_else(|| "served".to_owned());
    let delay_key = format!("orders:{}", query.get("status").map_or("any", String::as_str));
    state.order_queries.lock().unwrap().push(query);
    state.pause(&delay_key).await;
    Json(json!([
        { "id": 11, "table": 2, "status": status, "total": 42.5 },
        { "id": 12, "table": 1, "status": status, "total": 18.0 },
    ]))
    .into_response()
}

async fn order_status(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    guarded!(state, headers, &format!("/api/orders/{id}/status/"));
    Json(json!({ "id": id, "table": 2, "status": body["status"], "total": 42.5 })).into_response()
}

async fn payments(State(state): State<Arc<FakeState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    state.idempotency_keys.lock().unwrap().push(key);
    guarded!(state, headers, "/api/payments/");
    if state
        .payment_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "detail": "try again" }))).into_response();
    }
    let id = state.next_payment_id.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "id": id, "status": "completed", "order_id": body["order_id"] })).into_response()
}

async fn receipt(State(state): State<Arc<FakeState>>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    guarded!(state, headers, &format!("/api/orders/{id}/receipt/"));
    Json(json!({ "receipt_number": format!("R-{id}"), "order_id": id, "total": 42.5 })).into_response()
}

pub struct Backend {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

pub async fn spawn_backend() -> Backend {
    let state = Arc::new(FakeState::default());
    let app = Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/verify/", get(verify))
        .route("/api/auth/logout/", post(logout))
        .route("/api/admin/metrics/", get(metrics))
        .route("/api/admin/profit/", get(profit))
        .route("/api/dashboard/", get(summary))
        .route("/api/tables/", get(tables))
        .route("/api/tables/{id}/", patch(update_table))
        .route("/api/orders/", get(orders))
        .route("/api/orders/{id}/status/", patch(order_status))
        .route("/api/orders/{id}/receipt/", post(receipt))
        .route("/api/payments/", post(payments))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Backend { base_url: format!("http://{addr}"), state }
}

/// One page's worth of client state wired to a backend.
pub struct Page {
    pub config: ClientConfig,
    pub local: Arc<MemoryStore>,
    pub session: Arc<MemoryStore>,
    pub cookies: Arc<MemoryStore>,
    pub navigator: Arc<MemoryNavigator>,
    pub api: Arc<ApiClient>,
    pub guard: Arc<SessionGuard>,
}

pub fn open_page(backend: &Backend, path: &str, policy: LocalCredentialPolicy) -> Page {
    let config = ClientConfig {
        base_url: backend.base_url.clone(),
        local_policy: policy,
        ..ClientConfig::default()
    };
    let local = Arc::new(MemoryStore::new());
    let session = Arc::new(MemoryStore::new());
    let cookies = Arc::new(MemoryStore::new());
    let navigator = Arc::new(MemoryNavigator::new(path));
    let ctx = BrowserContext::new(local.clone(), session.clone(), cookies.clone(), navigator.clone());
    let api = Arc::new(ApiClient::new(&config, ctx.clone()).unwrap());
    let guard = Arc::new(SessionGuard::new(ctx, api.clone(), &config));
    Page { config, local, session, cookies, navigator, api, guard }
}

/// Open `path` and sign in as `role` (usernames double as role codes).
pub async fn signed_in(backend: &Backend, path: &str, role: &str) -> Page {
    let page = open_page(backend, path, LocalCredentialPolicy::TrustLocal);
    let outcome = page.guard.login(role, PASSWORD).await;
    assert!(matches!(outcome, pos_client::session::LoginOutcome::Success { .. }), "{outcome:?}");
    page
}
