//! REST client for the point-of-sale backend.
//!
//! ARCHITECTURE
//! ============
//! One `reqwest::Client` per page. Every request carries the headers the
//! browser would attach (bearer token, CSRF header, cookies) read from the
//! shared [`BrowserContext`], and every response's `Set-Cookie` headers are
//! written back into the context's cookie jar.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx responses are classified by [`ClientError::from_status`], keeping
//! the server's `error`/`detail`/`message` text when the body carries one.
//! Bodies that do not match the expected shape surface as `Validation`.

use std::time::Duration;

use reqwest::RequestBuilder;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::context::BrowserContext;
use crate::credential::{UserData, parse_set_cookie};
use crate::error::ClientError;
use crate::models::{
    BusinessMetrics, DashboardSummary, Order, OrderFilter, OrderStatus, PaymentResult, Period, ProfitRow, Receipt,
    Table, TableStatus,
};
use crate::payment::{PaymentGateway, PaymentIntent};
use crate::session::{AuthApi, LoginResponse};

pub const LOGIN_PATH: &str = "/api/auth/login/";
pub const VERIFY_PATH: &str = "/api/auth/verify/";
pub const LOGOUT_PATH: &str = "/api/auth/logout/";
pub const PROFIT_PATH: &str = "/api/admin/profit/";
pub const DASHBOARD_PATH: &str = "/api/dashboard/";
pub const PAYMENTS_PATH: &str = "/api/payments/";
pub const TABLES_PATH: &str = "/api/tables/";

/// Header carrying the payment intent's key.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

fn metrics_endpoint(period: Period) -> String {
    format!("/api/admin/metrics/?period={}", period.as_str())
}

fn table_endpoint(table_id: u64) -> String {
    format!("/api/tables/{table_id}/")
}

fn receipt_endpoint(order_id: u64) -> String {
    format!("/api/orders/{order_id}/receipt/")
}

fn order_status_endpoint(order_id: u64) -> String {
    format!("/api/orders/{order_id}/status/")
}

fn orders_endpoint(filter: &OrderFilter) -> String {
    let query = filter
        .query()
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        "/api/orders/".to_owned()
    } else {
        format!("/api/orders/?{query}")
    }
}

/// First human-readable message in an error body.
fn server_message(body: &Value) -> Option<String> {
    for key in ["error", "detail", "message"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            return Some(text.to_owned());
        }
    }
    body.get("non_field_errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn error_from_body(status: u16, body: &str) -> ClientError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| server_message(&value));
    ClientError::from_status(status, message)
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Plain(items) | Listing::Paged { results: items } => items,
        }
    }
}

/// Verification answers `{ "user": {...} }` or the user object itself.
#[derive(Deserialize)]
#[serde(untagged)]
enum VerifyResponse {
    Wrapped { user: UserData },
    Bare(UserData),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    ctx: BrowserContext,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, ctx: BrowserContext) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ClientError::Config(format!("http client build failed: {e}")))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned(), ctx })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        self.ctx
            .request_headers()
            .into_iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value))
    }

    fn absorb_cookies(&self, headers: &HeaderMap) {
        for raw in headers.get_all(SET_COOKIE) {
            let Some(cookie) = raw.to_str().ok().and_then(parse_set_cookie) else {
                continue;
            };
            let result = if cookie.delete {
                self.ctx.cookies.remove(&cookie.name)
            } else {
                self.ctx.cookies.set(&cookie.name, &cookie.value)
            };
            if let Err(e) = result {
                warn!(error = %e, cookie = %cookie.name, "cookie write failed");
            }
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, ClientError> {
        let response = self.authorize(builder).send().await?;
        self.absorb_cookies(response.headers());
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "request rejected");
            return Err(error_from_body(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let body = self.send(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_list<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Vec<T>, ClientError> {
        let listing: Listing<T> = self.send_json(builder).await?;
        Ok(listing.into_vec())
    }

    // =========================================================================
    // ADMIN
    // =========================================================================

    /// # Errors
    ///
    /// Returns a [`ClientError`] classifying the failed request.
    pub async fn business_metrics(&self, period: Period) -> Result<BusinessMetrics, ClientError> {
        self.send_json(self.http.get(self.url(&metrics_endpoint(period)))).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] classifying the failed request.
    pub async fn profit_table(&self) -> Result<Vec<ProfitRow>, ClientError> {
        self.send_list(self.http.get(self.url(PROFIT_PATH))).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] classifying the failed request.
    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ClientError> {
        self.send_json(self.http.get(self.url(DASHBOARD_PATH))).await
    }

    // =========================================================================
    // TABLES / ORDERS / RECEIPTS
    // =========================================================================

    /// # Errors
    ///
    /// Returns a [`ClientError`] classifying the failed request.
    pub async fn list_tables(&self) -> Result<Vec<Table>, ClientError> {
        self.send_list(self.http.get(self.url(TABLES_PATH))).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] classifying the failed request.
    pub async fn update_table_status(&self, table_id: u64, status: TableStatus) -> Result<Table, ClientError> {
        let body = serde_json::json!({ "status": status });
        self.send_json(self.http.patch(self.url(&table_endpoint(table_id))).json(&body))
            .await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] classifying the failed request.
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, ClientError> {
        self.send_list(self.http.get(self.url(&orders_endpoint(filter)))).await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] classifying the failed request.
    pub async fn transition_order(&self, order_id: u64, status: OrderStatus) -> Result<Order, ClientError> {
        let body = serde_json::json!({ "status": status });
        self.send_json(self.http.patch(self.url(&order_status_endpoint(order_id))).json(&body))
            .await
    }

    /// # Errors
    ///
    /// Returns a [`ClientError`] classifying the failed request.
    pub async fn generate_receipt(&self, order_id: u64) -> Result<Receipt, ClientError> {
        self.send_json(self.http.post(self.url(&receipt_endpoint(order_id))))
            .await
    }
}

#[async_trait::async_trait]
impl AuthApi for ApiClient {
    async fn exchange_credentials(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = serde_json::json!({ "username": username, "password": password });
        self.send_json(self.http.post(self.url(LOGIN_PATH)).json(&body))
            .await
    }

    async fn verify(&self) -> Result<UserData, ClientError> {
        let response: VerifyResponse = self.send_json(self.http.get(self.url(VERIFY_PATH))).await?;
        Ok(match response {
            VerifyResponse::Wrapped { user } | VerifyResponse::Bare(user) => user,
        })
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.send(self.http.post(self.url(LOGOUT_PATH))).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl PaymentGateway for ApiClient {
    async fn submit_payment(&self, intent: &PaymentIntent) -> Result<PaymentResult, ClientError> {
        let builder = self
            .http
            .post(self.url(PAYMENTS_PATH))
            .header(IDEMPOTENCY_HEADER, intent.key().as_str())
            .json(intent.request());
        self.send_json(builder).await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
