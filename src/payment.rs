//! Idempotent payment submission.
//!
//! DESIGN
//! ======
//! A [`PaymentIntent`] is one logical "take this payment" action. Its
//! idempotency key is minted when the intent is created and sent with every
//! attempt, so a retry after a dropped response cannot charge twice. A new
//! click is a new intent and therefore a new key.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::{PaymentRequest, PaymentResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    key: IdempotencyKey,
    request: PaymentRequest,
}

impl PaymentIntent {
    #[must_use]
    pub fn new(request: PaymentRequest) -> Self {
        Self { key: IdempotencyKey::mint(), request }
    }

    #[must_use]
    pub fn key(&self) -> &IdempotencyKey {
        &self.key
    }

    #[must_use]
    pub fn request(&self) -> &PaymentRequest {
        &self.request
    }
}

/// Payment endpoint. Enables mocking in tests.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submit one attempt of `intent`, carrying its idempotency key.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the request fails or the server rejects it.
    async fn submit_payment(&self, intent: &PaymentIntent) -> Result<PaymentResult, ClientError>;
}

pub struct PaymentSubmitter {
    gateway: Arc<dyn PaymentGateway>,
    retries: u32,
}

impl PaymentSubmitter {
    #[must_use]
    pub fn new(gateway: Arc<dyn PaymentGateway>, retries: u32) -> Self {
        Self { gateway, retries }
    }

    /// Submit a fresh intent for `request`.
    ///
    /// # Errors
    ///
    /// Returns the last [`ClientError`] once retries are exhausted or on a non-retryable failure.
    pub async fn submit(&self, request: PaymentRequest) -> Result<PaymentResult, ClientError> {
        self.submit_intent(&PaymentIntent::new(request)).await
    }

    /// Submit `intent`, retrying retryable failures with the same key.
    ///
    /// # Errors
    ///
    /// Returns the last [`ClientError`] once retries are exhausted or on a non-retryable failure.
    pub async fn submit_intent(&self, intent: &PaymentIntent) -> Result<PaymentResult, ClientError> {
        let mut attempt = 0_u32;
        loop {
            match self.gateway.submit_payment(intent).await {
                Ok(result) => {
                    info!(
                        order_id = intent.request().order_id,
                        payment_id = result.id,
                        key = %intent.key(),
                        attempt,
                        "payment accepted"
                    );
                    return Ok(result);
                }
                Err(e) if e.retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, key = %intent.key(), attempt, "payment attempt failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[path = "payment_test.rs"]
mod tests;
