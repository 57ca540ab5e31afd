use std::sync::Mutex;

use super::*;
use crate::models::PaymentMethod;

// =========================================================================
// MockGateway
// =========================================================================

/// Fails the first `failures` attempts with `failure`, then accepts.
struct MockGateway {
    keys: Mutex<Vec<String>>,
    failures: Mutex<usize>,
    failure_status: Option<u16>,
}

impl MockGateway {
    fn new(failures: usize, failure_status: Option<u16>) -> Self {
        Self { keys: Mutex::new(Vec::new()), failures: Mutex::new(failures), failure_status }
    }

    fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    async fn submit_payment(&self, intent: &PaymentIntent) -> Result<PaymentResult, ClientError> {
        self.keys.lock().unwrap().push(intent.key().as_str().to_owned());
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(match self.failure_status {
                Some(status) => ClientError::from_status(status, None),
                None => ClientError::Network { status: None, message: Some("timeout".into()) },
            });
        }
        Ok(PaymentResult { id: 99, status: "completed".into(), order_id: Some(intent.request().order_id) })
    }
}

fn request() -> PaymentRequest {
    PaymentRequest { order_id: 12, amount: 42.5, method: PaymentMethod::Cash }
}

// =========================================================================
// keys
// =========================================================================

#[test]
fn minted_keys_are_uuids_and_differ() {
    let a = IdempotencyKey::mint();
    let b = IdempotencyKey::mint();
    assert_ne!(a, b);
    assert!(Uuid::parse_str(a.as_str()).is_ok());
}

#[test]
fn intent_key_is_stable() {
    let intent = PaymentIntent::new(request());
    assert_eq!(intent.key(), intent.clone().key());
}

// =========================================================================
// submit
// =========================================================================

#[tokio::test]
async fn sequential_submissions_for_same_order_use_distinct_keys() {
    let gateway = Arc::new(MockGateway::new(0, None));
    let submitter = PaymentSubmitter::new(gateway.clone(), 1);

    submitter.submit(request()).await.unwrap();
    submitter.submit(request()).await.unwrap();

    let keys = gateway.keys();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

#[tokio::test]
async fn retries_within_one_intent_reuse_the_key() {
    let gateway = Arc::new(MockGateway::new(2, None));
    let submitter = PaymentSubmitter::new(gateway.clone(), 2);

    let result = submitter.submit(request()).await.unwrap();
    assert_eq!(result.order_id, Some(12));

    let keys = gateway.keys();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|k| k == &keys[0]));
}

#[tokio::test]
async fn retries_are_bounded() {
    let gateway = Arc::new(MockGateway::new(5, Some(503)));
    let submitter = PaymentSubmitter::new(gateway.clone(), 1);

    let err = submitter.submit(request()).await.unwrap_err();
    assert!(matches!(err, ClientError::Network { status: Some(503), .. }));
    assert_eq!(gateway.keys().len(), 2);
}

#[tokio::test]
async fn auth_and_validation_failures_are_not_retried() {
    for status in [401, 403, 400] {
        let gateway = Arc::new(MockGateway::new(1, Some(status)));
        let submitter = PaymentSubmitter::new(gateway.clone(), 3);
        assert!(submitter.submit(request()).await.is_err());
        assert_eq!(gateway.keys().len(), 1, "status {status} must not retry");
    }
}

#[tokio::test]
async fn resubmitting_an_intent_keeps_its_key() {
    let gateway = Arc::new(MockGateway::new(0, None));
    let submitter = PaymentSubmitter::new(gateway.clone(), 0);
    let intent = PaymentIntent::new(request());

    submitter.submit_intent(&intent).await.unwrap();
    submitter.submit_intent(&intent).await.unwrap();

    assert_eq!(gateway.keys(), vec![intent.key().to_string(), intent.key().to_string()]);
}
