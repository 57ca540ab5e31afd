//! Cashier dashboard: served orders awaiting payment.
//!
//! Every press of "pay" is its own payment intent. Retries inside one
//! intent reuse its idempotency key; a second press mints a new one.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::{NoticeLevel, Notices, Widget, apply, gate, lock, report_action_error, settle};
use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{Order, OrderFilter, OrderStatus, PaymentMethod, PaymentRequest, PaymentResult, Receipt};
use crate::payment::PaymentSubmitter;
use crate::role::Role;
use crate::scheduler::Refresh;
use crate::session::SessionGuard;

pub const CASHIER_ROLES: &[Role] = &[Role::Cashier, Role::Admin, Role::Manager];

const AWAITING_PAYMENT: OrderFilter = OrderFilter { status: Some(OrderStatus::Served), table: None };

pub struct CashierDashboard {
    guard: Arc<SessionGuard>,
    api: Arc<ApiClient>,
    payments: PaymentSubmitter,
    pending: Mutex<Widget<Vec<Order>>>,
    last_receipt: Mutex<Option<Receipt>>,
    notices: Notices,
}

impl CashierDashboard {
    #[must_use]
    pub fn new(guard: Arc<SessionGuard>, api: Arc<ApiClient>, payment_retries: u32) -> Self {
        let payments = PaymentSubmitter::new(api.clone(), payment_retries);
        Self {
            guard,
            api,
            payments,
            pending: Mutex::new(Widget::Empty),
            last_receipt: Mutex::new(None),
            notices: Notices::default(),
        }
    }

    pub async fn init(&self) -> bool {
        gate(&self.guard, CASHIER_ROLES).await
    }

    #[must_use]
    pub fn pending(&self) -> Widget<Vec<Order>> {
        lock(&self.pending).clone()
    }

    #[must_use]
    pub fn last_receipt(&self) -> Option<Receipt> {
        lock(&self.last_receipt).clone()
    }

    #[must_use]
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub async fn refresh_pending(&self) {
        let orders = self.api.list_orders(&AWAITING_PAYMENT).await;
        let sign_out = apply(&mut lock(&self.pending), settle("pending-orders", orders, true), &self.notices);
        if sign_out {
            self.guard.handle_auth_failure();
        }
    }

    /// Take a payment for `order_id`, then request its receipt.
    ///
    /// Returns the accepted payment, or `None` after raising a notice.
    pub async fn pay_order(&self, order_id: u64, amount: f64, method: PaymentMethod) -> Option<PaymentResult> {
        let request = PaymentRequest { order_id, amount, method };
        let payment = match self.payments.submit(request).await {
            Ok(payment) => payment,
            Err(e) => {
                report_action_error(&self.guard, &self.notices, "pay-order", &e);
                return None;
            }
        };
        self.notices.push(NoticeLevel::Success, format!("Payment recorded for order {order_id}"));
        if let Some(orders) = lock(&self.pending).loaded_mut() {
            orders.retain(|order| order.id != order_id);
        }

        match self.api.generate_receipt(order_id).await {
            Ok(receipt) => {
                info!(order_id, receipt = %receipt.receipt_number, "receipt generated");
                *lock(&self.last_receipt) = Some(receipt);
            }
            Err(e) => {
                warn!(order_id, error = %e, "payment taken but receipt failed");
                report_action_error(&self.guard, &self.notices, "generate-receipt", &e);
            }
        }
        Some(payment)
    }
}

#[async_trait::async_trait]
impl Refresh for CashierDashboard {
    fn name(&self) -> &str {
        "cashier-dashboard"
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        self.refresh_pending().await;
        Ok(())
    }
}
