//! Waiter dashboard: floor plan plus the order list.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::{NoticeLevel, Notices, Widget, apply, gate, lock, report_action_error, settle};
use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{Order, OrderFilter, OrderStatus, Table, TableStatus};
use crate::role::Role;
use crate::scheduler::Refresh;
use crate::session::SessionGuard;

pub const WAITER_ROLES: &[Role] = &[Role::Waiter, Role::Admin, Role::Manager];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaiterView {
    pub tables: Widget<Vec<Table>>,
    pub orders: Widget<Vec<Order>>,
}

pub struct WaiterDashboard {
    guard: Arc<SessionGuard>,
    api: Arc<ApiClient>,
    filter: Mutex<OrderFilter>,
    view: Mutex<WaiterView>,
    notices: Notices,
}

impl WaiterDashboard {
    #[must_use]
    pub fn new(guard: Arc<SessionGuard>, api: Arc<ApiClient>) -> Self {
        Self {
            guard,
            api,
            filter: Mutex::new(OrderFilter::default()),
            view: Mutex::new(WaiterView::default()),
            notices: Notices::default(),
        }
    }

    pub async fn init(&self) -> bool {
        gate(&self.guard, WAITER_ROLES).await
    }

    #[must_use]
    pub fn view(&self) -> WaiterView {
        lock(&self.view).clone()
    }

    #[must_use]
    pub fn filter(&self) -> OrderFilter {
        *lock(&self.filter)
    }

    #[must_use]
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Tables are the page's primary resource; orders are secondary.
    pub async fn refresh_all(&self) {
        let filter = self.filter();
        let (tables, orders) = tokio::join!(self.api.list_tables(), self.api.list_orders(&filter));
        let sign_out = {
            let mut view = lock(&self.view);
            let tables = apply(&mut view.tables, settle("tables", tables, true), &self.notices);
            let orders = if self.filter() == filter {
                apply(&mut view.orders, settle("orders", orders, false), &self.notices)
            } else {
                debug!(?filter, "discarding orders for superseded filter");
                false
            };
            tables || orders
        };
        if sign_out {
            self.guard.handle_auth_failure();
        }
    }

    /// Replace the order filter and reload the order list.
    pub async fn filter_orders(&self, filter: OrderFilter) {
        *lock(&self.filter) = filter;
        let orders = self.api.list_orders(&filter).await;
        let sign_out = {
            let mut view = lock(&self.view);
            if self.filter() != filter {
                debug!(?filter, "discarding orders for superseded filter");
                return;
            }
            apply(&mut view.orders, settle("orders", orders, false), &self.notices)
        };
        if sign_out {
            self.guard.handle_auth_failure();
        }
    }

    pub async fn update_table_status(&self, table_id: u64, status: TableStatus) -> bool {
        match self.api.update_table_status(table_id, status).await {
            Ok(updated) => {
                info!(table_id, status = status.as_str(), "table status updated");
                if let Some(tables) = lock(&self.view).tables.loaded_mut() {
                    if let Some(slot) = tables.iter_mut().find(|t| t.id == updated.id) {
                        *slot = updated;
                    }
                }
                self.notices
                    .push(NoticeLevel::Success, format!("Table {table_id} marked {}", status.as_str()));
                true
            }
            Err(e) => {
                report_action_error(&self.guard, &self.notices, "update-table", &e);
                false
            }
        }
    }

    /// Move an order to `status` and patch it in the loaded list.
    pub async fn advance_order(&self, order_id: u64, status: OrderStatus) -> bool {
        match self.api.transition_order(order_id, status).await {
            Ok(updated) => {
                info!(order_id, status = status.as_str(), "order advanced");
                if let Some(orders) = lock(&self.view).orders.loaded_mut() {
                    if let Some(slot) = orders.iter_mut().find(|o| o.id == updated.id) {
                        *slot = updated;
                    }
                }
                self.notices
                    .push(NoticeLevel::Success, format!("Order {order_id} is now {}", status.as_str()));
                true
            }
            Err(e) => {
                report_action_error(&self.guard, &self.notices, "advance-order", &e);
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl Refresh for WaiterDashboard {
    fn name(&self) -> &str {
        "waiter-dashboard"
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        self.refresh_all().await;
        Ok(())
    }
}
