//! Admin dashboard: aggregate counters, business metrics, profit table.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::{Notices, Widget, apply, gate, lock, settle};
use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{BusinessMetrics, DashboardSummary, Period, ProfitRow};
use crate::role::Role;
use crate::scheduler::Refresh;
use crate::session::SessionGuard;

pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Manager];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminView {
    pub summary: Widget<DashboardSummary>,
    pub metrics: Widget<BusinessMetrics>,
    pub profit: Widget<Vec<ProfitRow>>,
}

pub struct AdminDashboard {
    guard: Arc<SessionGuard>,
    api: Arc<ApiClient>,
    period: Mutex<Period>,
    view: Mutex<AdminView>,
    notices: Notices,
}

impl AdminDashboard {
    #[must_use]
    pub fn new(guard: Arc<SessionGuard>, api: Arc<ApiClient>) -> Self {
        Self {
            guard,
            api,
            period: Mutex::new(Period::default()),
            view: Mutex::new(AdminView::default()),
            notices: Notices::default(),
        }
    }

    pub async fn init(&self) -> bool {
        gate(&self.guard, ADMIN_ROLES).await
    }

    #[must_use]
    pub fn view(&self) -> AdminView {
        lock(&self.view).clone()
    }

    #[must_use]
    pub fn period(&self) -> Period {
        *lock(&self.period)
    }

    #[must_use]
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Reload every widget. The aggregate is the page's primary resource.
    ///
    /// Metrics fetched for a period that was replaced mid-flight are dropped.
    pub async fn refresh_all(&self) {
        let period = self.period();
        let (summary, metrics, profit) = tokio::join!(
            self.api.dashboard_summary(),
            self.api.business_metrics(period),
            self.api.profit_table(),
        );
        let sign_out = {
            let mut view = lock(&self.view);
            let summary = apply(&mut view.summary, settle("summary", summary, true), &self.notices);
            let metrics = if self.period() == period {
                apply(&mut view.metrics, settle("metrics", metrics, false), &self.notices)
            } else {
                debug!(%period, "discarding metrics for superseded period");
                false
            };
            let profit = apply(&mut view.profit, settle("profit", profit, false), &self.notices);
            summary || metrics || profit
        };
        if sign_out {
            self.guard.handle_auth_failure();
        }
    }

    /// Switch the metrics window and refetch metrics only.
    pub async fn set_period(&self, period: Period) {
        *lock(&self.period) = period;
        info!(%period, "metrics period changed");
        let metrics = self.api.business_metrics(period).await;
        let sign_out = {
            let mut view = lock(&self.view);
            if self.period() != period {
                debug!(%period, "discarding metrics for superseded period");
                return;
            }
            apply(&mut view.metrics, settle("metrics", metrics, false), &self.notices)
        };
        if sign_out {
            self.guard.handle_auth_failure();
        }
    }
}

#[async_trait::async_trait]
impl Refresh for AdminDashboard {
    fn name(&self) -> &str {
        "admin-dashboard"
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        self.refresh_all().await;
        Ok(())
    }
}
