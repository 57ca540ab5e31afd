//! Staff roles and the role → dashboard route table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Route every unknown or missing role lands on.
pub const ROOT_ROUTE: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Chef,
    Waiter,
    Cashier,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Admin, Role::Manager, Role::Chef, Role::Waiter, Role::Cashier];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Chef => "chef",
            Role::Waiter => "waiter",
            Role::Cashier => "cashier",
        }
    }

    /// Case-insensitive parse. Anything outside the known set is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|role| role.code().eq_ignore_ascii_case(raw))
    }

    /// Dashboard for this role. Managers share the admin dashboard.
    #[must_use]
    pub const fn dashboard_route(self) -> &'static str {
        match self {
            Role::Admin | Role::Manager => "/admin/dashboard/",
            Role::Chef => "/chef/dashboard/",
            Role::Waiter => "/waiter/dashboard/",
            Role::Cashier => "/cashier/dashboard/",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Total mapping from an optional role to its landing route.
#[must_use]
pub fn route_for(role: Option<Role>) -> &'static str {
    role.map_or(ROOT_ROUTE, Role::dashboard_route)
}

#[cfg(test)]
#[path = "role_test.rs"]
mod tests;
