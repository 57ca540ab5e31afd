//! Client for the restaurant point-of-sale backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Dashboards (admin, cashier, waiter) poll REST endpoints and gate their
//! `init()` on a shared [`session::SessionGuard`]. Browser surfaces
//! (persistent storage, session storage, cookies, location) are modelled as
//! traits in [`storage`] and [`navigator`] so the same logic runs headless
//! and under test.
//!
//! LAYOUT
//! ======
//! - `error`: failure taxonomy shared by every call site.
//! - `config`: environment-driven client configuration.
//! - `role`, `credential`, `context`: identity, tokens, cookies.
//! - `api`: reqwest-backed REST client.
//! - `session`: the session guard.
//! - `payment`: idempotent payment submission.
//! - `scheduler`: one refresh timer per page.
//! - `dashboard`: per-role controllers.

pub mod api;
pub mod config;
pub mod context;
pub mod credential;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod navigator;
pub mod payment;
pub mod role;
pub mod scheduler;
pub mod session;
pub mod storage;
