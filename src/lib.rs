//! Session and credential management core for a multi-role listing platform.
//!
//! The crate is a library: HTTP routing, input validation and the other
//! outer surfaces live in the consuming service. What lives here is the
//! security-critical center: paired access/refresh token issuance and
//! rotation with theft detection, OTP step-up on risky logins, per-account
//! session eviction, the transactional account+profile create, and the
//! password-reset token lifecycle.

pub mod config;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use tracing_subscriber::EnvFilter;

/// Initialize tracing with the given log level filter.
///
/// Safe to call more than once (later calls are no-ops), which keeps
/// test setup simple.
pub fn init_tracing(log_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .try_init();
}
