//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients shared by
//! provider implementations.

use std::time::Duration;

/// Build a `reqwest::Client` with the given request timeout.
///
/// Proxy settings are taken from the standard environment variables
/// (`HTTPS_PROXY` etc.), which reqwest honors by default.
pub fn build_http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to build reqwest client")
}
