//! HTTP client construction for registry and asset requests

use reqwest::blocking::Client;
use std::time::Duration;

/// Default timeout for metadata requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for binary and font downloads (5 minutes)
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Default user agent for skcanvas requests
pub const USER_AGENT: &str = concat!("skcanvas/", env!("CARGO_PKG_VERSION"));

/// Builds HTTP client with appropriate settings
///
/// # Arguments
///
/// * `timeout` - Request timeout duration
///
/// # Errors
///
/// Returns error if client construction fails
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Builds HTTP client with DEFAULT_TIMEOUT
pub fn build_default_client() -> Result<Client, reqwest::Error> {
    build_client(DEFAULT_TIMEOUT)
}

/// Builds HTTP client with DOWNLOAD_TIMEOUT
pub fn build_download_client() -> Result<Client, reqwest::Error> {
    build_client(DOWNLOAD_TIMEOUT)
}
