//! Shared HTTP utilities
//!
//! This module provides common functionality for talking to the registry and
//! asset hosts:
//! - HTTP client construction with appropriate user-agent and timeouts
//! - Safe URL construction helpers
//! - Retry with exponential backoff for transient failures

pub mod client;
pub mod retry;
pub mod url;

// Re-exports for convenient access
pub use client::{
    DEFAULT_TIMEOUT, DOWNLOAD_TIMEOUT, USER_AGENT, build_client, build_default_client,
    build_download_client,
};
pub use retry::RetryPolicy;
pub use url::{UrlError, append_path_segments, file_name_from_url, parse_base_url};
