//! Font asset installation
//!
//! A font source is either a single `.otf`/`.ttf` file, kept as downloaded,
//! or an archive that is extracted next to itself. The downloaded file doubles
//! as the "already installed" marker: when it exists, nothing is fetched.

use crate::fonts::FontRegistry;
use crate::http::client::build_download_client;
use crate::http::retry::RetryPolicy;
use crate::http::url::{file_name_from_url, parse_base_url};
use crate::install::extract::{ArchiveFormat, ExtractError, extract};
use crate::install::fetch::{DownloadOptions, FetchError, fetch};
use reqwest::blocking::Client;
use skcanvas_core::Config;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Extensions accepted for user-supplied font URLs
pub const USER_FONT_EXTENSIONS: &[&str] = &[".otf", ".ttf", ".tgz", ".tar.gz"];

/// Which font asset to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    /// The configured default font set
    Default,
    /// A user-supplied URL (validated with [`validate_font_url`])
    Url(String),
}

/// Checks a user-supplied font URL
///
/// The URL must be http(s) and its file name must end with `.otf`, `.ttf`,
/// `.tgz` or `.tar.gz` (case-insensitive).
pub fn validate_font_url(raw: &str) -> Result<Url, FontError> {
    let url = parse_base_url(raw).map_err(|e| FontError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let name = file_name_from_url(&url)
        .map_err(|e| FontError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?
        .to_ascii_lowercase();

    if USER_FONT_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        Ok(url)
    } else {
        Err(FontError::UnsupportedExtension {
            url: raw.to_string(),
        })
    }
}

fn is_font_file(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.ends_with(".otf") || name.ends_with(".ttf")
}

/// Downloads fonts into a font directory and keeps a registry current
pub struct FontInstaller {
    client: Client,
    default_url: String,
    retry: RetryPolicy,
    registry: Arc<FontRegistry>,
}

impl FontInstaller {
    pub fn new(default_url: impl Into<String>, registry: Arc<FontRegistry>) -> Result<Self, FontError> {
        Ok(Self {
            client: build_download_client().map_err(FontError::Client)?,
            default_url: default_url.into(),
            retry: RetryPolicy::default(),
            registry,
        })
    }

    pub fn from_config(config: &Config, registry: Arc<FontRegistry>) -> Result<Self, FontError> {
        Self::new(config.fonts.default_url(), registry)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &Arc<FontRegistry> {
        &self.registry
    }

    /// Installs `source` into `font_dir` unless its marker file exists
    ///
    /// Returns the number of families known to the registry afterwards.
    ///
    /// # Errors
    ///
    /// Invalid URLs, fetch failures and extraction failures. A failed
    /// extraction removes the downloaded archive so the next call retries.
    pub fn ensure_fonts(&self, font_dir: &Path, source: &FontSource) -> Result<usize, FontError> {
        let url = match source {
            FontSource::Default => parse_base_url(&self.default_url).map_err(|e| {
                FontError::InvalidUrl {
                    url: self.default_url.clone(),
                    reason: e.to_string(),
                }
            })?,
            FontSource::Url(raw) => validate_font_url(raw)?,
        };

        let file_name = file_name_from_url(&url).map_err(|e| FontError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let is_archive = ArchiveFormat::is_archive_name(&file_name);
        if !is_archive && !is_font_file(&file_name) {
            return Err(FontError::UnsupportedExtension {
                url: url.to_string(),
            });
        }

        let marker = font_dir.join(&file_name);
        if marker.exists() {
            tracing::debug!("fonts from {} already installed", file_name);
            return Ok(self.registry.load_dir(font_dir));
        }

        tracing::info!("installing fonts from {}", url);
        let download = fetch(
            &self.client,
            &url,
            font_dir,
            &DownloadOptions {
                retry: self.retry,
                ..DownloadOptions::default()
            },
        )?;

        if is_archive && let Err(err) = extract(&download.path) {
            if let Err(e) = fs::remove_file(&download.path) {
                tracing::warn!(
                    "could not remove {} after failed extraction: {}",
                    download.path.display(),
                    e
                );
            }
            return Err(err.into());
        }

        let count = self.registry.load_dir(font_dir);
        tracing::info!("{} font families available", count);
        Ok(count)
    }

    /// Installs the default font set; failures are logged, never returned
    ///
    /// Returns the number of families discoverable on disk either way.
    pub fn ensure_default_fonts(&self, font_dir: &Path) -> usize {
        match self.ensure_fonts(font_dir, &FontSource::Default) {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("default font installation failed: {}", err);
                self.registry.load_dir(font_dir)
            }
        }
    }
}

/// Font installation errors
#[derive(Debug, Error)]
pub enum FontError {
    #[error("FONT_URL_INVALID: '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("FONT_URL_UNSUPPORTED: '{url}' must end with .otf, .ttf, .tgz or .tar.gz")]
    UnsupportedExtension { url: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("FETCH_FAILED: could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
