//! URL construction helpers for registry and asset URLs

use thiserror::Error;
use url::Url;

/// Parses a base URL (registry mirror, asset host)
///
/// Only `http` and `https` are accepted.
pub fn parse_base_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UrlError::UnsupportedScheme {
            url: url.clone(),
            scheme: other.to_string(),
        }),
    }
}

/// Appends path segments to `url`, keeping any path the base already has
///
/// `https://mirror/npm` + `["@napi-rs", "canvas-linux-x64-gnu", "latest"]`
/// yields `https://mirror/npm/@napi-rs/canvas-linux-x64-gnu/latest`.
///
/// # Errors
///
/// Returns error if URL cannot be a base
pub fn append_path_segments(url: &mut Url, segments: &[&str]) -> Result<(), UrlError> {
    let url_for_error = url.clone();
    url.path_segments_mut()
        .map_err(|_| UrlError::CannotBeABase { url: url_for_error })?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

/// Last non-empty path segment of `url`, used as the on-disk file name
///
/// # Errors
///
/// Returns [`UrlError::NoFileName`] when the URL has no usable final segment
/// (root path, trailing `..`).
pub fn file_name_from_url(url: &Url) -> Result<String, UrlError> {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .filter(|name| *name != "." && *name != "..")
        .map(str::to_string)
        .ok_or_else(|| UrlError::NoFileName { url: url.clone() })
}

/// URL construction errors
#[derive(Debug, Error)]
pub enum UrlError {
    /// URL cannot be used as a base
    #[error("URL cannot be a base: {url}")]
    CannotBeABase {
        /// The problematic URL
        url: Url,
    },

    /// Only http(s) is fetched
    #[error("unsupported URL scheme '{scheme}': {url}")]
    UnsupportedScheme { url: Url, scheme: String },

    /// No final path segment to name the downloaded file after
    #[error("URL has no file name: {url}")]
    NoFileName { url: Url },

    /// Invalid URL parse error
    #[error("Invalid URL: {0}")]
    ParseError(#[from] url::ParseError),
}
