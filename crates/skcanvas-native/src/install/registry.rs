//! npm registry metadata lookup
//!
//! Only the `dist` object of a single-version document is consumed:
//! `dist.tarball` (required) and `dist.integrity` (optional).

use crate::http::retry::RetryPolicy;
use crate::http::url::append_path_segments;
use crate::install::fetch::FetchError;
use crate::install::integrity::Integrity;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Registry document for one published version
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub dist: Option<Dist>,
}

/// Distribution details of a published version
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Dist {
    pub tarball: Option<String>,
    pub integrity: Option<String>,
}

/// Where to download a package from, and what it should hash to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarballLocation {
    pub url: Url,
    pub integrity: Option<Integrity>,
    /// Version the registry resolved the request to, if reported
    pub version: Option<String>,
}

/// Builds `<base>/<package>/<version>`; a scoped package keeps its `/`
pub fn metadata_url(base: &Url, package: &str, version: &str) -> Result<Url, FetchError> {
    let mut url = base.clone();
    let mut segments: Vec<&str> = package.split('/').collect();
    segments.push(version);
    append_path_segments(&mut url, &segments)?;
    Ok(url)
}

/// Requests registry metadata for `package@version` and reads its tarball location
///
/// # Errors
///
/// - [`FetchError::Http`] / [`FetchError::Network`] when the request fails
/// - [`FetchError::InvalidMetadata`] when the body is not a metadata document
/// - [`FetchError::MissingField`] when `dist.tarball` is absent
pub fn fetch_tarball_location(
    client: &Client,
    base: &Url,
    package: &str,
    version: &str,
    retry: &RetryPolicy,
) -> Result<TarballLocation, FetchError> {
    let url = metadata_url(base, package, version)?;
    tracing::debug!("querying registry: {}", url);

    let body = retry.run(
        &format!("registry lookup for {package}"),
        |_| request_metadata(client, &url),
        FetchError::is_transient,
    )?;

    parse_tarball_location(&url, &body)
}

fn request_metadata(client: &Client, url: &Url) -> Result<String, FetchError> {
    let response = client
        .get(url.as_str())
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .map_err(|e| FetchError::Network {
            url: url.clone(),
            source: e.without_url(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            url: url.clone(),
            status: status.as_u16(),
        });
    }

    response.text().map_err(|e| FetchError::Network {
        url: url.clone(),
        source: e.without_url(),
    })
}

/// Reads the tarball location out of a metadata document
pub(crate) fn parse_tarball_location(url: &Url, body: &str) -> Result<TarballLocation, FetchError> {
    let metadata: PackageMetadata =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidMetadata {
            url: url.clone(),
            reason: e.to_string(),
        })?;

    let dist = metadata.dist.unwrap_or_default();
    let tarball = dist
        .tarball
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| FetchError::MissingField {
            url: url.clone(),
            field: "dist.tarball",
        })?;

    let tarball_url = Url::parse(&tarball).map_err(|e| FetchError::InvalidMetadata {
        url: url.clone(),
        reason: format!("dist.tarball '{tarball}': {e}"),
    })?;

    let integrity = match dist.integrity.as_deref() {
        Some(value) if !value.trim().is_empty() => Some(Integrity::parse(value)?),
        _ => None,
    };

    Ok(TarballLocation {
        url: tarball_url,
        integrity,
        version: metadata.version,
    })
}
