//! Asset download with terminal-status classification
//!
//! Downloads are streamed into a temporary file inside the destination
//! directory and only renamed to their final name once the transfer is
//! `Complete` and, when requested, the integrity digest matches. The
//! destination directory therefore never holds a partially-downloaded file
//! under its final name, and a file already present under that name is
//! treated as cached.
//!
//! # Example
//!
//! ```no_run
//! use skcanvas_native::http::build_download_client;
//! use skcanvas_native::install::fetch::{DownloadOptions, fetch};
//! use std::path::Path;
//! use url::Url;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = build_download_client()?;
//! let url = Url::parse("https://fonts.example.com/NotoSans.ttf")?;
//! let result = fetch(&client, &url, Path::new("data/assets/fonts"), &DownloadOptions::default())?;
//! println!("{} ({:?})", result.path.display(), result.status);
//! # Ok(())
//! # }
//! ```

use crate::http::retry::RetryPolicy;
use crate::http::url::{UrlError, file_name_from_url};
use crate::install::integrity::{Integrity, IntegrityError};
use reqwest::blocking::Client;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Download progress snapshot (advisory only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub downloaded: u64,
    pub total: Option<u64>,
    /// Never decreases within one fetch
    pub percent: u8,
    pub remaining_bytes: Option<u64>,
}

/// Download configuration options
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Expected digest of the complete file
    pub integrity: Option<Integrity>,

    /// Retry behaviour for transient failures
    pub retry: RetryPolicy,

    /// Optional progress callback
    pub progress: Option<fn(Progress)>,
}

/// Final state of a transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Complete,
    /// The stream ended before all announced bytes arrived
    Aborted,
    /// The local side could not store the stream
    Failed,
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Complete => f.write_str("complete"),
            DownloadStatus::Aborted => f.write_str("aborted"),
            DownloadStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Outcome of a successful [`fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub status: DownloadStatus,
    /// The file was already present and no request was made
    pub skipped: bool,
    pub bytes: u64,
}

/// Downloads `url` into `destination_dir`, named after the URL's last segment
///
/// # Errors
///
/// Returns [`FetchError`] on network failure, non-success status, a
/// non-`Complete` terminal status or an integrity mismatch. Transient failures
/// are retried according to `options.retry` first.
pub fn fetch(
    client: &Client,
    url: &Url,
    destination_dir: &Path,
    options: &DownloadOptions,
) -> Result<DownloadResult, FetchError> {
    let file_name = file_name_from_url(url)?;
    let target = destination_dir.join(&file_name);

    if target.exists() {
        tracing::debug!("{} already present, skipping download", target.display());
        let bytes = fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
        return Ok(DownloadResult {
            path: target,
            status: DownloadStatus::Complete,
            skipped: true,
            bytes,
        });
    }

    fs::create_dir_all(destination_dir).map_err(|e| FetchError::Io {
        operation: format!("create directory {}", destination_dir.display()),
        source: e,
    })?;

    tracing::debug!("downloading {} to {}", url, target.display());
    let mut tracker = ProgressTracker::new(options.progress);
    let (temp_file, downloaded) = options.retry.run(
        &format!("download of {url}"),
        |_| transfer(client, url, destination_dir, options, &mut tracker),
        FetchError::is_transient,
    )
    .inspect_err(|err| {
        tracing::warn!("download of {} {}: {}", url, err.download_status(), err);
    })?;

    temp_file.persist(&target).map_err(|e| FetchError::Io {
        operation: format!("rename download to {}", target.display()),
        source: e.error,
    })?;

    tracing::info!("downloaded {} ({} bytes)", target.display(), downloaded);

    Ok(DownloadResult {
        path: target,
        status: DownloadStatus::Complete,
        skipped: false,
        bytes: downloaded,
    })
}

/// One transfer attempt into a temporary file next to the target
fn transfer(
    client: &Client,
    url: &Url,
    dir: &Path,
    options: &DownloadOptions,
    tracker: &mut ProgressTracker,
) -> Result<(tempfile::NamedTempFile, u64), FetchError> {
    let mut response = client
        .get(url.as_str())
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

    let total = response.content_length();

    let mut temp_file = tempfile::Builder::new()
        .prefix(".skcanvas-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| FetchError::Io {
            operation: format!("create temporary file in {}", dir.display()),
            source: e,
        })?;

    let mut hasher = options.integrity.as_ref().map(Integrity::hasher);
    let mut downloaded: u64 = 0;
    let mut buffer = [0; 8192];

    let incomplete = |status, downloaded| FetchError::Incomplete {
        url: url.clone(),
        status,
        downloaded,
        expected: total,
    };

    loop {
        let bytes_read = match response.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("reading {} failed after {} bytes: {}", url, downloaded, e);
                return Err(incomplete(DownloadStatus::Aborted, downloaded));
            }
        };

        if let Err(e) = temp_file.write_all(&buffer[..bytes_read]) {
            tracing::warn!("writing download of {} failed: {}", url, e);
            return Err(incomplete(DownloadStatus::Failed, downloaded));
        }

        if let Some(hasher) = hasher.as_mut() {
            hasher.update(&buffer[..bytes_read]);
        }

        downloaded += bytes_read as u64;
        tracker.report(downloaded, total);
    }

    if let Some(expected) = total
        && downloaded != expected
    {
        return Err(incomplete(DownloadStatus::Aborted, downloaded));
    }

    if let Some(integrity) = &options.integrity
        && let Some(hasher) = hasher
        && !integrity.matches(&hasher.finalize())
    {
        return Err(FetchError::Integrity {
            url: url.clone(),
            expected: integrity.to_string(),
        });
    }

    if let Err(e) = temp_file.as_file().sync_all() {
        tracing::warn!("syncing download of {} failed: {}", url, e);
        return Err(incomplete(DownloadStatus::Failed, downloaded));
    }

    tracker.finish(downloaded);

    Ok((temp_file, downloaded))
}

/// Keeps reported percentages monotonic across chunks and retries
struct ProgressTracker {
    callback: Option<fn(Progress)>,
    last_percent: u8,
}

impl ProgressTracker {
    fn new(callback: Option<fn(Progress)>) -> Self {
        Self {
            callback,
            last_percent: 0,
        }
    }

    fn report(&mut self, downloaded: u64, total: Option<u64>) {
        let Some(callback) = self.callback else {
            return;
        };

        let raw = match total {
            Some(total) if total > 0 => (downloaded.min(total) * 100 / total) as u8,
            _ => 0,
        };
        self.last_percent = self.last_percent.max(raw);

        callback(Progress {
            downloaded,
            total,
            percent: self.last_percent,
            remaining_bytes: total.map(|t| t.saturating_sub(downloaded)),
        });
    }

    fn finish(&mut self, downloaded: u64) {
        let Some(callback) = self.callback else {
            return;
        };
        self.last_percent = 100;
        callback(Progress {
            downloaded,
            total: Some(downloaded),
            percent: 100,
            remaining_bytes: Some(0),
        });
    }
}

/// Fetch error types
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or no response arrived
    #[error("FETCH_FAILED: request to {url} failed: {source}")]
    Network {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("FETCH_FAILED: {url} returned HTTP {status}")]
    Http { url: Url, status: u16 },

    /// Registry metadata lacks a required field
    #[error("FETCH_FAILED: registry metadata at {url} has no '{field}'")]
    MissingField { url: Url, field: &'static str },

    /// Registry metadata is not the expected JSON document
    #[error("FETCH_FAILED: invalid registry metadata at {url}: {reason}")]
    InvalidMetadata { url: Url, reason: String },

    /// The transfer ended in a non-complete terminal state
    #[error("FETCH_FAILED: download of {url} {status} after {downloaded} bytes")]
    Incomplete {
        url: Url,
        status: DownloadStatus,
        downloaded: u64,
        expected: Option<u64>,
    },

    /// Downloaded bytes do not match the advertised digest
    #[error("FETCH_FAILED: integrity check failed for {url} (expected {expected})")]
    Integrity { url: Url, expected: String },

    /// Advertised digest could not be parsed
    #[error("FETCH_FAILED: {0}")]
    InvalidIntegrity(#[from] IntegrityError),

    #[error("FETCH_FAILED: {0}")]
    Url(#[from] UrlError),

    /// HTTP client construction failed
    #[error("FETCH_FAILED: could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Local filesystem error
    #[error("FETCH_FAILED: I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Whether repeating the request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { source, .. } => source.is_timeout() || source.is_connect(),
            FetchError::Http { status, .. } => *status >= 500 || *status == 429,
            FetchError::Incomplete { status, .. } => *status == DownloadStatus::Aborted,
            _ => false,
        }
    }

    /// Terminal status this error corresponds to
    pub fn download_status(&self) -> DownloadStatus {
        match self {
            FetchError::Incomplete { status, .. } => *status,
            _ => DownloadStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client::build_client;
    use mockito::Server;
    use skcanvas_testkit::{sri_sha512, temp_dir_in_workspace};
    use std::time::Duration;

    fn client() -> Client {
        build_client(Duration::from_secs(10)).unwrap()
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn dir_entries(dir: &Path) -> usize {
        fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[test]
    fn test_fetch_writes_file_under_url_name() {
        let mut server = Server::new();
        let body = vec![b'x'; 1000];
        let mock = server
            .mock("GET", "/files/canvas.tgz")
            .with_status(200)
            .with_body(&body)
            .create();

        let dest = temp_dir_in_workspace();
        let url = Url::parse(&format!("{}/files/canvas.tgz", server.url())).unwrap();
        let result = fetch(&client(), &url, dest.path(), &DownloadOptions::default()).unwrap();

        mock.assert();
        assert_eq!(result.status, DownloadStatus::Complete);
        assert!(!result.skipped);
        assert_eq!(result.bytes, 1000);
        assert_eq!(result.path, dest.path().join("canvas.tgz"));
        assert_eq!(fs::read(&result.path).unwrap(), body);
        assert_eq!(dir_entries(dest.path()), 1, "no temporary files left");
    }

    #[test]
    fn test_existing_file_skips_network() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/files/cached.tgz")
            .with_status(200)
            .expect(0)
            .create();

        let dest = temp_dir_in_workspace();
        fs::write(dest.path().join("cached.tgz"), b"cached").unwrap();

        let url = Url::parse(&format!("{}/files/cached.tgz", server.url())).unwrap();
        let result = fetch(&client(), &url, dest.path(), &DownloadOptions::default()).unwrap();

        mock.assert();
        assert!(result.skipped);
        assert_eq!(result.status, DownloadStatus::Complete);
        assert_eq!(result.bytes, 6);
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/files/missing.tgz")
            .with_status(404)
            .expect(1)
            .create();

        let dest = temp_dir_in_workspace();
        let url = Url::parse(&format!("{}/files/missing.tgz", server.url())).unwrap();
        let options = DownloadOptions {
            retry: fast_retry(3),
            ..DownloadOptions::default()
        };
        let err = fetch(&client(), &url, dest.path(), &options).unwrap_err();

        mock.assert();
        assert!(matches!(err, FetchError::Http { status: 404, .. }));
        assert!(!err.is_transient());
        assert_eq!(dir_entries(dest.path()), 0);
    }

    #[test]
    fn test_server_error_is_retried() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/files/flaky.tgz")
            .with_status(503)
            .expect(3)
            .create();

        let dest = temp_dir_in_workspace();
        let url = Url::parse(&format!("{}/files/flaky.tgz", server.url())).unwrap();
        let options = DownloadOptions {
            retry: fast_retry(3),
            ..DownloadOptions::default()
        };
        let err = fetch(&client(), &url, dest.path(), &options).unwrap_err();

        mock.assert();
        assert!(matches!(err, FetchError::Http { status: 503, .. }));
        assert!(!dest.path().join("flaky.tgz").exists());
    }

    #[test]
    fn test_integrity_match_persists_file() {
        let mut server = Server::new();
        let body = b"canvas tarball".to_vec();
        server
            .mock("GET", "/files/verified.tgz")
            .with_status(200)
            .with_body(&body)
            .create();

        let dest = temp_dir_in_workspace();
        let url = Url::parse(&format!("{}/files/verified.tgz", server.url())).unwrap();
        let options = DownloadOptions {
            integrity: Some(Integrity::parse(&sri_sha512(&body)).unwrap()),
            ..DownloadOptions::default()
        };
        let result = fetch(&client(), &url, dest.path(), &options).unwrap();
        assert_eq!(fs::read(result.path).unwrap(), body);
    }

    #[test]
    fn test_integrity_mismatch_leaves_nothing_behind() {
        let mut server = Server::new();
        server
            .mock("GET", "/files/tampered.tgz")
            .with_status(200)
            .with_body("tampered")
            .create();

        let dest = temp_dir_in_workspace();
        let url = Url::parse(&format!("{}/files/tampered.tgz", server.url())).unwrap();
        let options = DownloadOptions {
            integrity: Some(Integrity::parse(&sri_sha512(b"original")).unwrap()),
            ..DownloadOptions::default()
        };
        let err = fetch(&client(), &url, dest.path(), &options).unwrap_err();

        assert!(matches!(err, FetchError::Integrity { .. }));
        assert_eq!(dir_entries(dest.path()), 0);
    }

    #[test]
    fn test_broken_stream_is_not_complete() {
        let mut server = Server::new();
        server
            .mock("GET", "/files/broken.tgz")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"partial")?;
                Err(io::Error::other("connection dropped"))
            })
            .create();

        let dest = temp_dir_in_workspace();
        let url = Url::parse(&format!("{}/files/broken.tgz", server.url())).unwrap();
        let result = fetch(&client(), &url, dest.path(), &DownloadOptions::default());

        assert!(result.is_err(), "a truncated stream must not count as complete");
        assert!(!dest.path().join("broken.tgz").exists());
    }

    #[test]
    fn test_progress_is_monotonic_and_finishes_at_100() {
        use std::sync::{Mutex, OnceLock};

        // Static storage for tracking progress calls (required for fn pointer)
        static PROGRESS_CALLS: OnceLock<Mutex<Vec<Progress>>> = OnceLock::new();

        fn track_progress(progress: Progress) {
            PROGRESS_CALLS
                .get_or_init(|| Mutex::new(Vec::new()))
                .lock()
                .unwrap()
                .push(progress);
        }

        let mut server = Server::new();
        let body = vec![b'p'; 50_000];
        server
            .mock("GET", "/files/progress.tgz")
            .with_status(200)
            .with_body(&body)
            .create();

        let dest = temp_dir_in_workspace();
        let url = Url::parse(&format!("{}/files/progress.tgz", server.url())).unwrap();
        let options = DownloadOptions {
            progress: Some(track_progress),
            ..DownloadOptions::default()
        };
        fetch(&client(), &url, dest.path(), &options).unwrap();

        let calls = PROGRESS_CALLS.get().unwrap().lock().unwrap();
        assert!(calls.len() >= 2);
        assert!(calls.windows(2).all(|w| w[0].percent <= w[1].percent));
        let last = calls.last().unwrap();
        assert_eq!(last.percent, 100);
        assert_eq!(last.remaining_bytes, Some(0));
        assert_eq!(last.downloaded, 50_000);
    }

    #[test]
    fn test_url_without_file_name() {
        let dest = temp_dir_in_workspace();
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let err = fetch(&client(), &url, dest.path(), &DownloadOptions::default()).unwrap_err();
        assert!(matches!(err, FetchError::Url(UrlError::NoFileName { .. })));
    }

    #[test]
    fn test_download_status_of_errors() {
        let url = Url::parse("https://example.com/a.tgz").unwrap();
        let aborted = FetchError::Incomplete {
            url: url.clone(),
            status: DownloadStatus::Aborted,
            downloaded: 10,
            expected: Some(20),
        };
        assert_eq!(aborted.download_status(), DownloadStatus::Aborted);
        assert!(aborted.is_transient());

        let http = FetchError::Http { url, status: 500 };
        assert_eq!(http.download_status(), DownloadStatus::Failed);
        assert!(http.is_transient());
    }
}
