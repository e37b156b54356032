//! Canvas binding installation
//!
//! Resolves the artifact for the host, reuses the module when it is already
//! on disk, otherwise fetches the package tarball from the registry, extracts
//! it and loads the module through the configured [`NativeLoader`].

use crate::http::client::{build_default_client, build_download_client};
use crate::http::retry::RetryPolicy;
use crate::http::url::{UrlError, parse_base_url};
use crate::install::extract::{ExtractError, extract};
use crate::install::fetch::{DownloadOptions, FetchError, Progress, fetch};
use crate::install::libc::LibcDetector;
use crate::install::loader::{InstalledBinding, LoadError, NativeLoader, SharedObjectLoader};
use crate::install::platform::{Artifact, HostPlatform, PlatformError, resolve_with};
use crate::install::registry::fetch_tarball_location;
use reqwest::blocking::Client;
use skcanvas_core::Config;
use skcanvas_core::config::consts::registry::{BASE_URL, VERSION};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Where and how to install the binding
#[derive(Debug, Clone)]
pub struct BindingOptions {
    /// Directory holding the tarball and the extracted `package/`
    pub node_binary_path: PathBuf,
    pub registry_base: String,
    /// Registry version or dist-tag
    pub version: String,
    pub host: HostPlatform,
    pub libc: Arc<LibcDetector>,
    pub retry: RetryPolicy,
    pub progress: Option<fn(Progress)>,
}

impl BindingOptions {
    /// Defaults for the current host with the given binary directory
    pub fn new(node_binary_path: PathBuf) -> Self {
        Self {
            node_binary_path,
            registry_base: BASE_URL.to_string(),
            version: VERSION.to_string(),
            host: HostPlatform::current(),
            libc: LibcDetector::shared(skcanvas_core::LibcFlavor::Musl),
            retry: RetryPolicy::default(),
            progress: None,
        }
    }

    /// Options described by `config`, with paths relative to `root`
    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self {
            registry_base: config.registry.base.clone(),
            version: config.registry.version.clone(),
            libc: LibcDetector::from_config(&config.platform),
            ..Self::new(config.node_binary_dir(root))
        }
    }

    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    pub fn with_libc(mut self, libc: Arc<LibcDetector>) -> Self {
        self.libc = libc;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Installs and loads the canvas binding
pub struct BindingInstaller<L = SharedObjectLoader> {
    options: BindingOptions,
    registry_base: Url,
    metadata_client: Client,
    download_client: Client,
    loader: L,
}

impl<L: NativeLoader> BindingInstaller<L> {
    /// Validates the registry URL and builds the HTTP clients
    pub fn new(options: BindingOptions, loader: L) -> Result<Self, InstallError> {
        let registry_base =
            parse_base_url(&options.registry_base).map_err(|source| InstallError::InvalidRegistry {
                url: options.registry_base.clone(),
                source,
            })?;

        Ok(Self {
            registry_base,
            metadata_client: build_default_client().map_err(InstallError::Client)?,
            download_client: build_download_client().map_err(InstallError::Client)?,
            options,
            loader,
        })
    }

    pub fn options(&self) -> &BindingOptions {
        &self.options
    }

    /// Artifact for the configured host; detects libc only where it matters
    pub fn resolve_artifact(&self) -> Result<Artifact, InstallError> {
        let host = &self.options.host;
        Ok(resolve_with(&host.os, &host.arch, || {
            self.options.libc.detect()
        })?)
    }

    /// Resolves, fetches if needed, and loads the binding
    ///
    /// # Errors
    ///
    /// Every failure is fatal; see [`InstallError::kind`] for the category.
    pub fn install(&self) -> Result<InstalledBinding, InstallError> {
        let artifact = self.resolve_artifact()?;
        let module_path = artifact.module_path(&self.options.node_binary_path);

        if module_path.is_file() {
            tracing::debug!("canvas binding present at {}", module_path.display());
        } else {
            tracing::info!("installing canvas binding {}", artifact.package_name());
            self.download_and_extract(&artifact)?;

            if !module_path.is_file() {
                return Err(InstallError::ModuleMissing {
                    platform: artifact.platform,
                    path: module_path,
                });
            }
        }

        let binding = self
            .loader
            .load(&artifact, &module_path)
            .map_err(|source| InstallError::Load {
                os: artifact.os.clone(),
                arch: artifact.arch.clone(),
                platform: artifact.platform,
                source,
            })?;

        tracing::info!(
            "canvas binding {} loaded from {}",
            artifact.platform,
            module_path.display()
        );
        Ok(binding)
    }

    fn download_and_extract(&self, artifact: &Artifact) -> Result<(), InstallError> {
        let dir = &self.options.node_binary_path;
        fs::create_dir_all(dir).map_err(|source| InstallError::Io {
            operation: format!("create {}", dir.display()),
            source,
        })?;

        let location = fetch_tarball_location(
            &self.metadata_client,
            &self.registry_base,
            &artifact.package_name(),
            &self.options.version,
            &self.options.retry,
        )?;

        let download = fetch(
            &self.download_client,
            &location.url,
            dir,
            &DownloadOptions {
                integrity: location.integrity,
                retry: self.options.retry,
                progress: self.options.progress,
            },
        )?;

        let summary = extract(&download.path)?;
        tracing::debug!(
            "unpacked {} files from {}",
            summary.files,
            download.path.display()
        );
        Ok(())
    }
}

/// Failure category of an [`InstallError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallErrorKind {
    UnsupportedPlatform,
    Fetch,
    Extract,
    Load,
    Io,
}

/// Binding installation errors; all are fatal to service start
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    UnsupportedPlatform(#[from] PlatformError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("EXTRACT_FAILED: package for {platform} did not contain {}", path.display())]
    ModuleMissing { platform: &'static str, path: PathBuf },

    #[error("LOAD_FAILED: cannot load canvas binding for {os}-{arch} ({platform}): {source}")]
    Load {
        os: String,
        arch: String,
        platform: &'static str,
        #[source]
        source: LoadError,
    },

    #[error("FETCH_FAILED: invalid registry URL '{url}': {source}")]
    InvalidRegistry {
        url: String,
        #[source]
        source: UrlError,
    },

    #[error("FETCH_FAILED: could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("IO_ERROR: {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    pub fn kind(&self) -> InstallErrorKind {
        match self {
            InstallError::UnsupportedPlatform(_) => InstallErrorKind::UnsupportedPlatform,
            InstallError::Fetch(_) | InstallError::InvalidRegistry { .. } | InstallError::Client(_) => {
                InstallErrorKind::Fetch
            }
            InstallError::Extract(_) | InstallError::ModuleMissing { .. } => {
                InstallErrorKind::Extract
            }
            InstallError::Load { .. } => InstallErrorKind::Load,
            InstallError::Io { .. } => InstallErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skcanvas_core::LibcFlavor;
    use skcanvas_testkit::{shared_object_bytes, temp_dir_in_workspace};

    /// A registry nobody listens on; any request fails to connect
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn options(dir: &Path, os: &str, arch: &str) -> BindingOptions {
        BindingOptions {
            registry_base: UNREACHABLE.to_string(),
            ..BindingOptions::new(dir.to_path_buf())
        }
        .with_host(HostPlatform::new(os, arch))
        .with_libc(Arc::new(LibcDetector::fixed(LibcFlavor::Glibc)))
        .with_retry(RetryPolicy::none())
    }

    #[test]
    fn test_unsupported_platform_fails_before_network() {
        let temp = temp_dir_in_workspace();
        let installer =
            BindingInstaller::new(options(temp.path(), "plan9", "x64"), SharedObjectLoader).unwrap();

        let err = installer.install().unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::UnsupportedPlatform);
        assert!(err.to_string().contains("plan9"));
        assert!(err.to_string().contains("x64"));
    }

    #[test]
    fn test_existing_module_is_loaded_without_network() {
        let temp = temp_dir_in_workspace();
        let module = temp.path().join("package/skia.linux-x64-gnu.node");
        fs::create_dir_all(module.parent().unwrap()).unwrap();
        fs::write(&module, shared_object_bytes("linux")).unwrap();

        let installer =
            BindingInstaller::new(options(temp.path(), "linux", "x64"), SharedObjectLoader).unwrap();
        let binding = installer.install().unwrap();

        assert_eq!(binding.module_path, module);
        assert_eq!(binding.artifact.platform, "linux-x64-gnu");
    }

    #[test]
    fn test_corrupt_existing_module_reports_platform_context() {
        let temp = temp_dir_in_workspace();
        let module = temp.path().join("package/skia.darwin-arm64.node");
        fs::create_dir_all(module.parent().unwrap()).unwrap();
        fs::write(&module, b"not a dylib").unwrap();

        let installer =
            BindingInstaller::new(options(temp.path(), "darwin", "arm64"), SharedObjectLoader)
                .unwrap();
        let err = installer.install().unwrap_err();

        assert_eq!(err.kind(), InstallErrorKind::Load);
        let message = err.to_string();
        assert!(message.contains("darwin-arm64"), "{message}");
    }

    #[test]
    fn test_unreachable_registry_is_fetch_error() {
        let temp = temp_dir_in_workspace();
        let installer =
            BindingInstaller::new(options(temp.path(), "linux", "arm"), SharedObjectLoader).unwrap();

        let err = installer.install().unwrap_err();
        assert_eq!(err.kind(), InstallErrorKind::Fetch);
    }

    #[test]
    fn test_invalid_registry_url() {
        let temp = temp_dir_in_workspace();
        let opts = BindingOptions {
            registry_base: "ftp://registry.example.com".to_string(),
            ..options(temp.path(), "linux", "x64")
        };
        let err = BindingInstaller::new(opts, SharedObjectLoader)
            .err()
            .unwrap();
        assert_eq!(err.kind(), InstallErrorKind::Fetch);
    }

    #[test]
    fn test_resolve_artifact_uses_detector() {
        let temp = temp_dir_in_workspace();
        let opts = options(temp.path(), "linux", "arm64")
            .with_libc(Arc::new(LibcDetector::fixed(LibcFlavor::Musl)));
        let installer = BindingInstaller::new(opts, SharedObjectLoader).unwrap();
        assert_eq!(
            installer.resolve_artifact().unwrap().platform,
            "linux-arm64-musl"
        );
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.registry.base = "https://mirror.example.com/npm".to_string();
        config.registry.version = "0.1.65".to_string();
        config.platform.libc = Some(LibcFlavor::Glibc);

        let opts = BindingOptions::from_config(&config, Path::new("/srv/bot"));
        assert_eq!(opts.registry_base, "https://mirror.example.com/npm");
        assert_eq!(opts.version, "0.1.65");
        assert_eq!(opts.node_binary_path, Path::new("/srv/bot/data/assets/canvas"));
        assert_eq!(opts.libc.detect(), LibcFlavor::Glibc);
    }
}
