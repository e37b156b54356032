pub mod binding;
pub mod extract;
pub mod fetch;
pub mod font;
pub mod integrity;
pub mod libc;
pub mod loader;
pub mod platform;
pub mod registry;

// Re-export for convenience
pub use binding::{BindingInstaller, BindingOptions, InstallError, InstallErrorKind};
pub use extract::{ArchiveFormat, EntryKind, ExtractError, ExtractSummary, extract};
pub use fetch::{DownloadOptions, DownloadResult, DownloadStatus, FetchError, Progress, fetch};
pub use libc::LibcDetector;
pub use platform::{Artifact, HostPlatform, PlatformError, resolve, resolve_with};
pub use registry::{PackageMetadata, TarballLocation, fetch_tarball_location};
