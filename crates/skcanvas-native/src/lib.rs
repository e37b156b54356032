//! Native Skia canvas binding provisioning for skcanvas.
//!
//! This crate resolves the prebuilt `@napi-rs/canvas` package matching the
//! host, downloads it from an npm registry mirror, unpacks it safely and hands
//! the module to a [`NativeLoader`]. Font assets go through the same fetch and
//! extract primitives.
//!
//! # Architecture
//!
//! - [`install::platform`]: (os, arch, libc) to artifact table
//! - [`install::libc`]: glibc/musl detection on Linux hosts
//! - [`install::fetch`]: streamed downloads with terminal status and integrity checks
//! - [`install::registry`]: registry metadata lookup (`dist.tarball`)
//! - [`install::extract`]: tar+gzip and zip extraction with traversal protection
//! - [`install::binding`]: the orchestrating binding installer
//! - [`install::font`]: idempotent font installation
//! - [`fonts`]: the font family registry
//! - [`http`]: client construction, URL helpers and retry policy
//!
//! # Binding Installation Flow
//!
//! ```text
//! BindingInstaller::install()
//!     ↓
//! 1. Resolve artifact (os, arch[, libc])
//!     → UnsupportedPlatform on unknown combinations
//!     ↓
//! 2. Check {node_binary_path}/package/skia.{platform}.node
//!     → present: skip to 5
//!     ↓ (missing)
//! 3. Registry lookup: {registry}/@napi-rs/canvas-{platform}/{version}
//!     → dist.tarball, dist.integrity
//!     ↓
//! 4. Download tarball (Complete only) → extract next to it
//!     ↓
//! 5. NativeLoader::load(path) → InstalledBinding
//! ```
//!
//! # Example
//!
//! ```no_run
//! use skcanvas_native::install::binding::{BindingInstaller, BindingOptions};
//! use skcanvas_native::install::loader::SharedObjectLoader;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = BindingOptions::new(PathBuf::from("data/assets/canvas"));
//! let installer = BindingInstaller::new(options, SharedObjectLoader)?;
//! let binding = installer.install()?;
//! println!("Loaded {}", binding.module_path.display());
//! # Ok(())
//! # }
//! ```

pub mod fonts;
pub mod http;
pub mod install;

// Re-export commonly used types
pub use fonts::FontRegistry;
pub use install::binding::{BindingInstaller, BindingOptions, InstallError, InstallErrorKind};
pub use install::font::{FontError, FontInstaller, FontSource};
pub use install::loader::{InstalledBinding, NativeLoader, SharedObjectLoader};
pub use install::platform::{Artifact, HostPlatform, PlatformError};
pub use skcanvas_core::LibcFlavor;
