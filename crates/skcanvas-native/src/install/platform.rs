//! Host platform to artifact resolution
//!
//! Operating systems and architectures use Node's naming (`darwin`, `win32`,
//! `x64`, `ia32`), which is what the `@napi-rs/canvas-*` package names are
//! built from. Every supported combination maps to exactly one artifact; any
//! other combination is an error, never a nearby default.

use skcanvas_core::LibcFlavor;
use skcanvas_core::config::consts::registry::{MODULE_PREFIX, PACKAGE_PREFIX, PACKAGE_SCOPE};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Artifact choice for one (os, arch) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Fixed(&'static str),
    ByLibc {
        gnu: &'static str,
        musl: &'static str,
    },
}

const TABLE: &[(&str, &[(&str, Target)])] = &[
    (
        "android",
        &[
            ("arm64", Target::Fixed("android-arm64")),
            ("arm", Target::Fixed("android-arm-eabi")),
        ],
    ),
    (
        "win32",
        &[
            ("x64", Target::Fixed("win32-x64-msvc")),
            ("ia32", Target::Fixed("win32-ia32-msvc")),
            ("arm64", Target::Fixed("win32-arm64-msvc")),
        ],
    ),
    (
        "darwin",
        &[
            ("x64", Target::Fixed("darwin-x64")),
            ("arm64", Target::Fixed("darwin-arm64")),
        ],
    ),
    ("freebsd", &[("x64", Target::Fixed("freebsd-x64"))]),
    (
        "linux",
        &[
            (
                "x64",
                Target::ByLibc {
                    gnu: "linux-x64-gnu",
                    musl: "linux-x64-musl",
                },
            ),
            (
                "arm64",
                Target::ByLibc {
                    gnu: "linux-arm64-gnu",
                    musl: "linux-arm64-musl",
                },
            ),
            ("arm", Target::Fixed("linux-arm-gnueabihf")),
        ],
    ),
];

fn lookup(os: &str, arch: &str) -> Option<Target> {
    TABLE
        .iter()
        .find(|(table_os, _)| *table_os == os)
        .and_then(|(_, arches)| arches.iter().find(|(table_arch, _)| *table_arch == arch))
        .map(|(_, target)| *target)
}

/// Operating system and CPU architecture of a host, in Node naming
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this process is running on
    pub fn current() -> Self {
        Self::new(
            node_os_name(std::env::consts::OS),
            node_arch_name(std::env::consts::ARCH),
        )
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Maps a Rust `target_os` name to Node's `process.platform` name
pub fn node_os_name(rust_os: &str) -> &str {
    match rust_os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Maps a Rust `target_arch` name to Node's `process.arch` name
pub fn node_arch_name(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}

/// A resolved platform-specific binding package
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub os: String,
    pub arch: String,
    pub libc: Option<LibcFlavor>,
    /// Platform identifier, e.g. `linux-x64-gnu`
    pub platform: &'static str,
}

impl Artifact {
    /// Registry package name, e.g. `@napi-rs/canvas-linux-x64-gnu`
    pub fn package_name(&self) -> String {
        format!("{}/{}-{}", PACKAGE_SCOPE, PACKAGE_PREFIX, self.platform)
    }

    /// Module file shipped in the package, e.g. `skia.linux-x64-gnu.node`
    pub fn module_file_name(&self) -> String {
        format!("{}.{}.node", MODULE_PREFIX, self.platform)
    }

    /// Expected module location below a binary directory (`<dir>/package/<file>`)
    pub fn module_path(&self, node_binary_dir: &Path) -> PathBuf {
        node_binary_dir
            .join(skcanvas_core::config::consts::paths::PACKAGE_DIR)
            .join(self.module_file_name())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform)
    }
}

/// Resolves (os, arch) to an artifact, using `libc` where the table branches on it
pub fn resolve(os: &str, arch: &str, libc: LibcFlavor) -> Result<Artifact, PlatformError> {
    resolve_with(os, arch, || libc)
}

/// Resolves (os, arch) to an artifact, calling `detect_libc` only when needed
///
/// `detect_libc` runs for `linux` on `x64` and `arm64` only.
///
/// # Errors
///
/// [`PlatformError::Unsupported`] carrying the offending pair when the table
/// has no entry for it.
pub fn resolve_with<F>(os: &str, arch: &str, detect_libc: F) -> Result<Artifact, PlatformError>
where
    F: FnOnce() -> LibcFlavor,
{
    let target = lookup(os, arch).ok_or_else(|| PlatformError::Unsupported {
        os: os.to_string(),
        arch: arch.to_string(),
    })?;

    let (platform, libc) = match target {
        Target::Fixed(platform) => (platform, None),
        Target::ByLibc { gnu, musl } => {
            let libc = detect_libc();
            let platform = match libc {
                LibcFlavor::Glibc => gnu,
                LibcFlavor::Musl => musl,
            };
            (platform, Some(libc))
        }
    };

    tracing::debug!("resolved {}-{} to {}", os, arch, platform);

    Ok(Artifact {
        os: os.to_string(),
        arch: arch.to_string(),
        libc,
        platform,
    })
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("UNSUPPORTED_PLATFORM: no canvas binding for os '{os}' arch '{arch}'")]
    Unsupported { os: String, arch: String },
}
