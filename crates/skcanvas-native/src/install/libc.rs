//! glibc / musl detection for Linux hosts
//!
//! Probes run in priority order until one is conclusive:
//!
//! 1. [`GetconfProbe`]: asks the system for `GNU_LIBC_VERSION`; a glibc
//!    version line means glibc, a report without one means musl
//! 2. [`LoaderScanProbe`]: locates `ldd` on `PATH` and scans it for `musl`
//! 3. the configured fallback
//!
//! The first answer is cached for the detector's lifetime.

use skcanvas_core::LibcFlavor;
use std::process::Command;
use std::sync::{Arc, OnceLock};

/// One libc detection technique
pub trait LibcProbe: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// `None` when the technique is unavailable or inconclusive
    fn probe(&self) -> Option<LibcFlavor>;
}

/// Structured system report via `getconf GNU_LIBC_VERSION`
#[derive(Debug, Default, Clone, Copy)]
pub struct GetconfProbe;

impl LibcProbe for GetconfProbe {
    fn name(&self) -> &'static str {
        "getconf"
    }

    fn probe(&self) -> Option<LibcFlavor> {
        let getconf = which::which("getconf").ok()?;
        let output = Command::new(getconf).arg("GNU_LIBC_VERSION").output().ok()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Some(parse_getconf_report(output.status.success(), &stdout))
    }
}

/// Reads a `getconf GNU_LIBC_VERSION` result
///
/// glibc answers `glibc 2.39`; musl's getconf rejects the variable.
pub(crate) fn parse_getconf_report(success: bool, stdout: &str) -> LibcFlavor {
    let has_glibc_version = stdout
        .lines()
        .any(|line| line.trim_start().starts_with("glibc"));
    if success && has_glibc_version {
        LibcFlavor::Glibc
    } else {
        LibcFlavor::Musl
    }
}

/// Scans the dynamic loader front-end (`ldd`) for the musl marker
#[derive(Debug, Default, Clone, Copy)]
pub struct LoaderScanProbe;

impl LibcProbe for LoaderScanProbe {
    fn name(&self) -> &'static str {
        "ldd-scan"
    }

    fn probe(&self) -> Option<LibcFlavor> {
        let ldd = which::which("ldd").ok()?;
        let contents = std::fs::read(&ldd).ok()?;
        Some(classify_loader(&contents))
    }
}

pub(crate) fn classify_loader(contents: &[u8]) -> LibcFlavor {
    if contents.windows(4).any(|window| window == b"musl") {
        LibcFlavor::Musl
    } else {
        LibcFlavor::Glibc
    }
}

/// Always answers with the same flavor (configured override)
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub LibcFlavor);

impl LibcProbe for FixedProbe {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn probe(&self) -> Option<LibcFlavor> {
        Some(self.0)
    }
}

/// Cached libc detection
pub struct LibcDetector {
    probes: Vec<Box<dyn LibcProbe>>,
    fallback: LibcFlavor,
    detected: OnceLock<LibcFlavor>,
}

impl LibcDetector {
    /// Default probe chain with the given fallback
    pub fn new(fallback: LibcFlavor) -> Self {
        Self::with_probes(
            vec![Box::new(GetconfProbe), Box::new(LoaderScanProbe)],
            fallback,
        )
    }

    pub fn with_probes(probes: Vec<Box<dyn LibcProbe>>, fallback: LibcFlavor) -> Self {
        Self {
            probes,
            fallback,
            detected: OnceLock::new(),
        }
    }

    /// Skips detection and always reports `flavor`
    pub fn fixed(flavor: LibcFlavor) -> Self {
        Self::with_probes(vec![Box::new(FixedProbe(flavor))], flavor)
    }

    /// Detector described by the `[platform]` config table
    ///
    /// A pinned `libc` gets its own fixed detector; otherwise the process-wide
    /// detector for the configured fallback is shared.
    pub fn from_config(config: &skcanvas_core::config::PlatformConfig) -> Arc<Self> {
        match config.libc {
            Some(flavor) => Arc::new(Self::fixed(flavor)),
            None => Self::shared(config.libc_fallback),
        }
    }

    /// Process-wide detector with the default probe chain
    ///
    /// Probes run at most once per process for each fallback flavor.
    pub fn shared(fallback: LibcFlavor) -> Arc<Self> {
        static GLIBC_FALLBACK: OnceLock<Arc<LibcDetector>> = OnceLock::new();
        static MUSL_FALLBACK: OnceLock<Arc<LibcDetector>> = OnceLock::new();

        let cell = match fallback {
            LibcFlavor::Glibc => &GLIBC_FALLBACK,
            LibcFlavor::Musl => &MUSL_FALLBACK,
        };
        Arc::clone(cell.get_or_init(|| Arc::new(Self::new(fallback))))
    }

    /// Detected flavor; probes run at most once per detector
    pub fn detect(&self) -> LibcFlavor {
        *self.detected.get_or_init(|| self.run_probes())
    }

    fn run_probes(&self) -> LibcFlavor {
        for probe in &self.probes {
            if let Some(flavor) = probe.probe() {
                tracing::debug!("libc probe '{}' reported {}", probe.name(), flavor);
                return flavor;
            }
            tracing::debug!("libc probe '{}' was inconclusive", probe.name());
        }
        tracing::warn!(
            "could not determine the C library, assuming {} (set platform.libc to override)",
            self.fallback
        );
        self.fallback
    }
}

impl std::fmt::Debug for LibcDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibcDetector")
            .field(
                "probes",
                &self.probes.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("fallback", &self.fallback)
            .field("detected", &self.detected.get())
            .finish()
    }
}
