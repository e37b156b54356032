use super::consts;
use crate::error::{CanvasError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// skcanvas.toml schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for native binaries
    #[serde(default = "default_node_binary_path")]
    pub node_binary_path: PathBuf,
    /// Directory for fonts
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            node_binary_path: default_node_binary_path(),
            font_path: default_font_path(),
        }
    }
}

fn default_node_binary_path() -> PathBuf {
    PathBuf::from(consts::paths::NODE_BINARY_PATH)
}

fn default_font_path() -> PathBuf {
    PathBuf::from(consts::paths::FONT_PATH)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontsConfig {
    /// Family used when a caller does not name one
    #[serde(default)]
    pub default_font: Option<String>,
    /// Overrides the bundled font set download
    #[serde(default)]
    pub default_url: Option<String>,
}

impl FontsConfig {
    pub fn default_url(&self) -> &str {
        self.default_url
            .as_deref()
            .unwrap_or(consts::fonts::DEFAULT_URL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_base")]
    pub base: String,
    /// Exact version or dist-tag
    #[serde(default = "default_registry_version")]
    pub version: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base: default_registry_base(),
            version: default_registry_version(),
        }
    }
}

fn default_registry_base() -> String {
    consts::registry::BASE_URL.to_string()
}

fn default_registry_version() -> String {
    consts::registry::VERSION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Skips libc detection entirely when set
    #[serde(default)]
    pub libc: Option<LibcFlavor>,
    /// Used when detection is inconclusive
    #[serde(default = "default_libc_fallback")]
    pub libc_fallback: LibcFlavor,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            libc: None,
            libc_fallback: default_libc_fallback(),
        }
    }
}

fn default_libc_fallback() -> LibcFlavor {
    LibcFlavor::Musl
}

/// C library implementation of a Linux host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LibcFlavor {
    Glibc,
    Musl,
}

impl fmt::Display for LibcFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibcFlavor::Glibc => f.write_str("glibc"),
            LibcFlavor::Musl => f.write_str("musl"),
        }
    }
}

impl Config {
    /// Reads and validates the config at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CanvasError::ConfigParseError(e.to_string()))?;

        let config: Config = toml::from_str(&content).map_err(|e| CanvasError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.base.trim().is_empty() {
            return Err(CanvasError::ConfigInvalidValue {
                field: "registry.base".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.registry.version.trim().is_empty() {
            return Err(CanvasError::ConfigInvalidValue {
                field: "registry.version".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.paths.node_binary_path.as_os_str().is_empty() {
            return Err(CanvasError::ConfigInvalidValue {
                field: "paths.node_binary_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.paths.font_path.as_os_str().is_empty() {
            return Err(CanvasError::ConfigInvalidValue {
                field: "paths.font_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Native binary directory, relative paths anchored at `root`
    pub fn node_binary_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.paths.node_binary_path)
    }

    /// Font directory, relative paths anchored at `root`
    pub fn font_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.paths.font_path)
    }

    /// Creates both asset directories and returns them as (binaries, fonts)
    pub fn ensure_dirs(&self, root: &Path) -> Result<(PathBuf, PathBuf)> {
        let binaries = self.node_binary_dir(root);
        let fonts = self.font_dir(root);
        for dir in [&binaries, &fonts] {
            if dir.exists() && !dir.is_dir() {
                return Err(CanvasError::PathNotDirectory { path: dir.clone() });
            }
            std::fs::create_dir_all(dir)?;
        }
        Ok((binaries, fonts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(
            config.paths.node_binary_path,
            PathBuf::from("data/assets/canvas")
        );
        assert_eq!(config.paths.font_path, PathBuf::from("data/assets/fonts"));
        assert_eq!(config.registry.base, "https://registry.npmmirror.com");
        assert_eq!(config.registry.version, "latest");
        assert_eq!(config.platform.libc, None);
        assert_eq!(config.platform.libc_fallback, LibcFlavor::Musl);
        assert!(config.fonts.default_font.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[paths]
node_binary_path = "bin/canvas"
font_path = "bin/fonts"

[fonts]
default_font = "Noto Sans SC"
default_url = "https://fonts.example.com/set.tar.gz"

[registry]
base = "https://registry.npmjs.org"
version = "0.1.65"

[platform]
libc = "glibc"
libc_fallback = "glibc"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.paths.node_binary_path, PathBuf::from("bin/canvas"));
        assert_eq!(config.fonts.default_font.as_deref(), Some("Noto Sans SC"));
        assert_eq!(
            config.fonts.default_url(),
            "https://fonts.example.com/set.tar.gz"
        );
        assert_eq!(config.registry.version, "0.1.65");
        assert_eq!(config.platform.libc, Some(LibcFlavor::Glibc));
        assert_eq!(config.platform.libc_fallback, LibcFlavor::Glibc);
    }

    #[test]
    fn test_default_font_url_falls_back_to_bundled_set() {
        let config = Config::default();
        assert_eq!(config.fonts.default_url(), consts::fonts::DEFAULT_URL);
    }

    #[test]
    fn test_unknown_libc_is_rejected() {
        let toml = r#"
[platform]
libc_fallback = "bionic"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_registry() {
        let mut config = Config::default();
        config.registry.base = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            CanvasError::ConfigInvalidValue { ref field, .. } if field == "registry.base"
        ));
    }

    #[test]
    fn test_libc_display() {
        assert_eq!(LibcFlavor::Glibc.to_string(), "glibc");
        assert_eq!(LibcFlavor::Musl.to_string(), "musl");
    }
}
