//! Global context for CLI commands

use anyhow::{Context as _, Result};
use skcanvas_core::Config;
use std::env;
use std::path::{Path, PathBuf};

/// Loaded configuration plus the directory its relative paths are anchored at
pub struct Context {
    pub config: Config,
    pub root: PathBuf,
    #[allow(dead_code)]
    pub verbose: bool,
}

impl Context {
    /// Loads `config_path`, or defaults when it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated, or the working directory is unavailable.
    pub fn new(config_path: &Path, verbose: bool) -> Result<Self> {
        let config = Config::load_or_default(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;

        let root = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => env::current_dir()?,
        };

        tracing::debug!("config root: {}", root.display());

        Ok(Self {
            config,
            root,
            verbose,
        })
    }

    pub fn node_binary_dir(&self) -> PathBuf {
        self.config.node_binary_dir(&self.root)
    }

    pub fn font_dir(&self) -> PathBuf {
        self.config.font_dir(&self.root)
    }
}
