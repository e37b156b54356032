//! Service start-up: binding installation plus background font installation

use skcanvas_core::Config;
use skcanvas_native::install::binding::InstallError;
use skcanvas_native::{
    BindingInstaller, BindingOptions, FontInstaller, FontRegistry, InstalledBinding, NativeLoader,
    SharedObjectLoader,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// A started canvas service
pub struct CanvasService {
    binding: InstalledBinding,
    fonts: Arc<FontRegistry>,
    font_dir: PathBuf,
    default_font: Option<String>,
    font_task: Mutex<Option<JoinHandle<usize>>>,
}

impl CanvasService {
    /// Starts the service described by `config`, paths anchored at `root`
    ///
    /// # Errors
    ///
    /// Any binding installation failure. Font installation failures are
    /// logged and never returned.
    pub fn start(config: &Config, root: &Path) -> Result<Self, InstallError> {
        let (node_binary_dir, font_dir) = config.ensure_dirs(root).map_err(|e| InstallError::Io {
            operation: "prepare asset directories".to_string(),
            source: io::Error::other(e),
        })?;
        tracing::debug!(
            "asset directories: {} and {}",
            node_binary_dir.display(),
            font_dir.display()
        );

        let registry = Arc::new(FontRegistry::new());
        let fonts = FontInstaller::from_config(config, Arc::clone(&registry)).map_err(|e| {
            InstallError::Io {
                operation: "prepare font installer".to_string(),
                source: io::Error::other(e),
            }
        })?;
        let binding = BindingInstaller::new(
            BindingOptions::from_config(config, root),
            SharedObjectLoader,
        )?;

        Self::start_with(binding, fonts, font_dir, config.fonts.default_font.clone())
    }

    /// Starts from prepared installers
    ///
    /// Font installation is spawned first and runs concurrently with the
    /// binding installation.
    pub fn start_with<L: NativeLoader>(
        binding: BindingInstaller<L>,
        fonts: FontInstaller,
        font_dir: PathBuf,
        default_font: Option<String>,
    ) -> Result<Self, InstallError> {
        let registry = Arc::clone(fonts.registry());

        let task_dir = font_dir.clone();
        let font_task = thread::Builder::new()
            .name("skcanvas-fonts".to_string())
            .spawn(move || fonts.ensure_default_fonts(&task_dir))
            .map_err(|source| InstallError::Io {
                operation: "spawn font installation".to_string(),
                source,
            })?;

        let binding = binding.install()?;

        Ok(Self {
            binding,
            fonts: registry,
            font_dir,
            default_font,
            font_task: Mutex::new(Some(font_task)),
        })
    }

    pub fn binding(&self) -> &InstalledBinding {
        &self.binding
    }

    pub fn fonts(&self) -> &Arc<FontRegistry> {
        &self.fonts
    }

    pub fn font_dir(&self) -> &Path {
        &self.font_dir
    }

    /// Blocks until background font installation has finished
    ///
    /// Returns the number of registered families. Later calls return
    /// immediately.
    pub fn wait_fonts(&self) -> usize {
        let task = self
            .font_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(task) = task
            && task.join().is_err()
        {
            tracing::warn!("font installation thread panicked");
            return self.fonts.load_dir(&self.font_dir);
        }
        self.fonts.len()
    }

    /// Configured default font, if the registry knows it
    pub fn default_font(&self) -> Option<&str> {
        let name = self.default_font.as_deref()?;
        if self.fonts.contains(name) {
            Some(name)
        } else {
            tracing::warn!("default font '{}' is not installed", name);
            None
        }
    }
}

impl std::fmt::Debug for CanvasService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasService")
            .field("binding", &self.binding)
            .field("font_dir", &self.font_dir)
            .field("default_font", &self.default_font)
            .finish_non_exhaustive()
    }
}
