// Core modules
pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{Config, LibcFlavor};
pub use error::{CanvasError, Result};
