//! Canvas binding and font provisioning for a plugin host
//!
//! [`CanvasService`] owns everything the installers produce: the loaded
//! binding and the font registry. Nothing is kept in process globals.

pub mod service;

pub use service::CanvasService;
