//! CLI command implementations

pub mod fonts;
pub mod install;
pub mod platform;
