pub mod consts;
mod model;

pub use model::{
    Config, FontsConfig, LibcFlavor, PathsConfig, PlatformConfig, RegistryConfig,
};
