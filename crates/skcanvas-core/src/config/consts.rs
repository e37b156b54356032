//! Defaults shared by the config model and the installers

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "skcanvas.toml";

/// Filesystem layout defaults
pub mod paths {
    /// Directory receiving the native binding package
    pub const NODE_BINARY_PATH: &str = "data/assets/canvas";

    /// Directory receiving font archives and their contents
    pub const FONT_PATH: &str = "data/assets/fonts";

    /// Subdirectory created by npm tarballs
    pub const PACKAGE_DIR: &str = "package";
}

/// npm registry defaults
pub mod registry {
    /// Mirror queried for package metadata
    pub const BASE_URL: &str = "https://registry.npmmirror.com";

    /// Version tag requested when none is pinned
    pub const VERSION: &str = "latest";

    /// Scope of the platform packages
    pub const PACKAGE_SCOPE: &str = "@napi-rs";

    /// Name prefix of the platform packages (`canvas-<platform>`)
    pub const PACKAGE_PREFIX: &str = "canvas";

    /// Name prefix of the module file inside a platform package (`skia.<platform>.node`)
    pub const MODULE_PREFIX: &str = "skia";
}

/// Font asset defaults
pub mod fonts {
    /// Bundled font set fetched when no URL is configured
    pub const DEFAULT_URL: &str =
        "https://github.com/notofonts/noto-cjk/releases/download/Sans2.004/16_NotoSansSC.zip";
}
