//! npm registry mocks built on mockito

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mockito::{Mock, ServerGuard};
use sha2::{Digest, Sha512};

/// Version reported by mocked registry metadata
pub const FIXTURE_VERSION: &str = "1.0.0";

/// A package served by a mock registry: metadata document plus tarball
pub struct RegistryFixture {
    pub metadata: Mock,
    pub tarball: Mock,
    pub tarball_url: String,
}

impl RegistryFixture {
    /// Serves `tarball` for `package` at `version`, with a matching `dist.integrity`
    pub fn serve(server: &mut ServerGuard, package: &str, version: &str, tarball: &[u8]) -> Self {
        let integrity = sri_sha512(tarball);
        Self::serve_with_integrity(server, package, version, tarball, Some(&integrity))
    }

    /// Serves `tarball` for `package`, advertising `integrity` verbatim
    pub fn serve_with_integrity(
        server: &mut ServerGuard,
        package: &str,
        version: &str,
        tarball: &[u8],
        integrity: Option<&str>,
    ) -> Self {
        let short_name = package.rsplit('/').next().unwrap_or(package);
        let tarball_path = format!("/{package}/-/{short_name}-{FIXTURE_VERSION}.tgz");
        let tarball_url = format!("{}{}", server.url(), tarball_path);

        let metadata = server
            .mock("GET", format!("/{package}/{version}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(metadata_json(package, &tarball_url, integrity))
            .create();

        let tarball = server
            .mock("GET", tarball_path.as_str())
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(tarball)
            .create();

        Self {
            metadata,
            tarball,
            tarball_url,
        }
    }
}

/// Registry metadata document for a single published version
pub fn metadata_json(package: &str, tarball_url: &str, integrity: Option<&str>) -> String {
    let mut dist = serde_json::json!({ "tarball": tarball_url });
    if let Some(integrity) = integrity {
        dist["integrity"] = serde_json::Value::from(integrity);
    }
    serde_json::json!({
        "name": package,
        "version": FIXTURE_VERSION,
        "dist": dist,
    })
    .to_string()
}

/// Subresource-integrity string (`sha512-<base64>`) for `bytes`
pub fn sri_sha512(bytes: &[u8]) -> String {
    format!("sha512-{}", STANDARD.encode(Sha512::digest(bytes)))
}
