//! `skcanvas platform` - show host detection and artifact resolution

use crate::context::Context;
use crate::output::print_json;
use anyhow::Result;
use serde::Serialize;
use skcanvas_native::HostPlatform;
use skcanvas_native::install::libc::LibcDetector;
use skcanvas_native::install::platform::resolve_with;

#[derive(Debug, Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
    libc: Option<String>,
    platform: String,
    package: String,
    module_path: String,
    installed: bool,
}

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let host = HostPlatform::current();
    let detector = LibcDetector::from_config(&ctx.config.platform);
    let artifact = resolve_with(&host.os, &host.arch, || detector.detect())?;
    let module_path = artifact.module_path(&ctx.node_binary_dir());

    let info = PlatformInfo {
        os: artifact.os.clone(),
        arch: artifact.arch.clone(),
        libc: artifact.libc.map(|l| l.to_string()),
        platform: artifact.platform.to_string(),
        package: artifact.package_name(),
        installed: module_path.is_file(),
        module_path: module_path.display().to_string(),
    };

    if json {
        return print_json(&info);
    }

    println!("Host:     {}-{}", info.os, info.arch);
    if let Some(libc) = &info.libc {
        println!("libc:     {}", libc);
    }
    println!("Platform: {}", info.platform);
    println!("Package:  {}", info.package);
    println!(
        "Module:   {} ({})",
        info.module_path,
        if info.installed { "installed" } else { "not installed" }
    );

    Ok(())
}
