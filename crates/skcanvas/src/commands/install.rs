//! `skcanvas install` - provision the binding and the default fonts

use crate::context::Context;
use crate::output::print_json;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use skcanvas::CanvasService;

#[derive(Debug, Serialize)]
struct InstallReport {
    platform: String,
    package: String,
    module_path: String,
    exports: Vec<String>,
    font_families: usize,
    default_font: Option<String>,
}

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let service = CanvasService::start(&ctx.config, &ctx.root)?;
    let font_families = service.wait_fonts();

    let binding = service.binding();
    let report = InstallReport {
        platform: binding.artifact.platform.to_string(),
        package: binding.artifact.package_name(),
        module_path: binding.module_path.display().to_string(),
        exports: binding.exports.clone(),
        font_families,
        default_font: service.default_font().map(str::to_string),
    };

    if json {
        return print_json(&report);
    }

    println!(
        "{} Canvas binding {} loaded",
        "✓".green().bold(),
        report.platform.cyan()
    );
    println!("  Module: {}", report.module_path);
    println!(
        "{} {} font {} in {}",
        "✓".green().bold(),
        report.font_families,
        if report.font_families == 1 { "family" } else { "families" },
        service.font_dir().display()
    );
    if let Some(font) = &report.default_font {
        println!("  Default font: {}", font);
    }

    Ok(())
}
