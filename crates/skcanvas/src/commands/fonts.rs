//! `skcanvas fonts` - list and add fonts

use crate::context::Context;
use crate::output::print_json;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use skcanvas_native::install::font::validate_font_url;
use skcanvas_native::{FontInstaller, FontRegistry, FontSource};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct FontList {
    font_dir: String,
    families: Vec<String>,
}

pub fn list(ctx: &Context, refresh: bool, json: bool) -> Result<()> {
    let font_dir = ctx.font_dir();
    let registry = Arc::new(FontRegistry::new());

    if refresh {
        ctx.config.ensure_dirs(&ctx.root)?;
        FontInstaller::from_config(&ctx.config, Arc::clone(&registry))?
            .ensure_default_fonts(&font_dir);
    } else {
        registry.load_dir(&font_dir);
    }

    let list = FontList {
        font_dir: font_dir.display().to_string(),
        families: registry.families(),
    };

    if json {
        return print_json(&list);
    }

    if list.families.is_empty() {
        println!("No fonts installed in {}", list.font_dir);
        println!("Run `skcanvas fonts list --refresh` to install the default set");
        return Ok(());
    }

    println!("Fonts in {}:", list.font_dir);
    for family in &list.families {
        println!("  {}", family);
    }
    Ok(())
}

pub fn add(ctx: &Context, url: &str) -> Result<()> {
    // Reject bad URLs before touching the filesystem
    validate_font_url(url)?;

    let (_, font_dir) = ctx.config.ensure_dirs(&ctx.root)?;
    let installer = FontInstaller::from_config(&ctx.config, Arc::new(FontRegistry::new()))?;
    let count = installer.ensure_fonts(&font_dir, &FontSource::Url(url.to_string()))?;

    println!(
        "{} {} font {} available",
        "✓".green().bold(),
        count,
        if count == 1 { "family" } else { "families" }
    );
    Ok(())
}
