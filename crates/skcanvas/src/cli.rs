//! CLI command structure using clap

use clap::{Parser, Subcommand};
use skcanvas_core::config::consts::CONFIG_FILE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skcanvas")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file; relative asset paths are resolved against its directory
    #[arg(short, long, global = true, env = "SKCANVAS_CONFIG", default_value = CONFIG_FILE)]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install and load the canvas binding, then the default fonts
    Install {
        #[arg(long)]
        json: bool,
    },

    /// Show the detected host and the binding it resolves to
    Platform {
        #[arg(long)]
        json: bool,
    },

    /// Font management
    #[command(subcommand)]
    Fonts(FontsCommands),
}

#[derive(Subcommand)]
pub enum FontsCommands {
    /// List registered font families
    List {
        /// Install the default font set first if it is missing
        #[arg(long)]
        refresh: bool,

        #[arg(long)]
        json: bool,
    },

    /// Download and register fonts from a URL (.otf, .ttf, .tgz, .tar.gz)
    Add { url: String },
}
