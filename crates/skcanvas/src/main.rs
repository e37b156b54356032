mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use cli::{Cli, Commands, FontsCommands};
use context::Context;

fn main() {
    let cli = Cli::parse();
    output::init_logging(cli.verbose);

    let result = Context::new(&cli.config, cli.verbose).and_then(|ctx| match cli.command {
        Commands::Install { json } => commands::install::run(&ctx, json),
        Commands::Platform { json } => commands::platform::run(&ctx, json),
        Commands::Fonts(fonts_cmd) => match fonts_cmd {
            FontsCommands::List { refresh, json } => commands::fonts::list(&ctx, refresh, json),
            FontsCommands::Add { url } => commands::fonts::add(&ctx, &url),
        },
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
