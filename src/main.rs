use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use krxdash::cli::{Cli, Commands};
use krxdash::config::get_config;
use krxdash::dispatcher::{dispatch_cli, DispatchContext};
use krxdash::ui::launch_repl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Logs go to stderr so --json output on stdout stays parseable
    let filter = EnvFilter::try_from_env("KRXDASH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color && std::io::stderr().is_terminal())
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = get_config()?;
    match cli.command {
        None | Some(Commands::Interactive) => launch_repl(config, cli.json).await,
        Some(command) => {
            let ctx = DispatchContext {
                config,
                json_output: cli.json,
            };
            dispatch_cli(command, &ctx).await
        }
    }
}
