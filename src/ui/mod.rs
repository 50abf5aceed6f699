//! Terminal UI building blocks and the interactive session
//!
//! Chart rendering, spinners, the readline wrapper and the REPL loop that
//! keeps one `Session` alive across commands.

pub mod chart;
pub mod progress;
pub mod readline;

use crate::commands::{parse_command, Command};
use crate::config::Config;
use crate::dispatcher::{dispatch_command, print_help, DispatchContext};
use crate::session::Session;
use crate::tickers;
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;

const COMMAND_PATTERNS: &[&[&str]] = &[
    &["lookup"],
    &["view", "reset"],
    &["show"],
    &["chart"],
    &["export"],
    &["search"],
    &["demo"],
    &["help"],
    &["exit"],
    &["quit"],
];

/// Launch the interactive REPL.
pub async fn launch_repl(config: &Config, json_output: bool) -> Result<()> {
    println!("{}", "krxdash - Interactive Mode".bold());
    println!(
        "Type {} for help, {} to exit\n",
        "help".cyan(),
        "exit".cyan()
    );

    let mut rl = readline::Readline::new(COMMAND_PATTERNS, None)?;
    // Completion only; a missing listing is reported on the first lookup
    match tickers::get_listing(config) {
        Ok(listing) => rl.set_company_names(
            listing.records().iter().map(|r| r.name.clone()).collect(),
        ),
        Err(e) => tracing::debug!("Company name completion disabled: {:#}", e),
    }

    let ctx = DispatchContext {
        config,
        json_output,
    };
    let mut session = Session::new();

    loop {
        match rl.readline("krxdash> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Ok(Command::Exit) => {
                        println!("Goodbye!");
                        break;
                    }
                    Ok(Command::Help) => print_help(),
                    Ok(cmd) => {
                        if let Err(e) = dispatch_command(cmd, &mut session, &ctx).await {
                            eprintln!("{} {:#}", "Error:".red().bold(), e);
                        }
                    }
                    Err(e) => {
                        eprintln!("{} {}", "Parse error:".yellow().bold(), e.message);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("{} {}", "Error:".red().bold(), err);
                break;
            }
        }
    }

    Ok(())
}
