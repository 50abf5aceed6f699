//! Command dispatcher that routes both clap Commands and the interactive
//! `Command` enum to the appropriate handlers.
//!
//! The one-shot CLI and the REPL share the handlers below; the REPL keeps a
//! `Session` alive between calls while the CLI starts from an empty one.

pub mod demo;
pub mod lookup;
pub mod tickers;

use anyhow::Result;
use colored::Colorize;

use crate::cli::Commands;
use crate::commands::{parse_flexible_date, Command, DateBound};
use crate::config::Config;
use crate::session::Session;

pub use demo::DemoRequest;
pub use lookup::LookupRequest;

/// Shared state of one dispatch call
pub struct DispatchContext<'a> {
    pub config: &'a Config,
    pub json_output: bool,
}

/// Route a one-shot CLI command. `Interactive` is handled by the caller.
pub async fn dispatch_cli(command: Commands, ctx: &DispatchContext<'_>) -> Result<()> {
    match command {
        Commands::Demo {
            category,
            range,
            rows,
            seed,
            feedback,
        } => demo::dispatch_demo(
            DemoRequest {
                category,
                range,
                rows,
                seed,
                feedback,
            },
            ctx,
        ),
        Commands::Lookup {
            company,
            from,
            to,
            view_from,
            view_to,
            export,
            labels,
            no_chart,
        } => {
            let request = LookupRequest {
                company,
                from: parse_optional(from.as_deref(), DateBound::Start)?,
                to: parse_optional(to.as_deref(), DateBound::End)?,
                view_from: parse_optional(view_from.as_deref(), DateBound::Start)?,
                view_to: parse_optional(view_to.as_deref(), DateBound::End)?,
                export,
                labels: labels.unwrap_or(ctx.config.labels),
                show_chart: !no_chart,
            };
            let mut session = Session::new();
            lookup::dispatch_lookup(request, &mut session, ctx).await
        }
        Commands::Tickers { action } => tickers::dispatch_tickers(action, ctx),
        Commands::Interactive => Ok(()),
    }
}

/// Route a command typed in the interactive session
pub async fn dispatch_command(
    command: Command,
    session: &mut Session,
    ctx: &DispatchContext<'_>,
) -> Result<()> {
    match command {
        Command::Lookup { company, from, to } => {
            let request = LookupRequest {
                company,
                from,
                to,
                view_from: None,
                view_to: None,
                export: None,
                labels: ctx.config.labels,
                show_chart: true,
            };
            lookup::dispatch_lookup(request, session, ctx).await
        }
        Command::View { from, to } => {
            session.set_view(from, to)?;
            lookup::print_chart(session, ctx.config.labels, ctx)
        }
        Command::ViewReset => {
            session.reset_view()?;
            lookup::print_chart(session, ctx.config.labels, ctx)
        }
        Command::Show => lookup::print_table(session, ctx.config.labels, ctx),
        Command::Chart => lookup::print_chart(session, ctx.config.labels, ctx),
        Command::Export { path } => lookup::export_view(
            session,
            path.as_deref().map(std::path::Path::new),
            ctx.config.labels,
            ctx,
        )
        .map(|_| ()),
        Command::Search { fragment } => tickers::dispatch_tickers(
            crate::cli::TickersCommands::Search {
                fragment,
                limit: tickers::DEFAULT_SEARCH_LIMIT,
            },
            ctx,
        ),
        Command::Demo { seed } => demo::dispatch_demo(
            DemoRequest {
                seed,
                ..DemoRequest::default()
            },
            ctx,
        ),
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Exit => Ok(()),
    }
}

fn parse_optional(value: Option<&str>, bound: DateBound) -> Result<Option<chrono::NaiveDate>> {
    match value {
        Some(raw) => Ok(Some(parse_flexible_date(raw, bound)?)),
        None => Ok(None),
    }
}

pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  lookup <company> [from] [to] - Load prices (company: exact name or 6-digit code)");
    println!("  view <from> [to]             - Narrow the chart/export range ('-' keeps a bound open)");
    println!("  view reset                   - Chart the whole loaded range again");
    println!("  show                         - Print the loaded table (newest first)");
    println!("  chart                        - Draw the close price over the current range");
    println!("  export [path]                - Write the current range to an .xlsx file");
    println!("  search <fragment>            - Search company names and codes");
    println!("  demo [seed]                  - Show the demo dashboard");
    println!("  help                         - Show this help");
    println!("  exit                         - Exit application");
    println!(
        "\nDates: {}",
        "YYYY-MM-DD | YYYYMMDD | YYYY-MM | YYYY".bright_black()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::price_table::tests::sample_table;

    fn ctx(config: &Config) -> DispatchContext<'_> {
        DispatchContext {
            config,
            json_output: false,
        }
    }

    #[test]
    fn parse_optional_uses_bound() {
        let from = parse_optional(Some("2024-02"), DateBound::Start).unwrap();
        let to = parse_optional(Some("2024-02"), DateBound::End).unwrap();
        assert_eq!(from.unwrap().to_string(), "2024-02-01");
        assert_eq!(to.unwrap().to_string(), "2024-02-29");
        assert!(parse_optional(None, DateBound::Start).unwrap().is_none());
        assert!(parse_optional(Some("soon"), DateBound::Start).is_err());
    }

    #[tokio::test]
    async fn view_commands_need_a_loaded_table() {
        let config = Config::default();
        let mut session = Session::new();
        let err = dispatch_command(Command::Chart, &mut session, &ctx(&config))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("lookup"));
        assert!(
            dispatch_command(Command::ViewReset, &mut session, &ctx(&config))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn view_command_updates_session() {
        let config = Config::default();
        let mut session = Session::new();
        session.store(sample_table());
        let from = chrono::NaiveDate::from_ymd_opt(2024, 1, 4);
        dispatch_command(
            Command::View { from, to: None },
            &mut session,
            &ctx(&config),
        )
        .await
        .unwrap();
        assert_eq!(session.view().unwrap().from, from.unwrap());
    }
}
