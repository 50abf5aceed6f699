use anyhow::Result;
use colored::Colorize;

use super::DispatchContext;
use crate::cli::formatters;
use crate::cli::TickersCommands;
use crate::tickers;
use crate::ui::progress::Spinner;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

pub fn dispatch_tickers(action: TickersCommands, ctx: &DispatchContext<'_>) -> Result<()> {
    match action {
        TickersCommands::Refresh { force } => {
            let spinner = Spinner::start("Downloading KRX listing...", !ctx.json_output);
            let result = tickers::refresh_listing(force, ctx.config);
            spinner.finish();
            let path = result?;
            if ctx.json_output {
                println!(
                    "{}",
                    serde_json::json!({
                        "refreshed": true,
                        "path": path,
                    })
                );
            } else {
                println!(
                    "{} Updated listing cache: {}",
                    "✓".green().bold(),
                    path.display()
                );
            }
            Ok(())
        }
        TickersCommands::Status => {
            let cache_dir = tickers::listing_cache_dir(ctx.config)?;
            let csv_path = cache_dir.join("listing.csv");
            let meta = tickers::read_cache_meta(Some(&cache_dir))?;
            let stale = if csv_path.exists() {
                Some(tickers::is_cache_stale(
                    &cache_dir,
                    ctx.config.listing_max_age_hours,
                )?)
            } else {
                None
            };
            let companies = if csv_path.exists() {
                Some(tickers::load_listing(Some(&cache_dir))?.len())
            } else {
                None
            };

            if ctx.json_output {
                let payload = serde_json::json!({
                    "cache_path": csv_path,
                    "cache_exists": csv_path.exists(),
                    "stale": stale,
                    "companies": companies,
                    "fetched_at": meta.as_ref().map(|m| m.fetched_at.to_rfc3339()),
                    "source_url": meta.as_ref().map(|m| m.source_url.clone()),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            println!("Cache path: {}", csv_path.display());
            match meta {
                Some(meta) => {
                    let age = chrono::Utc::now().signed_duration_since(meta.fetched_at);
                    println!(
                        "Last fetch: {} ({} hours ago)",
                        meta.fetched_at.to_rfc3339(),
                        age.num_hours()
                    );
                    println!("Source URL: {}", meta.source_url);
                }
                None => println!("Last fetch: not available"),
            }
            if let Some(count) = companies {
                println!("Companies: {}", count);
            }
            if stale == Some(true) {
                println!(
                    "{} Cache is older than {} hours, run `krxdash tickers refresh`",
                    "⚠".yellow().bold(),
                    ctx.config.listing_max_age_hours
                );
            }
            Ok(())
        }
        TickersCommands::Search { fragment, limit } => {
            let listing = tickers::get_listing(ctx.config)?;
            let matches = tickers::search(&listing, &fragment, limit);
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&matches)?);
                return Ok(());
            }
            print!("{}", formatters::format_search_results(&matches));
            if !matches.is_empty() {
                println!();
            }
            Ok(())
        }
    }
}
