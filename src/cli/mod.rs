use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::reports::demo::{DEFAULT_ROWS, RANGE_DEFAULT};
use crate::reports::{Category, Labels};

pub mod formatters;

#[derive(Parser, Debug)]
#[command(name = "krxdash")]
#[command(version, about = "KRX stock price lookup and demo dashboard for the terminal")]
#[command(
    long_about = "Look up the daily price history of a company listed on the Korean exchange by name or 6-digit code, chart a date range and export it to Excel. Also ships a small demo dashboard with random data."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Demo dashboard: category selector, slider value, random table and chart
    Demo {
        /// Selected category (개요, 상세 분석, 설정 or overview, detail, settings)
        #[arg(short, long, default_value = "개요")]
        category: Category,

        /// Slider value
        #[arg(short, long, default_value_t = RANGE_DEFAULT, value_parser = clap::value_parser!(u8).range(0..=100))]
        range: u8,

        /// Number of random rows
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,

        /// Seed for reproducible random data
        #[arg(long)]
        seed: Option<u64>,

        /// Feedback text to submit
        #[arg(long)]
        feedback: Option<String>,
    },

    /// Look up the price history of a company
    Lookup {
        /// Company name (exact) or 6-digit ticker code, e.g. 삼성전자 or 005930
        company: String,

        /// Start date (YYYY-MM-DD, YYYYMMDD, YYYY-MM or YYYY)
        #[arg(long)]
        from: Option<String>,

        /// End date, defaults to today
        #[arg(long)]
        to: Option<String>,

        /// Start of the chart/export range
        #[arg(long)]
        view_from: Option<String>,

        /// End of the chart/export range
        #[arg(long)]
        view_to: Option<String>,

        /// Export the chart range to xlsx; optional file or directory
        #[arg(long, num_args = 0..=1)]
        export: Option<Option<PathBuf>>,

        /// Column labels (ko or en)
        #[arg(long)]
        labels: Option<Labels>,

        /// Skip the chart
        #[arg(long)]
        no_chart: bool,
    },

    /// Listed company cache
    Tickers {
        #[command(subcommand)]
        action: TickersCommands,
    },

    /// Start interactive mode (default when no command is given)
    Interactive,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TickersCommands {
    /// Download the KRX listed company table
    Refresh {
        /// Download even if the cache is still fresh
        #[arg(long)]
        force: bool,
    },
    /// Show cache location and age
    Status,
    /// Search company names and codes
    Search {
        fragment: String,

        /// Maximum number of matches
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}
