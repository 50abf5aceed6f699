//! Error handling for krxdash
//!
//! Defines the typed failures of the lookup pipeline and establishes a unified
//! Result type using anyhow for context chaining and error propagation.

use chrono::NaiveDate;
use thiserror::Error;

/// Core error types for the lookup and export pipeline
#[derive(Error, Debug)]
pub enum DashError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("company not found: {query}{}", suggestion_suffix(.suggestions))]
    TickerNotFound {
        query: String,
        suggestions: Vec<String>,
    },

    #[error("invalid date range: {from} is after {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("no price data for {ticker} between {from} and {to}")]
    EmptyPriceData {
        ticker: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("no prices loaded yet, run `lookup` first")]
    NothingLoaded,

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("pricing error: {0}")]
    Pricing(String),

    #[error("listing error: {0}")]
    Listing(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

/// Result type alias for krxdash operations
pub type Result<T> = anyhow::Result<T>;
