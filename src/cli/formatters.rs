//! Output formatting module for CLI display
//!
//! Tables, status lines and JSON payloads for the lookup, demo and tickers
//! commands. Nothing in here fetches or computes; it only presents.

use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Style},
};

use crate::reports::{
    Category, DateRange, DemoFrame, Feedback, Labels, PriceRow, PriceSummary, PriceTable,
};
use crate::tickers::{ResolvedTicker, ResolutionSource, TickerRecord};
use crate::utils::{format_change_pct, format_krw, format_number, format_volume};

/// Rows of the loaded table, newest first, with localized headers
pub fn format_price_table<'a>(
    rows: impl Iterator<Item = &'a PriceRow>,
    labels: Labels,
) -> String {
    let mut builder = Builder::default();
    builder.push_record(PriceTable::headers(labels));
    for row in rows {
        let bar = &row.bar;
        builder.push_record([
            bar.date.format("%Y-%m-%d").to_string(),
            format_number(bar.open),
            format_number(bar.high),
            format_number(bar.low),
            format_number(bar.close),
            format_volume(bar.volume),
            row.change_pct
                .map(|pct| color_change(pct, format_change_pct(pct)).to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    table.to_string()
}

/// Up moves in red and down moves in blue, as KRX quote screens do
fn color_change(pct: Decimal, text: String) -> ColoredString {
    if pct > Decimal::ZERO {
        text.red()
    } else if pct < Decimal::ZERO {
        text.blue()
    } else {
        text.normal()
    }
}

/// One-line title of a lookup: name, code, market and how it was resolved
pub fn format_lookup_header(table: &PriceTable) -> String {
    let ticker = &table.ticker;
    let via = match ticker.source {
        ResolutionSource::ExactName => "name",
        ResolutionSource::NumericCode => "code",
    };
    format!(
        "\n{} {} ({}, {}) {}\n",
        "📈".cyan().bold(),
        table.display_name().bold(),
        ticker.code,
        ticker.market,
        format!("[{} · resolved by {}]", table.requested, via).bright_black()
    )
}

pub fn format_summary(summary: &PriceSummary, range: DateRange) -> String {
    let change = summary
        .change_pct
        .map(|pct| color_change(pct, format_change_pct(pct)).to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut output = format!("\n{} {}", "━".repeat(60).bright_black(), range);
    output.push_str(&format!(
        "\n{:<14} {}",
        "Sessions:".bold(),
        summary.sessions
    ));
    output.push_str(&format!(
        "\n{:<14} {} → {} ({})",
        "Close:".bold(),
        format_krw(summary.first_close),
        format_krw(summary.last_close),
        change
    ));
    output.push_str(&format!(
        "\n{:<14} {} ({})",
        "High:".bold(),
        format_krw(summary.high),
        summary.high_date
    ));
    output.push_str(&format!(
        "\n{:<14} {} ({})",
        "Low:".bold(),
        format_krw(summary.low),
        summary.low_date
    ));
    output.push_str(&format!(
        "\n{:<14} {}\n",
        "Volume:".bold(),
        format_volume(summary.total_volume)
    ));
    output
}

pub fn format_export_done(path: &Path, rows: usize) -> String {
    format!(
        "{} Exported {} rows to {}",
        "✓".green().bold(),
        rows,
        path.display()
    )
}

/// JSON payload of a lookup
pub fn format_lookup_json(
    table: &PriceTable,
    view: DateRange,
    summary: Option<&PriceSummary>,
    export_path: Option<&Path>,
) -> String {
    #[derive(Serialize)]
    struct JsonLookup<'a> {
        ticker: &'a ResolvedTicker,
        requested: DateRange,
        view: DateRange,
        rows: &'a [PriceRow],
        view_summary: Option<&'a PriceSummary>,
        export_path: Option<&'a Path>,
    }

    let payload = JsonLookup {
        ticker: &table.ticker,
        requested: table.requested,
        view,
        rows: table.rows(),
        view_summary: summary,
        export_path,
    };
    serde_json::to_string_pretty(&payload)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

pub fn format_demo_header(category: Category, range: u8) -> String {
    let mut output = format!("\n{} {}\n", "🧪".cyan().bold(), "Demo dashboard".bold());
    output.push_str(&format!("현재 선택: {}\n", category.label().cyan()));
    output.push_str(&format!("Range: {}\n", range));
    output
}

pub fn format_demo_table(frame: &DemoFrame) -> String {
    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(frame.columns.iter().cloned());
    builder.push_record(header);
    for (idx, row) in frame.rows.iter().enumerate() {
        let mut record = vec![idx.to_string()];
        record.extend(row.iter().map(|v| format!("{:.4}", v)));
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    table.to_string()
}

pub fn format_feedback_saved(text: &str) -> String {
    format!("{} Feedback saved: {}", "✓".green().bold(), text)
}

pub fn format_feedback_empty() -> String {
    format!("{} Feedback is empty, nothing submitted", "⚠".yellow().bold())
}

pub fn format_demo_json(
    category: Category,
    range: u8,
    frame: &DemoFrame,
    feedback: Option<&Feedback>,
) -> String {
    #[derive(Serialize)]
    #[serde(tag = "status", rename_all = "snake_case")]
    enum JsonFeedback<'a> {
        NotSubmitted,
        Saved { text: &'a str },
        Empty,
    }

    #[derive(Serialize)]
    struct JsonDemo<'a> {
        category: &'static str,
        range: u8,
        frame: &'a DemoFrame,
        feedback: JsonFeedback<'a>,
    }

    let payload = JsonDemo {
        category: category.label(),
        range,
        frame,
        feedback: match feedback {
            None => JsonFeedback::NotSubmitted,
            Some(Feedback::Saved(text)) => JsonFeedback::Saved {
                text: text.as_str(),
            },
            Some(Feedback::Empty) => JsonFeedback::Empty,
        },
    };
    serde_json::to_string_pretty(&payload)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

pub fn format_search_results(records: &[&TickerRecord]) -> String {
    if records.is_empty() {
        return format!("{} No matching companies\n", "ℹ".blue().bold());
    }

    let mut builder = Builder::default();
    builder.push_record(["Code", "Name", "Market", "Sector"]);
    for record in records {
        builder.push_record([
            record.code.clone(),
            record.name.clone(),
            record.market.to_string(),
            record.sector.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}
