use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::DispatchContext;
use crate::cli::formatters;
use crate::config::Config;
use crate::error::DashError;
use crate::export;
use crate::pricing;
use crate::reports::{summarize, DateRange, Labels, PriceColumn, PriceRow, PriceTable};
use crate::session::Session;
use crate::tickers::{self, ListingTable, ResolvedTicker};
use crate::ui::chart::{render_line_chart, ChartOptions, ChartSeries};
use crate::ui::progress::Spinner;

/// Everything a lookup needs, whichever front end collected it
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub company: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub view_from: Option<NaiveDate>,
    pub view_to: Option<NaiveDate>,
    /// `Some(None)` exports to the default location
    pub export: Option<Option<PathBuf>>,
    pub labels: Labels,
    pub show_chart: bool,
}

/// Requested range with defaults: `to` is today, `from` looks back
/// `default_lookback_days` from `to`.
pub fn request_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    config: &Config,
    today: NaiveDate,
) -> Result<DateRange> {
    let to = to.unwrap_or(today);
    let from = match from {
        Some(from) => from,
        None => u64::try_from(config.default_lookback_days)
            .ok()
            .and_then(|days| to.checked_sub_days(Days::new(days)))
            .ok_or_else(|| {
                DashError::Config(format!(
                    "default_lookback_days = {} reaches before the earliest date",
                    config.default_lookback_days
                ))
            })?,
    };
    Ok(DateRange::new(from, to)?)
}

/// Resolve `company` and fetch its prices over `range`
pub async fn load_table(
    company: &str,
    range: DateRange,
    ctx: &DispatchContext<'_>,
) -> Result<PriceTable> {
    let spinner = Spinner::start("Loading KRX listing...", !ctx.json_output);
    let resolved = match resolve_company(company, ctx.config) {
        Ok(resolved) => resolved,
        Err(e) => {
            spinner.finish();
            return Err(e);
        }
    };
    info!(
        "Resolved '{}' to {} ({:?}, {})",
        company.trim(),
        resolved.code,
        resolved.source,
        resolved.market
    );

    spinner.set_message(format!("Fetching prices for {}...", resolved.code));
    let bars = pricing::fetch_price_history(&resolved, range, ctx.config).await;
    spinner.finish();

    let table = PriceTable::from_bars(resolved, range, bars?);
    if table.is_empty() {
        return Err(DashError::EmptyPriceData {
            ticker: table.ticker.code.clone(),
            from: range.from,
            to: range.to,
        }
        .into());
    }
    Ok(table)
}

/// Resolve against the listing; a bare 6-digit code still works when the
/// listing cannot be loaded at all
fn resolve_company(company: &str, config: &Config) -> Result<ResolvedTicker> {
    match tickers::get_listing(config) {
        Ok(listing) => tickers::resolve(company, &listing),
        Err(e) if tickers::is_ticker_code(company.trim()) => {
            warn!("Listing unavailable, using '{}' as a bare code: {:#}", company.trim(), e);
            tickers::resolve(company, &ListingTable::default())
        }
        Err(e) => Err(e),
    }
}

pub async fn dispatch_lookup(
    request: LookupRequest,
    session: &mut Session,
    ctx: &DispatchContext<'_>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let range = request_range(request.from, request.to, ctx.config, today)?;
    let table = load_table(&request.company, range, ctx).await?;
    session.store(table);

    if request.view_from.is_some() || request.view_to.is_some() {
        session.set_view(request.view_from, request.view_to)?;
    }

    let export_path = match &request.export {
        Some(path) => Some(export_view(session, path.as_deref(), request.labels, ctx)?),
        None => None,
    };

    let (table, view, rows) = session.view_rows()?;
    let summary = summarize(rows);

    if ctx.json_output {
        println!(
            "{}",
            formatters::format_lookup_json(table, view, summary.as_ref(), export_path.as_deref())
        );
        return Ok(());
    }

    print!("{}", formatters::format_lookup_header(table));
    println!("{}", formatters::format_price_table(table.descending(), request.labels));
    if request.show_chart {
        println!();
        print!("{}", render_price_chart(table, view, rows, request.labels, ctx.config));
    }
    if let Some(summary) = summary {
        print!("{}", formatters::format_summary(&summary, view));
    }
    Ok(())
}

/// Reprint the loaded table, newest first
pub fn print_table(session: &Session, labels: Labels, ctx: &DispatchContext<'_>) -> Result<()> {
    let (table, view, rows) = session.view_rows()?;
    if ctx.json_output {
        let summary = summarize(rows);
        println!(
            "{}",
            formatters::format_lookup_json(table, view, summary.as_ref(), None)
        );
        return Ok(());
    }
    print!("{}", formatters::format_lookup_header(table));
    println!("{}", formatters::format_price_table(table.descending(), labels));
    Ok(())
}

/// Chart and summary of the current view range
pub fn print_chart(session: &Session, labels: Labels, ctx: &DispatchContext<'_>) -> Result<()> {
    let (table, view, rows) = session.view_rows()?;
    let summary = summarize(rows);
    if ctx.json_output {
        println!(
            "{}",
            formatters::format_lookup_json(table, view, summary.as_ref(), None)
        );
        return Ok(());
    }
    print!("{}", render_price_chart(table, view, rows, labels, ctx.config));
    if let Some(summary) = summary {
        print!("{}", formatters::format_summary(&summary, view));
    }
    Ok(())
}

/// Write the current view range to xlsx and return the file path
pub fn export_view(
    session: &Session,
    requested: Option<&Path>,
    labels: Labels,
    ctx: &DispatchContext<'_>,
) -> Result<PathBuf> {
    let (table, view, _) = session.view_rows()?;
    let path = export::resolve_export_path(requested, ctx.config, table, view);
    let written = export::write_xlsx(&path, table, view, labels)?;
    if !ctx.json_output {
        println!("{}", formatters::format_export_done(&path, written));
    }
    Ok(path)
}

/// Close price line over `rows`
pub fn render_price_chart(
    table: &PriceTable,
    view: DateRange,
    rows: &[PriceRow],
    labels: Labels,
    config: &Config,
) -> String {
    let closes: Vec<f64> = rows
        .iter()
        .map(|row| row.bar.close.to_f64().unwrap_or(f64::NAN))
        .collect();
    let x_labels = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => Some((first.bar.date.to_string(), last.bar.date.to_string())),
        _ => None,
    };
    let options = ChartOptions {
        width: config.chart_width,
        height: config.chart_height,
        title: Some(format!("{} ({}) {}", table.display_name(), table.ticker.code, view)),
        x_labels,
    };
    render_line_chart(
        &[ChartSeries::new(PriceColumn::Close.label(labels), closes)],
        &options,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::price_table::tests::{d, sample_table};

    #[test]
    fn request_range_defaults() {
        let config = Config::default();
        let today = d(2024, 6, 30);

        let range = request_range(None, None, &config, today).unwrap();
        assert_eq!(range.to, today);
        assert_eq!(range.from, d(2023, 7, 1));

        let range = request_range(Some(d(2024, 1, 1)), None, &config, today).unwrap();
        assert_eq!(range, DateRange::new(d(2024, 1, 1), today).unwrap());

        let range = request_range(None, Some(d(2024, 1, 31)), &config, today).unwrap();
        assert_eq!(range.to, d(2024, 1, 31));
        assert_eq!(range.from, d(2023, 1, 31));
    }

    #[test]
    fn request_range_rejects_reversed_dates() {
        let err = request_range(Some(d(2024, 3, 1)), Some(d(2024, 1, 1)), &Config::default(), d(2024, 6, 30))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashError>(),
            Some(DashError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn request_range_reports_unreachable_lookback() {
        let config = Config {
            default_lookback_days: 100_000_000_000,
            ..Config::default()
        };
        let err = request_range(None, None, &config, d(2024, 6, 30)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashError>(),
            Some(DashError::Config(_))
        ));

        // An explicit start never consults the lookback
        let range = request_range(Some(d(2024, 1, 1)), None, &config, d(2024, 6, 30)).unwrap();
        assert_eq!(range.from, d(2024, 1, 1));
    }

    #[test]
    fn price_chart_uses_view_rows() {
        let table = sample_table();
        let view = DateRange::new(d(2024, 1, 3), d(2024, 1, 5)).unwrap();
        let rows = table.slice(view);
        let config = Config {
            chart_width: 20,
            chart_height: 5,
            ..Config::default()
        };
        let out = render_price_chart(&table, view, rows, Labels::Korean, &config);
        assert!(out.contains("삼성전자 (005930)"));
        assert!(out.contains("2024-01-03"));
        assert!(out.contains("2024-01-05"));
        assert!(out.contains("78,000"));
        assert!(out.contains("76,600"));
    }

    #[tokio::test]
    async fn lookup_runs_from_cached_listing_and_prices() {
        use crate::reports::price_table::tests::bar;
        use crate::tickers::{Market, TickerRecord};
        use calamine::{open_workbook, Data, Reader, Xlsx};
        use rust_decimal_macros::dec;

        let root = tempfile::tempdir().unwrap();
        let exports = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: Some(root.path().to_path_buf()),
            export_dir: Some(exports.path().to_path_buf()),
            offline: true,
            ..Config::default()
        };
        let listing_dir = tickers::listing_cache_dir(&config).unwrap();
        std::fs::create_dir_all(&listing_dir).unwrap();
        tickers::write_listing_csv(
            &listing_dir.join("listing.csv"),
            &[TickerRecord {
                code: "005930".to_string(),
                name: "삼성전자".to_string(),
                market: Market::Kospi,
                sector: None,
            }],
        )
        .unwrap();

        let requested = DateRange::new(d(2024, 1, 2), d(2024, 1, 8)).unwrap();
        pricing::seed_global_cache(
            "005930.KS",
            requested,
            vec![
                bar(d(2024, 1, 5), dec!(76600)),
                bar(d(2024, 1, 2), dec!(79600)),
                bar(d(2024, 1, 8), dec!(76500)),
                bar(d(2024, 1, 3), dec!(77000)),
                bar(d(2024, 1, 4), dec!(78000)),
            ],
        );

        let ctx = DispatchContext {
            config: &config,
            json_output: false,
        };
        let mut session = Session::new();
        let request = LookupRequest {
            company: " 삼성전자 ".to_string(),
            from: Some(requested.from),
            to: Some(requested.to),
            view_from: Some(d(2024, 1, 4)),
            view_to: None,
            export: Some(None),
            labels: Labels::English,
            show_chart: true,
        };
        dispatch_lookup(request, &mut session, &ctx).await.unwrap();

        let (table, view, rows) = session.view_rows().unwrap();
        assert_eq!(table.ticker.name.as_deref(), Some("삼성전자"));
        assert_eq!(table.len(), 5);
        assert_eq!(view, DateRange::new(d(2024, 1, 4), d(2024, 1, 8)).unwrap());
        assert_eq!(rows.len(), 3);

        let printed = formatters::format_price_table(table.descending(), Labels::English);
        let newest = printed.find("2024-01-08").unwrap();
        let oldest = printed.find("2024-01-02").unwrap();
        assert!(newest < oldest);

        let chart = render_price_chart(table, view, rows, Labels::English, &config);
        assert!(chart.contains("2024-01-04"));
        assert!(!chart.contains("2024-01-02"));

        let path = exports.path().join("삼성전자_005930_20240104_20240108.xlsx");
        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let sheet = workbook.worksheet_range(export::SHEET_NAME).unwrap();
        assert_eq!(sheet.height(), 4);
        assert_eq!(sheet.get((0, 4)), Some(&Data::String("Close".to_string())));
        let closes: Vec<f64> = (1..4)
            .filter_map(|row| match sheet.get((row, 4)) {
                Some(Data::Float(v)) => Some(*v),
                Some(Data::Int(v)) => Some(*v as f64),
                _ => None,
            })
            .collect();
        assert_eq!(closes, vec![78000.0, 76600.0, 76500.0]);
    }

    #[test]
    fn export_view_writes_current_range() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            export_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let ctx = DispatchContext {
            config: &config,
            json_output: true,
        };
        let mut session = Session::new();
        session.store(sample_table());
        session.set_view(Some(d(2024, 1, 4)), None).unwrap();

        let path = export_view(&session, None, Labels::Korean, &ctx).unwrap();
        assert_eq!(
            path,
            dir.path().join("삼성전자_005930_20240104_20240108.xlsx")
        );
        assert!(path.exists());
    }
}
