use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Days, FixedOffset, NaiveDate};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::PriceBar;
use crate::error::DashError;

/// Korea Standard Time, used when the response carries no offset
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(rename = "gmtoffset")]
    gmt_offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<i64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

/// Fetch daily bars from Yahoo Finance
///
/// # Arguments
/// * `symbol` - Yahoo symbol including the exchange suffix (e.g. `005930.KS`)
/// * `from` - First day, inclusive
/// * `to` - Last day, inclusive
pub async fn fetch_daily_bars(
    symbol: &str,
    from: NaiveDate,
    to: NaiveDate,
    timeout_secs: u64,
) -> Result<Vec<PriceBar>> {
    info!("Fetching daily prices for {} from {} to {}", symbol, from, to);

    let client = Client::builder()
        .user_agent("Mozilla/5.0 (compatible; krxdash/0.1)")
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;

    let (period1, period2) = request_window(from, to)?;
    let url = format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
        symbol, period1, period2
    );

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send request to Yahoo Finance")?;

    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read Yahoo Finance response")?;

    // Unknown symbols come back as 404 with a JSON error body
    if !status.is_success() && !body.trim_start().starts_with('{') {
        return Err(DashError::Pricing(format!(
            "Yahoo Finance returned error status: {}",
            status
        ))
        .into());
    }

    let bars = parse_chart_response(&body)?;
    let bars: Vec<PriceBar> = bars
        .into_iter()
        .filter(|bar| from <= bar.date && bar.date <= to)
        .collect();
    debug!("Fetched {} daily bars for {}", bars.len(), symbol);
    Ok(bars)
}

/// Unix timestamps covering `from` 00:00 KST up to the end of `to` in KST
fn request_window(from: NaiveDate, to: NaiveDate) -> Result<(i64, i64)> {
    let start = from
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid from date"))?
        .and_utc()
        .timestamp()
        - i64::from(KST_OFFSET_SECS);
    let end = to
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("Invalid to date"))?
        .and_utc()
        .timestamp()
        - i64::from(KST_OFFSET_SECS);
    Ok((start, end))
}

/// Parse a chart payload into daily bars.
///
/// Days without a close (halts, holidays padded by the API) are skipped.
/// Missing open/high/low fall back to the close.
pub fn parse_chart_response(body: &str) -> Result<Vec<PriceBar>> {
    let data: YahooChartResponse =
        serde_json::from_str(body).context("Failed to parse Yahoo Finance response")?;

    if let Some(error) = data.chart.error {
        if error.code == "Not Found" {
            return Err(DashError::UnknownSymbol(error.description).into());
        }
        return Err(DashError::Pricing(format!(
            "Yahoo Finance API error: {} - {}",
            error.code, error.description
        ))
        .into());
    }

    let result = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| DashError::Pricing("No data returned from Yahoo Finance".into()))?;

    // A range with no trading days has no timestamp array at all
    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };

    let offset = FixedOffset::east_opt(result.meta.gmt_offset.unwrap_or(KST_OFFSET_SECS))
        .ok_or_else(|| anyhow!("Invalid exchange offset"))?;

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DashError::Pricing("No quote data".into()))?;

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());

    for (i, &timestamp) in timestamps.iter().enumerate() {
        let Some(close) = closes.get(i).copied().flatten().and_then(to_price) else {
            continue;
        };
        let date = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| anyhow!("Invalid timestamp {}", timestamp))?
            .with_timezone(&offset)
            .date_naive();

        let field = |values: &[Option<f64>]| {
            values
                .get(i)
                .copied()
                .flatten()
                .and_then(to_price)
                .unwrap_or(close)
        };

        bars.push(PriceBar {
            date,
            open: field(opens.as_slice()),
            high: field(highs.as_slice()),
            low: field(lows.as_slice()),
            close,
            volume: volumes
                .get(i)
                .copied()
                .flatten()
                .map(|v| u64::try_from(v).unwrap_or(0))
                .unwrap_or(0),
        });
    }

    Ok(bars)
}

fn to_price(value: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(value).map(|d| d.round_dp(2).normalize())
}
