use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::DashError;
use crate::pricing::PriceBar;
use crate::tickers::ResolvedTicker;

/// Which label set the price columns are shown with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Labels {
    #[default]
    Korean,
    English,
}

impl FromStr for Labels {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ko" | "kr" | "korean" => Ok(Labels::Korean),
            "en" | "english" => Ok(Labels::English),
            other => Err(DashError::Config(format!(
                "unknown label set '{}' (use ko or en)",
                other
            ))),
        }
    }
}

/// Columns of a daily price table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceColumn {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
    Change,
}

impl PriceColumn {
    pub const ALL: [PriceColumn; 7] = [
        PriceColumn::Date,
        PriceColumn::Open,
        PriceColumn::High,
        PriceColumn::Low,
        PriceColumn::Close,
        PriceColumn::Volume,
        PriceColumn::Change,
    ];

    /// Field name as returned by the market-data source
    pub fn english(self) -> &'static str {
        match self {
            PriceColumn::Date => "Date",
            PriceColumn::Open => "Open",
            PriceColumn::High => "High",
            PriceColumn::Low => "Low",
            PriceColumn::Close => "Close",
            PriceColumn::Volume => "Volume",
            PriceColumn::Change => "Change",
        }
    }

    pub fn korean(self) -> &'static str {
        match self {
            PriceColumn::Date => "날짜",
            PriceColumn::Open => "시가",
            PriceColumn::High => "고가",
            PriceColumn::Low => "저가",
            PriceColumn::Close => "종가",
            PriceColumn::Volume => "거래량",
            PriceColumn::Change => "등락률",
        }
    }

    pub fn label(self, labels: Labels) -> &'static str {
        match labels {
            Labels::Korean => self.korean(),
            Labels::English => self.english(),
        }
    }
}

/// Inclusive calendar range; `from <= to` holds for every constructed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, DashError> {
        if from > to {
            return Err(DashError::InvalidDateRange { from, to });
        }
        Ok(Self { from, to })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.from, self.to)
    }
}

/// One trading day plus the close-to-close change against the previous row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    #[serde(flatten)]
    pub bar: PriceBar,
    pub change_pct: Option<Decimal>,
}

/// Daily price series of one company, kept in ascending date order
#[derive(Debug, Clone, Serialize)]
pub struct PriceTable {
    pub ticker: ResolvedTicker,
    pub requested: DateRange,
    rows: Vec<PriceRow>,
}

impl PriceTable {
    /// Build from raw bars in any order. A repeated date keeps the bar seen last.
    pub fn from_bars(ticker: ResolvedTicker, requested: DateRange, bars: Vec<PriceBar>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
        for bar in bars {
            by_date.insert(bar.date, bar);
        }

        let mut rows = Vec::with_capacity(by_date.len());
        let mut prev_close: Option<Decimal> = None;
        for bar in by_date.into_values() {
            let change_pct = prev_close
                .filter(|prev| !prev.is_zero())
                .map(|prev| ((bar.close - prev) / prev * Decimal::ONE_HUNDRED).round_dp(2));
            prev_close = Some(bar.close);
            rows.push(PriceRow { bar, change_pct });
        }

        Self {
            ticker,
            requested,
            rows,
        }
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column headers after relabeling
    pub fn headers(labels: Labels) -> Vec<&'static str> {
        PriceColumn::ALL.iter().map(|c| c.label(labels)).collect()
    }

    /// Newest first, the order the table view uses
    pub fn descending(&self) -> impl Iterator<Item = &PriceRow> {
        self.rows.iter().rev()
    }

    /// First and last trading day present in the table
    pub fn bounds(&self) -> Option<DateRange> {
        let first = self.rows.first()?.bar.date;
        let last = self.rows.last()?.bar.date;
        Some(DateRange {
            from: first,
            to: last,
        })
    }

    /// Rows with `range.from <= date <= range.to`
    pub fn slice(&self, range: DateRange) -> &[PriceRow] {
        let start = self.rows.partition_point(|r| r.bar.date < range.from);
        let end = self.rows.partition_point(|r| r.bar.date <= range.to);
        &self.rows[start..end.max(start)]
    }

    /// Resolve a view sub-range against the loaded data.
    ///
    /// Missing endpoints default to the table bounds and endpoints outside the
    /// table are pulled back onto them.
    pub fn clamp_view(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DateRange> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(DashError::InvalidDateRange { from, to }.into());
            }
        }
        let bounds = self.bounds().ok_or_else(|| DashError::EmptyPriceData {
            ticker: self.ticker.code.clone(),
            from: self.requested.from,
            to: self.requested.to,
        })?;

        let from = from.unwrap_or(bounds.from).clamp(bounds.from, bounds.to);
        let to = to.unwrap_or(bounds.to).clamp(bounds.from, bounds.to);
        Ok(DateRange::new(from, to)?)
    }

    /// Company name when known, ticker code otherwise
    pub fn display_name(&self) -> &str {
        self.ticker.name.as_deref().unwrap_or(&self.ticker.code)
    }
}

/// Headline numbers over a set of rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub sessions: usize,
    pub first_close: Decimal,
    pub last_close: Decimal,
    pub change_pct: Option<Decimal>,
    pub high: Decimal,
    pub high_date: NaiveDate,
    pub low: Decimal,
    pub low_date: NaiveDate,
    pub total_volume: u64,
}

pub fn summarize(rows: &[PriceRow]) -> Option<PriceSummary> {
    let first = rows.first()?;
    let last = rows.last()?;

    let mut high = &first.bar;
    let mut low = &first.bar;
    let mut total_volume: u64 = 0;
    for row in rows {
        if row.bar.high > high.high {
            high = &row.bar;
        }
        if row.bar.low < low.low {
            low = &row.bar;
        }
        total_volume = total_volume.saturating_add(row.bar.volume);
    }

    let change_pct = if first.bar.close.is_zero() {
        None
    } else {
        Some(
            ((last.bar.close - first.bar.close) / first.bar.close * Decimal::ONE_HUNDRED)
                .round_dp(2),
        )
    };

    Some(PriceSummary {
        sessions: rows.len(),
        first_close: first.bar.close,
        last_close: last.bar.close,
        change_pct,
        high: high.high,
        high_date: high.date,
        low: low.low,
        low_date: low.date,
        total_volume,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tickers::{Market, ResolutionSource};
    use rust_decimal_macros::dec;

    pub(crate) fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    pub(crate) fn bar(date: NaiveDate, close: Decimal) -> PriceBar {
        PriceBar {
            date,
            open: close - dec!(100),
            high: close + dec!(200),
            low: close - dec!(300),
            close,
            volume: 1_000,
        }
    }

    pub(crate) fn samsung() -> ResolvedTicker {
        ResolvedTicker {
            code: "005930".to_string(),
            name: Some("삼성전자".to_string()),
            market: Market::Kospi,
            source: ResolutionSource::ExactName,
        }
    }

    pub(crate) fn sample_table() -> PriceTable {
        let requested = DateRange::new(d(2024, 1, 1), d(2024, 1, 10)).unwrap();
        PriceTable::from_bars(
            samsung(),
            requested,
            vec![
                bar(d(2024, 1, 4), dec!(78000)),
                bar(d(2024, 1, 2), dec!(79600)),
                bar(d(2024, 1, 3), dec!(77000)),
                bar(d(2024, 1, 5), dec!(76600)),
                bar(d(2024, 1, 8), dec!(76500)),
            ],
        )
    }

    #[test]
    fn from_bars_sorts_ascending_and_computes_change() {
        let table = sample_table();
        let dates: Vec<NaiveDate> = table.rows().iter().map(|r| r.bar.date).collect();
        assert_eq!(
            dates,
            vec![
                d(2024, 1, 2),
                d(2024, 1, 3),
                d(2024, 1, 4),
                d(2024, 1, 5),
                d(2024, 1, 8)
            ]
        );
        assert_eq!(table.rows()[0].change_pct, None);
        // (77000 - 79600) / 79600 = -3.266..%
        assert_eq!(table.rows()[1].change_pct, Some(dec!(-3.27)));
        assert_eq!(table.rows()[2].change_pct, Some(dec!(1.30)));
    }

    #[test]
    fn from_bars_keeps_last_bar_for_duplicate_date() {
        let requested = DateRange::new(d(2024, 1, 1), d(2024, 1, 2)).unwrap();
        let table = PriceTable::from_bars(
            samsung(),
            requested,
            vec![bar(d(2024, 1, 2), dec!(100)), bar(d(2024, 1, 2), dec!(120))],
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].bar.close, dec!(120));
    }

    #[test]
    fn headers_are_relabeled() {
        assert_eq!(
            PriceTable::headers(Labels::Korean),
            vec!["날짜", "시가", "고가", "저가", "종가", "거래량", "등락률"]
        );
        assert_eq!(
            PriceTable::headers(Labels::English),
            vec!["Date", "Open", "High", "Low", "Close", "Volume", "Change"]
        );
    }

    #[test]
    fn descending_starts_with_latest() {
        let table = sample_table();
        let first = table.descending().next().unwrap();
        assert_eq!(first.bar.date, d(2024, 1, 8));
        assert_eq!(table.descending().count(), 5);
    }

    #[test]
    fn slice_is_inclusive_on_both_ends() {
        let table = sample_table();
        let range = DateRange::new(d(2024, 1, 3), d(2024, 1, 5)).unwrap();
        let rows = table.slice(range);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].bar.date, d(2024, 1, 3));
        assert_eq!(rows[2].bar.date, d(2024, 1, 5));

        // Weekend-only range has no trading days
        let weekend = DateRange::new(d(2024, 1, 6), d(2024, 1, 7)).unwrap();
        assert!(table.slice(weekend).is_empty());
    }

    #[test]
    fn clamp_view_defaults_and_clamps() {
        let table = sample_table();
        let full = table.clamp_view(None, None).unwrap();
        assert_eq!(full, DateRange::new(d(2024, 1, 2), d(2024, 1, 8)).unwrap());

        let clamped = table
            .clamp_view(Some(d(2023, 12, 1)), Some(d(2024, 1, 4)))
            .unwrap();
        assert_eq!(clamped.from, d(2024, 1, 2));
        assert_eq!(clamped.to, d(2024, 1, 4));

        let past_end = table.clamp_view(Some(d(2025, 1, 1)), None).unwrap();
        assert_eq!(past_end, DateRange::new(d(2024, 1, 8), d(2024, 1, 8)).unwrap());
    }

    #[test]
    fn clamp_view_rejects_reversed_range() {
        let table = sample_table();
        let err = table
            .clamp_view(Some(d(2024, 1, 5)), Some(d(2024, 1, 3)))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashError>(),
            Some(DashError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn clamp_view_on_empty_table_errors() {
        let requested = DateRange::new(d(2024, 1, 1), d(2024, 1, 2)).unwrap();
        let table = PriceTable::from_bars(samsung(), requested, Vec::new());
        assert!(table.is_empty());
        assert!(table.clamp_view(None, None).is_err());
    }

    #[test]
    fn date_range_rejects_reversed_bounds() {
        assert!(DateRange::new(d(2024, 2, 1), d(2024, 1, 31)).is_err());
        let range = DateRange::new(d(2024, 1, 30), d(2024, 2, 1)).unwrap();
        assert_eq!(range.to_string(), "2024-01-30 ~ 2024-02-01");
    }

    #[test]
    fn summarize_reports_extremes() {
        let table = sample_table();
        let summary = summarize(table.rows()).unwrap();
        assert_eq!(summary.sessions, 5);
        assert_eq!(summary.first_close, dec!(79600));
        assert_eq!(summary.last_close, dec!(76500));
        assert_eq!(summary.high, dec!(79800));
        assert_eq!(summary.high_date, d(2024, 1, 2));
        assert_eq!(summary.low, dec!(76200));
        assert_eq!(summary.low_date, d(2024, 1, 8));
        assert_eq!(summary.total_volume, 5_000);
        assert_eq!(summary.change_pct, Some(dec!(-3.89)));
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn labels_parse_from_short_names() {
        assert_eq!("ko".parse::<Labels>().unwrap(), Labels::Korean);
        assert_eq!("EN".parse::<Labels>().unwrap(), Labels::English);
        assert!("fr".parse::<Labels>().is_err());
    }
}
