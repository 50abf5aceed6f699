//! Per-session state of the stock lookup view.
//!
//! Holds the last loaded table and the sub-range that the chart and the
//! export work on. A new lookup replaces both.

use anyhow::Result;
use chrono::NaiveDate;

use crate::error::DashError;
use crate::reports::{DateRange, PriceRow, PriceTable};

#[derive(Debug, Default)]
pub struct Session {
    loaded: Option<PriceTable>,
    view: Option<DateRange>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded table; the view resets to the full bounds
    pub fn store(&mut self, table: PriceTable) {
        self.view = table.bounds();
        self.loaded = Some(table);
    }

    pub fn table(&self) -> Result<&PriceTable> {
        self.loaded
            .as_ref()
            .ok_or_else(|| DashError::NothingLoaded.into())
    }

    pub fn view(&self) -> Option<DateRange> {
        self.view
    }

    pub fn set_view(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DateRange> {
        let range = self.table()?.clamp_view(from, to)?;
        self.view = Some(range);
        Ok(range)
    }

    pub fn reset_view(&mut self) -> Result<DateRange> {
        self.set_view(None, None)
    }

    /// Loaded table together with the rows inside the current view
    pub fn view_rows(&self) -> Result<(&PriceTable, DateRange, &[PriceRow])> {
        let table = self.table()?;
        let range = match self.view {
            Some(range) => range,
            None => table.clamp_view(None, None)?,
        };
        Ok((table, range, table.slice(range)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::price_table::tests::{d, sample_table};

    #[test]
    fn empty_session_reports_nothing_loaded() {
        let session = Session::new();
        let err = session.view_rows().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashError>(),
            Some(DashError::NothingLoaded)
        ));
        assert!(session.view().is_none());
    }

    #[test]
    fn store_resets_view_to_full_bounds() {
        let mut session = Session::new();
        session.store(sample_table());
        let (_, range, rows) = session.view_rows().unwrap();
        assert_eq!(range, DateRange::new(d(2024, 1, 2), d(2024, 1, 8)).unwrap());
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn set_view_narrows_rows() {
        let mut session = Session::new();
        session.store(sample_table());
        session.set_view(Some(d(2024, 1, 4)), None).unwrap();
        let (_, range, rows) = session.view_rows().unwrap();
        assert_eq!(range.from, d(2024, 1, 4));
        assert_eq!(rows.len(), 3);

        assert!(session
            .set_view(Some(d(2024, 1, 8)), Some(d(2024, 1, 2)))
            .is_err());
        // A rejected view leaves the previous one in place
        assert_eq!(session.view().unwrap().from, d(2024, 1, 4));

        session.reset_view().unwrap();
        assert_eq!(session.view_rows().unwrap().2.len(), 5);
    }

    #[test]
    fn new_lookup_replaces_view() {
        let mut session = Session::new();
        session.store(sample_table());
        session.set_view(Some(d(2024, 1, 5)), Some(d(2024, 1, 5))).unwrap();
        session.store(sample_table());
        assert_eq!(session.view_rows().unwrap().2.len(), 5);
    }
}
