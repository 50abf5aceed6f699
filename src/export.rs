//! Excel export of a price table range
//!
//! The workbook is built in memory first so the same bytes can be written to
//! disk or handed to any other sink.

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Chart, ChartType, Color, ExcelDateTime, Format, FormatAlign, Workbook};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::error::DashError;
use crate::reports::{DateRange, Labels, PriceColumn, PriceRow, PriceTable};

pub const SHEET_NAME: &str = "시세";

/// Serialize `rows` of `table` into xlsx bytes
pub fn to_xlsx_buffer(table: &PriceTable, rows: &[PriceRow], labels: Labels) -> Result<Vec<u8>> {
    if rows.is_empty() {
        return Err(DashError::Export(format!(
            "nothing to export for {}",
            table.display_name()
        ))
        .into());
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(0xDDEBF7));
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let integer_format = Format::new().set_num_format("#,##0");
    let percent_format = Format::new().set_num_format("0.00");

    for (col, column) in PriceColumn::ALL.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, column.label(labels), &header_format)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        let bar = &row.bar;
        let date = ExcelDateTime::from_ymd(
            bar.date.year() as u16,
            bar.date.month() as u8,
            bar.date.day() as u8,
        )?;
        worksheet.write_datetime_with_format(r, 0, &date, &date_format)?;
        worksheet.write_number_with_format(r, 1, decimal_to_f64(bar.open), &integer_format)?;
        worksheet.write_number_with_format(r, 2, decimal_to_f64(bar.high), &integer_format)?;
        worksheet.write_number_with_format(r, 3, decimal_to_f64(bar.low), &integer_format)?;
        worksheet.write_number_with_format(r, 4, decimal_to_f64(bar.close), &integer_format)?;
        worksheet.write_number_with_format(r, 5, bar.volume as f64, &integer_format)?;
        if let Some(change) = row.change_pct {
            worksheet.write_number_with_format(r, 6, decimal_to_f64(change), &percent_format)?;
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();

    let last_row = rows.len() as u32;
    let mut chart = Chart::new(ChartType::Line);
    chart
        .add_series()
        .set_categories((SHEET_NAME, 1, 0, last_row, 0))
        .set_values((SHEET_NAME, 1, 4, last_row, 4))
        .set_name((SHEET_NAME, 0, 4));
    let title = format!("{} ({})", table.display_name(), table.ticker.code);
    chart.title().set_name(title.as_str());
    chart.legend().set_hidden();
    worksheet.insert_chart(1, PriceColumn::ALL.len() as u16 + 1, &chart)?;

    let buffer = workbook
        .save_to_buffer()
        .context("Failed to serialize workbook")?;
    Ok(buffer)
}

/// Write the rows of `range` to `path`. Returns the number of rows written.
pub fn write_xlsx(
    path: &Path,
    table: &PriceTable,
    range: DateRange,
    labels: Labels,
) -> Result<usize> {
    let rows = table.slice(range);
    if rows.is_empty() {
        return Err(DashError::Export(format!("no trading days between {}", range)).into());
    }
    let buffer = to_xlsx_buffer(table, rows, labels)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, &buffer)
        .map_err(DashError::Io)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        "Exported {} rows ({} bytes) to {}",
        rows.len(),
        buffer.len(),
        path.display()
    );
    Ok(rows.len())
}

/// `<name>_<code>_<from>_<to>.xlsx`, with path-hostile characters replaced
pub fn default_file_name(table: &PriceTable, range: DateRange) -> String {
    let name: String = table
        .display_name()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    format!(
        "{}_{}_{}_{}.xlsx",
        name,
        table.ticker.code,
        range.from.format("%Y%m%d"),
        range.to.format("%Y%m%d")
    )
}

/// Where an export lands.
///
/// An explicit directory gets the default file name; an explicit file gets an
/// `.xlsx` extension if it has none; nothing at all uses `export_dir`.
pub fn resolve_export_path(
    requested: Option<&Path>,
    config: &Config,
    table: &PriceTable,
    range: DateRange,
) -> PathBuf {
    let file_name = default_file_name(table, range);
    match requested {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) if path.extension().is_none() => path.with_extension("xlsx"),
        Some(path) => path.to_path_buf(),
        None => config
            .export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(file_name),
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::price_table::tests::{d, sample_table};

    #[test]
    fn buffer_is_a_zip_container() {
        let table = sample_table();
        let buffer = to_xlsx_buffer(&table, table.rows(), Labels::Korean).unwrap();
        assert!(buffer.starts_with(b"PK"));
    }

    #[test]
    fn empty_rows_are_rejected() {
        let table = sample_table();
        let err = to_xlsx_buffer(&table, &[], Labels::Korean).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashError>(),
            Some(DashError::Export(_))
        ));
    }

    #[test]
    fn write_failure_keeps_the_io_error() {
        let table = sample_table();
        let range = table.bounds().unwrap();
        let dir = tempfile::tempdir().unwrap();
        // The target is an existing directory
        let err = write_xlsx(dir.path(), &table, range, Labels::Korean).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashError>(),
            Some(DashError::Io(_))
        ));
        assert!(format!("{:#}", err).contains("Failed to write"));
    }

    #[test]
    fn default_file_name_uses_name_code_and_range() {
        let table = sample_table();
        let range = DateRange::new(d(2024, 1, 3), d(2024, 1, 5)).unwrap();
        assert_eq!(
            default_file_name(&table, range),
            "삼성전자_005930_20240103_20240105.xlsx"
        );
    }

    #[test]
    fn resolve_export_path_variants() {
        let table = sample_table();
        let range = DateRange::new(d(2024, 1, 3), d(2024, 1, 5)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            export_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };

        let into_dir = resolve_export_path(Some(dir.path()), &config, &table, range);
        assert_eq!(into_dir, dir.path().join("삼성전자_005930_20240103_20240105.xlsx"));

        let bare = resolve_export_path(Some(Path::new("out/prices")), &config, &table, range);
        assert_eq!(bare, PathBuf::from("out/prices.xlsx"));

        let defaulted = resolve_export_path(None, &config, &table, range);
        assert_eq!(defaulted, into_dir);
    }

    #[test]
    fn write_xlsx_reports_row_count() {
        let table = sample_table();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.xlsx");
        let range = DateRange::new(d(2024, 1, 3), d(2024, 1, 5)).unwrap();
        let written = write_xlsx(&path, &table, range, Labels::English).unwrap();
        assert_eq!(written, 3);
        assert!(path.exists());

        let weekend = DateRange::new(d(2024, 1, 6), d(2024, 1, 7)).unwrap();
        assert!(write_xlsx(&path, &table, weekend, Labels::English).is_err());
    }
}
