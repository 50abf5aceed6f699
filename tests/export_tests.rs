use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDate;
use rust_decimal_macros::dec;

use krxdash::export::{write_xlsx, SHEET_NAME};
use krxdash::pricing::PriceBar;
use krxdash::reports::{DateRange, Labels, PriceTable};
use krxdash::tickers::{Market, ResolutionSource, ResolvedTicker};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn sk_hynix_table() -> PriceTable {
    let ticker = ResolvedTicker {
        code: "000660".to_string(),
        name: Some("SK하이닉스".to_string()),
        market: Market::Kospi,
        source: ResolutionSource::ExactName,
    };
    let bars = vec![
        PriceBar {
            date: d(2024, 1, 3),
            open: dec!(138000),
            high: dec!(139500),
            low: dec!(134300),
            close: dec!(134900),
            volume: 4_011_122,
        },
        PriceBar {
            date: d(2024, 1, 2),
            open: dec!(140300),
            high: dec!(142400),
            low: dec!(137900),
            close: dec!(138900),
            volume: 2_845_219,
        },
        PriceBar {
            date: d(2024, 1, 4),
            open: dec!(135000),
            high: dec!(137200),
            low: dec!(134400),
            close: dec!(136000),
            volume: 2_563_047,
        },
    ];
    PriceTable::from_bars(
        ticker,
        DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap(),
        bars,
    )
}

fn cell_number(cell: &Data) -> f64 {
    match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::DateTime(dt) => dt.as_f64(),
        other => panic!("expected a number, got {:?}", other),
    }
}

#[test]
fn exported_workbook_has_localized_header_and_ascending_rows() {
    let table = sk_hynix_table();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hynix.xlsx");

    let range = table.clamp_view(None, None).unwrap();
    let written = write_xlsx(&path, &table, range, Labels::Korean).unwrap();
    assert_eq!(written, 3);

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    let sheet = workbook.worksheet_range(SHEET_NAME).unwrap();
    let rows: Vec<&[Data]> = sheet.rows().collect();
    assert_eq!(rows.len(), 4);

    let header: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
    assert_eq!(
        header,
        vec!["날짜", "시가", "고가", "저가", "종가", "거래량", "등락률"]
    );

    // 2024-01-02 is Excel serial 45293
    assert_eq!(cell_number(&rows[1][0]), 45293.0);
    assert_eq!(cell_number(&rows[1][4]), 138900.0);
    assert_eq!(cell_number(&rows[3][4]), 136000.0);
    assert_eq!(cell_number(&rows[2][5]), 4_011_122.0);

    // First row has no previous close
    assert!(matches!(rows[1].get(6), None | Some(Data::Empty)));
    assert!((cell_number(&rows[2][6]) - (-2.88)).abs() < 1e-9);
}

#[test]
fn export_of_a_view_only_contains_that_range() {
    let table = sk_hynix_table();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.xlsx");

    let view = table.clamp_view(Some(d(2024, 1, 3)), None).unwrap();
    let written = write_xlsx(&path, &table, view, Labels::English).unwrap();
    assert_eq!(written, 2);

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    let sheet = workbook.worksheet_range(SHEET_NAME).unwrap();
    let rows: Vec<&[Data]> = sheet.rows().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0].to_string(), "Date");
    assert_eq!(rows[0][4].to_string(), "Close");
    assert_eq!(cell_number(&rows[1][0]), 45294.0);
}
