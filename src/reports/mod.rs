// Reports module - price table model and demo dashboard data

pub mod demo;
pub mod price_table;

pub use demo::{Category, DemoFrame, Feedback};
pub use price_table::{
    summarize, DateRange, Labels, PriceColumn, PriceRow, PriceSummary, PriceTable,
};
