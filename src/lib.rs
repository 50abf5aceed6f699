//! krxdash - KRX stock price lookup and demo dashboard
//!
//! Resolves Korean listed companies by exact name or 6-digit code, fetches
//! their daily price history, renders tables and terminal charts, and exports
//! a chosen date range to Excel.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod export;
pub mod pricing;
pub mod reports;
pub mod session;
pub mod tickers;
pub mod ui;
pub mod utils;
