//! Data behind the demo dashboard: a category selector, a range slider,
//! a small frame of random normal values and a feedback box.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::DashError;

pub const DEFAULT_ROWS: usize = 10;
pub const DEFAULT_COLUMNS: usize = 3;
pub const RANGE_MIN: u8 = 0;
pub const RANGE_MAX: u8 = 100;
pub const RANGE_DEFAULT: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Category {
    #[default]
    Overview,
    Detail,
    Settings,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Overview, Category::Detail, Category::Settings];

    pub fn label(self) -> &'static str {
        match self {
            Category::Overview => "개요",
            Category::Detail => "상세 분석",
            Category::Settings => "설정",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.split_whitespace().collect();
        match compact.to_lowercase().as_str() {
            "개요" | "overview" => Ok(Category::Overview),
            "상세분석" | "detail" | "details" => Ok(Category::Detail),
            "설정" | "settings" => Ok(Category::Settings),
            _ => Err(DashError::InvalidQuery(format!(
                "unknown category '{}' (choose one of: {})",
                s,
                Category::ALL
                    .iter()
                    .map(|c| c.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

/// Column-labelled grid of random values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl DemoFrame {
    /// Standard normal samples; the same seed always yields the same frame
    pub fn random(rows: usize, columns: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let columns = columns.min(26);
        let names = (0..columns)
            .map(|i| char::from(b'A' + i as u8).to_string())
            .collect();
        let data = (0..rows)
            .map(|_| {
                (0..columns)
                    .map(|_| rng.sample::<f64, _>(StandardNormal))
                    .collect()
            })
            .collect();
        Self {
            columns: names,
            rows: data,
        }
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index).copied())
            .collect()
    }
}

/// Outcome of pressing the submit button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Saved(String),
    Empty,
}

impl Feedback {
    pub fn submit(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            Feedback::Empty
        } else {
            Feedback::Saved(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_frame_has_requested_shape() {
        let frame = DemoFrame::random(DEFAULT_ROWS, DEFAULT_COLUMNS, Some(1));
        assert_eq!(frame.columns, vec!["A", "B", "C"]);
        assert_eq!(frame.rows.len(), 10);
        assert!(frame.rows.iter().all(|r| r.len() == 3));
        assert_eq!(frame.column(1).len(), 10);
    }

    #[test]
    fn seeded_frames_are_reproducible() {
        let a = DemoFrame::random(5, 3, Some(42));
        let b = DemoFrame::random(5, 3, Some(42));
        let c = DemoFrame::random(5, 3, Some(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn category_parses_korean_and_english() {
        assert_eq!("상세 분석".parse::<Category>().unwrap(), Category::Detail);
        assert_eq!("상세분석".parse::<Category>().unwrap(), Category::Detail);
        assert_eq!("Settings".parse::<Category>().unwrap(), Category::Settings);
        assert_eq!("개요".parse::<Category>().unwrap(), Category::Overview);
        assert!("차트".parse::<Category>().is_err());
    }

    #[test]
    fn feedback_requires_text() {
        assert_eq!(
            Feedback::submit("  좋아요 "),
            Feedback::Saved("좋아요".to_string())
        );
        assert_eq!(Feedback::submit("   "), Feedback::Empty);
    }
}
