//! Command parsing for the interactive session
//!
//! A small hand-written parser for readline input. The one-shot CLI goes
//! through clap instead; both end up in the same dispatcher functions.

use chrono::{Datelike, NaiveDate};

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load prices: `lookup <company> [from] [to]`
    Lookup {
        company: String,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    /// Narrow the chart/export range: `view <from> [to]`
    View {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    /// Back to the full loaded range: `view reset`
    ViewReset,
    /// Print the loaded table again: `show`
    Show,
    /// Draw the close price over the view range: `chart`
    Chart,
    /// Write the view range to xlsx: `export [path]`
    Export { path: Option<String> },
    /// Search the listing: `search <fragment>`
    Search { fragment: String },
    /// Random demo dashboard: `demo [seed]`
    Demo { seed: Option<u64> },
    /// Show help
    Help,
    /// Exit/quit
    Exit,
}

/// Error type for command parsing
#[derive(Debug, Clone)]
pub struct CommandParseError {
    pub message: String,
}

impl CommandParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandParseError {}

/// Which end of a range a partial date stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// Parse flexible date formats: YYYY-MM-DD, YYYYMMDD, YYYY-MM or YYYY.
///
/// Month and year forms expand to their first day for a start bound and to
/// their last day for an end bound.
pub fn parse_flexible_date(s: &str, bound: DateBound) -> Result<NaiveDate, CommandParseError> {
    let s = s.trim();
    let invalid = || {
        CommandParseError::new(format!(
            "Invalid date '{}'. Use YYYY-MM-DD, YYYYMMDD, YYYY-MM, or YYYY",
            s
        ))
    };

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| invalid());
    }

    // YYYY-MM
    if let Ok(first) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        return Ok(match bound {
            DateBound::Start => first,
            DateBound::End => last_day_of_month(first).unwrap_or(first),
        });
    }

    if s.len() == 4 {
        if let Ok(year) = s.parse::<i32>() {
            if (1900..=2100).contains(&year) {
                let date = match bound {
                    DateBound::Start => NaiveDate::from_ymd_opt(year, 1, 1),
                    DateBound::End => NaiveDate::from_ymd_opt(year, 12, 31),
                };
                return date.ok_or_else(invalid);
            }
        }
    }

    Err(invalid())
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next_month.and_then(|d| d.pred_opt())
}

fn looks_like_date(token: &str) -> bool {
    parse_flexible_date(token, DateBound::Start).is_ok()
}

/// Parse a command string into a Command enum
///
/// A leading slash is accepted and ignored, so `/lookup 삼성전자` and
/// `lookup 삼성전자` are the same.
pub fn parse_command(input: &str) -> Result<Command, CommandParseError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(CommandParseError::new(
            "Empty command. Type `help` for commands.",
        ));
    }

    let input = input.strip_prefix('/').unwrap_or(input);

    let mut parts = input.split_whitespace();
    let cmd = parts
        .next()
        .ok_or_else(|| CommandParseError::new("No command provided"))?;
    let rest: Vec<&str> = parts.collect();

    match cmd.to_lowercase().as_str() {
        "lookup" | "l" => parse_lookup(&rest),
        "view" | "v" => {
            if rest.first().is_some_and(|t| t.eq_ignore_ascii_case("reset")) {
                return Ok(Command::ViewReset);
            }
            if rest.is_empty() || rest.len() > 2 {
                return Err(CommandParseError::new(
                    "view requires a range. Usage: view <from> [to] or view reset",
                ));
            }
            let from = parse_open_bound(rest[0], DateBound::Start)?;
            let to = match rest.get(1) {
                Some(token) => parse_open_bound(token, DateBound::End)?,
                None => None,
            };
            Ok(Command::View { from, to })
        }
        "show" | "table" => Ok(Command::Show),
        "chart" => Ok(Command::Chart),
        "export" => Ok(Command::Export {
            path: (!rest.is_empty()).then(|| rest.join(" ")),
        }),
        "search" | "find" => {
            if rest.is_empty() {
                return Err(CommandParseError::new(
                    "search requires a name fragment. Usage: search <fragment>",
                ));
            }
            Ok(Command::Search {
                fragment: rest.join(" "),
            })
        }
        "demo" => {
            let seed = match rest.first() {
                Some(token) => Some(token.parse::<u64>().map_err(|_| {
                    CommandParseError::new(format!(
                        "Seed must be a non-negative integer, got '{}'",
                        token
                    ))
                })?),
                None => None,
            };
            Ok(Command::Demo { seed })
        }
        "help" | "h" | "?" => Ok(Command::Help),
        "exit" | "quit" | "q" => Ok(Command::Exit),
        _ => Err(CommandParseError::new(format!(
            "Unknown command: {}. Type `help` for available commands.",
            cmd
        ))),
    }
}

/// `lookup <company...> [from] [to]`; trailing date-shaped tokens are the range
fn parse_lookup(rest: &[&str]) -> Result<Command, CommandParseError> {
    let usage = "lookup requires a company. Usage: lookup <company> [from] [to]";
    if rest.is_empty() {
        return Err(CommandParseError::new(usage));
    }

    let mut end = rest.len();
    let mut dates = Vec::new();
    // Keep at least one token for the company so `lookup 2024` stays a name
    while end > 1 && dates.len() < 2 && looks_like_date(rest[end - 1]) {
        dates.push(rest[end - 1]);
        end -= 1;
    }
    dates.reverse();

    let company = rest[..end].join(" ");
    let (from, to) = match dates.as_slice() {
        [] => (None, None),
        [from] => (Some(parse_flexible_date(from, DateBound::Start)?), None),
        [from, to, ..] => (
            Some(parse_flexible_date(from, DateBound::Start)?),
            Some(parse_flexible_date(to, DateBound::End)?),
        ),
    };

    Ok(Command::Lookup { company, from, to })
}

/// `-` and `..` leave a view endpoint open
fn parse_open_bound(token: &str, bound: DateBound) -> Result<Option<NaiveDate>, CommandParseError> {
    match token {
        "-" | ".." => Ok(None),
        _ => parse_flexible_date(token, bound).map(Some),
    }
}
