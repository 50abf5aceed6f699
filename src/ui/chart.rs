//! Terminal line chart for one or more value series
//!
//! The chart is laid out by ratatui's `Chart` widget into an off-screen
//! `Buffer`, then written out line by line so it can be printed between
//! ordinary stdout output instead of taking over the screen.

use colored::Colorize;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Chart, Dataset, GraphType, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::utils::format_axis_value;

/// Marker and legend glyph per series, cycled
const MARKERS: [(Marker, &str, Color); 3] = [
    (Marker::Dot, "•", Color::Cyan),
    (Marker::Braille, "⣿", Color::Yellow),
    (Marker::HalfBlock, "▀", Color::Magenta),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    fn points(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| (i as f64, *v))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    /// Total width in columns, y labels included
    pub width: usize,
    /// Rows of plot area, axis and x labels excluded
    pub height: usize,
    pub title: Option<String>,
    /// Labels printed under the first and last point
    pub x_labels: Option<(String, String)>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 72,
            height: 16,
            title: None,
            x_labels: None,
        }
    }
}

/// Lay the chart out into a buffer of `width x (height + 2)` cells.
///
/// Returns `None` when no series has a finite value.
pub fn chart_buffer(series: &[ChartSeries], options: &ChartOptions) -> Option<Buffer> {
    let points: Vec<Vec<(f64, f64)>> = series.iter().map(ChartSeries::points).collect();
    let (mut min, mut max) = points
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    if (max - min).abs() < f64::EPSILON {
        min -= 1.0;
        max += 1.0;
    }

    let last_x = series
        .iter()
        .map(|s| s.values.len().saturating_sub(1))
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let datasets: Vec<Dataset> = points
        .iter()
        .zip(series)
        .enumerate()
        .map(|(idx, (data, s))| {
            let (marker, _, color) = MARKERS[idx % MARKERS.len()];
            Dataset::default()
                .name(s.name.clone())
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(data)
        })
        .collect();

    // The x axis row is only laid out when labels are present
    let (first, last) = options.x_labels.clone().unwrap_or_default();
    let x_axis = Axis::default()
        .bounds([0.0, last_x])
        .labels(vec![Span::raw(first), Span::raw(last)])
        .labels_alignment(Alignment::Right);
    let y_axis = Axis::default().bounds([min, max]).labels(vec![
        Span::raw(format_axis_value(min)),
        Span::raw(format_axis_value((min + max) / 2.0)),
        Span::raw(format_axis_value(max)),
    ]);

    let width = options.width.clamp(8, u16::MAX as usize) as u16;
    let height = (options.height.clamp(2, u16::MAX as usize - 2) + 2) as u16;
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    Chart::new(datasets)
        .x_axis(x_axis)
        .y_axis(y_axis)
        .legend_position(None)
        .render(area, &mut buf);
    Some(buf)
}

/// Render `series` as printable lines with a title and legend.
///
/// All series share one y scale and are spread over the full width.
pub fn render_line_chart(series: &[ChartSeries], options: &ChartOptions) -> String {
    let Some(buf) = chart_buffer(series, options) else {
        return "(no data to chart)\n".to_string();
    };
    let width = buf.area.width as usize;

    let mut out = String::new();
    if let Some(title) = &options.title {
        let pad = width.saturating_sub(title.width()) / 2;
        out.push_str(&" ".repeat(pad));
        out.push_str(&title.as_str().bold().to_string());
        out.push('\n');
    }

    for line in buffer_lines(&buf) {
        out.push_str(&line);
        out.push('\n');
    }

    if series.len() > 1 || options.title.is_none() {
        let legend: Vec<String> = series
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                let (_, glyph, color) = MARKERS[idx % MARKERS.len()];
                format!("{} {}", paint(glyph, color), s.name)
            })
            .collect();
        out.push_str(&legend.join("   "));
        out.push('\n');
    }

    out
}

/// Buffer rows as strings, colored where the widget set a foreground
fn buffer_lines(buf: &Buffer) -> Vec<String> {
    let area = buf.area;
    (area.top()..area.bottom())
        .map(|y| {
            let mut line = String::new();
            let mut x = area.left();
            while x < area.right() {
                let cell = &buf[(x, y)];
                let symbol = cell.symbol();
                line.push_str(&paint(symbol, cell.fg));
                // Wide glyphs cover the following cell
                x += symbol.width().max(1) as u16;
            }
            line.trim_end().to_string()
        })
        .collect()
}

fn paint(symbol: &str, color: Color) -> String {
    let terminal = match color {
        Color::Cyan => colored::Color::Cyan,
        Color::Yellow => colored::Color::Yellow,
        Color::Magenta => colored::Color::Magenta,
        _ => return symbol.to_string(),
    };
    if symbol.trim().is_empty() {
        return symbol.to_string();
    }
    symbol.color(terminal).to_string()
}
