use anyhow::Result;

use super::DispatchContext;
use crate::cli::formatters;
use crate::reports::demo::{DEFAULT_COLUMNS, DEFAULT_ROWS, RANGE_DEFAULT};
use crate::reports::{Category, DemoFrame, Feedback};
use crate::ui::chart::{render_line_chart, ChartOptions, ChartSeries};

#[derive(Debug, Clone, PartialEq)]
pub struct DemoRequest {
    pub category: Category,
    pub range: u8,
    pub rows: usize,
    pub seed: Option<u64>,
    pub feedback: Option<String>,
}

impl Default for DemoRequest {
    fn default() -> Self {
        Self {
            category: Category::default(),
            range: RANGE_DEFAULT,
            rows: DEFAULT_ROWS,
            seed: None,
            feedback: None,
        }
    }
}

pub fn dispatch_demo(request: DemoRequest, ctx: &DispatchContext<'_>) -> Result<()> {
    let frame = DemoFrame::random(request.rows, DEFAULT_COLUMNS, request.seed);
    let feedback = request.feedback.as_deref().map(Feedback::submit);

    if ctx.json_output {
        println!(
            "{}",
            formatters::format_demo_json(request.category, request.range, &frame, feedback.as_ref())
        );
        return Ok(());
    }

    print!(
        "{}",
        formatters::format_demo_header(request.category, request.range)
    );
    println!("{}", formatters::format_demo_table(&frame));
    println!();
    print!("{}", render_demo_chart(&frame, ctx.config.chart_width, ctx.config.chart_height));

    match feedback {
        Some(Feedback::Saved(text)) => println!("\n{}", formatters::format_feedback_saved(&text)),
        Some(Feedback::Empty) => println!("\n{}", formatters::format_feedback_empty()),
        None => {}
    }
    Ok(())
}

/// One series per frame column
pub fn render_demo_chart(frame: &DemoFrame, width: usize, height: usize) -> String {
    let series: Vec<ChartSeries> = frame
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| ChartSeries::new(name.clone(), frame.column(idx)))
        .collect();
    let options = ChartOptions {
        width,
        height,
        title: None,
        x_labels: Some(("0".to_string(), frame.rows.len().saturating_sub(1).to_string())),
    };
    render_line_chart(&series, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_request_matches_dashboard_defaults() {
        let request = DemoRequest::default();
        assert_eq!(request.category, Category::Overview);
        assert_eq!(request.range, 50);
        assert_eq!(request.rows, 10);
    }

    #[test]
    fn demo_chart_has_a_legend_entry_per_column() {
        let frame = DemoFrame::random(10, 3, Some(3));
        let out = render_demo_chart(&frame, 30, 6);
        let legend = out.lines().last().unwrap();
        for name in ["A", "B", "C"] {
            assert!(legend.contains(name));
        }
    }
}
