//! HTML training report.
use std::path::Path;

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use ndarray::s;
use plotly::common::{DashType, Line, Mode};
use plotly::layout::{Axis, Layout};
use plotly::{Plot, Scatter};

use regsel_models::io::Table;
use regsel_models::models::params::format_params;
use regsel_models::trainer::TrainingOutcome;

use crate::pipeline::input::RegselConfig;
use crate::util::write_bytes_to_file;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

/// Scatter of predictions against targets with the `y = x` reference line.
pub fn plot_actual_vs_predicted(actual: &[f64], predicted: &[f64], title: &str) -> Plot {
    let lo = actual
        .iter()
        .chain(predicted.iter())
        .copied()
        .fold(f64::INFINITY, f64::min);
    let hi = actual
        .iter()
        .chain(predicted.iter())
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let scatter = Scatter::new(actual.to_vec(), predicted.to_vec())
        .mode(Mode::Markers)
        .name("Test split");
    let reference_line = Scatter::new(vec![lo, hi], vec![lo, hi])
        .mode(Mode::Lines)
        .name("y = x (Perfect prediction)")
        .line(Line::new().color("red").dash(DashType::Dash));

    let mut plot = Plot::new();
    plot.add_trace(scatter);
    plot.add_trace(reference_line);
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Actual"))
            .y_axis(Axis::new().title("Predicted")),
    );
    plot
}

fn candidate_table(outcome: &TrainingOutcome) -> Markup {
    html! {
        table class="candidates" {
            thead {
                tr {
                    th { "Candidate" }
                    th { "Model" }
                    th { "Best parameters" }
                    th { "Mean CV r2" }
                    th { "Train r2" }
                    th { "Test r2" }
                    th { "Test RMSE" }
                }
            }
            tbody {
                @for report in &outcome.reports {
                    tr class=[(report.name == outcome.best_candidate).then_some("winner")] {
                        td { (report.name) }
                        td { (report.kind) }
                        td { code { (format_params(&report.best_params)) } }
                        td { (format!("{:.4}", report.cv_score)) }
                        td { (format!("{:.4}", report.train.r2)) }
                        td { (format!("{:.4}", report.test.r2)) }
                        td { (format!("{:.4}", report.test.rmse)) }
                    }
                }
            }
        }
    }
}

/// Render the report for `outcome`, plotting predictions on the `test` table
/// (label in the last column).
pub fn render_training_report(
    outcome: &TrainingOutcome,
    test: &Table,
    config: &RegselConfig,
) -> Result<String> {
    let label_idx = test.data.ncols() - 1;
    let predicted = outcome
        .predict(test.data.slice(s![.., ..label_idx]))
        .context("Failed to predict the test split for the report")?;
    let actual = test.data.column(label_idx).to_vec();

    let plot = plot_actual_vs_predicted(
        &actual,
        &predicted.to_vec(),
        &format!("{}: predicted vs actual (test split)", outcome.best_candidate),
    );
    let config_json = serde_json::to_string_pretty(config)?;
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "regsel training report" }
                script src=(PLOTLY_CDN) {}
                style {
                    "body { font-family: sans-serif; margin: 2em; }
                    table.candidates { border-collapse: collapse; }
                    table.candidates td, table.candidates th { border: 1px solid #ccc; padding: 4px 8px; }
                    tr.winner { background-color: #e6f4ea; font-weight: bold; }
                    .code-container { background-color: #f5f5f5; padding: 10px; border-radius: 5px; overflow-x: auto; }"
                }
            }
            body {
                h1 { "regsel training report" }
                p { "Generated " (generated) " by regsel " (config.version) "." }

                h2 { "Overview" }
                p {
                    "Best model: " strong { (outcome.best_candidate) }
                    " with parameters " code { (format_params(&outcome.best_params)) } "."
                }
                table class="candidates" {
                    tr { th { "" } th { "r2" } th { "MSE" } th { "RMSE" } }
                    tr {
                        th { "Train" }
                        td { (format!("{:.4}", outcome.train_metrics.r2)) }
                        td { (format!("{:.4}", outcome.train_metrics.mse)) }
                        td { (format!("{:.4}", outcome.train_metrics.rmse)) }
                    }
                    tr {
                        th { "Test" }
                        td { (format!("{:.4}", outcome.test_metrics.r2)) }
                        td { (format!("{:.4}", outcome.test_metrics.mse)) }
                        td { (format!("{:.4}", outcome.test_metrics.rmse)) }
                    }
                }
                (PreEscaped(plot.to_inline_html(Some("actual-vs-predicted"))))

                h2 { "Candidates" }
                (candidate_table(outcome))

                h2 { "Configuration" }
                div class="code-container" {
                    pre { code { (config_json) } }
                }
            }
        }
    };
    Ok(markup.into_string())
}

pub fn write_training_report(
    outcome: &TrainingOutcome,
    test: &Table,
    config: &RegselConfig,
    path: &Path,
) -> Result<()> {
    let html = render_training_report(outcome, test, config)?;
    write_bytes_to_file(path, html.as_bytes())
}
