use eframe::egui::{Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use fair_lending::analysis::{DisparityReport, ReportKind, TestDetail, TestResult};
use fair_lending::config::AnalysisConfig;

use crate::state::{AnalysisState, AppState, Tab};
use crate::ui::plot;

const PREVIEW_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Central panel – preview, summary, test and chart of the active tab
// ---------------------------------------------------------------------------

pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    let title = match state.tab {
        Tab::Pricing => "Price Testing",
        Tab::Underwriting => "Credit Decision Testing",
    };
    let (analysis, config) = state.active();
    ui.heading(title);

    if analysis.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to start  (File → Open…)");
        });
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            data_preview(ui, analysis);
            ui.add_space(8.0);

            if let Some(err) = &analysis.error {
                ui.label(RichText::new(err).color(Color32::RED));
                return;
            }
            let Some(report) = &analysis.report else {
                ui.label("Pick a grouping and an outcome column.");
                return;
            };

            summary_section(ui, report, config);
            ui.add_space(8.0);
            test_section(ui, report, config);
            ui.add_space(8.0);

            if let (Some(spec), Some(colors)) = (&analysis.chart, &analysis.color_map) {
                plot::disparity_chart(ui, spec, colors);
            }
        });
}

fn data_preview(ui: &mut Ui, analysis: &AnalysisState) {
    let Some(ds) = &analysis.dataset else {
        return;
    };
    ui.strong("Data Preview");
    let head = ds.head(PREVIEW_ROWS);
    let rows: Vec<Vec<String>> = head
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();
    string_table(ui, "preview", &head.column_names(), &rows);
}

fn summary_section(ui: &mut Ui, report: &DisparityReport, config: &AnalysisConfig) {
    let heading = match report.kind {
        ReportKind::Pricing => format!(
            "{} by {}",
            report.outcome_column, report.group_column
        ),
        ReportKind::Underwriting => format!("Approval Rates by {}", report.group_column),
    };
    ui.strong(heading);

    for issue in &report.issues {
        ui.label(RichText::new(issue.to_string()).color(Color32::from_rgb(220, 140, 20)));
    }
    if report.groups.is_empty() {
        return;
    }

    string_table(
        ui,
        "summary",
        &report.summary_headers(),
        &report.summary_rows(config.decimals),
    );
    if let Some(b) = report.baseline {
        ui.label(format!(
            "{}: {b:.prec$}",
            report.baseline_label(),
            prec = config.decimals
        ));
    }
}

fn test_section(ui: &mut Ui, report: &DisparityReport, config: &AnalysisConfig) {
    let Some(test) = &report.test else {
        ui.label("No significance test for this selection (not enough data).");
        return;
    };
    let d = config.decimals;
    ui.strong(format!("{}", test.kind));

    match &test.detail {
        TestDetail::Anova(table) => {
            let headers: Vec<String> = ["", "df", "sum_sq", "mean_sq", "F", "PR(>F)"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let rows = vec![
                vec![
                    report.group_column.clone(),
                    table.between.df.to_string(),
                    format!("{:.d$}", table.between.sum_sq),
                    format!("{:.d$}", table.between.mean_sq),
                    format!("{:.d$}", test.statistic),
                    format!("{:.d$}", test.p_value),
                ],
                vec![
                    "Residual".to_string(),
                    table.within.df.to_string(),
                    format!("{:.d$}", table.within.sum_sq),
                    format!("{:.d$}", table.within.mean_sq),
                    String::new(),
                    String::new(),
                ],
            ];
            string_table(ui, "anova", &headers, &rows);
        }
        TestDetail::Welch {
            df,
            mean_difference,
            ..
        } => {
            ui.label(format!("t statistic: {:.d$}", test.statistic));
            ui.label(format!("Degrees of freedom: {df:.2}"));
            ui.label(format!("Mean difference: {mean_difference:.d$}"));
            ui.label(format!("p-value: {:.d$}", test.p_value));
        }
        TestDetail::ChiSquare {
            yates_corrected, ..
        } => {
            ui.label(format!("Chi-square Statistic: {:.d$}", test.statistic));
            ui.label(format!("p-value: {:.d$}", test.p_value));
            if let Some(dof) = test.degrees_of_freedom {
                ui.label(format!("Degrees of freedom: {dof}"));
            }
            if *yates_corrected {
                ui.label(RichText::new("Yates' continuity correction applied").weak());
            }
        }
    }
    significance_badge(ui, test, config.significance_level);
}

fn significance_badge(ui: &mut Ui, test: &TestResult, alpha: f64) {
    let (text, color) = if test.is_significant(alpha) {
        (
            format!("Significant disparity at α = {alpha}"),
            Color32::from_rgb(200, 60, 60),
        )
    } else {
        (
            format!("No significant disparity at α = {alpha}"),
            Color32::from_rgb(60, 150, 60),
        )
    };
    ui.label(RichText::new(text).color(color).strong());
}

/// Plain striped grid of pre-formatted cells.
fn string_table(ui: &mut Ui, id: &str, headers: &[String], rows: &[Vec<String>]) {
    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .columns(Column::auto().at_least(60.0), headers.len())
            .header(20.0, |mut header| {
                for h in headers {
                    header.col(|ui: &mut Ui| {
                        ui.strong(h.as_str());
                    });
                }
            })
            .body(|mut body| {
                for row in rows {
                    body.row(18.0, |mut table_row| {
                        for cell in row {
                            table_row.col(|ui: &mut Ui| {
                                ui.label(cell.as_str());
                            });
                        }
                    });
                }
            });
    });
    ui.add_space(4.0);
}
