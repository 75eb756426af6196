//! Declarative chart descriptions.
//!
//! A [`ChartSpec`] says *what* to draw for a [`DisparityReport`]; the
//! dashboard's plot module decides *how*. Category order always follows the
//! report's group order.

use serde::Serialize;

use crate::analysis::{DisparityReport, GroupStats, ReportKind};
use crate::config::AnalysisConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    GroupedBar,
    BoxPlot,
    StackedBar,
}

/// One bar per category. Stacked charts carry one series per outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: String,
    /// Aligned with [`ChartSpec::categories`].
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxElement {
    pub category: String,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueLabel {
    pub category: String,
    /// Height at which the label is anchored.
    pub value: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
    pub boxes: Vec<BoxElement>,
    pub value_labels: Vec<ValueLabel>,
    pub reference_line: Option<ReferenceLine>,
    /// Some category label is longer than `wrap_width`; the renderer wraps.
    pub wrap_labels: bool,
    pub wrap_width: usize,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Default chart for a report: box plot for pricing, stacked proportions
/// for underwriting.
pub fn build_chart_spec(report: &DisparityReport, config: &AnalysisConfig) -> ChartSpec {
    let kind = match report.kind {
        ReportKind::Pricing => ChartKind::BoxPlot,
        ReportKind::Underwriting => ChartKind::StackedBar,
    };
    build_chart_spec_as(report, kind, config)
}

/// Chart of the requested kind. A kind that does not fit the report (box
/// plot of approval decisions, stacked price means) falls back to a
/// grouped bar of the group metric.
pub fn build_chart_spec_as(
    report: &DisparityReport,
    kind: ChartKind,
    config: &AnalysisConfig,
) -> ChartSpec {
    let kind = match (report.kind, kind) {
        (ReportKind::Pricing, ChartKind::StackedBar)
        | (ReportKind::Underwriting, ChartKind::BoxPlot) => ChartKind::GroupedBar,
        (_, k) => k,
    };

    let categories: Vec<String> = report.groups.iter().map(|g| g.key.to_string()).collect();
    let wrap_labels = categories
        .iter()
        .any(|c| c.chars().count() > config.label_wrap_width);

    let format_metric = |v: f64| match report.kind {
        ReportKind::Pricing => format!("{v:.prec$}", prec = config.decimals),
        ReportKind::Underwriting => format_percent(v),
    };

    let value_labels = report
        .groups
        .iter()
        .zip(&categories)
        .map(|(g, category)| ValueLabel {
            category: category.clone(),
            value: match (kind, &g.stats) {
                (ChartKind::BoxPlot, GroupStats::Numeric(s)) => s.box_stats.upper_whisker,
                (ChartKind::StackedBar, _) => 1.0,
                _ => g.metric,
            },
            text: format_metric(g.metric),
        })
        .collect();

    let reference_line = report.baseline.map(|b| ReferenceLine {
        value: b,
        label: format!("{}: {}", report.baseline_label(), format_metric(b)),
    });

    let (title, y_axis_title) = match report.kind {
        ReportKind::Pricing => (
            format!("Distribution of {} by {}", report.outcome_column, report.group_column),
            report.outcome_column.clone(),
        ),
        ReportKind::Underwriting => (
            format!("Approval Rates by {}", report.group_column),
            if kind == ChartKind::StackedBar {
                "Proportion".to_string()
            } else {
                report.metric_label()
            },
        ),
    };

    let series = match kind {
        ChartKind::GroupedBar => vec![BarSeries {
            name: report.metric_label(),
            values: report.groups.iter().map(|g| g.metric).collect(),
        }],
        ChartKind::StackedBar => report
            .categories
            .iter()
            .map(|cat| BarSeries {
                name: cat.to_string(),
                values: report
                    .groups
                    .iter()
                    .map(|g| match &g.stats {
                        GroupStats::Categorical(s) => {
                            s.categories.get(cat).map_or(0.0, |share| share.proportion)
                        }
                        GroupStats::Numeric(_) => 0.0,
                    })
                    .collect(),
            })
            .collect(),
        ChartKind::BoxPlot => Vec::new(),
    };

    let boxes = if kind == ChartKind::BoxPlot {
        report
            .groups
            .iter()
            .zip(&categories)
            .filter_map(|(g, category)| match &g.stats {
                GroupStats::Numeric(s) => Some(BoxElement {
                    category: category.clone(),
                    lower_whisker: s.box_stats.lower_whisker,
                    q1: s.box_stats.q1,
                    median: s.box_stats.median,
                    q3: s.box_stats.q3,
                    upper_whisker: s.box_stats.upper_whisker,
                    outliers: s.box_stats.outliers.clone(),
                }),
                GroupStats::Categorical(_) => None,
            })
            .collect()
    } else {
        Vec::new()
    };

    ChartSpec {
        kind,
        title,
        x_axis_title: report.group_column.clone(),
        y_axis_title,
        categories,
        series,
        boxes,
        value_labels,
        reference_line,
        wrap_labels,
        wrap_width: config.label_wrap_width,
    }
}

fn format_percent(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{PricingRequest, UnderwritingRequest, pricing_report, underwriting_report};
    use crate::data::model::{Column, ColumnType, Table, Value};

    fn pricing_fixture() -> DisparityReport {
        let table = Table::new(
            vec![
                Column::new("Race", ColumnType::Categorical),
                Column::new("AIP", ColumnType::Numeric),
            ],
            vec![
                vec![Value::text("A"), Value::Number(1.0)],
                vec![Value::text("A"), Value::Number(3.0)],
                vec![Value::text("B"), Value::Number(5.0)],
            ],
        )
        .unwrap();
        pricing_report(&table, &PricingRequest::new("Race", "AIP")).unwrap()
    }

    fn underwriting_fixture(groups: &[&str]) -> DisparityReport {
        let mut rows = Vec::new();
        for (i, g) in groups.iter().enumerate() {
            rows.push(vec![Value::text(*g), Value::text("Approved")]);
            if i % 2 == 0 {
                rows.push(vec![Value::text(*g), Value::text("Denied")]);
            }
        }
        let table = Table::new(
            vec![
                Column::new("Race", ColumnType::Categorical),
                Column::new("Decision", ColumnType::Categorical),
            ],
            rows,
        )
        .unwrap();
        let request = UnderwritingRequest::new("Race", "Decision", "Approved");
        underwriting_report(&table, &request, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn pricing_defaults_to_box_plot() {
        let spec = build_chart_spec(&pricing_fixture(), &AnalysisConfig::default());
        assert_eq!(spec.kind, ChartKind::BoxPlot);
        assert_eq!(spec.categories, vec!["A", "B"]);
        assert_eq!(spec.boxes.len(), 2);
        assert_eq!(spec.boxes[0].median, 2.0);
        assert_eq!(spec.value_labels[0].text, "2.0000");
        assert_eq!(spec.title, "Distribution of AIP by Race");

        let line = spec.reference_line.unwrap();
        assert_eq!(line.value, 3.0);
        assert_eq!(line.label, "Overall mean AIP: 3.0000");
    }

    #[test]
    fn underwriting_defaults_to_stacked_proportions() {
        let spec = build_chart_spec(&underwriting_fixture(&["A", "B"]), &AnalysisConfig::default());
        assert_eq!(spec.kind, ChartKind::StackedBar);
        assert_eq!(spec.y_axis_title, "Proportion");
        let names: Vec<&str> = spec.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Approved", "Denied"]);
        assert_eq!(spec.series[0].values, vec![0.5, 1.0]);
        assert_eq!(spec.value_labels[0].text, "50.0%");
        assert_eq!(spec.reference_line.unwrap().label, "Overall approval rate: 66.7%");
    }

    #[test]
    fn grouped_bar_uses_group_metric() {
        let report = pricing_fixture();
        let spec = build_chart_spec_as(&report, ChartKind::GroupedBar, &AnalysisConfig::default());
        assert_eq!(spec.series.len(), 1);
        assert_eq!(spec.series[0].values, vec![2.0, 5.0]);
        assert!(spec.boxes.is_empty());
    }

    #[test]
    fn mismatched_kind_falls_back_to_grouped_bar() {
        let report = underwriting_fixture(&["A", "B"]);
        let spec = build_chart_spec_as(&report, ChartKind::BoxPlot, &AnalysisConfig::default());
        assert_eq!(spec.kind, ChartKind::GroupedBar);
    }

    #[test]
    fn long_labels_request_wrapping() {
        let report = underwriting_fixture(&["Native Hawaiian or Other Pacific Islander", "White"]);
        let spec = build_chart_spec(&report, &AnalysisConfig::default());
        assert!(spec.wrap_labels);
        assert_eq!(spec.wrap_width, 12);
    }

    #[test]
    fn undefined_baseline_has_no_reference_line() {
        let table = Table::empty(vec![
            Column::new("Race", ColumnType::Categorical),
            Column::new("AIP", ColumnType::Numeric),
        ]);
        let report = pricing_report(&table, &PricingRequest::new("Race", "AIP")).unwrap();
        let spec = build_chart_spec(&report, &AnalysisConfig::default());
        assert!(spec.is_empty());
        assert!(spec.reference_line.is_none());
    }
}
