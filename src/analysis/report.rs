use std::fmt;

use serde::Serialize;

use super::significance::{TestResult, test_categorical, test_numeric};
use super::summary::{
    CategoricalSummary, NumericGroups, NumericSummary, summarize_categorical, summarize_numeric,
};
use crate::config::AnalysisConfig;
use crate::data::filter::{Filter, filter, project};
use crate::data::model::{ColumnType, Table, Value};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Compare a numeric outcome (rate, APR) across groups.
#[derive(Debug, Clone, Default)]
pub struct PricingRequest {
    pub group_column: String,
    pub value_column: String,
    pub filter: Filter,
}

impl PricingRequest {
    pub fn new(group_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            group_column: group_column.into(),
            value_column: value_column.into(),
            filter: Filter::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Compare approval rates of a categorical decision across groups.
#[derive(Debug, Clone, Default)]
pub struct UnderwritingRequest {
    pub group_column: String,
    pub outcome_column: String,
    /// Outcome category counted as an approval.
    pub approved_label: String,
    pub filter: Filter,
}

impl UnderwritingRequest {
    pub fn new(
        group_column: impl Into<String>,
        outcome_column: impl Into<String>,
        approved_label: impl Into<String>,
    ) -> Self {
        Self {
            group_column: group_column.into(),
            outcome_column: outcome_column.into(),
            approved_label: approved_label.into(),
            filter: Filter::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportKind {
    Pricing,
    Underwriting,
}

/// A soft degeneracy the presentation layer should explain to the analyst.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DataIssue {
    /// No rows survive filtering and projection.
    NoData,
    /// Fewer than two groups to compare.
    TooFewGroups { found: usize },
    /// The outcome takes fewer than two distinct categories.
    TooFewCategories { found: usize },
    /// The baseline has a zero denominator for this filter.
    BaselineUndefined { reason: String },
    /// A test applies but is not computable (e.g. no within-group spread).
    TestUndefined,
    /// Every group is constant but the group means differ, so the F ratio
    /// is unbounded.
    NoWithinGroupVariation,
    /// Pricing groups must come from a categorical column.
    NonCategoricalGrouping { column: String },
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataIssue::NoData => write!(f, "No rows match the current selection"),
            DataIssue::TooFewGroups { found } => {
                write!(f, "Need at least 2 groups to compare, found {found}")
            }
            DataIssue::TooFewCategories { found } => {
                write!(f, "Need at least 2 outcome categories, found {found}")
            }
            DataIssue::BaselineUndefined { reason } => {
                write!(f, "Baseline undefined for this filter: {reason}")
            }
            DataIssue::TestUndefined => {
                write!(f, "Not enough variation in the data to run the test")
            }
            DataIssue::NoWithinGroupVariation => write!(
                f,
                "Values are constant within every group but differ between groups; \
                 the F test is undefined"
            ),
            DataIssue::NonCategoricalGrouping { column } => write!(
                f,
                "Grouping column '{column}' is not categorical; pick a categorical column"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GroupStats {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
}

/// One group of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: Value,
    pub count: usize,
    /// Group mean (pricing) or approval rate (underwriting).
    pub metric: f64,
    /// `metric - baseline`; absent when the baseline is undefined.
    pub deviation: Option<f64>,
    pub stats: GroupStats,
}

/// Result of one pricing or underwriting analysis. Built fresh per request
/// and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisparityReport {
    pub kind: ReportKind,
    pub group_column: String,
    pub outcome_column: String,
    /// Rows that entered the analysis (after filtering and dropping missing).
    pub population: usize,
    /// Ordered by group key.
    pub groups: Vec<GroupRow>,
    /// Outcome categories (underwriting only), in column order.
    pub categories: Vec<Value>,
    pub approved_label: Option<String>,
    /// Grand mean or overall approval rate.
    pub baseline: Option<f64>,
    pub test: Option<TestResult>,
    pub issues: Vec<DataIssue>,
}

impl DisparityReport {
    pub fn is_empty(&self) -> bool {
        self.population == 0
    }

    /// `None` when no test could be run.
    pub fn is_significant(&self, alpha: f64) -> Option<bool> {
        self.test.as_ref().map(|t| t.is_significant(alpha))
    }

    /// Short description of the group metric, for table headers and axes.
    pub fn metric_label(&self) -> String {
        match self.kind {
            ReportKind::Pricing => format!("Mean {}", self.outcome_column),
            ReportKind::Underwriting => "Approval rate".to_string(),
        }
    }

    pub fn baseline_label(&self) -> String {
        match self.kind {
            ReportKind::Pricing => format!("Overall mean {}", self.outcome_column),
            ReportKind::Underwriting => "Overall approval rate".to_string(),
        }
    }

    /// Header row of the summary table.
    pub fn summary_headers(&self) -> Vec<String> {
        let mut headers = vec![self.group_column.clone(), "Count".to_string()];
        match self.kind {
            ReportKind::Pricing => {
                headers.push(self.metric_label());
                headers.push("Std Dev".to_string());
            }
            ReportKind::Underwriting => {
                headers.extend(self.categories.iter().map(|c| c.to_string()));
                headers.push(self.metric_label());
            }
        }
        headers.push("Deviation".to_string());
        headers
    }

    /// Summary table body, numbers rounded to `decimals` places.
    /// Undefined values render as `NaN` (std dev) or `n/a` (deviation).
    pub fn summary_rows(&self, decimals: usize) -> Vec<Vec<String>> {
        let num = |v: f64| format!("{v:.decimals$}");
        self.groups
            .iter()
            .map(|g| {
                let mut row = vec![g.key.to_string(), g.count.to_string()];
                match &g.stats {
                    GroupStats::Numeric(s) => {
                        row.push(num(s.mean));
                        row.push(num(s.std_dev));
                    }
                    GroupStats::Categorical(s) => {
                        row.extend(self.categories.iter().map(|c| {
                            num(s.categories.get(c).map_or(0.0, |share| share.proportion))
                        }));
                        row.push(num(g.metric));
                    }
                }
                row.push(g.deviation.map_or_else(|| "n/a".to_string(), num));
                row
            })
            .collect()
    }
}

fn collect_issues(population: usize, groups: usize, issues: &mut Vec<DataIssue>) {
    if population == 0 {
        issues.push(DataIssue::NoData);
    } else if groups < 2 {
        issues.push(DataIssue::TooFewGroups { found: groups });
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Pricing disparity: per-group means against the grand mean, tested with
/// Welch (two groups) or ANOVA (three or more).
pub fn pricing_report(table: &Table, request: &PricingRequest) -> Result<DisparityReport> {
    let group_col = request.group_column.as_str();
    let value_col = request.value_column.as_str();
    let group_ty = table.column(group_col)?.ty;
    table.require_type(value_col, ColumnType::Numeric)?;

    if group_ty != ColumnType::Categorical {
        let report = DisparityReport {
            kind: ReportKind::Pricing,
            group_column: group_col.to_string(),
            outcome_column: value_col.to_string(),
            population: 0,
            groups: Vec::new(),
            categories: Vec::new(),
            approved_label: None,
            baseline: None,
            test: None,
            issues: vec![DataIssue::NonCategoricalGrouping {
                column: group_col.to_string(),
            }],
        };
        log_report(&report);
        return Ok(report);
    }

    let filtered = filter(table, &request.filter)?;
    let population_table = project(&filtered, &[group_col, value_col])?;
    let summaries = summarize_numeric(&population_table, group_col, value_col)?;

    let population: usize = summaries.values().map(|s| s.count).sum();
    let baseline = (population > 0)
        .then(|| summaries.values().map(|s| s.sum()).sum::<f64>() / population as f64);

    let test = test_numeric(&summaries);

    let mut issues = Vec::new();
    collect_issues(population, summaries.len(), &mut issues);
    if baseline.is_none() {
        issues.push(DataIssue::BaselineUndefined {
            reason: "no observations".to_string(),
        });
    }
    if test.is_none() && summaries.len() >= 2 {
        issues.push(numeric_test_issue(&summaries));
    }

    let groups = summaries
        .into_iter()
        .map(|(key, s)| GroupRow {
            key,
            count: s.count,
            metric: s.mean,
            deviation: baseline.map(|b| s.mean - b),
            stats: GroupStats::Numeric(s),
        })
        .collect();

    let report = DisparityReport {
        kind: ReportKind::Pricing,
        group_column: group_col.to_string(),
        outcome_column: value_col.to_string(),
        population,
        groups,
        categories: Vec::new(),
        approved_label: None,
        baseline,
        test,
        issues,
    };
    log_report(&report);
    Ok(report)
}

/// Underwriting disparity: per-group approval rates against the pooled
/// approval rate, tested with a chi-square test of independence.
pub fn underwriting_report(
    table: &Table,
    request: &UnderwritingRequest,
    config: &AnalysisConfig,
) -> Result<DisparityReport> {
    let group_col = request.group_column.as_str();
    let outcome_col = request.outcome_column.as_str();
    let label = request.approved_label.as_str();
    table.column_index(group_col)?;
    table.column_index(outcome_col)?;

    let filtered = filter(table, &request.filter)?;
    let population_table = project(&filtered, &[group_col, outcome_col])?;
    let summaries = summarize_categorical(&population_table, group_col, outcome_col)?;

    let categories: Vec<Value> = summaries
        .values()
        .next()
        .map(|s| s.categories.keys().cloned().collect())
        .unwrap_or_default();
    let population: usize = summaries.values().map(|s| s.count).sum();
    let approved: usize = summaries.values().map(|s| s.share_of_label(label).count).sum();

    let mut issues = Vec::new();
    collect_issues(population, summaries.len(), &mut issues);
    if population > 0 && categories.len() < 2 {
        issues.push(DataIssue::TooFewCategories {
            found: categories.len(),
        });
    }

    let baseline = if population == 0 {
        issues.push(DataIssue::BaselineUndefined {
            reason: "no observations".to_string(),
        });
        None
    } else if approved == 0 {
        log::warn!("approved label '{label}' never occurs in '{outcome_col}'");
        issues.push(DataIssue::BaselineUndefined {
            reason: format!("'{label}' never occurs in {outcome_col}"),
        });
        None
    } else {
        Some(approved as f64 / population as f64)
    };

    let test = test_categorical(&summaries, config.yates_correction);
    if test.is_none() && summaries.len() >= 2 && categories.len() >= 2 {
        issues.push(DataIssue::TestUndefined);
    }

    let groups = summaries
        .into_iter()
        .map(|(key, s)| {
            let rate = s.share_of_label(label).proportion;
            GroupRow {
                key,
                count: s.count,
                metric: rate,
                deviation: baseline.map(|b| rate - b),
                stats: GroupStats::Categorical(s),
            }
        })
        .collect();

    let report = DisparityReport {
        kind: ReportKind::Underwriting,
        group_column: group_col.to_string(),
        outcome_column: outcome_col.to_string(),
        population,
        groups,
        categories,
        approved_label: Some(label.to_string()),
        baseline,
        test,
        issues,
    };
    log_report(&report);
    Ok(report)
}

/// Why a numeric test over two or more groups came back empty.
fn numeric_test_issue(summaries: &NumericGroups) -> DataIssue {
    let replicated = summaries.values().any(|s| s.count > 1);
    let constant = summaries
        .values()
        .all(|s| s.count < 2 || s.std_dev == 0.0);
    let mut means = summaries.values().map(|s| s.mean);
    let first = means.next();
    let means_differ = means.any(|m| Some(m) != first);

    if replicated && constant && means_differ {
        DataIssue::NoWithinGroupVariation
    } else {
        DataIssue::TestUndefined
    }
}

fn log_report(report: &DisparityReport) {
    log::info!(
        "{:?} report on {} by {}: {} rows, {} groups, test {}",
        report.kind,
        report.outcome_column,
        report.group_column,
        report.population,
        report.groups.len(),
        report
            .test
            .as_ref()
            .map_or_else(|| "none".to_string(), |t| format!("{} p={:.4}", t.kind, t.p_value))
    );
    for issue in &report.issues {
        log::warn!("{issue}");
    }
}
