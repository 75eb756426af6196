use std::collections::BTreeSet;

use fair_lending::analysis::{
    DisparityReport, PricingRequest, ReportKind, UnderwritingRequest, pricing_report,
    underwriting_report,
};
use fair_lending::chart::{ChartKind, ChartSpec, build_chart_spec, build_chart_spec_as};
use fair_lending::config::AnalysisConfig;
use fair_lending::data::filter::{Filter, Selection};
use fair_lending::data::model::{Table, Value};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Per-analysis state
// ---------------------------------------------------------------------------

/// Everything one tab (pricing or underwriting) needs, independent of rendering.
pub struct AnalysisState {
    pub kind: ReportKind,

    /// Loaded dataset (None until the user loads a file).
    pub dataset: Option<Table>,

    /// File name shown in the header.
    pub source: Option<String>,

    pub group_column: Option<String>,
    pub outcome_column: Option<String>,

    /// Outcome category counted as an approval (underwriting tab).
    pub approved_label: String,

    /// Row filters: loan type, purpose, demographic categories.
    pub filters: Filter,

    /// Chart style picked by the analyst; `None` uses the report default.
    pub chart_kind: Option<ChartKind>,

    /// Latest analysis (cached until a selection changes).
    pub report: Option<DisparityReport>,
    pub chart: Option<ChartSpec>,
    pub color_map: Option<ColorMap>,

    /// Structural error from the last analysis (bad column choice).
    pub error: Option<String>,
}

impl AnalysisState {
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            dataset: None,
            source: None,
            group_column: None,
            outcome_column: None,
            approved_label: String::new(),
            filters: Filter::new(),
            chart_kind: None,
            report: None,
            chart: None,
            color_map: None,
            error: None,
        }
    }

    /// Ingest a newly loaded dataset, pick default columns and run the analysis.
    pub fn set_dataset(&mut self, dataset: Table, source: String, config: &AnalysisConfig) {
        let categorical = dataset.categorical_columns();

        self.group_column = categorical.first().cloned();
        self.outcome_column = match self.kind {
            ReportKind::Pricing => dataset.numeric_columns().first().cloned(),
            ReportKind::Underwriting => categorical
                .iter()
                .rev()
                .find(|c| Some(*c) != self.group_column.as_ref())
                .cloned(),
        };

        self.filters = config
            .filter_columns
            .iter()
            .filter(|c| dataset.column_index(c).is_ok())
            .map(|c| (c.clone(), Selection::All))
            .collect();

        self.dataset = Some(dataset);
        self.source = Some(source);
        self.approved_label = config.approved_label.clone();
        self.recompute(config);
    }

    /// Columns offered as filters: the configured ones plus the group column.
    pub fn filter_columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = self.filters.keys().cloned().collect();
        if let Some(group) = &self.group_column {
            if !cols.contains(group) {
                cols.push(group.clone());
            }
        }
        cols
    }

    pub fn set_group_column(&mut self, col: String, config: &AnalysisConfig) {
        self.group_column = Some(col);
        self.recompute(config);
    }

    pub fn set_outcome_column(&mut self, col: String, config: &AnalysisConfig) {
        self.outcome_column = Some(col);
        self.approved_label = config.approved_label.clone();
        self.recompute(config);
    }

    pub fn set_approved_label(&mut self, label: String, config: &AnalysisConfig) {
        self.approved_label = label;
        self.recompute(config);
    }

    /// Outcome categories the analyst can mark as the approval.
    pub fn outcome_categories(&self) -> Vec<String> {
        self.outcome_column
            .as_deref()
            .and_then(|col| self.unique_values(col))
            .map(|vals| vals.iter().map(|v| v.to_string()).collect())
            .unwrap_or_default()
    }

    pub fn set_chart_kind(&mut self, kind: Option<ChartKind>, config: &AnalysisConfig) {
        self.chart_kind = kind;
        self.rebuild_chart(config);
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &Value, config: &AnalysisConfig) {
        let Some(all_vals) = self.unique_values(column) else {
            return;
        };
        let selection = self.filters.entry(column.to_string()).or_default();
        let mut selected = match selection {
            Selection::All => all_vals.clone(),
            Selection::OneOf(set) => set.clone(),
        };
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        *selection = if selected == all_vals {
            Selection::All
        } else {
            Selection::OneOf(selected)
        };
        self.recompute(config);
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str, config: &AnalysisConfig) {
        self.filters.insert(column.to_string(), Selection::All);
        self.recompute(config);
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str, config: &AnalysisConfig) {
        self.filters
            .insert(column.to_string(), Selection::OneOf(BTreeSet::new()));
        self.recompute(config);
    }

    pub fn unique_values(&self, column: &str) -> Option<BTreeSet<Value>> {
        self.dataset.as_ref()?.unique_values(column).ok()
    }

    /// Re-run the analysis for the current selections.
    pub fn recompute(&mut self, config: &AnalysisConfig) {
        self.report = None;
        self.chart = None;
        self.color_map = None;
        self.error = None;

        let (Some(ds), Some(group), Some(outcome)) =
            (&self.dataset, &self.group_column, &self.outcome_column)
        else {
            return;
        };

        let result = match self.kind {
            ReportKind::Pricing => pricing_report(
                ds,
                &PricingRequest::new(group, outcome).with_filter(self.filters.clone()),
            ),
            ReportKind::Underwriting => underwriting_report(
                ds,
                &UnderwritingRequest::new(group, outcome, self.approved_label.as_str())
                    .with_filter(self.filters.clone()),
                config,
            ),
        };

        match result {
            Ok(report) => {
                self.report = Some(report);
                self.rebuild_chart(config);
            }
            Err(e) => {
                log::warn!("analysis failed: {e}");
                self.error = Some(e.to_string());
            }
        }
    }

    fn rebuild_chart(&mut self, config: &AnalysisConfig) {
        let Some(report) = &self.report else {
            return;
        };
        let spec = match self.chart_kind {
            Some(kind) => build_chart_spec_as(report, kind, config),
            None => build_chart_spec(report, config),
        };
        let labels: Vec<String> = match spec.kind {
            ChartKind::StackedBar => spec.series.iter().map(|s| s.name.clone()).collect(),
            _ => spec.categories.clone(),
        };
        self.color_map = Some(ColorMap::new(&labels));
        self.chart = Some(spec);
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Pricing,
    Underwriting,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AnalysisConfig,
    pub tab: Tab,
    pub pricing: AnalysisState,
    pub underwriting: AnalysisState,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            tab: Tab::Pricing,
            pricing: AnalysisState::new(ReportKind::Pricing),
            underwriting: AnalysisState::new(ReportKind::Underwriting),
            status_message: None,
        }
    }

    /// The analysis behind the active tab, with the shared config.
    pub fn active(&mut self) -> (&mut AnalysisState, &AnalysisConfig) {
        let analysis = match self.tab {
            Tab::Pricing => &mut self.pricing,
            Tab::Underwriting => &mut self.underwriting,
        };
        (analysis, &self.config)
    }

    pub fn set_dataset(&mut self, tab: Tab, dataset: Table, source: String) {
        let analysis = match tab {
            Tab::Pricing => &mut self.pricing,
            Tab::Underwriting => &mut self.underwriting,
        };
        analysis.set_dataset(dataset, source, &self.config);
        self.status_message = None;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fair_lending::data::model::{Column, ColumnType};

    fn pricing_table() -> Table {
        Table::new(
            vec![
                Column::new("Race", ColumnType::Categorical),
                Column::new("LoanType", ColumnType::Categorical),
                Column::new("AIP", ColumnType::Numeric),
            ],
            vec![
                vec!["A".into(), "Auto".into(), Value::Number(4.0)],
                vec!["A".into(), "Mortgage".into(), Value::Number(3.0)],
                vec!["B".into(), "Auto".into(), Value::Number(5.0)],
                vec!["B".into(), "Mortgage".into(), Value::Number(4.5)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn loading_picks_default_columns_and_runs() {
        let mut state = AppState::default();
        state.set_dataset(Tab::Pricing, pricing_table(), "p.csv".into());
        let p = &state.pricing;
        assert_eq!(p.group_column.as_deref(), Some("Race"));
        assert_eq!(p.outcome_column.as_deref(), Some("AIP"));
        assert!(p.filters.contains_key("LoanType"));
        assert_eq!(p.report.as_ref().unwrap().population, 4);
        assert!(p.chart.is_some());
    }

    #[test]
    fn toggling_filters_round_trips_to_all() {
        let mut state = AppState::default();
        state.set_dataset(Tab::Pricing, pricing_table(), "p.csv".into());
        let (p, config) = state.active();
        let auto = Value::text("Auto");

        p.toggle_filter_value("LoanType", &auto, config);
        assert_eq!(p.report.as_ref().unwrap().population, 2);

        p.toggle_filter_value("LoanType", &auto, config);
        assert_eq!(p.filters["LoanType"], Selection::All);
        assert_eq!(p.report.as_ref().unwrap().population, 4);
    }

    #[test]
    fn select_none_leaves_no_data() {
        let mut state = AppState::default();
        state.set_dataset(Tab::Pricing, pricing_table(), "p.csv".into());
        let (p, config) = state.active();
        p.select_none("LoanType", config);
        assert!(p.report.as_ref().unwrap().is_empty());
    }

    fn coded_decisions() -> Table {
        Table::new(
            vec![
                Column::new("Sex", ColumnType::Categorical),
                Column::new("Decision", ColumnType::Categorical),
            ],
            vec![
                vec!["F".into(), "Y".into()],
                vec!["F".into(), "N".into()],
                vec!["M".into(), "Y".into()],
                vec!["M".into(), "Y".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn approved_category_can_be_picked_from_the_outcome() {
        let mut state = AppState::default();
        state.set_dataset(Tab::Underwriting, coded_decisions(), "uw.csv".into());
        state.tab = Tab::Underwriting;
        let (uw, config) = state.active();
        assert_eq!(uw.outcome_column.as_deref(), Some("Decision"));
        assert_eq!(uw.approved_label, "Approved");
        assert!(uw.report.as_ref().unwrap().baseline.is_none());

        assert_eq!(uw.outcome_categories(), vec!["N", "Y"]);
        uw.set_approved_label("Y".into(), config);
        let report = uw.report.as_ref().unwrap();
        assert!((report.baseline.unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(report.approved_label.as_deref(), Some("Y"));
    }

    #[test]
    fn bad_outcome_column_reports_error() {
        let mut state = AppState::default();
        state.set_dataset(Tab::Pricing, pricing_table(), "p.csv".into());
        let (p, config) = state.active();
        p.set_outcome_column("LoanType".into(), config);
        assert!(p.report.is_none());
        assert!(p.error.is_some());
    }
}
