use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use fair_lending::analysis::ReportKind;
use fair_lending::chart::ChartKind;
use fair_lending::config::AnalysisConfig;
use fair_lending::data::filter::Selection;

use crate::state::{AnalysisState, AppState, Tab};

// ---------------------------------------------------------------------------
// Left side panel – column selectors and filter widgets
// ---------------------------------------------------------------------------

/// Render the left selection panel for the active tab.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    let (analysis, config) = state.active();

    ui.heading("Analysis");
    ui.separator();

    let Some(dataset) = &analysis.dataset else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let (group_columns, outcome_columns) = match analysis.kind {
        ReportKind::Pricing => (dataset.categorical_columns(), dataset.numeric_columns()),
        ReportKind::Underwriting => (dataset.column_names(), dataset.column_names()),
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Column selectors ----
            ui.strong("Grouping column (e.g. Race, Sex)");
            let current_group = analysis.group_column.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("group_column")
                .selected_text(&current_group)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &group_columns {
                        if ui.selectable_label(current_group == *col, col).clicked() {
                            analysis.set_group_column(col.clone(), config);
                        }
                    }
                });

            let outcome_hint = match analysis.kind {
                ReportKind::Pricing => "Numeric column (e.g. Rate, APR)",
                ReportKind::Underwriting => "Outcome column (e.g. Approved, Denied)",
            };
            ui.strong(outcome_hint);
            let current_outcome = analysis.outcome_column.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("outcome_column")
                .selected_text(&current_outcome)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &outcome_columns {
                        if ui.selectable_label(current_outcome == *col, col).clicked() {
                            analysis.set_outcome_column(col.clone(), config);
                        }
                    }
                });

            if analysis.kind == ReportKind::Underwriting {
                approved_label_selector(ui, analysis, config);
            }

            chart_kind_selector(ui, analysis, config);
            ui.separator();

            // ---- Per-column filter widgets (collapsible) ----
            ui.strong("Filters");
            for col in analysis.filter_columns() {
                let Some(all_values) = analysis.unique_values(&col) else {
                    continue;
                };

                let selection = analysis.filters.get(&col).cloned().unwrap_or_default();

                // Show count of selected / total in the header
                let n_total = all_values.len();
                let n_selected = match &selection {
                    Selection::All => n_total,
                    Selection::OneOf(set) => set.len(),
                };
                let header_text = format!("{col}  ({n_selected}/{n_total})");

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(&col)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                analysis.select_all(&col, config);
                            }
                            if ui.small_button("None").clicked() {
                                analysis.select_none(&col, config);
                            }
                        });

                        for val in &all_values {
                            let mut checked = selection.accepts(val);
                            if ui.checkbox(&mut checked, val.to_string()).changed() {
                                analysis.toggle_filter_value(&col, val, config);
                            }
                        }
                    });
            }
        });
}

fn approved_label_selector(
    ui: &mut Ui,
    analysis: &mut AnalysisState,
    config: &AnalysisConfig,
) {
    ui.strong("Approved outcome");
    let current = analysis.approved_label.clone();
    egui::ComboBox::from_id_salt("approved_label")
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            for category in analysis.outcome_categories() {
                if ui.selectable_label(current == category, &category).clicked() {
                    analysis.set_approved_label(category, config);
                }
            }
        });
}

fn chart_kind_selector(
    ui: &mut Ui,
    analysis: &mut AnalysisState,
    config: &AnalysisConfig,
) {
    let default_label = match analysis.kind {
        ReportKind::Pricing => "Box plot",
        ReportKind::Underwriting => "Stacked bars",
    };
    ui.strong("Chart");
    ui.horizontal(|ui: &mut Ui| {
        if ui
            .selectable_label(analysis.chart_kind.is_none(), default_label)
            .clicked()
        {
            analysis.set_chart_kind(None, config);
        }
        if ui
            .selectable_label(
                analysis.chart_kind == Some(ChartKind::GroupedBar),
                "Group bars",
            )
            .clicked()
        {
            analysis.set_chart_kind(Some(ChartKind::GroupedBar), config);
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open pricing data…").clicked() {
                open_file_dialog(state, Tab::Pricing);
                ui.close_menu();
            }
            if ui.button("Open underwriting data…").clicked() {
                open_file_dialog(state, Tab::Underwriting);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.selectable_value(&mut state.tab, Tab::Pricing, "Price Testing");
        ui.selectable_value(&mut state.tab, Tab::Underwriting, "Credit Decision Testing");

        ui.separator();

        let (analysis, _) = state.active();
        if let (Some(ds), Some(src)) = (&analysis.dataset, &analysis.source) {
            let visible = analysis.report.as_ref().map_or(0, |r| r.population);
            ui.label(format!("{src}: {} rows loaded, {visible} analysed", ds.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState, tab: Tab) {
    let file = rfd::FileDialog::new()
        .set_title("Open loan data")
        .add_filter(
            "Supported files",
            &["csv", "xlsx", "xls", "xlsm", "ods", "json", "parquet", "pq"],
        )
        .add_filter("CSV", &["csv"])
        .add_filter("Excel", &["xlsx", "xls", "xlsm", "ods"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        load_into(state, tab, &path);
    }
}

/// Load `path` into the given tab, reporting failures in the status line.
pub fn load_into(state: &mut AppState, tab: Tab, path: &Path) {
    match fair_lending::data::loader::load_file(path) {
        Ok(dataset) => {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            state.set_dataset(tab, dataset, source);
            state.tab = tab;
        }
        Err(e) => {
            log::error!("Failed to load file: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
