use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, report};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct FairLendingApp {
    pub state: AppState,
}

impl FairLendingApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for FairLendingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar + tabs ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: column selectors and filters ----
        egui::SidePanel::left("selection_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: tables, test result, chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            report::central_panel(ui, &mut self.state);
        });
    }
}
