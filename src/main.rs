mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::FairLendingApp;
use eframe::egui;
use fair_lending::config::AnalysisConfig;
use state::{AppState, Tab};

/// Usage: `fair-lending [PRICING_FILE] [UNDERWRITING_FILE]`
fn main() -> eframe::Result {
    env_logger::init();

    let config = match AnalysisConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Ignoring configuration: {e:#}");
            AnalysisConfig::default()
        }
    };

    let mut state = AppState::new(config);
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    if let Some(path) = args.next() {
        ui::panels::load_into(&mut state, Tab::Pricing, &path);
    }
    if let Some(path) = args.next() {
        ui::panels::load_into(&mut state, Tab::Underwriting, &path);
    }
    state.tab = Tab::Pricing;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Fair Lending Analysis Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(FairLendingApp::new(state)))),
    )
}
