//! Fair lending disparity analysis.
//!
//! Load a loan table, pick a grouping column and an outcome, and get back a
//! [`analysis::DisparityReport`] (group summaries, baseline, deviations and a
//! significance test) plus a [`chart::ChartSpec`] describing how to plot it.

pub mod analysis;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;

pub use error::{AnalysisError, Result};
