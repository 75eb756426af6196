//! Disparity analysis engine.
//!
//! ```text
//!   Table ──filter/project──▶ summary ──▶ significance ──▶ report
//! ```
//!
//! Everything in here is a pure function of its inputs.

pub mod report;
pub mod significance;
pub mod summary;

pub use report::{
    DataIssue, DisparityReport, GroupRow, GroupStats, PricingRequest, ReportKind,
    UnderwritingRequest, pricing_report, underwriting_report,
};
pub use significance::{ContingencyTable, TestDetail, TestKind, TestResult};
pub use summary::{CategoricalGroups, NumericGroups, summarize_categorical, summarize_numeric};
