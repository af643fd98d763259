//! Output rendering (text report, JSON manifest)

pub mod report;

pub use report::{build_report, ReportEntry, RunReport};
