/// Export module
///
/// This module turns a project into shareable files:
/// - PDF report with activities and photos (report.rs)
/// - Font metrics used to wrap report text (metrics.rs)
/// - ZIP bundle of the table and image folder (bundle.rs)

pub mod bundle;
pub mod metrics;
pub mod report;
