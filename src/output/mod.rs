//! Output formatting module
//!
//! Renders the final report and the live progress marks.

mod formatter;
mod progress;

pub use formatter::ReportFormatter;
pub use progress::ProgressPrinter;
