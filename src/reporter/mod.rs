pub mod json;
pub mod terminal;

use crate::cli::OutputFormat;
use crate::probe::{CheckResult, Job};

pub use json::JsonReporter;
pub use terminal::TerminalReporter;

/// Renders one check result as a single output line.
pub trait Reporter {
    fn report(&self, job: &Job, result: &CheckResult) -> String;
}

/// Reporter for the selected format.
pub fn reporter_for(format: OutputFormat, color: bool) -> Box<dyn Reporter + Send + Sync> {
    match format {
        OutputFormat::Terminal => Box::new(TerminalReporter::new(color)),
        OutputFormat::Json => Box::new(JsonReporter::new()),
    }
}
