use serde::Serialize;

use crate::probe::{CheckResult, Job, Labels, Status};
use crate::reporter::Reporter;

/// One JSON object per line, suitable for log shippers.
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ResultLine<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    status: Status,
    message: &'a str,
    labels: Labels,
}

impl Reporter for JsonReporter {
    fn report(&self, job: &Job, result: &CheckResult) -> String {
        let line = ResultLine {
            kind: job.kind(),
            status: result.status(),
            message: result.message(),
            labels: job.labels(),
        };
        serde_json::to_string(&line)
            .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize result: {}"}}"#, e))
    }
}
