use crate::probe::{CheckResult, Job, Status};
use crate::reporter::Reporter;
use colored::Colorize;

pub struct TerminalReporter {
    color: bool,
}

impl TerminalReporter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Tag padded to a fixed width so messages line up.
    fn tag(&self, status: Status) -> String {
        let padded = format!("{:<8}", format!("[{}]", status.tag()));
        if !self.color {
            return padded;
        }
        match status {
            Status::Ok => padded.green().to_string(),
            Status::Warn => padded.yellow().to_string(),
            Status::Err => padded.red().to_string(),
        }
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, _job: &Job, result: &CheckResult) -> String {
        format!("{} {}", self.tag(result.status()), result.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::StaticProbe;

    fn render(result: CheckResult) -> String {
        let job = Job::new("static", Box::new(StaticProbe::new(result.clone())));
        TerminalReporter::new(false).report(&job, &result)
    }

    #[test]
    fn test_plain_tags_are_aligned() {
        assert_eq!(render(CheckResult::ok("up")), "[OK]     up");
        assert_eq!(render(CheckResult::warn("lossy")), "[WARN]   lossy");
        assert_eq!(render(CheckResult::err("down")), "[ERROR]  down");
    }

    #[test]
    fn test_colored_output_keeps_message() {
        let result = CheckResult::err("down");
        let job = Job::new("static", Box::new(StaticProbe::new(result.clone())));
        let line = TerminalReporter::new(true).report(&job, &result);
        assert!(line.contains("[ERROR]"));
        assert!(line.ends_with(" down"));
    }
}
