use serde::Serialize;
use std::time::Duration;

use crate::probe::Status;

/// Counts of one execution round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub ok: usize,
    pub warn: usize,
    pub err: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RoundSummary {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Ok => self.ok += 1,
            Status::Warn => self.warn += 1,
            Status::Err => self.err += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.warn + self.err
    }

    /// 1 if any check failed, 0 otherwise. Warnings do not fail a round.
    pub fn exit_code(&self) -> i32 {
        if self.err > 0 { 1 } else { 0 }
    }
}
