use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::time::Instant;
use thiserror::Error;

use super::summary::RoundSummary;
use crate::probe::{CheckResult, Job};

pub const DEFAULT_WORKERS: usize = 10;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Fixed-width pool that runs one round of jobs at a time.
pub struct Engine {
    pool: ThreadPool,
}

impl Engine {
    pub fn new(workers: usize) -> Result<Self, EngineError> {
        if workers == 0 {
            return Err(EngineError::NoWorkers);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pipecheck-worker-{}", i))
            .build()?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every job and hand each result to `on_result` on the calling
    /// thread, in completion order.
    pub fn run<F>(&self, jobs: &[Job], mut on_result: F) -> RoundSummary
    where
        F: FnMut(&Job, &CheckResult),
    {
        let started = Instant::now();
        let (tx, rx) = mpsc::channel();

        let mut summary = self.pool.in_place_scope(move |scope| {
            for (index, job) in jobs.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = invoke_guarded(job);
                    // The receiver outlives the scope.
                    let _ = tx.send((index, result));
                });
            }
            drop(tx);

            let mut summary = RoundSummary::default();
            for (index, result) in rx {
                let job = &jobs[index];
                tracing::debug!(
                    kind = job.kind(),
                    status = %result.status(),
                    "check finished"
                );
                on_result(job, &result);
                summary.record(result.status());
            }
            summary
        });

        summary.elapsed = started.elapsed();
        summary
    }
}

/// Invoke the job's probe, turning a panic into an `Err` result.
fn invoke_guarded(job: &Job) -> CheckResult {
    match panic::catch_unwind(AssertUnwindSafe(|| job.probe().invoke())) {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            tracing::warn!(kind = job.kind(), reason = %reason, "probe panicked");
            CheckResult::err(format!("{} check panicked ({})", job.kind(), reason))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
