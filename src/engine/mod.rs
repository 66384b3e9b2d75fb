//! Execution engine.
//!
//! Runs a batch of probe jobs on a fixed-width worker pool and streams the
//! results back to the caller as they complete.

mod executor;
mod summary;

pub use executor::{DEFAULT_WORKERS, Engine, EngineError};
pub use summary::RoundSummary;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Job, Status};
    use crate::test_utils::fixtures::StaticProbe;
    use std::time::Duration;

    fn job(probe: StaticProbe) -> Job {
        Job::new("static", Box::new(probe))
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(Engine::new(0), Err(EngineError::NoWorkers)));
    }

    #[test]
    fn test_run_collects_every_result() {
        let engine = Engine::new(4).unwrap();
        let jobs = vec![
            job(StaticProbe::ok("a")),
            job(StaticProbe::warn("b")),
            job(StaticProbe::ok("c")),
        ];

        let mut seen = Vec::new();
        let summary = engine.run(&jobs, |_, result| seen.push(result.message().to_string()));
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(summary.ok, 2);
        assert_eq!(summary.warn, 1);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_any_err_fails_round() {
        let engine = Engine::new(2).unwrap();
        let jobs = vec![job(StaticProbe::ok("up")), job(StaticProbe::err("down"))];
        let summary = engine.run(&jobs, |_, _| {});
        assert_eq!(summary.err, 1);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_results_arrive_in_completion_order() {
        let engine = Engine::new(2).unwrap();
        let jobs = vec![
            job(StaticProbe::ok("slow").with_delay(Duration::from_millis(300))),
            job(StaticProbe::ok("fast")),
        ];
        let mut order = Vec::new();
        engine.run(&jobs, |_, result| order.push(result.message().to_string()));
        assert_eq!(order, vec!["fast", "slow"]);
    }

    #[test]
    fn test_jobs_run_concurrently() {
        let engine = Engine::new(4).unwrap();
        let jobs: Vec<_> = (0..4)
            .map(|_| job(StaticProbe::ok("wait").with_delay(Duration::from_millis(200))))
            .collect();
        let summary = engine.run(&jobs, |_, _| {});
        assert_eq!(summary.total(), 4);
        assert!(summary.elapsed < Duration::from_millis(700));
    }

    #[test]
    fn test_panic_becomes_err_result() {
        let engine = Engine::new(2).unwrap();
        let jobs = vec![job(StaticProbe::panicking()), job(StaticProbe::ok("fine"))];
        let mut messages = Vec::new();
        let summary = engine.run(&jobs, |job, result| {
            if result.status() == Status::Err {
                messages.push(format!("{}: {}", job.kind(), result.message()));
            }
        });
        assert_eq!(summary.err, 1);
        assert_eq!(summary.ok, 1);
        assert!(messages[0].contains("static check panicked"));
        assert!(messages[0].contains("static probe asked to panic"));
    }

    #[test]
    fn test_empty_job_list() {
        let engine = Engine::new(1).unwrap();
        let summary = engine.run(&[], |_, _| panic!("no results expected"));
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(Engine::new(3).unwrap().workers(), 3);
    }
}
