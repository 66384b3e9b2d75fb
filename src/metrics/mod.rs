//! Prometheus state of the most recent result of every check.
//!
//! Each probe type gets a `<type>_check_state` gauge family labelled with the
//! type's label parameters plus the state itself. For one label set exactly
//! one of the `Ok`, `Warn` and `Err` series is 1.

mod server;

pub use server::{DEFAULT_METRICS_PORT, router, serve};

use prometheus::{Encoder, Histogram, HistogramOpts, IntGaugeVec, Opts, TextEncoder};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::probe::{Labels, Registry, Status};

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

struct KindGauge {
    gauge: IntGaugeVec,
    label_names: Vec<&'static str>,
}

type StateKey = (&'static str, Vec<String>);

pub struct MetricState {
    registry: prometheus::Registry,
    kinds: HashMap<&'static str, KindGauge>,
    states: Mutex<HashMap<StateKey, Status>>,
    round_seconds: Histogram,
}

impl MetricState {
    /// Register one gauge family per probe type plus the round timer.
    pub fn new(probes: &Registry) -> Result<Self, MetricsError> {
        let registry = prometheus::Registry::new();
        let mut kinds = HashMap::new();

        for kind in probes.kinds() {
            let state_label = format!("{}_check_state", kind.name);
            let label_names = kind.label_names();
            let mut all_labels: Vec<&str> = label_names.clone();
            all_labels.push(&state_label);

            let gauge = IntGaugeVec::new(
                Opts::new(state_label.clone(), format!("State of check {}", kind.name)),
                &all_labels,
            )?;
            registry.register(Box::new(gauge.clone()))?;
            kinds.insert(kind.name, KindGauge { gauge, label_names });
        }

        let round_seconds = Histogram::with_opts(HistogramOpts::new(
            "checks_processing_seconds",
            "Time spent processing all checks",
        ))?;
        registry.register(Box::new(round_seconds.clone()))?;

        Ok(Self {
            registry,
            kinds,
            states: Mutex::new(HashMap::new()),
            round_seconds,
        })
    }

    /// Record the latest status for one check instance.
    pub fn update(&self, kind: &str, labels: &Labels, status: Status) {
        let Some((name, entry)) = self.kinds.get_key_value(kind) else {
            tracing::warn!(kind, "no metric registered for probe type");
            return;
        };

        let values: Vec<String> = entry
            .label_names
            .iter()
            .map(|label| labels.get(*label).cloned().unwrap_or_default())
            .collect();

        let mut states = self
            .states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for state in Status::ALL {
            let mut label_values: Vec<&str> = values.iter().map(String::as_str).collect();
            label_values.push(state.as_str());
            entry
                .gauge
                .with_label_values(&label_values[..])
                .set(i64::from(state == status));
        }
        states.insert((*name, values), status);
    }

    /// Latest recorded status for a label set.
    pub fn state(&self, kind: &str, labels: &Labels) -> Option<Status> {
        let (name, entry) = self.kinds.get_key_value(kind)?;
        let values: Vec<String> = entry
            .label_names
            .iter()
            .map(|label| labels.get(*label).cloned().unwrap_or_default())
            .collect();
        let states = self
            .states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        states.get(&(*name, values)).copied()
    }

    pub fn observe_round(&self, elapsed: Duration) {
        self.round_seconds.observe(elapsed.as_secs_f64());
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::labels;

    fn state() -> MetricState {
        MetricState::new(&Registry::builtin().unwrap()).unwrap()
    }

    #[test]
    fn test_gauge_families_per_kind() {
        let metrics = state();
        metrics.update(
            "tcp",
            &labels([("host", "8.8.8.8"), ("port", "53")]),
            Status::Ok,
        );
        let text = metrics.render().unwrap();
        assert!(text.contains("# HELP tcp_check_state State of check tcp"));
        assert!(text.contains(
            r#"tcp_check_state{host="8.8.8.8",port="53",tcp_check_state="Ok"} 1"#
        ));
        assert!(text.contains(
            r#"tcp_check_state{host="8.8.8.8",port="53",tcp_check_state="Err"} 0"#
        ));
    }

    #[test]
    fn test_state_transition_is_exclusive() {
        let metrics = state();
        let labels = labels([("url", "https://example.com")]);
        metrics.update("http", &labels, Status::Ok);
        metrics.update("http", &labels, Status::Warn);

        assert_eq!(metrics.state("http", &labels), Some(Status::Warn));
        let text = metrics.render().unwrap();
        assert!(text.contains(r#"http_check_state{http_check_state="Warn",url="https://example.com"} 1"#));
        assert!(text.contains(r#"http_check_state{http_check_state="Ok",url="https://example.com"} 0"#));
    }

    #[test]
    fn test_missing_label_is_empty() {
        let metrics = state();
        metrics.update("mysql", &labels([("host", "db")]), Status::Err);
        assert_eq!(
            metrics.state("mysql", &labels([("host", "db"), ("port", "")])),
            Some(Status::Err)
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        let metrics = state();
        metrics.update("smtp", &Labels::new(), Status::Ok);
        assert_eq!(metrics.state("smtp", &Labels::new()), None);
    }

    #[test]
    fn test_round_histogram() {
        let metrics = state();
        metrics.observe_round(Duration::from_millis(250));
        let text = metrics.render().unwrap();
        assert!(text.contains("checks_processing_seconds_count 1"));
        assert!(text.contains("checks_processing_seconds_sum 0.25"));
    }
}
