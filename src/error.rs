use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::k8s::K8sError;
use crate::metrics::MetricsError;
use crate::probe::RegistryError;

/// Fatal errors: any of these stops pipecheck before or instead of a round.
#[derive(Error, Debug)]
pub enum PipecheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Kubernetes(#[from] K8sError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("Failed to start metrics endpoint on port {port}: {source}")]
    MetricsBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipecheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_is_transparent() {
        let err: PipecheckError = RegistryError::UnknownProbeType("smtp".to_string()).into();
        assert_eq!(err.to_string(), "can't find check of type 'smtp'");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: PipecheckError = ConfigError::ReadFile {
            path: "checks.yaml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Failed to read config file checks.yaml: not found"
        );
    }

    #[test]
    fn test_metrics_bind_display() {
        let err = PipecheckError::MetricsBind {
            port: 9000,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to start metrics endpoint on port 9000: address in use"
        );
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: PipecheckError = EngineError::NoWorkers.into();
        assert!(matches!(err, PipecheckError::Engine(_)));
    }
}
