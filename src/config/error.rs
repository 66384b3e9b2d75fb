//! Configuration error types.

/// Configuration loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config from stdin: {0}")]
    ReadStdin(#[source] std::io::Error),

    #[error("Failed to parse YAML config {path}: {source}")]
    ParseYaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config {path}: {message}")]
    InvalidDocument { path: String, message: String },

    #[error("Invalid check entry in {path}: {message}")]
    InvalidCheck { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(path: &str, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_check(path: &str, message: impl Into<String>) -> Self {
        Self::InvalidCheck {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
