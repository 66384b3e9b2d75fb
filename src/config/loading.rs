//! Configuration loading functions.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use super::error::ConfigError;
use super::extract::{extract_specs, specs_from_list};
use super::types::Document;
use crate::probe::Registry;

/// Source name that selects standard input.
pub const STDIN_SOURCE: &str = "-";

const OPTIONS_KEY: &str = "options";
const CHECKS_KEY: &str = "checks";

/// Read the raw YAML text from a file path or, for `-`, standard input.
pub fn read_source(source: &str) -> Result<String, ConfigError> {
    if source == STDIN_SOURCE {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .map_err(ConfigError::ReadStdin)?;
        return Ok(content);
    }

    fs::read_to_string(Path::new(source)).map_err(|e| ConfigError::ReadFile {
        path: source.to_string(),
        source: e,
    })
}

impl Document {
    /// Load a check document from a file path or `-` for stdin.
    pub fn load(source: &str, registry: &Registry) -> Result<Self, ConfigError> {
        let content = read_source(source)?;
        Self::parse(source, &content, registry)
    }

    /// Parse a check document. `path` only labels error messages.
    pub fn parse(path: &str, content: &str, registry: &Registry) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: path.to_string(),
            source: e,
        })?;

        let mut root = match root {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => return Err(ConfigError::invalid(path, "top level must be a mapping")),
        };

        let options = match root.remove(OPTIONS_KEY) {
            None | Some(Value::Null) => Mapping::new(),
            Some(Value::Mapping(options)) => options,
            Some(_) => return Err(ConfigError::invalid(path, "'options' must be a mapping")),
        };

        let checks = match root.remove(CHECKS_KEY) {
            Some(Value::Sequence(entries)) => specs_from_list(&entries, registry),
            Some(nested @ Value::Mapping(_)) => extract_specs(&nested),
            Some(Value::Null) => Ok(Vec::new()),
            Some(_) => {
                return Err(ConfigError::invalid(path, "'checks' must be a list or a mapping"));
            }
            None => extract_specs(&Value::Mapping(root)),
        }
        .map_err(|message| ConfigError::invalid_check(path, message))?;

        tracing::debug!(path, checks = checks.len(), "loaded check document");
        Ok(Self { options, checks })
    }
}
