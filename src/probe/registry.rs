//! Probe type registry.

use serde_yaml::Mapping;
use std::fmt;
use thiserror::Error;

use super::args::ProbeArgs;
use super::{DnsProbe, HttpProbe, LABEL_KEYS, Labels, MysqlProbe, PingProbe, Probe, TcpProbe};
use crate::config::{GlobalOptions, ProbeSpec};

/// Errors raised while registering probe types or building probe instances.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("probe type '{0}' is already registered")]
    DuplicateProbeType(String),

    #[error("can't find check of type '{0}'")]
    UnknownProbeType(String),

    #[error("probe '{probe}' requires argument '{argument}'")]
    MissingArgument { probe: String, argument: String },

    #[error("invalid argument '{argument}' for probe '{probe}': {message}")]
    InvalidArgument {
        probe: String,
        argument: String,
        message: String,
    },

    #[error("invalid {probe} target '{literal}': {message}")]
    InvalidTarget {
        probe: String,
        literal: String,
        message: String,
    },
}

/// Constructor of a probe from its filtered arguments.
pub type BuildFn = fn(ProbeArgs) -> Result<Box<dyn Probe>, RegistryError>;

/// Parser of the literal target syntax accepted by a probe's CLI flag.
pub type TargetFn = fn(&str) -> Result<Mapping, String>;

/// Static description of one probe type.
#[derive(Debug, Clone, Copy)]
pub struct ProbeKind {
    pub name: &'static str,
    pub help: &'static str,
    /// Every argument the probe recognizes. Anything else is dropped before
    /// construction.
    pub parameters: &'static [&'static str],
    pub constructor: BuildFn,
    pub parse_target: TargetFn,
}

impl ProbeKind {
    /// Declared parameters that are exported as metric labels.
    pub fn label_names(&self) -> Vec<&'static str> {
        self.parameters
            .iter()
            .copied()
            .filter(|p| LABEL_KEYS.contains(p))
            .collect()
    }

    /// Filter `merged` down to the declared, truthy parameters and build.
    pub fn build(&self, merged: &Mapping) -> Result<Box<dyn Probe>, RegistryError> {
        (self.constructor)(ProbeArgs::filter(self.name, merged, self.parameters))
    }

    /// Parse one CLI literal (e.g. `8.8.8.8:53` for tcp) into a spec.
    pub fn target_spec(&self, literal: &str) -> Result<ProbeSpec, RegistryError> {
        let args = (self.parse_target)(literal).map_err(|message| RegistryError::InvalidTarget {
            probe: self.name.to_string(),
            literal: literal.to_string(),
            message,
        })?;
        Ok(ProbeSpec::new(self.name, args))
    }
}

/// A probe instance ready to run, tagged with its type name.
pub struct Job {
    kind: &'static str,
    probe: Box<dyn Probe>,
}

impl Job {
    pub fn new(kind: &'static str, probe: Box<dyn Probe>) -> Self {
        Self { kind, probe }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn probe(&self) -> &dyn Probe {
        self.probe.as_ref()
    }

    pub fn labels(&self) -> Labels {
        self.probe.labels()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("kind", &self.kind)
            .field("probe", &self.probe)
            .finish()
    }
}

/// Mapping from probe type name to its [`ProbeKind`], in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    kinds: Vec<ProbeKind>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in probe type.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for kind in [
            HttpProbe::KIND,
            DnsProbe::KIND,
            PingProbe::KIND,
            TcpProbe::KIND,
            MysqlProbe::KIND,
        ] {
            registry.register(kind)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, kind: ProbeKind) -> Result<(), RegistryError> {
        if self.get(kind.name).is_some() {
            return Err(RegistryError::DuplicateProbeType(kind.name.to_string()));
        }
        self.kinds.push(kind);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ProbeKind> {
        self.kinds.iter().find(|k| k.name == name)
    }

    pub fn lookup(&self, name: &str) -> Result<&ProbeKind, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownProbeType(name.to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ProbeKind> {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Build a job from a spec. Spec arguments override global options of
    /// the same name.
    pub fn instantiate(
        &self,
        spec: &ProbeSpec,
        globals: &GlobalOptions,
    ) -> Result<Job, RegistryError> {
        let kind = self.lookup(&spec.kind)?;
        let mut merged = globals.as_mapping().clone();
        for (key, value) in &spec.args {
            merged.insert(key.clone(), value.clone());
        }
        let probe = kind.build(&merged)?;
        Ok(Job::new(kind.name, probe))
    }

    pub fn instantiate_all(
        &self,
        specs: &[ProbeSpec],
        globals: &GlobalOptions,
    ) -> Result<Vec<Job>, RegistryError> {
        specs
            .iter()
            .map(|spec| self.instantiate(spec, globals))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{StaticProbe, static_kind};

    fn spec(yaml: &str) -> ProbeSpec {
        let mapping: Mapping = serde_yaml::from_str(yaml).unwrap();
        ProbeSpec::from_leaf(&mapping).unwrap()
    }

    #[test]
    fn test_builtin_registry_names() {
        let registry = Registry::builtin().unwrap();
        let names: Vec<_> = registry.kinds().map(|k| k.name).collect();
        assert_eq!(names, vec!["http", "dns", "ping", "tcp", "mysql"]);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = Registry::builtin().unwrap();
        let err = registry.register(TcpProbe::KIND).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateProbeType(name) if name == "tcp"));
    }

    #[test]
    fn test_instantiate_unknown_type() {
        let registry = Registry::builtin().unwrap();
        let err = registry
            .instantiate(&spec("type: smtp\nhost: mail"), &GlobalOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownProbeType(ref name) if name == "smtp"));
        assert_eq!(err.to_string(), "can't find check of type 'smtp'");
    }

    #[test]
    fn test_instantiate_spec_overrides_globals() {
        let mut registry = Registry::new();
        registry.register(static_kind()).unwrap();

        let globals = GlobalOptions::from_mapping(
            serde_yaml::from_str("name: global\nhost: shared").unwrap(),
        );
        let job = registry
            .instantiate(&spec("type: static\nname: local"), &globals)
            .unwrap();
        assert_eq!(job.kind(), "static");
        let labels = job.labels();
        assert_eq!(labels["name"], "local");
        assert_eq!(labels["host"], "shared");
    }

    #[test]
    fn test_instantiate_missing_required_argument() {
        let registry = Registry::builtin().unwrap();
        let err = registry
            .instantiate(&spec("type: tcp\nhost: 8.8.8.8"), &GlobalOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingArgument { ref argument, .. } if argument == "port"));
    }

    #[test]
    fn test_label_names_follow_declared_parameters() {
        assert_eq!(TcpProbe::KIND.label_names(), vec!["host", "port"]);
        assert_eq!(HttpProbe::KIND.label_names(), vec!["url"]);
        assert_eq!(DnsProbe::KIND.label_names(), vec!["name"]);
    }

    #[test]
    fn test_target_spec_invalid_literal() {
        let err = TcpProbe::KIND.target_spec("8.8.8.8").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTarget { .. }));
    }

    #[test]
    fn test_job_debug_includes_kind() {
        let job = Job::new("static", Box::new(StaticProbe::ok("fine")));
        assert!(format!("{:?}", job).contains("static"));
    }
}
