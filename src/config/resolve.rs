//! Combine CLI, YAML and Kubernetes sources into one check list.

use serde_yaml::Value;

use super::extract::extract_specs;
use super::types::{Document, GlobalOptions, ProbeSpec};
use crate::cli::Cli;
use crate::error::{PipecheckError, Result};
use crate::k8s::{CheckRepository, K8sError, config_from_kubernetes};
use crate::probe::Registry;

/// Checks and options after every source has been applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved {
    pub specs: Vec<ProbeSpec>,
    pub options: GlobalOptions,
}

/// Resolve the full check list for one invocation.
///
/// Specs are concatenated CLI first, then YAML, then Kubernetes. Options
/// are layered built-in defaults, then YAML `options`, then flags given
/// explicitly on the command line.
pub fn resolve(
    cli: &Cli,
    registry: &Registry,
    repository: Option<&dyn CheckRepository>,
) -> Result<Resolved> {
    let mut specs = cli_specs(cli, registry)?;
    let mut options = GlobalOptions::builtin();

    if let Some(source) = &cli.file {
        let document = Document::load(source, registry)?;
        options.merge(&document.options);
        specs.extend(document.checks);
    }

    if let Some(repository) = repository {
        let keyed = config_from_kubernetes(repository, &cli.namespace, cli.selector.as_deref())?;
        let k8s_specs = extract_specs(&Value::Mapping(keyed)).map_err(K8sError::InvalidResource)?;
        tracing::info!(
            namespace = %cli.namespace,
            checks = k8s_specs.len(),
            "loaded checks from Kubernetes"
        );
        specs.extend(k8s_specs);
    }

    options.merge(&cli.global_options());

    // Unknown types are fatal before anything runs.
    for spec in &specs {
        registry.lookup(&spec.kind).map_err(PipecheckError::from)?;
    }

    Ok(Resolved { specs, options })
}

/// Specs from the per-probe target flags, in flag declaration order.
pub fn cli_specs(cli: &Cli, registry: &Registry) -> Result<Vec<ProbeSpec>> {
    let mut specs = Vec::new();
    for (kind, literals) in cli.targets() {
        let kind = registry.lookup(kind)?;
        for literal in literals {
            specs.push(kind.target_spec(literal)?);
        }
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::CheckResource;
    use crate::test_utils::fixtures::FakeRepository;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["pipecheck"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn registry() -> Registry {
        Registry::builtin().unwrap()
    }

    #[test]
    fn test_cli_literal_becomes_spec() {
        let resolved = resolve(&cli(&["--tcp", "8.8.8.8:53"]), &registry(), None).unwrap();
        assert_eq!(resolved.specs.len(), 1);
        let spec = &resolved.specs[0];
        assert_eq!(spec.kind, "tcp");
        assert_eq!(spec.args.get("host"), Some(&Value::from("8.8.8.8")));
        assert_eq!(spec.args.get("port"), Some(&Value::from(53)));
    }

    #[test]
    fn test_builtin_defaults_present() {
        let resolved = resolve(&cli(&[]), &registry(), None).unwrap();
        assert!(resolved.specs.is_empty());
        assert_eq!(resolved.options.get("tcp_timeout"), Some(&Value::from(2.0)));
        assert_eq!(resolved.options.get("http_method"), Some(&Value::from("HEAD")));
        assert_eq!(resolved.options.get("ping_count"), Some(&Value::from(1)));
    }

    #[test]
    fn test_option_layering() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checks.yaml");
        fs::write(
            &path,
            "options:\n  tcp_timeout: 5.0\n  ping_count: 4\nchecks:\n  - ping: 8.8.8.8\n",
        )
        .unwrap();

        let resolved = resolve(
            &cli(&["-f", path.to_str().unwrap(), "--tcp-timeout", "1.5"]),
            &registry(),
            None,
        )
        .unwrap();
        // explicit CLI beats YAML, YAML beats built-in
        assert_eq!(resolved.options.get("tcp_timeout"), Some(&Value::from(1.5)));
        assert_eq!(resolved.options.get("ping_count"), Some(&Value::from(4)));
        assert_eq!(resolved.options.get("http_method"), Some(&Value::from("HEAD")));
    }

    #[test]
    fn test_spec_order_cli_yaml_kubernetes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checks.yaml");
        fs::write(&path, "checks:\n  - ping: yaml.example\n").unwrap();

        let repository = FakeRepository::with(vec![CheckResource::new(
            "a",
            "default",
            serde_json::json!({"k8s": {"type": "ping", "host": "k8s.example"}}),
        )]);
        let resolved = resolve(
            &cli(&["--ping", "cli.example", "-f", path.to_str().unwrap(), "-k"]),
            &registry(),
            Some(&repository),
        )
        .unwrap();
        let hosts: Vec<_> = resolved
            .specs
            .iter()
            .map(|s| s.args.get("host").and_then(Value::as_str).unwrap().to_string())
            .collect();
        assert_eq!(hosts, vec!["cli.example", "yaml.example", "k8s.example"]);
    }

    #[test]
    fn test_unknown_type_in_yaml_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checks.yaml");
        fs::write(&path, "a: {type: smtp, host: mail}\n").unwrap();

        let err = resolve(&cli(&["-f", path.to_str().unwrap()]), &registry(), None).unwrap_err();
        assert_eq!(err.to_string(), "can't find check of type 'smtp'");
    }

    #[test]
    fn test_invalid_cli_literal_is_fatal() {
        let err = resolve(&cli(&["--tcp", "8.8.8.8"]), &registry(), None).unwrap_err();
        assert!(matches!(err, PipecheckError::Registry(_)));
    }

    #[test]
    fn test_kubernetes_crd_missing_is_fatal() {
        let repository = FakeRepository::crd_missing();
        let err = resolve(&cli(&["-k"]), &registry(), Some(&repository)).unwrap_err();
        assert!(matches!(err, PipecheckError::Kubernetes(K8sError::CrdNotInstalled { .. })));
    }
}
