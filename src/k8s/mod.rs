//! Checks defined as Kubernetes custom resources.
//!
//! Each `Check` resource (`checks.pipecheck.r3i.at/v1alpha1`) carries check
//! leaves somewhere in its `spec`. Leaves of all listed resources are merged
//! by the key they were found under, so a later resource overrides an earlier
//! one that uses the same key.

mod client;

pub use client::KubeRepository;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::config::{deep_merge, extract_keyed_leaves};

pub const GROUP: &str = "pipecheck.r3i.at";
pub const VERSION: &str = "v1alpha1";
pub const KIND: &str = "Check";
pub const PLURAL: &str = "checks";

#[derive(Error, Debug)]
pub enum K8sError {
    #[error("Failed to start Kubernetes client runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(
        "No Kubernetes credentials found (in-cluster: {in_cluster}; kubeconfig: {kubeconfig})"
    )]
    NoCredentials {
        in_cluster: String,
        kubeconfig: String,
    },

    #[error("Failed to create Kubernetes client: {0}")]
    Client(#[source] kube::Error),

    #[error(
        "Custom resource definition checks.pipecheck.r3i.at/v1alpha1 is not installed (namespace '{namespace}')"
    )]
    CrdNotInstalled { namespace: String },

    #[error("Failed to list checks in namespace '{namespace}': {source}")]
    List {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("Invalid Check resource: {0}")]
    InvalidResource(String),
}

/// One listed `Check` custom resource.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResource {
    pub name: String,
    pub namespace: String,
    pub spec: serde_json::Value,
}

impl CheckResource {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, spec: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            spec,
        }
    }
}

/// Source of `Check` resources.
pub trait CheckRepository {
    /// List resources in `namespace`, optionally filtered by a label selector.
    /// A missing resource definition is [`K8sError::CrdNotInstalled`], never an
    /// empty list.
    fn list_checks(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<CheckResource>, K8sError>;
}

/// Merge the check leaves of every listed resource, keyed by leaf key.
pub fn config_from_kubernetes(
    repository: &dyn CheckRepository,
    namespace: &str,
    selector: Option<&str>,
) -> Result<Mapping, K8sError> {
    let resources = repository.list_checks(namespace, selector)?;
    tracing::debug!(namespace, count = resources.len(), "listed Check resources");

    let mut merged = Mapping::new();
    for resource in &resources {
        let spec: Value = serde_yaml::to_value(&resource.spec)
            .map_err(|e| K8sError::InvalidResource(format!("{}: {}", resource.name, e)))?;
        let spec = match spec {
            Value::Mapping(spec) => spec,
            Value::Null => {
                tracing::warn!(resource = %resource.name, "Check resource has no spec");
                continue;
            }
            _ => {
                return Err(K8sError::InvalidResource(format!(
                    "{}: spec must be a mapping",
                    resource.name
                )));
            }
        };
        deep_merge(&mut merged, &extract_keyed_leaves(&spec, &resource.name));
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::FakeRepository;
    use serde_json::json;

    fn leaf<'a>(merged: &'a Mapping, key: &str) -> &'a Mapping {
        merged.get(key).and_then(Value::as_mapping).unwrap()
    }

    #[test]
    fn test_later_resource_wins() {
        let repository = FakeRepository::with(vec![
            CheckResource::new(
                "first",
                "default",
                json!({"dns_a": {"type": "dns", "name": "a.example", "ips": ["10.0.0.1"]}}),
            ),
            CheckResource::new(
                "second",
                "default",
                json!({"dns_a": {"type": "dns", "name": "a.example", "ips": ["10.0.0.2"]}}),
            ),
        ]);

        let merged = config_from_kubernetes(&repository, "default", None).unwrap();
        assert_eq!(merged.len(), 1);
        let ips = leaf(&merged, "dns_a").get("ips").unwrap();
        assert_eq!(ips, &Value::Sequence(vec![Value::from("10.0.0.2")]));
    }

    #[test]
    fn test_distinct_keys_are_unioned() {
        let repository = FakeRepository::with(vec![
            CheckResource::new("one", "ns", json!({"web": {"type": "http", "url": "https://a"}})),
            CheckResource::new(
                "two",
                "ns",
                json!({"group": {"db": {"type": "tcp", "host": "db", "port": 5432}}}),
            ),
        ]);
        let merged = config_from_kubernetes(&repository, "ns", None).unwrap();
        let keys: Vec<_> = merged.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["web", "db"]);
    }

    #[test]
    fn test_crd_missing_is_fatal() {
        let repository = FakeRepository::crd_missing();
        let err = config_from_kubernetes(&repository, "default", None).unwrap_err();
        assert!(matches!(err, K8sError::CrdNotInstalled { .. }));
    }

    #[test]
    fn test_selector_is_forwarded() {
        let repository = FakeRepository::with(vec![]);
        config_from_kubernetes(&repository, "monitoring", Some("team=infra")).unwrap();
        assert_eq!(
            repository.last_query(),
            Some(("monitoring".to_string(), Some("team=infra".to_string())))
        );
    }

    #[test]
    fn test_non_mapping_spec_is_invalid() {
        let repository =
            FakeRepository::with(vec![CheckResource::new("bad", "default", json!([1, 2]))]);
        let err = config_from_kubernetes(&repository, "default", None).unwrap_err();
        assert!(matches!(err, K8sError::InvalidResource(_)));
    }

    #[test]
    fn test_null_spec_is_skipped() {
        let repository = FakeRepository::with(vec![CheckResource::new(
            "empty",
            "default",
            serde_json::Value::Null,
        )]);
        assert!(config_from_kubernetes(&repository, "default", None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_crd_error_message() {
        let err = K8sError::CrdNotInstalled {
            namespace: "default".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Custom resource definition checks.pipecheck.r3i.at/v1alpha1 is not installed (namespace 'default')"
        );
    }
}
