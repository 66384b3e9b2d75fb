use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::config::{Config, KubeConfigOptions};
use kube::Client;
use tokio::runtime::{Builder, Runtime};

use super::{CheckRepository, CheckResource, GROUP, K8sError, KIND, PLURAL, VERSION};

/// [`CheckRepository`] backed by the Kubernetes API server.
///
/// The client runs on its own single-threaded runtime; calls block the
/// caller until the API server answers.
pub struct KubeRepository {
    runtime: Runtime,
    client: Client,
}

impl KubeRepository {
    /// Connect with in-cluster credentials, falling back to the local
    /// kubeconfig.
    pub fn connect() -> Result<Self, K8sError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(K8sError::Runtime)?;
        let client = runtime.block_on(async {
            let config = load_config().await?;
            Client::try_from(config).map_err(K8sError::Client)
        })?;
        Ok(Self { runtime, client })
    }

    fn api(&self, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(GROUP, VERSION, KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, PLURAL);
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

async fn load_config() -> Result<Config, K8sError> {
    let in_cluster = match Config::incluster() {
        Ok(config) => {
            tracing::debug!("using in-cluster Kubernetes configuration");
            return Ok(config);
        }
        Err(e) => e,
    };
    tracing::debug!(error = %in_cluster, "in-cluster configuration unavailable, trying kubeconfig");

    Config::from_kubeconfig(&KubeConfigOptions::default())
        .await
        .map_err(|e| K8sError::NoCredentials {
            in_cluster: in_cluster.to_string(),
            kubeconfig: e.to_string(),
        })
}

impl CheckRepository for KubeRepository {
    fn list_checks(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<CheckResource>, K8sError> {
        let mut params = ListParams::default();
        if let Some(selector) = selector {
            params = params.labels(selector);
        }

        let api = self.api(namespace);
        let list = self
            .runtime
            .block_on(api.list(&params))
            .map_err(|e| match e {
                kube::Error::Api(response) if response.code == 404 => K8sError::CrdNotInstalled {
                    namespace: namespace.to_string(),
                },
                other => K8sError::List {
                    namespace: namespace.to_string(),
                    source: other,
                },
            })?;

        Ok(list
            .items
            .into_iter()
            .map(|object| {
                CheckResource::new(
                    object.metadata.name.unwrap_or_default(),
                    object
                        .metadata
                        .namespace
                        .unwrap_or_else(|| namespace.to_string()),
                    object
                        .data
                        .get("spec")
                        .cloned()
                        .unwrap_or(serde_json::Value::Null),
                )
            })
            .collect())
    }
}
