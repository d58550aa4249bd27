//! ServiceLevel rendering and push

use crate::{Result, DEFAULT_NAMESPACE, DEFAULT_PROMETHEUS_ADDRESS, GROUP, KIND, PLURAL, VERSION};
use async_trait::async_trait;
use indexmap::IndexMap;
use kube::api::{Api, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use legend_core::library::SLO_TEMPLATE;
use legend_core::{InputSpec, SloObjective, TemplateLibrary};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Serialize)]
struct ServiceLevelData<'a> {
    name: String,
    namespace: &'a str,
    service: &'a str,
    prometheus_address: &'a str,
    labels: &'a IndexMap<String, String>,
    objectives: &'a [SloObjective],
}

/// A rendered ServiceLevel ready to be created
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceLevelManifest {
    pub name: String,
    pub namespace: String,
    pub yaml: String,
}

impl ServiceLevelManifest {
    /// Parse the rendered YAML into an untyped object.
    pub fn to_object(&self) -> Result<DynamicObject> {
        Ok(serde_yaml::from_str(&self.yaml)?)
    }
}

/// Render the spec's `slo` section, `None` when the spec has none.
pub fn render_service_level(
    spec: &InputSpec,
    library: &TemplateLibrary,
) -> Result<Option<ServiceLevelManifest>> {
    let Some(slo) = &spec.slo else {
        return Ok(None);
    };

    let name = slo
        .name
        .clone()
        .unwrap_or_else(|| resource_name(&spec.service));
    let namespace = slo.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
    let data = ServiceLevelData {
        name: name.clone(),
        namespace,
        service: &spec.service,
        prometheus_address: slo
            .prometheus_address
            .as_deref()
            .unwrap_or(DEFAULT_PROMETHEUS_ADDRESS),
        labels: &slo.labels,
        objectives: &slo.objectives,
    };

    let yaml = library.render(SLO_TEMPLATE, &data)?;
    debug!(name = %name, namespace, "Rendered ServiceLevel");
    Ok(Some(ServiceLevelManifest {
        name,
        namespace: namespace.to_string(),
        yaml,
    }))
}

/// Kubernetes object names: lower-case alphanumerics and '-'
fn resource_name(service: &str) -> String {
    let mut name = String::with_capacity(service.len());
    for c in service.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }
    name.trim_matches('-').chars().take(63).collect()
}

/// Where ServiceLevel objects are created
#[async_trait]
pub trait ServiceLevelApi: Send + Sync {
    async fn create(&self, namespace: &str, object: &DynamicObject) -> Result<()>;
}

/// [`ServiceLevelApi`] backed by the cluster in the default kube config
pub struct KubeServiceLevelApi {
    client: Client,
}

impl KubeServiceLevelApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the local kube config or in-cluster environment.
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn resource() -> ApiResource {
        let gvk = GroupVersionKind::gvk(GROUP, VERSION, KIND);
        ApiResource::from_gvk_with_plural(&gvk, PLURAL)
    }
}

#[async_trait]
impl ServiceLevelApi for KubeServiceLevelApi {
    async fn create(&self, namespace: &str, object: &DynamicObject) -> Result<()> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &Self::resource());
        api.create(&PostParams::default(), object).await?;
        Ok(())
    }
}

/// Result of pushing a ServiceLevel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SloOutcome {
    Applied { name: String, namespace: String },
    Skipped { reason: String },
}

/// Create `manifest` through `api`; failures are logged and reported as
/// [`SloOutcome::Skipped`].
pub async fn apply_service_level<A>(api: &A, manifest: &ServiceLevelManifest) -> SloOutcome
where
    A: ServiceLevelApi + ?Sized,
{
    let result = async {
        let object = manifest.to_object()?;
        api.create(&manifest.namespace, &object).await
    }
    .await;

    match result {
        Ok(()) => {
            info!(name = %manifest.name, namespace = %manifest.namespace, "Applied ServiceLevel");
            SloOutcome::Applied {
                name: manifest.name.clone(),
                namespace: manifest.namespace.clone(),
            }
        }
        Err(err) => {
            info!(error = %err, "Failed to apply slo component, crd object not present");
            SloOutcome::Skipped {
                reason: err.to_string(),
            }
        }
    }
}

/// Connect to the default cluster and apply `manifest`.
pub async fn push_service_level(manifest: &ServiceLevelManifest) -> SloOutcome {
    match KubeServiceLevelApi::try_default().await {
        Ok(api) => apply_service_level(&api, manifest).await,
        Err(err) => {
            info!(error = %err, "Failed to apply slo component, no cluster available");
            SloOutcome::Skipped {
                reason: err.to_string(),
            }
        }
    }
}
