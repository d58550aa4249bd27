//! # Legend Kube
//!
//! Renders a spec's `slo` section into a `ServiceLevel` custom resource
//! (`monitoring.spotahome.com/v1alpha1`) and creates it in the cluster.
//! A cluster without the CRD, or no cluster at all, is not an error: the
//! push is skipped and logged.

pub mod error;
pub mod service_level;

pub use error::{Result, SloError};
pub use service_level::{
    apply_service_level, push_service_level, render_service_level, KubeServiceLevelApi,
    ServiceLevelApi, ServiceLevelManifest, SloOutcome,
};

pub const GROUP: &str = "monitoring.spotahome.com";
pub const VERSION: &str = "v1alpha1";
pub const KIND: &str = "ServiceLevel";
pub const PLURAL: &str = "servicelevels";
pub const DEFAULT_NAMESPACE: &str = "monitoring";
pub const DEFAULT_PROMETHEUS_ADDRESS: &str = "http://prometheus.monitoring.svc:9090";
