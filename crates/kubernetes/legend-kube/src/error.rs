//! Error types for ServiceLevel rendering and push

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SloError {
    #[error("Failed to render ServiceLevel: {0}")]
    Render(#[from] legend_core::LegendError),

    #[error("Rendered ServiceLevel is not a valid object: {0}")]
    Manifest(#[from] serde_yaml::Error),

    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

pub type Result<T> = std::result::Result<T, SloError>;
