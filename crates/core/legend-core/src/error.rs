//! Error types for the dashboard generation pipeline.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading settings, expanding a spec or compiling it.
#[derive(Error, Debug)]
pub enum LegendError {
    /// Settings could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(String),

    /// Grafana settings are missing one or more values
    #[error(
        "Incomplete legend config, missing {}: please update the legend config file or set env values",
        .missing.join(", ")
    )]
    IncompleteConfig { missing: Vec<String> },

    /// The input spec is structurally invalid
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    /// No metrics template exists for a component
    #[error("Unknown component '{0}': no metrics template in the library")]
    UnknownComponent(String),

    /// No target template exists for a datasource
    #[error("Unknown datasource '{datasource}' used by panel '{panel}'")]
    UnknownDatasource { datasource: String, panel: String },

    /// A template was requested that the library does not hold
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A template failed to parse or render
    #[error("Template error in {name}: {message}")]
    Template { name: String, message: String },

    /// An alert condition query could not be parsed
    #[error("Invalid condition query '{query}': {reason}")]
    ConditionQuery { query: String, reason: String },

    /// The jsonnet binary could not be located
    #[error("Jsonnet compiler '{0}' not found on PATH")]
    CompilerNotFound(String),

    /// The jsonnet binary exited unsuccessfully
    #[error("Jsonnet compilation of {} failed ({status}): {stderr}", .path.display())]
    CompilerFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    /// The jsonnet binary ran past its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LegendError {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a new invalid spec error
    pub fn invalid_spec<T: fmt::Display>(msg: T) -> Self {
        Self::InvalidSpec(msg.to_string())
    }

    /// Create a new condition query error
    pub fn condition_query<Q: fmt::Display, R: fmt::Display>(query: Q, reason: R) -> Self {
        Self::ConditionQuery {
            query: query.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a template error from a rendering failure
    pub fn template<T: fmt::Display>(name: &str, err: T) -> Self {
        Self::Template {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for LegendError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LegendError>;
