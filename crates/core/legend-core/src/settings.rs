//! Tool settings.
//!
//! Settings are layered: built-in defaults, then an INI file (either the
//! path given on the command line or `$LEGEND_HOME/.legend.cfg`), then
//! environment variables. The file looks like:
//!
//! ```ini
//! [grafana]
//! api_key = eyJrIjoi...
//! host = grafana.example.com
//! protocol = https
//!
//! [legend]
//! jsonnet_bin = /usr/local/bin/jsonnet
//! ```

use crate::{LegendError, Result};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_GRAFONNET_REPO_NAME: &str = "grafonnet-lib";
pub const DEFAULT_GRAFONNET_REPO_URL: &str = "https://github.com/grafana/grafonnet-lib.git";
pub const DEFAULT_GRAFONNET_BRANCH: &str = "master";
pub const DEFAULT_JSONNET_BIN: &str = "jsonnet";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const CONFIG_FILE_NAME: &str = ".legend.cfg";

/// Grafana connection values as read from config and env
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrafanaSettings {
    pub api_key: Option<String>,
    pub host: Option<String>,
    pub protocol: Option<String>,
    pub timeout_secs: u64,
}

/// A complete Grafana endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrafanaEndpoint {
    pub base_url: String,
    pub api_key: String,
}

/// Resolved tool settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub legend_home: PathBuf,
    pub grafonnet_repo_name: String,
    pub grafonnet_repo_url: String,
    pub grafonnet_branch: String,
    pub jsonnet_bin: String,
    pub library_dir: Option<PathBuf>,
    pub grafana: GrafanaSettings,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    grafana: RawGrafana,
    #[serde(default)]
    legend: RawLegend,
}

#[derive(Debug, Default, Deserialize)]
struct RawGrafana {
    api_key: Option<String>,
    host: Option<String>,
    protocol: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLegend {
    jsonnet_bin: Option<String>,
    library_dir: Option<PathBuf>,
    grafonnet_branch: Option<String>,
}

impl Settings {
    /// Load settings, reading `config_file` when given.
    ///
    /// An explicit file must exist; the default `$LEGEND_HOME/.legend.cfg`
    /// is optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let legend_home = resolve_legend_home()?;

        let mut builder = Config::builder();
        match config_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(LegendError::config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), "Loading legend config file");
                builder = builder.add_source(File::from(path).format(FileFormat::Ini).required(true));
            }
            None => {
                let default_path = legend_home.join(CONFIG_FILE_NAME);
                debug!(path = %default_path.display(), "Loading default legend config file");
                builder = builder.add_source(
                    File::from(default_path.as_path())
                        .format(FileFormat::Ini)
                        .required(false),
                );
            }
        }

        let config = builder
            .set_override_option("grafana.api_key", env_value("GRAFANA_API_KEY"))?
            .set_override_option("grafana.host", env_value("GRAFANA_HOST"))?
            .set_override_option("grafana.protocol", env_value("GRAFANA_PROTOCOL"))?
            .set_override_option("legend.jsonnet_bin", env_value("LEGEND_JSONNET_BIN"))?
            .set_override_option("legend.library_dir", env_value("LEGEND_LIBRARY_DIR"))?
            .build()?;
        let raw: RawSettings = config.try_deserialize()?;

        Ok(Self {
            legend_home,
            grafonnet_repo_name: env_value("GRAFONNET_REPO_NAME")
                .unwrap_or_else(|| DEFAULT_GRAFONNET_REPO_NAME.to_string()),
            grafonnet_repo_url: env_value("GRAFONNET_REPO_URL")
                .unwrap_or_else(|| DEFAULT_GRAFONNET_REPO_URL.to_string()),
            grafonnet_branch: raw
                .legend
                .grafonnet_branch
                .unwrap_or_else(|| DEFAULT_GRAFONNET_BRANCH.to_string()),
            jsonnet_bin: raw
                .legend
                .jsonnet_bin
                .unwrap_or_else(|| DEFAULT_JSONNET_BIN.to_string()),
            library_dir: raw.legend.library_dir,
            grafana: GrafanaSettings {
                api_key: non_empty(raw.grafana.api_key),
                host: non_empty(raw.grafana.host),
                protocol: non_empty(raw.grafana.protocol),
                timeout_secs: raw.grafana.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
        })
    }

    /// Directory holding the grafonnet checkout, passed to jsonnet with `-J`.
    pub fn grafonnet_path(&self) -> PathBuf {
        self.legend_home.join(&self.grafonnet_repo_name)
    }

    /// Build the Grafana endpoint, failing when any value is missing.
    pub fn grafana_endpoint(&self) -> Result<GrafanaEndpoint> {
        let grafana = &self.grafana;
        let missing: Vec<String> = [
            ("api_key", &grafana.api_key),
            ("host", &grafana.host),
            ("protocol", &grafana.protocol),
        ]
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key.to_string())
        .collect();

        match (&grafana.api_key, &grafana.host, &grafana.protocol) {
            (Some(api_key), Some(host), Some(protocol)) => Ok(GrafanaEndpoint {
                base_url: format!("{}://{}", protocol, host.trim_end_matches('/')),
                api_key: api_key.clone(),
            }),
            _ => Err(LegendError::IncompleteConfig { missing }),
        }
    }
}

fn resolve_legend_home() -> Result<PathBuf> {
    if let Some(home) = env_value("LEGEND_HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(".legend"))
        .ok_or_else(|| LegendError::config("cannot determine home directory, set LEGEND_HOME"))
}

fn env_value(key: &str) -> Option<String> {
    non_empty(std::env::var(key).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
