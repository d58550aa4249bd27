//! Template library and renderer.
//!
//! The library ships with the binary. A directory given with
//! [`TemplateLibrary::with_override_dir`] shadows built-in templates file by
//! file, which is how new components and datasources are added without a
//! rebuild. Every template sees its input under the single name `data`.

use crate::utils::convert_to_alnum;
use crate::{LegendError, Result};
use minijinja::{context, AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub const OUTPUT_TEMPLATE: &str = "output.j2";
pub const ALERT_TEMPLATE: &str = "alert/alert.j2";
pub const ALERT_CONDITION_TEMPLATE: &str = "alert/alert_condition.j2";
pub const SLO_TEMPLATE: &str = "kubernetes/slo.yaml.j2";

const METRICS_DIR: &str = "metrics";
const METRICS_SUFFIX: &str = "_metrics.yaml";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (OUTPUT_TEMPLATE, include_str!("../library/output.j2")),
    (ALERT_TEMPLATE, include_str!("../library/alert/alert.j2")),
    (
        ALERT_CONDITION_TEMPLATE,
        include_str!("../library/alert/alert_condition.j2"),
    ),
    (SLO_TEMPLATE, include_str!("../library/kubernetes/slo.yaml.j2")),
    (
        "datasource/prometheus.j2",
        include_str!("../library/datasource/prometheus.j2"),
    ),
    (
        "datasource/cloudwatch.j2",
        include_str!("../library/datasource/cloudwatch.j2"),
    ),
    (
        "datasource/influxdb.j2",
        include_str!("../library/datasource/influxdb.j2"),
    ),
    (
        "metrics/elb_metrics.yaml",
        include_str!("../library/metrics/elb_metrics.yaml"),
    ),
    (
        "metrics/http_metrics.yaml",
        include_str!("../library/metrics/http_metrics.yaml"),
    ),
    (
        "metrics/rds_metrics.yaml",
        include_str!("../library/metrics/rds_metrics.yaml"),
    ),
    (
        "metrics/redis_metrics.yaml",
        include_str!("../library/metrics/redis_metrics.yaml"),
    ),
    (
        "metrics/sqs_metrics.yaml",
        include_str!("../library/metrics/sqs_metrics.yaml"),
    ),
];

/// Renders named templates from the built-in library or an override directory
pub struct TemplateLibrary {
    env: Environment<'static>,
    override_dir: Option<PathBuf>,
}

impl std::fmt::Debug for TemplateLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateLibrary")
            .field("override_dir", &self.override_dir)
            .finish()
    }
}

impl TemplateLibrary {
    /// Library with only the built-in templates
    pub fn builtin() -> Self {
        Self::build(None)
    }

    /// Library whose templates are looked up in `dir` first
    pub fn with_override_dir(dir: impl Into<PathBuf>) -> Self {
        Self::build(Some(dir.into()))
    }

    fn build(override_dir: Option<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_filter("alnum", |value: String| convert_to_alnum(&value));

        let dir = override_dir.clone();
        env.set_loader(move |name| {
            if let Some(dir) = &dir {
                let path = dir.join(name);
                if path.is_file() {
                    trace!(template = name, path = %path.display(), "Loading template override");
                    return std::fs::read_to_string(&path).map(Some).map_err(|err| {
                        minijinja::Error::new(
                            ErrorKind::InvalidOperation,
                            format!("could not read {}", path.display()),
                        )
                        .with_source(err)
                    });
                }
            }
            Ok(builtin_source(name).map(str::to_owned))
        });

        Self { env, override_dir }
    }

    pub fn override_dir(&self) -> Option<&Path> {
        self.override_dir.as_deref()
    }

    /// Render template `name` with `data` bound to the `data` variable.
    pub fn render<S: Serialize>(&self, name: &str, data: &S) -> Result<String> {
        let template = self.env.get_template(name).map_err(|err| match err.kind() {
            ErrorKind::TemplateNotFound => LegendError::TemplateNotFound(name.to_string()),
            _ => LegendError::template(name, describe(&err)),
        })?;
        debug!(template = name, "Rendering template");
        template
            .render(context! { data => data })
            .map_err(|err| LegendError::template(name, describe(&err)))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Template name of a component's metrics file
    pub fn metrics_template(component: &str) -> String {
        format!("{}/{}{}", METRICS_DIR, component.to_lowercase(), METRICS_SUFFIX)
    }

    /// Template name of a datasource's target renderer
    pub fn datasource_template(data_source: &str) -> String {
        format!("datasource/{}.j2", data_source.to_lowercase())
    }

    /// Components with a metrics template, built-in or overridden
    pub fn component_templates(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = BUILTIN_TEMPLATES
            .iter()
            .filter_map(|(name, _)| component_name(name))
            .collect();

        if let Some(dir) = &self.override_dir {
            if let Ok(entries) = std::fs::read_dir(dir.join(METRICS_DIR)) {
                for entry in entries.flatten() {
                    let file_name = entry.file_name();
                    if let Some(name) = file_name
                        .to_str()
                        .and_then(|f| f.strip_suffix(METRICS_SUFFIX))
                    {
                        names.insert(name.to_string());
                    }
                }
            }
        }

        names.into_iter().collect()
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_source(name: &str) -> Option<&'static str> {
    BUILTIN_TEMPLATES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, source)| *source)
}

fn component_name(template: &str) -> Option<String> {
    template
        .strip_prefix(METRICS_DIR)?
        .strip_prefix('/')?
        .strip_suffix(METRICS_SUFFIX)
        .map(str::to_string)
}

fn describe(err: &minijinja::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
