//! The user-authored dashboard spec.

use crate::utils::{convert_to_alnum, is_safe_name};
use crate::{LegendError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Grafana's grid is 24 columns wide
pub const GRID_WIDTH: u32 = 24;

const MAX_UID_LEN: usize = 40;

/// Top-level dashboard spec
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSpec {
    /// Service name, used as dashboard title and alert tag
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Folder to create or reuse when publishing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana_folder: Option<String>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub alert_channels: Vec<AlertChannel>,
    /// Components in dashboard order
    pub components: IndexMap<String, ComponentSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo: Option<SloSpec>,
    /// Anything else is handed to templates untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One logical component (a queue, a database, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentSpec {
    /// Data for the component's metrics template
    #[serde(default = "empty_dimensions")]
    pub dimensions: Value,
    /// Panel overrides and additions, keyed by `title`
    #[serde(default)]
    pub panels: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panels_in_row: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ComponentSpec {
    fn default() -> Self {
        Self {
            dimensions: empty_dimensions(),
            panels: Vec::new(),
            hide: None,
            panels_in_row: None,
            extra: Map::new(),
        }
    }
}

fn empty_dimensions() -> Value {
    Value::Array(Vec::new())
}

/// Notification channel to attach alerts to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertChannel {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
}

/// Link rendered into the dashboard header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

/// Service level objectives pushed to the cluster as a `ServiceLevel`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SloSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus_address: Option<String>,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    pub objectives: Vec<SloObjective>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SloObjective {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Availability objective in percent, e.g. `99.9`
    pub objective: f64,
    pub error_query: String,
    pub total_query: String,
}

impl InputSpec {
    /// Parse a spec from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let spec: InputSpec = serde_yaml::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read and parse a spec file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            LegendError::invalid_spec(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::from_yaml(&text)
    }

    /// Check the structural rules the generator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            return Err(LegendError::invalid_spec("service must not be empty"));
        }
        if self.dashboard_uid().is_empty() {
            return Err(LegendError::invalid_spec(
                "service has no ASCII letters or digits to derive a dashboard uid from, set uid",
            ));
        }
        if self.components.is_empty() {
            return Err(LegendError::invalid_spec("at least one component is required"));
        }

        for (name, component) in &self.components {
            if !is_safe_name(name) {
                return Err(LegendError::invalid_spec(format!(
                    "component name '{}' may only contain letters, digits, '_' and '-'",
                    name
                )));
            }
            if let Some(per_row) = component.panels_in_row {
                if per_row == 0 || per_row > GRID_WIDTH {
                    return Err(LegendError::invalid_spec(format!(
                        "component '{}': panels_in_row must be between 1 and {}",
                        name, GRID_WIDTH
                    )));
                }
            }
            for (index, panel) in component.panels.iter().enumerate() {
                match panel.get("title") {
                    Some(Value::String(title)) if !title.is_empty() => {}
                    _ => {
                        return Err(LegendError::invalid_spec(format!(
                            "component '{}': panel #{} needs a string title",
                            name,
                            index + 1
                        )))
                    }
                }
            }
        }

        if let Some(slo) = &self.slo {
            if slo.objectives.is_empty() {
                return Err(LegendError::invalid_spec("slo needs at least one objective"));
            }
            for objective in &slo.objectives {
                if !(0.0..=100.0).contains(&objective.objective) {
                    return Err(LegendError::invalid_spec(format!(
                        "slo objective '{}' must be a percentage",
                        objective.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Dashboard uid: the explicit `uid`, else derived from the service name.
    pub fn dashboard_uid(&self) -> String {
        match &self.uid {
            Some(uid) if !uid.is_empty() => uid.clone(),
            _ => convert_to_alnum(&self.service)
                .to_lowercase()
                .chars()
                .take(MAX_UID_LEN)
                .collect(),
        }
    }

    /// True when the spec names notification channels
    pub fn has_alert_channels(&self) -> bool {
        !self.alert_channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
service: payments
components:
  sqs:
    dimensions:
      - QueueName: payments-events
"#;

    #[test]
    fn test_minimal_spec_defaults() {
        let spec = InputSpec::from_yaml(MINIMAL).unwrap();
        assert_eq!(spec.service, "payments");
        assert!(spec.tags.is_empty());
        assert!(spec.alert_channels.is_empty());
        let sqs = &spec.components["sqs"];
        assert!(sqs.panels.is_empty());
        assert_eq!(sqs.hide, None);
        assert!(sqs.dimensions.is_array());
    }

    #[test]
    fn test_component_order_preserved() {
        let spec = InputSpec::from_yaml(
            r#"
service: checkout
components:
  redis: {}
  sqs: {}
  http: {}
"#,
        )
        .unwrap();
        let names: Vec<&str> = spec.components.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["redis", "sqs", "http"]);
        assert_eq!(spec.components["redis"].dimensions, Value::Array(vec![]));
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let spec = InputSpec::from_yaml(
            r#"
service: checkout
team: payments
components:
  sqs:
    owner: queues
"#,
        )
        .unwrap();
        assert_eq!(spec.extra["team"], Value::String("payments".into()));
        assert_eq!(spec.components["sqs"].extra["owner"], Value::String("queues".into()));
    }

    #[test]
    fn test_rejects_missing_components() {
        let err = InputSpec::from_yaml("service: lonely\ncomponents: {}\n").unwrap_err();
        assert!(matches!(err, LegendError::InvalidSpec(_)));
    }

    #[test]
    fn test_rejects_panel_without_title() {
        let err = InputSpec::from_yaml(
            r#"
service: checkout
components:
  sqs:
    panels:
      - format: short
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("needs a string title"));
    }

    #[test]
    fn test_rejects_path_like_component_names() {
        let err = InputSpec::from_yaml(
            r#"
service: checkout
components:
  "../etc": {}
"#,
        )
        .unwrap_err();
        assert!(matches!(err, LegendError::InvalidSpec(_)));
    }

    #[test]
    fn test_rejects_bad_panels_in_row() {
        let err = InputSpec::from_yaml(
            r#"
service: checkout
components:
  sqs:
    panels_in_row: 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("panels_in_row"));
    }

    #[test]
    fn test_dashboard_uid() {
        let mut spec = InputSpec::from_yaml(MINIMAL).unwrap();
        assert_eq!(spec.dashboard_uid(), "payments");

        spec.service = "Payments API / EU-West".into();
        assert_eq!(spec.dashboard_uid(), "paymentsapieuwest");

        spec.uid = Some("explicit-uid".into());
        assert_eq!(spec.dashboard_uid(), "explicit-uid");
    }

    #[test]
    fn test_service_without_alnum_needs_uid() {
        let err = InputSpec::from_yaml("service: 日本\ncomponents:\n  sqs: {}\n").unwrap_err();
        assert!(err.to_string().contains("set uid"), "{}", err);

        let spec = InputSpec::from_yaml("service: 日本\nuid: nihon\ncomponents:\n  sqs: {}\n").unwrap();
        assert_eq!(spec.dashboard_uid(), "nihon");
    }

    #[test]
    fn test_alert_channel_type_is_optional() {
        let spec = InputSpec::from_yaml(
            r#"
service: checkout
alert_channels:
  - name: oncall
    type: slack
  - name: email-team
components:
  sqs: {}
"#,
        )
        .unwrap();
        assert_eq!(spec.alert_channels[0].channel_type.as_deref(), Some("slack"));
        assert_eq!(spec.alert_channels[1].channel_type, None);
        assert!(spec.has_alert_channels());
    }

    #[test]
    fn test_slo_objective_range() {
        let err = InputSpec::from_yaml(
            r#"
service: checkout
components:
  http: {}
slo:
  objectives:
    - name: availability
      objective: 120
      error_query: errors
      total_query: total
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("percentage"));
    }
}
