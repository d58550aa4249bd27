//! Merging library panel defaults with user overrides.
//!
//! Every component in a spec is expanded through its metrics template into
//! one or more [`MetricTemplate`]s. The user's `panels` list is then laid
//! over each template: a panel whose title matches a template panel
//! replaces that panel's keys, anything else is appended.

use crate::library::TemplateLibrary;
use crate::spec::ComponentSpec;
use crate::{LegendError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A panel as written in the library or the spec, before assembly
pub type PanelDefinition = Map<String, Value>;

const ALERT_CONFIG_KEY: &str = "alert_config";

/// One row worth of panels produced by a component's metrics template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound(
    serialize = "P: Serialize",
    deserialize = "P: serde::de::DeserializeOwned"
))]
pub struct MetricTemplate<P = PanelDefinition> {
    /// Component name used for the description, defaults to the spec key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_title: Option<String>,
    /// Datasource kind, selects `datasource/<kind>.j2` for every target
    pub data_source: String,
    /// Grafana datasource name the panels query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "Vec::new")]
    pub panels: Vec<P>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panels_in_row: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<P> MetricTemplate<P> {
    /// Convert every panel, keeping the template header.
    pub fn try_map_panels<Q, F>(self, mut f: F) -> Result<MetricTemplate<Q>>
    where
        F: FnMut(P) -> Result<Q>,
    {
        let panels = self.panels.into_iter().map(&mut f).collect::<Result<Vec<_>>>()?;
        Ok(MetricTemplate {
            component: self.component,
            row_title: self.row_title,
            data_source: self.data_source,
            datasource: self.datasource,
            reference: self.reference,
            description: self.description,
            panels,
            hide: self.hide,
            panels_in_row: self.panels_in_row,
            extra: self.extra,
        })
    }

    /// Key the template's description is filed under
    pub fn description_key<'a>(&'a self, component: &'a str) -> &'a str {
        self.component.as_deref().unwrap_or(component)
    }
}

/// Text shown above the first row of a component
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentDescription {
    pub reference: String,
    pub description: String,
}

impl ComponentDescription {
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty() && self.description.is_empty()
    }
}

/// Lay user `overrides` over `template_panels`, keyed by title.
///
/// Matching panels take every override key; `alert_config` is merged key
/// by key instead of replaced, unless the template panel has none.
/// Unmatched overrides are appended in order. The title index is built
/// once from the template panels, so two overrides with the same unknown
/// title append two panels.
pub fn merge_panels(
    template_panels: Vec<PanelDefinition>,
    overrides: &[PanelDefinition],
) -> Vec<PanelDefinition> {
    let mut panels = template_panels;
    let by_title: HashMap<String, usize> = panels
        .iter()
        .enumerate()
        .filter_map(|(index, panel)| panel_title(panel).map(|title| (title.to_string(), index)))
        .collect();

    for user_panel in overrides {
        let target = panel_title(user_panel).and_then(|title| by_title.get(title).copied());
        match target {
            Some(index) => {
                debug!(title = ?panel_title(user_panel), "Overriding library panel");
                override_panel(&mut panels[index], user_panel);
            }
            None => {
                debug!(title = ?panel_title(user_panel), "Adding custom panel");
                panels.push(user_panel.clone());
            }
        }
    }

    panels
}

fn override_panel(panel: &mut PanelDefinition, user_panel: &PanelDefinition) {
    for (key, value) in user_panel {
        if key == ALERT_CONFIG_KEY {
            merge_alert_config(panel, value);
        } else {
            panel.insert(key.clone(), value.clone());
        }
    }
}

fn merge_alert_config(panel: &mut PanelDefinition, user_alert: &Value) {
    match (panel.get_mut(ALERT_CONFIG_KEY), user_alert) {
        (Some(Value::Object(existing)), Value::Object(user)) => {
            for (key, value) in user {
                existing.insert(key.clone(), value.clone());
            }
        }
        _ => {
            panel.insert(ALERT_CONFIG_KEY.to_string(), user_alert.clone());
        }
    }
}

fn panel_title(panel: &PanelDefinition) -> Option<&str> {
    panel.get("title").and_then(Value::as_str)
}

/// Expand one spec component into merged metric templates.
///
/// `hide` and `panels_in_row` only apply to the first template.
pub fn expand_component(
    name: &str,
    component: &ComponentSpec,
    library: &TemplateLibrary,
) -> Result<Vec<MetricTemplate>> {
    let template_name = TemplateLibrary::metrics_template(name);
    if !library.has_template(&template_name) {
        return Err(LegendError::UnknownComponent(name.to_string()));
    }

    let no_dimensions = Value::Array(Vec::new());
    let dimensions = match &component.dimensions {
        Value::Null => &no_dimensions,
        dimensions => dimensions,
    };
    let rendered = library.render(&template_name, dimensions)?;
    let mut templates = parse_templates(&template_name, &rendered)?;
    if templates.is_empty() {
        warn!(component = name, "Metrics template produced no rows, check the component dimensions");
    }

    for template in &mut templates {
        let panels = std::mem::take(&mut template.panels);
        template.panels = merge_panels(panels, &component.panels);
    }

    if let Some(first) = templates.first_mut() {
        if component.hide.is_some() {
            first.hide = component.hide;
        }
        if component.panels_in_row.is_some() {
            first.panels_in_row = component.panels_in_row;
        }
    }

    Ok(templates)
}

fn parse_templates(template_name: &str, rendered: &str) -> Result<Vec<MetricTemplate>> {
    if rendered.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(rendered)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_yaml::from_value(value).map_err(|err| {
        LegendError::template(template_name, format!("rendered metrics are not a template list: {}", err))
    })
}

/// Record the description of every template, first one per key wins.
pub fn collect_descriptions<P>(
    component: &str,
    templates: &[MetricTemplate<P>],
    descriptions: &mut IndexMap<String, ComponentDescription>,
) {
    for template in templates {
        descriptions
            .entry(template.description_key(component).to_string())
            .or_insert_with(|| ComponentDescription {
                reference: template.reference.clone().unwrap_or_default(),
                description: template.description.clone().unwrap_or_default(),
            });
    }
}
