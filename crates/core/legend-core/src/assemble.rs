//! Panel and alert assembly.
//!
//! Takes merged [`MetricTemplate`]s and fills in everything the output
//! template needs per panel: a grid-safe `title_var`, the rendered
//! datasource call for each target and, for alerting panels, the rendered
//! alert with its conditions.

use crate::library::{TemplateLibrary, ALERT_CONDITION_TEMPLATE, ALERT_TEMPLATE};
use crate::merge::{MetricTemplate, PanelDefinition};
use crate::utils::{convert_to_alnum, is_safe_name, ref_id, ref_index};
use crate::{LegendError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// A template whose panels are ready for the output template
pub type AssembledTemplate = MetricTemplate<Panel>;

/// Notification channel reference attached to alerts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRef {
    pub uid: String,
}

/// Dashboard-wide alert values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContext {
    /// JSON list of notification references
    pub alert_ids: String,
    pub service: String,
}

impl AlertContext {
    pub fn new(service: &str, notifications: &[NotificationRef]) -> Result<Self> {
        Ok(Self {
            alert_ids: serde_json::to_string(notifications)?,
            service: service.to_string(),
        })
    }
}

/// A fully assembled panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Panel {
    pub title: String,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_config: Option<AlertConfig>,
    #[serde(default)]
    pub title_var: String,
    /// Rendered alert call chain, empty when the panel does not alert
    #[serde(default)]
    pub alertrender: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One query of a panel
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Target {
    /// Rendered datasource call
    #[serde(default)]
    pub render: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Alert settings of a panel
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertConfig {
    #[serde(default)]
    pub rule: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_query: Option<ConditionQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_ids: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_service: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<AlertCondition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One or more `OPERATOR,REDUCER,TARGET,FROM,TO,EVALUATOR,PARAMS...` strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ConditionQuery {
    One(String),
    Many(Vec<String>),
}

impl ConditionQuery {
    pub fn queries(&self) -> Vec<&str> {
        match self {
            ConditionQuery::One(query) => vec![query.as_str()],
            ConditionQuery::Many(queries) => queries.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ConditionQuery::One(query) => query.trim().is_empty(),
            ConditionQuery::Many(queries) => queries.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Avg,
    Min,
    Max,
    Sum,
    Count,
    Last,
    Median,
    Diff,
    PercentDiff,
    CountNonNull,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Evaluator {
    Gt,
    Lt,
    OutsideRange,
    WithinRange,
    NoValue,
}

impl Evaluator {
    /// Number of evaluator parameters Grafana expects
    pub fn arity(self) -> usize {
        match self {
            Evaluator::Gt | Evaluator::Lt => 1,
            Evaluator::OutsideRange | Evaluator::WithinRange => 2,
            Evaluator::NoValue => 0,
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Operator::And),
            "or" => Ok(Operator::Or),
            other => Err(format!("unknown operator '{}'", other)),
        }
    }
}

impl FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let reducer = match s.to_ascii_lowercase().as_str() {
            "avg" => Reducer::Avg,
            "min" => Reducer::Min,
            "max" => Reducer::Max,
            "sum" => Reducer::Sum,
            "count" => Reducer::Count,
            "last" => Reducer::Last,
            "median" => Reducer::Median,
            "diff" => Reducer::Diff,
            "percent_diff" => Reducer::PercentDiff,
            "count_non_null" => Reducer::CountNonNull,
            other => return Err(format!("unknown reducer '{}'", other)),
        };
        Ok(reducer)
    }
}

impl FromStr for Evaluator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let evaluator = match s.to_ascii_lowercase().as_str() {
            "gt" => Evaluator::Gt,
            "lt" => Evaluator::Lt,
            "outside_range" => Evaluator::OutsideRange,
            "within_range" => Evaluator::WithinRange,
            "no_value" => Evaluator::NoValue,
            other => return Err(format!("unknown evaluator '{}'", other)),
        };
        Ok(evaluator)
    }
}

impl fmt::Display for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Evaluator::Gt => "gt",
            Evaluator::Lt => "lt",
            Evaluator::OutsideRange => "outside_range",
            Evaluator::WithinRange => "within_range",
            Evaluator::NoValue => "no_value",
        };
        f.write_str(name)
    }
}

/// A parsed alert condition, the data of `alert/alert_condition.j2`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertCondition {
    pub operator: Operator,
    pub reducer: Reducer,
    pub query_ref: String,
    pub from: String,
    pub to: String,
    pub evaluator: Evaluator,
    pub evaluator_params: Vec<f64>,
}

/// Parse every condition query of a panel against its targets.
pub fn parse_condition_query(query: &ConditionQuery, targets: &[Target]) -> Result<Vec<AlertCondition>> {
    query
        .queries()
        .into_iter()
        .map(|q| parse_condition(q, targets.len()))
        .collect()
}

fn parse_condition(query: &str, target_count: usize) -> Result<AlertCondition> {
    let fail = |reason: String| LegendError::condition_query(query, reason);
    let fields: Vec<&str> = query.split(',').map(str::trim).collect();
    if fields.len() < 6 {
        return Err(fail(format!(
            "expected OPERATOR,REDUCER,TARGET,FROM,TO,EVALUATOR[,PARAMS...], got {} fields",
            fields.len()
        )));
    }

    let operator: Operator = fields[0].parse().map_err(fail)?;
    let reducer: Reducer = fields[1].parse().map_err(fail)?;
    let query_ref = resolve_target(fields[2], target_count).map_err(fail)?;
    let from = non_empty_field(fields[3], "FROM").map_err(fail)?;
    let to = non_empty_field(fields[4], "TO").map_err(fail)?;
    let evaluator: Evaluator = fields[5].parse().map_err(fail)?;

    let evaluator_params = fields[6..]
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<f64>()
                .map_err(|_| format!("evaluator parameter '{}' is not a number", p))
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(fail)?;
    if evaluator_params.len() != evaluator.arity() {
        return Err(fail(format!(
            "evaluator '{}' takes {} parameter(s), got {}",
            evaluator,
            evaluator.arity(),
            evaluator_params.len()
        )));
    }

    Ok(AlertCondition {
        operator,
        reducer,
        query_ref,
        from,
        to,
        evaluator,
        evaluator_params,
    })
}

fn resolve_target(field: &str, target_count: usize) -> std::result::Result<String, String> {
    if target_count == 0 {
        return Err("panel has no targets to alert on".to_string());
    }
    let index = match field.parse::<usize>() {
        Ok(0) => return Err("target index is 1-based".to_string()),
        Ok(position) => position - 1,
        Err(_) => ref_index(field).ok_or_else(|| format!("'{}' is not a target index or ref id", field))?,
    };
    if index >= target_count {
        return Err(format!(
            "target '{}' out of range, panel has {} target(s)",
            field, target_count
        ));
    }
    Ok(ref_id(index))
}

fn non_empty_field(value: &str, name: &str) -> std::result::Result<String, String> {
    if value.is_empty() {
        Err(format!("{} must not be empty", name))
    } else {
        Ok(value.to_string())
    }
}

impl Panel {
    /// Typed view of a merged panel definition.
    ///
    /// An empty `alert_config` counts as no alert.
    pub fn from_definition(mut definition: PanelDefinition) -> Result<Self> {
        if matches!(definition.get("alert_config"), Some(Value::Object(config)) if config.is_empty())
            || matches!(definition.get("alert_config"), Some(Value::Null))
        {
            definition.remove("alert_config");
        }
        let title = definition
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        serde_json::from_value(Value::Object(definition))
            .map_err(|err| LegendError::invalid_spec(format!("panel '{}': {}", title, err)))
    }
}

/// Assemble every panel of a merged template.
pub fn assemble_template(
    template: MetricTemplate,
    alerts: &AlertContext,
    library: &TemplateLibrary,
) -> Result<AssembledTemplate> {
    let data_source = template.data_source.to_lowercase();
    let datasource_template = TemplateLibrary::datasource_template(&data_source);

    template.try_map_panels(|definition| {
        let mut panel = Panel::from_definition(definition)?;
        if !panel.targets.is_empty()
            && (!is_safe_name(&data_source) || !library.has_template(&datasource_template))
        {
            return Err(LegendError::UnknownDatasource {
                datasource: data_source.clone(),
                panel: panel.title.clone(),
            });
        }
        assemble_panel(&mut panel, &datasource_template, alerts, library)?;
        Ok(panel)
    })
}

fn assemble_panel(
    panel: &mut Panel,
    datasource_template: &str,
    alerts: &AlertContext,
    library: &TemplateLibrary,
) -> Result<()> {
    panel.title_var = convert_to_alnum(&panel.title);

    for target in &mut panel.targets {
        target.render = library.render(datasource_template, &target.fields)?;
        trace!(panel = %panel.title, render = %target.render, "Rendered target");
    }

    panel.alertrender = String::new();
    let Some(alert) = panel.alert_config.as_mut() else {
        return Ok(());
    };

    alert
        .rule
        .insert("name".to_string(), Value::String(panel.title.clone()));
    alert.alert_ids = Some(alerts.alert_ids.clone());
    alert.alert_service = Some(alerts.service.clone());
    let mut alertrender = library.render(ALERT_TEMPLATE, &*alert)?;

    match &alert.condition_query {
        Some(query) if !query.is_empty() => {
            alert.conditions = parse_condition_query(query, &panel.targets)?;
            for condition in &alert.conditions {
                alertrender.push_str(&library.render(ALERT_CONDITION_TEMPLATE, condition)?);
            }
            debug!(panel = %panel.title, conditions = alert.conditions.len(), "Assembled alert");
            panel.alertrender = alertrender;
        }
        _ => {
            debug!(panel = %panel.title, "Alert config without condition_query, no alert emitted");
        }
    }

    Ok(())
}
