//! # Legend Core
//!
//! Turns a declarative dashboard spec into grafonnet Jsonnet and compiles it
//! into Grafana dashboard JSON.
//!
//! The pipeline runs in this order:
//!
//! 1. [`spec`] parses and validates the user-authored YAML.
//! 2. [`merge`] expands every component through the [`library`] and merges
//!    user panel overrides onto the library defaults, keyed by panel title.
//! 3. [`assemble`] derives per-panel identifiers, renders datasource targets
//!    and alert conditions.
//! 4. [`layout`] places rows and panels on the dashboard grid.
//! 5. [`generator`] renders the top-level document and [`jsonnet`] compiles it.

pub mod assemble;
pub mod error;
pub mod generator;
pub mod jsonnet;
pub mod layout;
pub mod library;
pub mod merge;
pub mod settings;
pub mod spec;
pub mod utils;

#[cfg(test)]
mod tests;

pub use assemble::{AlertCondition, AlertConfig, AssembledTemplate, NotificationRef, Panel, Target};
pub use error::{LegendError, Result};
pub use generator::{AssembledDashboard, DashboardGenerator, GeneratedDocument};
pub use jsonnet::JsonnetCompiler;
pub use layout::{GridPos, LayoutPanel, LayoutRow};
pub use library::TemplateLibrary;
pub use merge::{ComponentDescription, MetricTemplate, PanelDefinition};
pub use settings::{GrafanaEndpoint, GrafanaSettings, Settings};
pub use spec::{AlertChannel, ComponentSpec, InputSpec, Reference, SloObjective, SloSpec};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        DashboardGenerator, InputSpec, JsonnetCompiler, LegendError, Result, Settings,
        TemplateLibrary,
    };
}
