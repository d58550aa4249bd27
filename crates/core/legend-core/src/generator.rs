//! Output emitter.
//!
//! Runs the whole expansion for a spec and renders the top-level Jsonnet
//! document.

use crate::assemble::{assemble_template, AlertContext, AssembledTemplate, NotificationRef};
use crate::layout::{assemble_panels_dynamic, LayoutRow};
use crate::library::{TemplateLibrary, OUTPUT_TEMPLATE};
use crate::merge::{collect_descriptions, expand_component, ComponentDescription};
use crate::spec::InputSpec;
use crate::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};
use uuid::Uuid;

/// Everything the output template sees as `data`
#[derive(Debug, Clone, Serialize)]
pub struct AssembledDashboard {
    #[serde(flatten)]
    pub spec: InputSpec,
    pub dashboard_uid: String,
    /// Assembled templates per component, in spec order
    pub metric: IndexMap<String, Vec<AssembledTemplate>>,
    pub component_desc: IndexMap<String, ComponentDescription>,
    pub assemble_panels: Vec<LayoutRow>,
}

/// Rendered Jsonnet and the data it was rendered from
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub dashboard: AssembledDashboard,
    pub jsonnet: String,
}

impl GeneratedDocument {
    /// Write the Jsonnet to `dir/legend-<uuid>.jsonnet`.
    pub fn write_jsonnet(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("legend-{}.jsonnet", Uuid::new_v4()));
        std::fs::write(&path, &self.jsonnet)?;
        debug!(path = %path.display(), "Wrote jsonnet document");
        Ok(path)
    }

    /// Write the Jsonnet into the system temp directory.
    pub fn write_temp_jsonnet(&self) -> Result<PathBuf> {
        self.write_jsonnet(&std::env::temp_dir())
    }
}

/// Drives merge, assembly, layout and rendering for one spec
#[derive(Debug)]
pub struct DashboardGenerator {
    library: TemplateLibrary,
}

impl DashboardGenerator {
    pub fn new(library: TemplateLibrary) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Expand the spec into an [`AssembledDashboard`] without rendering it.
    pub fn assemble(&self, spec: &InputSpec, notifications: &[NotificationRef]) -> Result<AssembledDashboard> {
        let span = info_span!("assemble", service = %spec.service);
        let _guard = span.enter();

        let alerts = AlertContext::new(&spec.service, notifications)?;
        let mut metric = IndexMap::new();
        let mut component_desc = IndexMap::new();

        for (name, component) in &spec.components {
            let templates = expand_component(name, component, &self.library)?;
            collect_descriptions(name, &templates, &mut component_desc);

            let assembled = templates
                .into_iter()
                .map(|template| assemble_template(template, &alerts, &self.library))
                .collect::<Result<Vec<_>>>()?;
            debug!(
                component = %name,
                rows = assembled.len(),
                panels = assembled.iter().map(|t| t.panels.len()).sum::<usize>(),
                "Assembled component"
            );
            metric.insert(name.clone(), assembled);
        }

        let assemble_panels = assemble_panels_dynamic(&metric, &component_desc);

        Ok(AssembledDashboard {
            spec: spec.clone(),
            dashboard_uid: spec.dashboard_uid(),
            metric,
            component_desc,
            assemble_panels,
        })
    }

    /// Expand and render the spec into Jsonnet.
    pub fn generate(&self, spec: &InputSpec, notifications: &[NotificationRef]) -> Result<GeneratedDocument> {
        let dashboard = self.assemble(spec, notifications)?;
        let jsonnet = self.library.render(OUTPUT_TEMPLATE, &dashboard)?;
        info!(
            service = %spec.service,
            uid = %dashboard.dashboard_uid,
            rows = dashboard.assemble_panels.len(),
            "Generated dashboard jsonnet"
        );
        Ok(GeneratedDocument { dashboard, jsonnet })
    }
}

impl Default for DashboardGenerator {
    fn default() -> Self {
        Self::new(TemplateLibrary::builtin())
    }
}
