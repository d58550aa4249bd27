//! Dashboard grid layout.
//!
//! Every metric template becomes one row. Panels flow left to right,
//! `panels_in_row` per line, on Grafana's 24 column grid.

use crate::assemble::{AssembledTemplate, Panel};
use crate::merge::ComponentDescription;
use crate::spec::GRID_WIDTH;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_PANELS_IN_ROW: u32 = 2;
pub const PANEL_HEIGHT: u32 = 8;
pub const ROW_HEIGHT: u32 = 1;
pub const TEXT_HEIGHT: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// A placed panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutPanel {
    /// Unique within the dashboard
    pub panel_ref: String,
    pub grid_pos: GridPos,
    pub panel: Panel,
}

/// A dashboard row with its panels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutRow {
    pub component: String,
    pub title: String,
    pub collapsed: bool,
    pub grid_pos: GridPos,
    pub datasource: Option<String>,
    /// Set on the first row of a component with a description, unless
    /// that row is collapsed
    pub description: Option<ComponentDescription>,
    pub text_grid_pos: Option<GridPos>,
    pub panels: Vec<LayoutPanel>,
}

/// Place every template of every component on the grid.
///
/// Collapsed rows only take the height of the row header; their panels
/// are positioned as they would be when the row is expanded.
pub fn assemble_panels_dynamic(
    metrics: &IndexMap<String, Vec<AssembledTemplate>>,
    descriptions: &IndexMap<String, ComponentDescription>,
) -> Vec<LayoutRow> {
    let mut rows = Vec::new();
    let mut described = HashSet::new();
    let mut y = 0;

    for (component_index, (component, templates)) in metrics.iter().enumerate() {
        for (template_index, template) in templates.iter().enumerate() {
            let collapsed = template.hide.unwrap_or(false);
            let per_row = template
                .panels_in_row
                .filter(|n| (1..=GRID_WIDTH).contains(n))
                .unwrap_or(DEFAULT_PANELS_IN_ROW);
            let width = GRID_WIDTH / per_row;

            let row_pos = GridPos { x: 0, y, w: GRID_WIDTH, h: ROW_HEIGHT };
            let mut cursor = y + ROW_HEIGHT;

            let key = template.description_key(component);
            let mut description = None;
            let mut text_grid_pos = None;
            let first_of_key = described.insert(key.to_string());
            if first_of_key && !collapsed {
                if let Some(desc) = descriptions.get(key).filter(|d| !d.is_empty()) {
                    description = Some(desc.clone());
                    text_grid_pos = Some(GridPos { x: 0, y: cursor, w: GRID_WIDTH, h: TEXT_HEIGHT });
                    cursor += TEXT_HEIGHT;
                }
            }

            let panels: Vec<LayoutPanel> = template
                .panels
                .iter()
                .enumerate()
                .map(|(index, panel)| {
                    let index = index as u32;
                    LayoutPanel {
                        panel_ref: format!(
                            "c{}_t{}_p{}_{}",
                            component_index, template_index, index, panel.title_var
                        ),
                        grid_pos: GridPos {
                            x: (index % per_row) * width,
                            y: cursor + (index / per_row) * PANEL_HEIGHT,
                            w: width,
                            h: PANEL_HEIGHT,
                        },
                        panel: panel.clone(),
                    }
                })
                .collect();

            let lines = (panels.len() as u32).div_ceil(per_row);
            y = if collapsed {
                y + ROW_HEIGHT
            } else {
                cursor + lines * PANEL_HEIGHT
            };

            rows.push(LayoutRow {
                component: component.clone(),
                title: template.row_title.clone().unwrap_or_else(|| component.clone()),
                collapsed,
                grid_pos: row_pos,
                datasource: template.datasource.clone(),
                description,
                text_grid_pos,
                panels,
            });
        }
    }

    rows
}
