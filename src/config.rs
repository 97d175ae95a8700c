use crate::backend::{BackendConfig, BackendKind};
use crate::layout::{LayoutParameters, OverlapMetric};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    /// Only move selected nodes and keep their centroid where it was.
    pub selected_only: bool,
    pub overlap_metric: OverlapMetric,
    /// Lay out partitions concurrently when the backend allows it.
    pub parallel: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            selected_only: false,
            overlap_metric: OverlapMetric::SourceOnly,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingConfig {
    pub enabled: bool,
    pub spacing: f64,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spacing: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub background: String,
    pub node_fill: String,
    pub locked_fill: String,
    pub node_stroke: String,
    pub edge_color: String,
    pub font_family: String,
    pub font_size: f32,
    pub show_labels: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 20.0,
            background: "#FFFFFF".to_string(),
            node_fill: "#ECECFF".to_string(),
            locked_fill: "#E8E8E8".to_string(),
            node_stroke: "#9370DB".to_string(),
            edge_color: "#333333".to_string(),
            font_family: "Inter, sans-serif".to_string(),
            font_size: 12.0,
            show_labels: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutParameters,
    pub backend: BackendConfig,
    pub placement: PlacementConfig,
    pub packing: PackingConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutParametersFile {
    coarse_graph_size: Option<i32>,
    interpolation_iterations: Option<i32>,
    level_convergence: Option<i32>,
    edge_len: Option<f64>,
    initial_iterations: Option<i32>,
    canvas_width: Option<f64>,
    canvas_height: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendConfigFile {
    kind: Option<BackendKind>,
    program: Option<String>,
    args: Option<Vec<String>>,
    search_paths: Option<Vec<PathBuf>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacementConfigFile {
    selected_only: Option<bool>,
    overlap_metric: Option<OverlapMetric>,
    parallel: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackingConfigFile {
    enabled: Option<bool>,
    spacing: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    padding: Option<f32>,
    background: Option<String>,
    node_fill: Option<String>,
    locked_fill: Option<String>,
    node_stroke: Option<String>,
    edge_color: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    show_labels: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutParametersFile>,
    backend: Option<BackendConfigFile>,
    placement: Option<PlacementConfigFile>,
    packing: Option<PackingConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.coarse_graph_size {
            target.coarse_graph_size = v;
        }
        if let Some(v) = layout.interpolation_iterations {
            target.interpolation_iterations = v;
        }
        if let Some(v) = layout.level_convergence {
            target.level_convergence = v;
        }
        if let Some(v) = layout.edge_len {
            target.edge_len = v;
        }
        if let Some(v) = layout.initial_iterations {
            target.initial_iterations = v;
        }
        if let Some(v) = layout.canvas_width {
            target.canvas_width = v;
        }
        if let Some(v) = layout.canvas_height {
            target.canvas_height = v;
        }
    }

    if let Some(backend) = parsed.backend {
        if let Some(v) = backend.kind {
            config.backend.kind = v;
        }
        if let Some(v) = backend.program {
            config.backend.program = v;
        }
        if let Some(v) = backend.args {
            config.backend.args = v;
        }
        if let Some(v) = backend.search_paths {
            config.backend.search_paths = v;
        }
    }

    if let Some(placement) = parsed.placement {
        if let Some(v) = placement.selected_only {
            config.placement.selected_only = v;
        }
        if let Some(v) = placement.overlap_metric {
            config.placement.overlap_metric = v;
        }
        if let Some(v) = placement.parallel {
            config.placement.parallel = v;
        }
    }

    if let Some(packing) = parsed.packing {
        if let Some(v) = packing.enabled {
            config.packing.enabled = v;
        }
        if let Some(v) = packing.spacing {
            config.packing.spacing = v;
        }
    }

    if let Some(render) = parsed.render {
        let target = &mut config.render;
        if let Some(v) = render.width {
            target.width = v;
        }
        if let Some(v) = render.height {
            target.height = v;
        }
        if let Some(v) = render.padding {
            target.padding = v;
        }
        if let Some(v) = render.background {
            target.background = v;
        }
        if let Some(v) = render.node_fill {
            target.node_fill = v;
        }
        if let Some(v) = render.locked_fill {
            target.locked_fill = v;
        }
        if let Some(v) = render.node_stroke {
            target.node_stroke = v;
        }
        if let Some(v) = render.edge_color {
            target.edge_color = v;
        }
        if let Some(v) = render.font_family {
            target.font_family = v;
        }
        if let Some(v) = render.font_size {
            target.font_size = v;
        }
        if let Some(v) = render.show_labels {
            target.show_labels = v;
        }
    }

    Ok(config)
}
