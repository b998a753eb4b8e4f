use crate::RenderOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Layout constants applied while compiling plans
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Marker size for scatter points and bubbles without a size variable
    pub marker_size: f64,
    /// Hole ratio used by donut charts
    pub donut_hole: f64,
    /// Rotation of category tick labels, in degrees
    pub tick_angle: i32,
    pub colorscale: String,
    /// Vertical offset of horizontal legends
    pub legend_offset: f64,
    /// Heatmaps with more cells than this are logged as a scaling risk
    pub heatmap_cell_warning: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            marker_size: 10.0,
            donut_hole: 0.5,
            tick_angle: -45,
            colorscale: "Viridis".to_string(),
            legend_offset: -0.2,
            heatmap_cell_warning: 10_000,
        }
    }
}

/// Everything the CLI can read from a config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub plan: PlanConfig,
    pub render: RenderOptions,
}

impl AppConfig {
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Failed to parse configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }
}
