// Library exports for chartplan

pub mod data;
pub mod descriptor;
pub mod profile;
pub mod parser;

// Compilation pipeline
pub mod plan;
pub mod group;
pub mod compiler;
pub mod error;
pub mod config;
pub mod session;

// Rendering adapter
pub mod stats;
pub mod render;

pub use compiler::{compile, Compiler};
pub use data::{DatasetRow, DatasetTable, Scalar};
pub use descriptor::{ChartFamily, QueryResponse, VisualizationDescriptor};
pub use error::CompileError;
pub use plan::{ChartPlan, Layout, Series};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    #[serde(default)]
    pub title: Option<String>,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: OutputFormat::Png,
            title: None,
        }
    }
}
