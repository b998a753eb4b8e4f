// Descriptor shorthand parser

pub mod descriptor;
pub mod lexer;

use crate::descriptor::VisualizationDescriptor;
use anyhow::{anyhow, Result};

pub use descriptor::{parse_descriptor, parse_descriptor_list, parse_one};

/// Parse a single shorthand descriptor such as `bar(region, sales) "Sales by region"`
pub fn parse(input: &str) -> Result<VisualizationDescriptor> {
    parse_one(input)
        .map(|(_, desc)| desc)
        .map_err(|e| anyhow!("Invalid descriptor '{}': {}", input.trim(), e))
}

/// Parse `;`-separated shorthand descriptors
pub fn parse_list(input: &str) -> Result<Vec<VisualizationDescriptor>> {
    parse_descriptor_list(input)
        .map(|(_, list)| list)
        .map_err(|e| anyhow!("Invalid descriptor list: {}", e))
}
