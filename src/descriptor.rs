use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart families the compiler knows how to plan.
/// Anything else is kept verbatim in `Unsupported` so it can be reported back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartFamily {
    Bar,
    Line,
    Area,
    Scatter,
    Bubble,
    Pie,
    Donut,
    Heatmap,
    Box,
    Violin,
    Radar,
    Unsupported(String),
}

impl ChartFamily {
    /// Minimum number of variables the family needs, `None` for unsupported families
    pub fn min_arity(&self) -> Option<usize> {
        match self {
            ChartFamily::Scatter | ChartFamily::Bubble | ChartFamily::Heatmap | ChartFamily::Radar => Some(2),
            ChartFamily::Bar
            | ChartFamily::Line
            | ChartFamily::Area
            | ChartFamily::Pie
            | ChartFamily::Donut
            | ChartFamily::Box
            | ChartFamily::Violin => Some(1),
            ChartFamily::Unsupported(_) => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ChartFamily::Unsupported(_))
    }

    pub fn name(&self) -> &str {
        match self {
            ChartFamily::Bar => "bar",
            ChartFamily::Line => "line",
            ChartFamily::Area => "area",
            ChartFamily::Scatter => "scatter",
            ChartFamily::Bubble => "bubble",
            ChartFamily::Pie => "pie",
            ChartFamily::Donut => "donut",
            ChartFamily::Heatmap => "heatmap",
            ChartFamily::Box => "box",
            ChartFamily::Violin => "violin",
            ChartFamily::Radar => "radar",
            ChartFamily::Unsupported(name) => name,
        }
    }
}

impl FromStr for ChartFamily {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "bar" => ChartFamily::Bar,
            "line" => ChartFamily::Line,
            "area" => ChartFamily::Area,
            "scatter" => ChartFamily::Scatter,
            "bubble" => ChartFamily::Bubble,
            "pie" => ChartFamily::Pie,
            "donut" => ChartFamily::Donut,
            "heatmap" => ChartFamily::Heatmap,
            "box" => ChartFamily::Box,
            "violin" => ChartFamily::Violin,
            "radar" => ChartFamily::Radar,
            _ => ChartFamily::Unsupported(s.to_string()),
        })
    }
}

impl From<String> for ChartFamily {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(family) => family,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for ChartFamily {
    fn from(s: &str) -> Self {
        ChartFamily::from(s.to_string())
    }
}

impl From<ChartFamily> for String {
    fn from(family: ChartFamily) -> Self {
        family.name().to_string()
    }
}

impl fmt::Display for ChartFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declarative chart request as produced by the Suggestion/Query Service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationDescriptor {
    #[serde(rename = "chart_type", alias = "chart_family")]
    pub chart_family: ChartFamily,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub variables: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl VisualizationDescriptor {
    pub fn new<I, S>(chart_family: impl Into<ChartFamily>, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chart_family: chart_family.into(),
            variables: variables.into_iter().map(Into::into).collect(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Response of a free-text query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub primary_visualization: VisualizationDescriptor,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub alternative_visualizations: Vec<VisualizationDescriptor>,
}

/// Either shape the Suggestion/Query boundary can hand back
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServiceResponse {
    Suggestions(Vec<VisualizationDescriptor>),
    Query(QueryResponse),
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_family_parsing_is_case_insensitive() {
        assert_eq!(ChartFamily::from("Bar"), ChartFamily::Bar);
        assert_eq!(ChartFamily::from(" DONUT "), ChartFamily::Donut);
        assert_eq!(
            ChartFamily::from("sankey"),
            ChartFamily::Unsupported("sankey".to_string())
        );
    }

    #[test]
    fn test_min_arity() {
        assert_eq!(ChartFamily::Bar.min_arity(), Some(1));
        assert_eq!(ChartFamily::Area.min_arity(), Some(1));
        assert_eq!(ChartFamily::Scatter.min_arity(), Some(2));
        assert_eq!(ChartFamily::Radar.min_arity(), Some(2));
        assert_eq!(ChartFamily::from("sankey").min_arity(), None);
    }

    #[test]
    fn test_descriptor_from_service_json() {
        let value = json!({
            "chart_type": "Heatmap",
            "variables": ["x", "y", "z"],
            "description": "Cross tab"
        });
        let desc: VisualizationDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(desc.chart_family, ChartFamily::Heatmap);
        assert_eq!(desc.variables, vec!["x", "y", "z"]);
        assert_eq!(desc.description, "Cross tab");
    }

    #[test]
    fn test_descriptor_null_variables() {
        let value = json!({"chart_family": "pie", "variables": null});
        let desc: VisualizationDescriptor = serde_json::from_value(value).unwrap();
        assert!(desc.variables.is_empty());
        assert!(desc.description.is_empty());
    }

    #[test]
    fn test_service_response_shapes() {
        let suggestions: ServiceResponse =
            serde_json::from_value(json!([{"chart_type": "bar", "variables": ["a", "b"]}])).unwrap();
        assert!(matches!(suggestions, ServiceResponse::Suggestions(ref v) if v.len() == 1));

        let query: ServiceResponse = serde_json::from_value(json!({
            "primary_visualization": {"chart_type": "pie", "variables": ["a"]},
            "alternative_visualizations": null
        }))
        .unwrap();
        match query {
            ServiceResponse::Query(q) => {
                assert_eq!(q.primary_visualization.chart_family, ChartFamily::Pie);
                assert!(q.alternative_visualizations.is_empty());
            }
            _ => panic!("Expected query response"),
        }
    }

    #[test]
    fn test_family_serializes_as_name() {
        let desc = VisualizationDescriptor::new("Radar", ["score", "dim1"]);
        let value = serde_json::to_value(&desc).unwrap();
        assert_eq!(value["chart_type"], "radar");
    }
}
