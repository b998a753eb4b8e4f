// Column profiles as returned by the Profiling Service.
//
// The compiler never re-infers column types; when a profile is available it
// reads the declared semantic type from here to pick axis kinds.

use crate::plan::AxisKind;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Continuous,
    Binary,
    Ordinal,
    Nominal,
    Datetime,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Continuous => "continuous",
            ColumnType::Binary => "binary",
            ColumnType::Ordinal => "ordinal",
            ColumnType::Nominal => "nominal",
            ColumnType::Datetime => "datetime",
            ColumnType::Unknown => "unknown",
        }
    }

    /// Continuous and datetime columns sit on a linear axis, everything else on a category axis
    pub fn axis_kind(&self) -> AxisKind {
        match self {
            ColumnType::Continuous | ColumnType::Datetime => AxisKind::Linear,
            _ => AxisKind::Category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MissingValues {
    #[serde(default)]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UniqueValues {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub examples: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnProfile {
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    #[serde(default)]
    pub missing_values: Option<MissingValues>,
    #[serde(default)]
    pub unique_values: Option<UniqueValues>,
    #[serde(default)]
    pub statistics: IndexMap<String, Value>,
}

/// Per-column profiles keyed by column name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetProfile {
    columns: IndexMap<String, ColumnProfile>,
}

impl DatasetProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, profile: ColumnProfile) -> Self {
        self.columns.insert(name.into(), profile);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.get(name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.column_type)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &ColumnProfile)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse profile '{}'", path.display()))
    }
}

// =============================================================================
// Display helpers
// =============================================================================

/// Render a profile value for display: integers as-is, other numbers with two decimals
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    format!("{:.2}", f)
                }
            }
        }
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => {
            let json = other.to_string();
            let mut short: String = json.chars().take(15).collect();
            short.push_str("...");
            short
        }
    }
}

/// `standard_deviation` becomes `Standard Deviation`
pub fn format_stat_key(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text table summarising a profile: one line per column
pub fn describe(profile: &DatasetProfile) -> String {
    let mut lines = vec![format!(
        "{:<24} {:<12} {:>9} {:>8}  {:<30} {}",
        "Column", "Type", "Missing", "Unique", "Samples", "Statistics"
    )];

    for (name, column) in profile.columns() {
        let missing = column
            .missing_values
            .as_ref()
            .and_then(|m| m.percentage)
            .filter(|p| *p != 0.0)
            .map(|p| format!("{:.2}%", p))
            .unwrap_or_else(|| "N/A".to_string());

        let unique = column
            .unique_values
            .as_ref()
            .and_then(|u| u.count)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());

        let samples = column
            .unique_values
            .as_ref()
            .map(|u| {
                u.examples
                    .iter()
                    .take(3)
                    .map(format_value)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let stats = column
            .statistics
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| format!("{}: {}", format_stat_key(k), format_value(v)))
            .collect::<Vec<_>>()
            .join("; ");

        lines.push(format!(
            "{:<24} {:<12} {:>9} {:>8}  {:<30} {}",
            name,
            column.column_type.name(),
            missing,
            unique,
            samples,
            stats
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_profile() -> DatasetProfile {
        serde_json::from_value(json!({
            "age": {
                "type": "continuous",
                "missing_values": {"percentage": 2.5},
                "unique_values": {"count": 40, "examples": [21, 34.567, null, 50]},
                "statistics": {"mean": 36.25, "standard_deviation": 9, "median": null}
            },
            "city": {
                "type": "nominal",
                "unique_values": {"count": 3, "examples": ["Oslo", "Lima"]}
            },
            "weird": {"type": "geospatial"}
        }))
        .unwrap()
    }

    #[test]
    fn test_profile_parsing() {
        let profile = make_profile();
        assert_eq!(profile.len(), 3);
        assert_eq!(profile.column_type("age"), Some(ColumnType::Continuous));
        assert_eq!(profile.column_type("city"), Some(ColumnType::Nominal));
        assert_eq!(profile.column_type("weird"), Some(ColumnType::Unknown));
        assert_eq!(profile.column_type("absent"), None);
    }

    #[test]
    fn test_axis_kind() {
        assert_eq!(ColumnType::Continuous.axis_kind(), AxisKind::Linear);
        assert_eq!(ColumnType::Datetime.axis_kind(), AxisKind::Linear);
        assert_eq!(ColumnType::Ordinal.axis_kind(), AxisKind::Category);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(null)), "N/A");
        assert_eq!(format_value(&json!(21)), "21");
        assert_eq!(format_value(&json!(34.567)), "34.57");
        assert_eq!(format_value(&json!("Oslo")), "Oslo");
        assert_eq!(format_value(&json!({"a": [1, 2, 3, 4, 5, 6]})), "{\"a\":[1,2,3,4,5...");
    }

    #[test]
    fn test_format_stat_key() {
        assert_eq!(format_stat_key("standard_deviation"), "Standard Deviation");
        assert_eq!(format_stat_key("mean"), "Mean");
    }

    #[test]
    fn test_describe() {
        let text = describe(&make_profile());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("age"));
        assert!(lines[1].contains("2.50%"));
        assert!(lines[1].contains("21, 34.57, N/A"));
        assert!(lines[1].contains("Standard Deviation: 9"));
        assert!(!lines[1].contains("Median"));
        assert!(lines[2].contains("nominal"));
    }
}
