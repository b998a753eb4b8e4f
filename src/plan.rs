use crate::data::Scalar;
use crate::descriptor::ChartFamily;
use serde::Serialize;

// =============================================================================
// Chart Plan
// =============================================================================

/// Compiled, renderer-ready output for one descriptor.
/// Immutable once produced; equal inputs produce equal plans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlan {
    pub family: ChartFamily,
    pub description: String,
    pub series: Vec<Series>,
    pub layout: Layout,
}

impl ChartPlan {
    /// Message carried by a fallback plan, if this is one
    pub fn fallback_message(&self) -> Option<&str> {
        self.series.iter().find_map(|s| match s {
            Series::Fallback(f) => Some(f.message.as_str()),
            _ => None,
        })
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_message().is_some()
    }
}

/// One drawable trace. The variant follows the chart family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Series {
    CategoryValue(BarTrace),
    Line(LineTrace),
    Point(PointTrace),
    Pie(PieTrace),
    Heatmap(HeatmapTrace),
    Distribution(DistributionTrace),
    Radar(RadarTrace),
    Fallback(FallbackNotice),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTrace {
    pub name: String,
    pub categories: Vec<Scalar>,
    pub values: Vec<Scalar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    None,
    /// Fill down to the previous trace
    ToNextY,
    /// Close the trace on itself
    ToSelf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTrace {
    pub name: String,
    pub categories: Vec<Scalar>,
    pub values: Vec<Scalar>,
    pub fill: Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkerSize {
    Constant(f64),
    PerPoint(Vec<Scalar>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointTrace {
    pub x: Vec<Scalar>,
    pub y: Vec<Scalar>,
    pub marker_size: MarkerSize,
    pub hover: Vec<String>,
}

impl PointTrace {
    pub fn points(&self) -> impl Iterator<Item = (&Scalar, &Scalar)> {
        self.x.iter().zip(self.y.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieTrace {
    pub labels: Vec<Scalar>,
    pub values: Vec<usize>,
    /// Inner radius as a fraction of the outer radius (0 for a full pie)
    pub hole: f64,
    pub text_info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapTrace {
    pub x: Vec<Scalar>,
    pub y: Vec<Scalar>,
    /// Indexed `[y][x]`
    pub z: Vec<Vec<Scalar>>,
    pub colorscale: String,
}

impl HeatmapTrace {
    pub fn cell_count(&self) -> usize {
        self.z.iter().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionShape {
    Box,
    Violin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionTrace {
    pub name: String,
    pub values: Vec<Scalar>,
    pub shape: DistributionShape,
    pub show_box: bool,
    pub show_mean: bool,
    pub show_outliers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarTrace {
    pub theta: Vec<String>,
    pub r: Vec<f64>,
    pub fill: Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackNotice {
    pub message: String,
}

// =============================================================================
// Layout Hints
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<AxisHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<LegendHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polar: Option<PolarHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_legend: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Category,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisHint {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_angle: Option<i32>,
    pub kind: AxisKind,
}

impl AxisHint {
    pub fn new(title: impl Into<String>, kind: AxisKind) -> Self {
        Self {
            title: title.into(),
            tick_angle: None,
            kind,
        }
    }

    pub fn with_tick_angle(mut self, angle: i32) -> Self {
        self.tick_angle = Some(angle);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendHint {
    pub orientation: Orientation,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolarHint {
    pub radial_axis_visible: bool,
    pub show_tick_labels: bool,
    pub clockwise: bool,
}
