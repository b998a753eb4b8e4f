use crate::config::PlanConfig;
use crate::data::{DatasetTable, Scalar};
use crate::descriptor::{ChartFamily, VisualizationDescriptor};
use crate::error::CompileError;
use crate::group::{column_mean, count_by_key, cross_tabulate, group_first_match, sorted_distinct};
use crate::plan::{
    AxisHint, AxisKind, BarTrace, ChartPlan, DistributionShape, DistributionTrace, FallbackNotice, Fill,
    HeatmapTrace, Layout, LegendHint, LineTrace, MarkerSize, Orientation, PieTrace, PointTrace, PolarHint,
    RadarTrace, Series,
};
use crate::profile::DatasetProfile;
use tracing::{debug, warn};

/// Turns a dataset plus a descriptor into a renderer-ready plan.
/// Stateless apart from its layout constants; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: PlanConfig,
}

/// Compile with default layout constants and no column profile
pub fn compile(table: &DatasetTable, descriptor: &VisualizationDescriptor) -> Result<ChartPlan, CompileError> {
    Compiler::default().compile(table, descriptor, None)
}

impl Compiler {
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Compile one descriptor against a dataset snapshot.
    ///
    /// Returns `InsufficientVariables` when the descriptor names fewer variables than
    /// its family needs (always when it names none). Unknown families compile to a
    /// plan holding a single fallback series.
    pub fn compile(
        &self,
        table: &DatasetTable,
        descriptor: &VisualizationDescriptor,
        profile: Option<&DatasetProfile>,
    ) -> Result<ChartPlan, CompileError> {
        let family = &descriptor.chart_family;
        let variables = descriptor.variables.as_slice();

        debug!(family = %family, variables = ?variables, rows = table.len(), "compiling chart plan");

        // Unsupported families skip the arity check but still need one variable
        let required = family.min_arity().unwrap_or(1);
        if variables.len() < required {
            return Err(CompileError::InsufficientVariables {
                family: family.clone(),
                required,
                provided: variables.len(),
            });
        }

        let axes = AxisResolver { profile };
        let (series, layout) = match family {
            ChartFamily::Bar => self.plan_bar(table, variables),
            ChartFamily::Line => self.plan_lines(table, variables, Fill::None, &axes),
            ChartFamily::Area => self.plan_lines(table, variables, Fill::ToNextY, &axes),
            ChartFamily::Scatter => self.plan_points(table, variables, false, &axes),
            ChartFamily::Bubble => self.plan_points(table, variables, true, &axes),
            ChartFamily::Pie => self.plan_pie(table, variables, 0.0),
            ChartFamily::Donut => self.plan_pie(table, variables, self.config.donut_hole),
            ChartFamily::Heatmap => self.plan_heatmap(table, variables),
            ChartFamily::Box => plan_distribution(table, variables, DistributionShape::Box),
            ChartFamily::Violin => plan_distribution(table, variables, DistributionShape::Violin),
            ChartFamily::Radar => plan_radar(table, variables),
            ChartFamily::Unsupported(name) => {
                warn!(family = %name, "unsupported chart family, emitting fallback");
                plan_fallback(name)
            }
        };

        Ok(ChartPlan {
            family: family.clone(),
            description: descriptor.description.clone(),
            series,
            layout,
        })
    }

    fn category_axis(&self, title: impl Into<String>) -> AxisHint {
        AxisHint::new(title, AxisKind::Category).with_tick_angle(self.config.tick_angle)
    }

    // =========================================================================
    // Per-family transforms
    // =========================================================================

    /// One bar per distinct key, valued by the first row carrying that key.
    /// Without a value variable every bar is null and the series is named after the key.
    fn plan_bar(&self, table: &DatasetTable, vars: &[String]) -> (Vec<Series>, Layout) {
        let key = &vars[0];
        let value = vars.get(1).map(String::as_str).unwrap_or_default();
        let groups = group_first_match(table.rows(), key);

        let mut categories = Vec::with_capacity(groups.len());
        let mut values = Vec::with_capacity(groups.len());
        for (category, row) in groups {
            values.push(row.value(value).clone());
            categories.push(category);
        }

        let series = vec![Series::CategoryValue(BarTrace {
            name: or_default(value, key).to_string(),
            categories,
            values,
        })];

        let layout = Layout {
            x_axis: Some(self.category_axis(key.as_str())),
            y_axis: Some(AxisHint::new(or_default(value, "Count"), AxisKind::Linear)),
            ..Layout::default()
        };

        (series, layout)
    }

    /// One line per variable after the first, over the sorted distinct keys.
    /// A lone key variable yields no lines.
    fn plan_lines(&self, table: &DatasetTable, vars: &[String], fill: Fill, axes: &AxisResolver) -> (Vec<Series>, Layout) {
        let key = &vars[0];
        let categories = sorted_distinct(table.rows(), key);
        let groups = group_first_match(table.rows(), key);

        let series = vars[1..]
            .iter()
            .map(|variable| {
                let values = categories
                    .iter()
                    .map(|c| groups.get(c).map(|row| row.value(variable).clone()).unwrap_or(Scalar::Null))
                    .collect();
                Series::Line(LineTrace {
                    name: variable.clone(),
                    categories: categories.clone(),
                    values,
                    fill,
                })
            })
            .collect();

        let first_value = vars.get(1).map(String::as_str).unwrap_or_default();
        let x_axis = AxisHint::new(key.as_str(), axes.kind_or(key, AxisKind::Category))
            .with_tick_angle(self.config.tick_angle);
        let layout = Layout {
            x_axis: Some(x_axis),
            y_axis: Some(AxisHint::new(or_default(first_value, "Value"), AxisKind::Linear)),
            ..Layout::default()
        };

        (series, layout)
    }

    /// Row-wise points; bubbles take their marker size from the third variable when present
    fn plan_points(&self, table: &DatasetTable, vars: &[String], bubble: bool, axes: &AxisResolver) -> (Vec<Series>, Layout) {
        let (x_var, y_var) = (&vars[0], &vars[1]);
        let rows = table.rows();

        let x: Vec<Scalar> = rows.iter().map(|r| r.value(x_var).clone()).collect();
        let y: Vec<Scalar> = rows.iter().map(|r| r.value(y_var).clone()).collect();

        let marker_size = match vars.get(2).filter(|v| bubble && !v.is_empty()) {
            Some(size_var) => MarkerSize::PerPoint(rows.iter().map(|r| r.value(size_var).clone()).collect()),
            None => MarkerSize::Constant(self.config.marker_size),
        };

        let hover = x
            .iter()
            .zip(&y)
            .map(|(xv, yv)| format!("{}: {}<br>{}: {}", x_var, xv, y_var, yv))
            .collect();

        let series = vec![Series::Point(PointTrace { x, y, marker_size, hover })];
        let layout = Layout {
            x_axis: Some(AxisHint::new(x_var.as_str(), axes.kind_or(x_var, AxisKind::Linear))),
            y_axis: Some(AxisHint::new(y_var.as_str(), axes.kind_or(y_var, AxisKind::Linear))),
            ..Layout::default()
        };

        (series, layout)
    }

    /// Row counts per distinct key
    fn plan_pie(&self, table: &DatasetTable, vars: &[String], hole: f64) -> (Vec<Series>, Layout) {
        let counts = count_by_key(table.rows(), &vars[0]);
        let (labels, values): (Vec<Scalar>, Vec<usize>) = counts.into_iter().unzip();

        let series = vec![Series::Pie(PieTrace {
            labels,
            values,
            hole,
            text_info: "label+percent".to_string(),
        })];
        let layout = Layout {
            legend: Some(LegendHint {
                orientation: Orientation::Horizontal,
                y: self.config.legend_offset,
            }),
            ..Layout::default()
        };

        (series, layout)
    }

    /// Cross-tabulation of the first two variables.
    /// A matched cell takes the third variable of its first row, or 1 when that is
    /// absent or falsy; an unmatched cell is 0.
    fn plan_heatmap(&self, table: &DatasetTable, vars: &[String]) -> (Vec<Series>, Layout) {
        let (x_var, y_var) = (&vars[0], &vars[1]);
        let value_var = vars.get(2);

        let tab = cross_tabulate(table.rows(), x_var, y_var);
        if tab.cell_count() > self.config.heatmap_cell_warning {
            warn!(
                x = %x_var,
                y = %y_var,
                cells = tab.cell_count(),
                "heatmap over high-cardinality columns"
            );
        }

        let z = tab.grid(|row| match row {
            None => Scalar::Number(0.0),
            Some(row) => match value_var {
                Some(field) if row.value(field).is_truthy() => row.value(field).clone(),
                _ => Scalar::Number(1.0),
            },
        });

        let series = vec![Series::Heatmap(HeatmapTrace {
            x: tab.x.clone(),
            y: tab.y.clone(),
            z,
            colorscale: self.config.colorscale.clone(),
        })];
        let layout = Layout {
            x_axis: Some(AxisHint::new(x_var.as_str(), AxisKind::Category)),
            y_axis: Some(AxisHint::new(y_var.as_str(), AxisKind::Category)),
            ..Layout::default()
        };

        (series, layout)
    }
}

/// The whole column as a single distribution sample
fn plan_distribution(table: &DatasetTable, vars: &[String], shape: DistributionShape) -> (Vec<Series>, Layout) {
    let variable = &vars[0];
    let violin = matches!(shape, DistributionShape::Violin);

    let series = vec![Series::Distribution(DistributionTrace {
        name: variable.clone(),
        values: table.column(variable),
        shape,
        show_box: true,
        show_mean: violin,
        show_outliers: !violin,
    })];
    let layout = Layout {
        y_axis: Some(AxisHint::new(variable.as_str(), AxisKind::Linear)),
        ..Layout::default()
    };

    (series, layout)
}

/// Column means of every variable after the first, as one closed trace
fn plan_radar(table: &DatasetTable, vars: &[String]) -> (Vec<Series>, Layout) {
    let dimensions = &vars[1..];
    let r = dimensions.iter().map(|d| column_mean(table.rows(), d)).collect();

    let series = vec![Series::Radar(RadarTrace {
        theta: dimensions.to_vec(),
        r,
        fill: Fill::ToSelf,
    })];
    let layout = Layout {
        polar: Some(PolarHint {
            radial_axis_visible: true,
            show_tick_labels: true,
            clockwise: true,
        }),
        ..Layout::default()
    };

    (series, layout)
}

fn plan_fallback(family: &str) -> (Vec<Series>, Layout) {
    let series = vec![Series::Fallback(FallbackNotice {
        message: format!("Unsupported chart type: {}", family),
    })];
    let layout = Layout {
        show_legend: Some(false),
        ..Layout::default()
    };
    (series, layout)
}

/// Axis kinds come from declared column types when a profile is present
struct AxisResolver<'a> {
    profile: Option<&'a DatasetProfile>,
}

impl AxisResolver<'_> {
    fn kind_or(&self, column: &str, default: AxisKind) -> AxisKind {
        self.profile
            .and_then(|p| p.column_type(column))
            .map(|t| t.axis_kind())
            .unwrap_or(default)
    }
}

fn or_default<'a>(name: &'a str, default: &'a str) -> &'a str {
    if name.is_empty() { default } else { name }
}
