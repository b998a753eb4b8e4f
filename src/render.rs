// Plotters-backed renderer for compiled chart plans.
//
// Every call acquires its own drawing area and releases it before returning,
// so resizing is just rendering again with different options.

use crate::data::Scalar;
use crate::plan::{
    AxisKind, BarTrace, ChartPlan, DistributionShape, DistributionTrace, Fill, HeatmapTrace, Layout, LineTrace,
    MarkerSize, PieTrace, PointTrace, RadarTrace, Series,
};
use crate::stats::Sample;
use crate::{OutputFormat, RenderOptions};
use anyhow::{bail, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::PI;
use std::ops::Range;
use tracing::debug;

/// Largest accepted width or height
pub const MAX_DIMENSION: u32 = 16_384;

/// Anything that can turn a plan into encoded image bytes
pub trait Renderer {
    fn render(&self, plan: &ChartPlan, options: &RenderOptions) -> Result<Vec<u8>>;
}

/// Renders to PNG through the bitmap backend or to SVG text
#[derive(Debug, Clone, Copy, Default)]
pub struct PlotRenderer;

impl Renderer for PlotRenderer {
    fn render(&self, plan: &ChartPlan, options: &RenderOptions) -> Result<Vec<u8>> {
        let (width, height) = (options.width, options.height);
        if width == 0 || height == 0 {
            bail!("Render size must be non-zero (got {}x{})", width, height);
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            bail!(
                "Render size {}x{} exceeds the {} pixel limit per side",
                width,
                height,
                MAX_DIMENSION
            );
        }
        debug!(family = %plan.family, width, height, format = options.format.extension(), "rendering plan");

        match options.format {
            OutputFormat::Png => {
                let Some(len) = (width as usize)
                    .checked_mul(height as usize)
                    .and_then(|pixels| pixels.checked_mul(3))
                else {
                    bail!("Render size {}x{} is too large for an RGB buffer", width, height);
                };
                let mut buffer = vec![0u8; len];
                {
                    let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                    draw_plan(&root, plan, options)?;
                    root.present().context("Failed to present drawing")?;
                }
                encode_png(&buffer, width, height)
            }
            OutputFormat::Svg => {
                let mut svg = String::new();
                {
                    let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                    draw_plan(&root, plan, options)?;
                    root.present().context("Failed to present drawing")?;
                }
                Ok(svg.into_bytes())
            }
        }
    }
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(buffer, width, height, image::ColorType::Rgb8)
        .context("Failed to encode PNG")?;
    Ok(png_bytes)
}

// =============================================================================
// Colors
// =============================================================================

const PALETTE: [RGBColor; 10] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
    RGBColor(255, 102, 146),
    RGBColor(182, 232, 128),
    RGBColor(255, 151, 255),
    RGBColor(254, 203, 82),
];

const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

fn palette(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Viridis ramp, `t` clamped to [0, 1]
pub fn viridis(t: f64) -> RGBColor {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - lower as f64;

    let (r0, g0, b0) = VIRIDIS[lower];
    let (r1, g1, b1) = VIRIDIS[lower + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

// =============================================================================
// Geometry helpers
// =============================================================================

/// Padded range over finite values; 0..1 when there are none
pub fn value_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if min > max {
        0.0..1.0
    } else if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    }
}

/// Like `value_range` but with the baseline pinned at zero, for bars and filled areas
fn range_with_zero(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let Range { start, end } = value_range(values);
    let start = if start > 0.0 { 0.0 } else { start };
    let end = if end < 0.0 { 0.0 } else { end };
    start..end
}

/// Start and end angle of each wedge, clockwise from twelve o'clock
pub fn pie_wedges(values: &[usize]) -> Vec<(f64, f64)> {
    let total: usize = values.iter().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut start = -PI / 2.0;
    values
        .iter()
        .map(|&v| {
            let end = start + 2.0 * PI * v as f64 / total as f64;
            let wedge = (start, end);
            start = end;
            wedge
        })
        .collect()
}

/// Per-point marker radii. Numeric sizes scale linearly into 4..=20 px.
pub fn marker_radii(size: &MarkerSize, count: usize) -> Vec<f64> {
    match size {
        MarkerSize::Constant(s) => vec![s / 2.0; count],
        MarkerSize::PerPoint(values) => {
            let nums: Vec<Option<f64>> = values.iter().map(Scalar::as_f64).collect();
            let range = value_range(nums.iter().flatten().copied());
            let (lo, hi) = (range.start, range.end);
            nums.iter()
                .map(|v| match v {
                    Some(v) if v.is_finite() && hi > lo => 4.0 + 16.0 * (v - lo) / (hi - lo),
                    _ => 4.0,
                })
                .collect()
        }
    }
}

/// Where each value sits on an axis, plus tick labels when the axis is categorical
#[derive(Debug, Clone, PartialEq)]
pub struct AxisPositions {
    pub positions: Vec<Option<f64>>,
    pub labels: Option<Vec<String>>,
}

impl AxisPositions {
    /// Numeric values map to themselves when `numeric` is requested and every non-null
    /// value is a number; otherwise each distinct value gets an index.
    pub fn resolve(values: &[Scalar], numeric: bool) -> Self {
        let all_numeric = values.iter().all(|v| v.is_null() || v.as_f64().is_some());
        if numeric && all_numeric {
            return Self {
                positions: values.iter().map(Scalar::as_f64).collect(),
                labels: None,
            };
        }

        let mut labels: Vec<&Scalar> = Vec::new();
        let positions = values
            .iter()
            .map(|v| {
                if v.is_null() {
                    return None;
                }
                let idx = match labels.iter().position(|l| *l == v) {
                    Some(idx) => idx,
                    None => {
                        labels.push(v);
                        labels.len() - 1
                    }
                };
                Some(idx as f64)
            })
            .collect();

        Self {
            positions,
            labels: Some(labels.into_iter().map(|l| l.to_string()).collect()),
        }
    }

    fn range(&self) -> Range<f64> {
        match &self.labels {
            Some(labels) => -0.5..(labels.len().max(1) as f64 - 0.5),
            None => value_range(self.positions.iter().flatten().copied()),
        }
    }
}

fn label_at(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 1e-6 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

// =============================================================================
// Drawing
// =============================================================================

type Area<DB> = DrawingArea<DB, Shift>;

fn draw_plan<DB: DrawingBackend>(root: &Area<DB>, plan: &ChartPlan, options: &RenderOptions) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    let title = options
        .title
        .clone()
        .or_else(|| Some(plan.description.clone()).filter(|d| !d.is_empty()));
    match title {
        Some(title) => {
            let area = root
                .titled(&title, ("sans-serif", 20))
                .context("Failed to draw title")?;
            draw_series(&area, plan)
        }
        None => draw_series(root, plan),
    }
}

fn draw_series<DB: DrawingBackend>(area: &Area<DB>, plan: &ChartPlan) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let Some(first) = plan.series.first() else {
        return draw_message(area, "No data to display");
    };

    match first {
        Series::CategoryValue(_) => draw_bars(area, &collect(plan, as_bar), &plan.layout),
        Series::Line(_) => draw_lines(area, &collect(plan, as_line), &plan.layout),
        Series::Point(points) => draw_points(area, points, &plan.layout),
        Series::Pie(pie) => draw_pie(area, pie),
        Series::Heatmap(heat) => draw_heatmap(area, heat, &plan.layout),
        Series::Distribution(_) => draw_distributions(area, &collect(plan, as_distribution), &plan.layout),
        Series::Radar(radar) => draw_radar(area, radar),
        Series::Fallback(notice) => draw_message(area, &notice.message),
    }
}

fn collect<'a, T>(plan: &'a ChartPlan, pick: fn(&'a Series) -> Option<&'a T>) -> Vec<&'a T> {
    plan.series.iter().filter_map(pick).collect()
}

fn as_bar(s: &Series) -> Option<&BarTrace> {
    match s {
        Series::CategoryValue(t) => Some(t),
        _ => None,
    }
}

fn as_line(s: &Series) -> Option<&LineTrace> {
    match s {
        Series::Line(t) => Some(t),
        _ => None,
    }
}

fn as_distribution(s: &Series) -> Option<&DistributionTrace> {
    match s {
        Series::Distribution(t) => Some(t),
        _ => None,
    }
}

fn centered_text(size: f64) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center))
}

fn draw_message<DB: DrawingBackend>(area: &Area<DB>, message: &str) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        message.to_string(),
        (w as i32 / 2, h as i32 / 2),
        centered_text(18.0),
    ))
    .context("Failed to draw message")?;
    Ok(())
}

fn axis_title(layout: &Layout, x: bool) -> String {
    let axis = if x { &layout.x_axis } else { &layout.y_axis };
    axis.as_ref().map(|a| a.title.clone()).unwrap_or_default()
}

fn axis_is_linear(layout: &Layout, x: bool) -> bool {
    let axis = if x { &layout.x_axis } else { &layout.y_axis };
    axis.as_ref().map_or(true, |a| a.kind == AxisKind::Linear)
}

fn draw_bars<DB: DrawingBackend>(area: &Area<DB>, traces: &[&BarTrace], layout: &Layout) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let Some(trace) = traces.first().filter(|t| !t.categories.is_empty()) else {
        return draw_message(area, "No data to display");
    };

    let labels: Vec<String> = trace.categories.iter().map(|c| c.to_string()).collect();
    let n = labels.len();
    let y_range = range_with_zero(trace.values.iter().filter_map(Scalar::as_f64));

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), y_range)
        .context("Failed to build chart")?;

    let formatter = |x: &f64| label_at(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&formatter)
        .x_desc(axis_title(layout, true))
        .y_desc(axis_title(layout, false))
        .draw()
        .context("Failed to draw mesh")?;

    let color = palette(0);
    chart
        .draw_series(trace.values.iter().enumerate().filter_map(|(i, v)| {
            let y = v.as_f64().filter(|y| y.is_finite())?;
            let x = i as f64;
            Some(Rectangle::new([(x - 0.4, 0.0), (x + 0.4, y)], color.filled()))
        }))
        .context("Failed to draw bars")?;

    Ok(())
}

fn draw_lines<DB: DrawingBackend>(area: &Area<DB>, traces: &[&LineTrace], layout: &Layout) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let Some(first) = traces.first().filter(|t| !t.categories.is_empty()) else {
        return draw_message(area, "No data to display");
    };

    let x_axis = AxisPositions::resolve(&first.categories, axis_is_linear(layout, true));
    let all_y = traces
        .iter()
        .flat_map(|t| t.values.iter().filter_map(Scalar::as_f64));
    let filled = traces.iter().any(|t| t.fill != Fill::None);
    let y_range = if filled { range_with_zero(all_y) } else { value_range(all_y) };

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_axis.range(), y_range)
        .context("Failed to build chart")?;

    let labels = x_axis.labels.clone().unwrap_or_default();
    let categorical = x_axis.labels.is_some();
    let formatter = |x: &f64| {
        if categorical {
            label_at(&labels, *x)
        } else {
            crate::data::format_number(*x)
        }
    };
    chart
        .configure_mesh()
        .x_label_formatter(&formatter)
        .x_desc(axis_title(layout, true))
        .y_desc(axis_title(layout, false))
        .draw()
        .context("Failed to draw mesh")?;

    for (idx, trace) in traces.iter().enumerate() {
        let color = palette(idx);
        let mut points: Vec<(f64, f64)> = x_axis
            .positions
            .iter()
            .zip(&trace.values)
            .filter_map(|(x, y)| Some(((*x)?, y.as_f64().filter(|v| v.is_finite())?)))
            .collect();
        // Categories arrive in text order; a numeric axis draws left to right
        if !categorical {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
        }

        if trace.fill == Fill::None {
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .context("Failed to draw line series")?
                .label(trace.name.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        } else {
            chart
                .draw_series(AreaSeries::new(points, 0.0, color.mix(0.3).filled()).border_style(color.stroke_width(2)))
                .context("Failed to draw area series")?
                .label(trace.name.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.mix(0.3).filled()));
        }
    }

    if traces.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_points<DB: DrawingBackend>(area: &Area<DB>, trace: &PointTrace, layout: &Layout) -> Result<()>
where
    DB::ErrorType: 'static,
{
    if trace.x.is_empty() {
        return draw_message(area, "No data to display");
    }

    let x_axis = AxisPositions::resolve(&trace.x, axis_is_linear(layout, true));
    let y_axis = AxisPositions::resolve(&trace.y, axis_is_linear(layout, false));
    let radii = marker_radii(&trace.marker_size, trace.x.len());

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_axis.range(), y_axis.range())
        .context("Failed to build chart")?;

    let x_labels = x_axis.labels.clone();
    let y_labels = y_axis.labels.clone();
    let x_formatter = |v: &f64| match &x_labels {
        Some(labels) => label_at(labels, *v),
        None => crate::data::format_number(*v),
    };
    let y_formatter = |v: &f64| match &y_labels {
        Some(labels) => label_at(labels, *v),
        None => crate::data::format_number(*v),
    };
    chart
        .configure_mesh()
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_desc(axis_title(layout, true))
        .y_desc(axis_title(layout, false))
        .draw()
        .context("Failed to draw mesh")?;

    let color = palette(0);
    chart
        .draw_series(
            x_axis
                .positions
                .iter()
                .zip(&y_axis.positions)
                .zip(&radii)
                .filter_map(|((x, y), r)| Some(Circle::new(((*x)?, (*y)?), *r, color.mix(0.7).filled()))),
        )
        .context("Failed to draw points")?;

    Ok(())
}

fn draw_pie<DB: DrawingBackend>(area: &Area<DB>, trace: &PieTrace) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let wedges = pie_wedges(&trace.values);
    if wedges.is_empty() {
        return draw_message(area, "No data to display");
    }

    let (w, h) = area.dim_in_pixel();
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let outer = (w.min(h) as f64 / 2.0 - 40.0).max(10.0);
    let inner = outer * trace.hole.clamp(0.0, 0.95);
    let total: usize = trace.values.iter().sum();
    let at = |r: f64, angle: f64| ((cx + r * angle.cos()).round() as i32, (cy + r * angle.sin()).round() as i32);

    for (idx, &(start, end)) in wedges.iter().enumerate() {
        let steps = ((end - start) / (2.0 * PI) * 120.0).ceil().max(2.0) as usize;
        let angle = |i: usize| start + (end - start) * i as f64 / steps as f64;

        let mut points: Vec<(i32, i32)> = (0..=steps).map(|i| at(outer, angle(i))).collect();
        if inner > 0.0 {
            points.extend((0..=steps).rev().map(|i| at(inner, angle(i))));
        } else {
            points.push(at(0.0, 0.0));
        }

        area.draw(&Polygon::new(points, palette(idx).filled()))
            .context("Failed to draw wedge")?;
    }

    let label_radius = if inner > 0.0 { (outer + inner) / 2.0 } else { outer * 0.65 };
    for ((label, value), &(start, end)) in trace.labels.iter().zip(&trace.values).zip(&wedges) {
        let percent = 100.0 * *value as f64 / total as f64;
        area.draw(&Text::new(
            format!("{} {:.1}%", label, percent),
            at(label_radius, (start + end) / 2.0),
            centered_text(13.0),
        ))
        .context("Failed to draw wedge label")?;
    }

    Ok(())
}

fn draw_heatmap<DB: DrawingBackend>(area: &Area<DB>, trace: &HeatmapTrace, layout: &Layout) -> Result<()>
where
    DB::ErrorType: 'static,
{
    if trace.cell_count() == 0 {
        return draw_message(area, "No data to display");
    }
    if trace.colorscale != "Viridis" {
        debug!(colorscale = %trace.colorscale, "unknown colorscale, using Viridis");
    }

    let x_labels: Vec<String> = trace.x.iter().map(|v| v.to_string()).collect();
    let y_labels: Vec<String> = trace.y.iter().map(|v| v.to_string()).collect();
    let z_range = value_range(trace.z.iter().flatten().filter_map(Scalar::as_f64));
    let z_min = z_range.start;
    let span = (z_range.end - z_range.start).max(f64::EPSILON);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..(x_labels.len() as f64 - 0.5), -0.5..(y_labels.len() as f64 - 0.5))
        .context("Failed to build chart")?;

    let x_formatter = |v: &f64| label_at(&x_labels, *v);
    let y_formatter = |v: &f64| label_at(&y_labels, *v);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(x_labels.len())
        .y_labels(y_labels.len())
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_desc(axis_title(layout, true))
        .y_desc(axis_title(layout, false))
        .draw()
        .context("Failed to draw mesh")?;

    chart
        .draw_series(trace.z.iter().enumerate().flat_map(|(yi, row)| {
            row.iter().enumerate().map(move |(xi, value)| {
                let color = match value.as_f64() {
                    Some(v) if v.is_finite() => viridis((v - z_min) / span),
                    _ => RGBColor(230, 230, 230),
                };
                let (x, y) = (xi as f64, yi as f64);
                Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], color.filled())
            })
        }))
        .context("Failed to draw heatmap cells")?;

    Ok(())
}

fn draw_distributions<DB: DrawingBackend>(
    area: &Area<DB>,
    traces: &[&DistributionTrace],
    layout: &Layout,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let samples: Vec<Sample> = traces.iter().map(|t| Sample::from_scalars(&t.values)).collect();
    if samples.iter().all(Sample::is_empty) {
        return draw_message(area, "No data to display");
    }

    let labels: Vec<String> = traces.iter().map(|t| t.name.clone()).collect();
    let mut y_range = value_range(samples.iter().flat_map(|s| s.values().iter().copied()));

    // Violin tails extend past the data
    let densities: Vec<_> = traces
        .iter()
        .zip(&samples)
        .map(|(t, s)| match t.shape {
            DistributionShape::Violin if !s.is_empty() => Some(s.density()),
            _ => None,
        })
        .collect();
    for density in densities.iter().flatten() {
        let grid = value_range(density.grid.iter().copied());
        y_range = y_range.start.min(grid.start)..y_range.end.max(grid.end);
    }

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..(labels.len() as f64 - 0.5), y_range)
        .context("Failed to build chart")?;

    let formatter = |v: &f64| label_at(&labels, *v);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&formatter)
        .y_desc(axis_title(layout, false))
        .draw()
        .context("Failed to draw mesh")?;

    for (idx, ((trace, sample), density)) in traces.iter().zip(&samples).zip(&densities).enumerate() {
        let Some(summary) = sample.summary() else {
            continue;
        };
        let color = palette(idx);
        let x = idx as f64;

        if let Some(density) = density {
            let half_width = 0.4;
            let mut outline: Vec<(f64, f64)> = density
                .grid
                .iter()
                .zip(&density.density)
                .map(|(y, d)| (x + d * half_width, *y))
                .collect();
            outline.extend(
                density
                    .grid
                    .iter()
                    .zip(&density.density)
                    .rev()
                    .map(|(y, d)| (x - d * half_width, *y)),
            );
            chart
                .draw_series(std::iter::once(Polygon::new(outline, color.mix(0.5).filled())))
                .context("Failed to draw violin")?;
        }

        if trace.show_box {
            let half = if density.is_some() { 0.05 } else { 0.25 };
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - half, summary.q1), (x + half, summary.q3)],
                    color.mix(0.6).filled(),
                )))
                .context("Failed to draw box")?;
            chart
                .draw_series([
                    PathElement::new(vec![(x - half, summary.median), (x + half, summary.median)], BLACK.stroke_width(2)),
                    PathElement::new(vec![(x, summary.q3), (x, summary.upper_whisker)], BLACK.stroke_width(1)),
                    PathElement::new(vec![(x, summary.q1), (x, summary.lower_whisker)], BLACK.stroke_width(1)),
                ])
                .context("Failed to draw whiskers")?;
        }

        if trace.show_mean {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(x - 0.15, summary.mean), (x + 0.15, summary.mean)],
                    RED.stroke_width(1),
                )))
                .context("Failed to draw mean line")?;
        }

        if trace.show_outliers {
            chart
                .draw_series(summary.outliers.iter().map(|y| Circle::new((x, *y), 3, color.filled())))
                .context("Failed to draw outliers")?;
        }
    }

    Ok(())
}

/// Polygon vertices in pixel space; radii are scaled to the largest finite value
pub fn radar_vertices(r: &[f64], center: (f64, f64), radius: f64) -> Vec<(i32, i32)> {
    let n = r.len();
    let max = r.iter().copied().filter(|v| v.is_finite()).fold(0.0f64, f64::max);
    let scale = if max > 0.0 { radius / max } else { 0.0 };

    r.iter()
        .enumerate()
        .map(|(k, v)| {
            let angle = -PI / 2.0 + 2.0 * PI * k as f64 / n as f64;
            let len = if v.is_finite() { v.max(0.0) * scale } else { 0.0 };
            (
                (center.0 + len * angle.cos()).round() as i32,
                (center.1 + len * angle.sin()).round() as i32,
            )
        })
        .collect()
}

fn draw_radar<DB: DrawingBackend>(area: &Area<DB>, trace: &RadarTrace) -> Result<()>
where
    DB::ErrorType: 'static,
{
    if trace.r.is_empty() {
        return draw_message(area, "No data to display");
    }

    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = (w.min(h) as f64 / 2.0 - 50.0).max(10.0);
    let grid_color = RGBColor(200, 200, 200);

    // Rings and spokes
    let spokes = radar_vertices(&vec![1.0; trace.r.len()], center, radius);
    for ring in 1..=4 {
        let ring_radius = radius * ring as f64 / 4.0;
        let mut path = radar_vertices(&vec![1.0; trace.r.len().max(3)], center, ring_radius);
        path.push(path[0]);
        area.draw(&PathElement::new(path, grid_color.stroke_width(1)))
            .context("Failed to draw radar grid")?;
    }
    let origin = (center.0.round() as i32, center.1.round() as i32);
    for (spoke, label) in spokes.iter().zip(&trace.theta) {
        area.draw(&PathElement::new(vec![origin, *spoke], grid_color.stroke_width(1)))
            .context("Failed to draw radar spoke")?;
        let (dx, dy) = (spoke.0 - origin.0, spoke.1 - origin.1);
        let label_pos = (spoke.0 + dx / 8, spoke.1 + dy / 8);
        area.draw(&Text::new(label.clone(), label_pos, centered_text(13.0)))
            .context("Failed to draw radar label")?;
    }

    let color = palette(0);
    let vertices = radar_vertices(&trace.r, center, radius);
    if trace.fill == Fill::ToSelf {
        area.draw(&Polygon::new(vertices.clone(), color.mix(0.3).filled()))
            .context("Failed to fill radar polygon")?;
    }
    let mut outline = vertices;
    outline.push(outline[0]);
    area.draw(&PathElement::new(outline, color.stroke_width(2)))
        .context("Failed to draw radar outline")?;

    Ok(())
}
