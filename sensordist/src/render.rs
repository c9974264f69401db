//! Bar charts of bucket counts.
//!
//! Rendering happens in two steps. [`layout`] turns buckets into a
//! [`ChartLayout`]: bar rectangles, colors, tick positions and which labels
//! to show. [`draw`] puts a layout onto any plotters drawing area, so charts
//! can go to a PNG file or to an in-memory buffer. There is no shared
//! plotting state between charts.

use std::{ops::Range, path::Path};

use plotters::{
    coord::{
        ranged1d::{DefaultFormatting, KeyPointHint, Ranged},
        Shift,
    },
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{
    error::chart_err,
    palette::{Colormap, RD_YL_BU_R, STEEL_BLUE},
    value::{datetime_from_micros, Bucket, ValueRange},
    Interval, Result,
};

/// 14 x 6 inches at 150 DPI.
pub const DEFAULT_SIZE: (u32, u32) = (2100, 900);
pub const DEFAULT_LABEL_THRESHOLD: usize = 20;
pub const DEFAULT_MAX_TICKS: usize = 8;

const BAR_FRACTION: f64 = 0.95;
const COLORBAR_WIDTH: i32 = 190;
const COLORBAR_STEPS: usize = 128;
const FONT: &str = "sans-serif";

const SECOND: i64 = 1;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Tick spacings the x axis may use, in seconds.
const TICK_STEPS: [i64; 13] = [
    MINUTE,
    2 * MINUTE,
    5 * MINUTE,
    10 * MINUTE,
    15 * MINUTE,
    20 * MINUTE,
    30 * MINUTE,
    HOUR,
    2 * HOUR,
    3 * HOUR,
    4 * HOUR,
    6 * HOUR,
    12 * HOUR,
];

#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub size: (u32, u32),
    /// Bars get a count label only when there are at most this many.
    pub label_threshold: usize,
    pub max_ticks: usize,
    pub colormap: Colormap,
    pub solid_color: RGBColor,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            label_threshold: DEFAULT_LABEL_THRESHOLD,
            max_ticks: DEFAULT_MAX_TICKS,
            colormap: RD_YL_BU_R,
            solid_color: STEEL_BLUE,
        }
    }
}

/// What the bar colors encode.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    /// Name of the value column
    pub name: String,
    pub range: ValueRange,
}

impl Legend {
    pub fn label(&self) -> String {
        format!(
            "{} ({:.1} ~ {:.1})",
            self.name, self.range.min, self.range.max
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Bucket start, in seconds since the Unix epoch
    pub center: f64,
    pub left: f64,
    pub right: f64,
    pub count: u64,
    pub color: RGBColor,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub title: String,
    pub x_desc: String,
    /// Seconds since the Unix epoch
    pub x_range: Range<f64>,
    pub y_max: f64,
    pub bars: Vec<Bar>,
    pub ticks: Vec<f64>,
    pub tick_format: &'static str,
    pub legend: Option<Legend>,
}

pub fn layout(
    buckets: &[Bucket],
    interval: Interval,
    legend: Option<&Legend>,
    style: &ChartStyle,
) -> ChartLayout {
    let width = interval.duration().as_secs_f64();
    let half_bar = width * BAR_FRACTION / 2.0;
    let show_labels = buckets.len() <= style.label_threshold;

    let bars = buckets
        .iter()
        .map(|bucket| {
            let center = bucket.start as f64 / 1e6;
            let color = match (legend, bucket.mean) {
                (Some(legend), Some(mean)) => {
                    style.colormap.color_at(legend.range.normalize(mean))
                }
                _ => style.solid_color,
            };
            Bar {
                center,
                left: center - half_bar,
                right: center + half_bar,
                count: bucket.count,
                color,
                label: show_labels.then(|| bucket.count.to_string()),
            }
        })
        .collect::<Vec<_>>();

    let x_range = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (first.center - width)..(last.center + width),
        _ => 0.0..width,
    };
    let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    let y_max = (max_count as f64 * 1.1).max(1.0);
    let span = x_range.end - x_range.start;

    ChartLayout {
        title: format!("Distribution ({interval} intervals)"),
        x_desc: format!("Time ({interval})"),
        ticks: nice_ticks(&x_range, style.max_ticks),
        tick_format: if span > DAY as f64 {
            "%m-%d %H:%M"
        } else {
            "%H:%M"
        },
        x_range,
        y_max,
        bars,
        legend: legend.cloned(),
    }
}

/// Tick positions at a round time step, at most `max_ticks` of them.
pub fn nice_ticks(range: &Range<f64>, max_ticks: usize) -> Vec<f64> {
    let max_ticks = max_ticks.max(1);
    let (lo, hi) = (range.start, range.end);
    let fits = |step: i64| {
        let step = step as f64;
        ((hi / step).floor() - (lo / step).ceil() + 1.0) as usize <= max_ticks
    };
    let step = TICK_STEPS.into_iter().find(|&s| fits(s)).unwrap_or_else(|| {
        let days = ((hi - lo) / DAY as f64 / max_ticks as f64).ceil().max(1.0) as i64;
        (days..).map(|d| d * DAY).find(|&s| fits(s)).unwrap_or(days * DAY)
    }) as f64;

    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    let ticks = (first..=last).map(|i| i as f64 * step).collect::<Vec<_>>();
    if ticks.is_empty() {
        vec![(lo + hi) / 2.0]
    } else {
        ticks
    }
}

fn format_tick(seconds: f64, format: &str) -> String {
    let micros = (seconds * 1e6).round() as i64;
    datetime_from_micros(micros).format(format).to_string()
}

/// X axis in seconds since the Unix epoch, labeled at precomputed round
/// times instead of the decimal steps of a plain `f64` axis.
struct TimeAxis {
    range: Range<f64>,
    ticks: Vec<f64>,
}

impl Ranged for TimeAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let span = self.range.end - self.range.start;
        if span <= 0.0 {
            return (limit.0 + limit.1) / 2;
        }
        let t = (value - self.range.start) / span;
        limit.0 + ((limit.1 - limit.0) as f64 * t).round() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.weight().allow_light_points() {
            Vec::new()
        } else {
            self.ticks.clone()
        }
    }

    fn range(&self) -> Range<f64> {
        self.range.clone()
    }
}

/// Writes `layout` as a PNG image.
pub fn render_png(path: impl AsRef<Path>, layout: &ChartLayout, style: &ChartStyle) -> Result<()> {
    let root = BitMapBackend::new(path.as_ref(), style.size).into_drawing_area();
    draw(&root, layout, style)?;
    root.present().map_err(chart_err)?;
    Ok(())
}

pub fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    layout: &ChartLayout,
    style: &ChartStyle,
) -> Result<()> {
    root.fill(&WHITE).map_err(chart_err)?;

    let main = match &layout.legend {
        Some(legend) => {
            let (width, _) = root.dim_in_pixel();
            let (main, side) = root.split_horizontally(width as i32 - COLORBAR_WIDTH);
            draw_colorbar(&side, legend, style.colormap)?;
            main
        }
        None => root.clone(),
    };

    let mut chart = ChartBuilder::on(&main)
        .caption(&layout.title, (FONT, 36).into_font().style(FontStyle::Bold))
        .margin(24)
        .x_label_area_size(140)
        .y_label_area_size(90)
        .build_cartesian_2d(
            TimeAxis {
                range: layout.x_range.clone(),
                ticks: layout.ticks.clone(),
            },
            0.0..layout.y_max,
        )
        .map_err(chart_err)?;

    let tick_format = layout.tick_format;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(&WHITE)
        .bold_line_style(BLACK.mix(0.15))
        .x_label_formatter(&|x| format_tick(*x, tick_format))
        .x_label_style(
            (FONT, 22)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_label_formatter(&|y| format!("{y:.0}"))
        .y_label_style((FONT, 22))
        .x_desc(layout.x_desc.as_str())
        .y_desc("Number of Data Points")
        .axis_desc_style((FONT, 26))
        .draw()
        .map_err(chart_err)?;

    draw_bars(&mut chart, &layout.bars)?;
    draw_count_labels(&mut chart, &layout.bars)?;
    Ok(())
}

fn draw_bars<DB, CT>(chart: &mut ChartContext<DB, CT>, bars: &[Bar]) -> Result<()>
where
    DB: DrawingBackend,
    CT: CoordTranslate<From = (f64, f64)>,
{
    chart
        .draw_series(bars.iter().map(|bar| {
            Rectangle::new(
                [(bar.left, 0.0), (bar.right, bar.count as f64)],
                bar.color.mix(0.9).filled(),
            )
        }))
        .map_err(chart_err)?;
    Ok(())
}

fn draw_count_labels<DB, CT>(chart: &mut ChartContext<DB, CT>, bars: &[Bar]) -> Result<()>
where
    DB: DrawingBackend,
    CT: CoordTranslate<From = (f64, f64)>,
{
    let style = TextStyle::from((FONT, 20).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(bars.iter().filter_map(|bar| {
            let label = bar.label.clone()?;
            Some(Text::new(label, (bar.center, bar.count as f64), style.clone()))
        }))
        .map_err(chart_err)?;
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    legend: &Legend,
    colormap: Colormap,
) -> Result<()> {
    let ValueRange { min, max } = legend.range;
    let (lo, hi) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };

    let mut bar = ChartBuilder::on(area)
        .margin_top(80)
        .margin_bottom(160)
        .margin_right(10)
        .set_label_area_size(LabelAreaPosition::Left, 50)
        .set_label_area_size(LabelAreaPosition::Right, 80)
        .build_cartesian_2d(0.0..1.0, lo..hi)
        .map_err(chart_err)?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(6)
        .y_label_formatter(&|v| format!("{v:.1}"))
        .y_label_style((FONT, 18))
        .y_desc(legend.label())
        .axis_desc_style((FONT, 20))
        .draw()
        .map_err(chart_err)?;

    let step = (hi - lo) / COLORBAR_STEPS as f64;
    bar.draw_series((0..COLORBAR_STEPS).map(|i| {
        let y0 = lo + step * i as f64;
        let t = (i as f64 + 0.5) / COLORBAR_STEPS as f64;
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], colormap.color_at(t).filled())
    }))
    .map_err(chart_err)?;
    Ok(())
}
