//! Multi-panel line chart of every question's scores over time.

pub mod fonts;

use crate::grid::DataGrid;
use crate::style::{FALLBACK_COLOR, parse_hex_color};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_DPI: u32 = 300;
pub const MAX_DPI: u32 = 1200;
/// Largest canvas rendered, in pixels (RGB, so three bytes each).
pub const MAX_PIXELS: u64 = 64_000_000;

/// Panels per row.
pub const PANEL_COLUMNS: usize = 2;

const FIGURE_WIDTH_IN: f64 = 8.0;
const PANEL_HEIGHT_IN: f64 = 3.5;
const Y_MAX: f64 = 110.0;
const Y_TICK_STEP: usize = 20;
const NOTE_WRAP: usize = 5;
const JPEG_QUALITY: u8 = 95;

const GUIDE_COLOR: RGBColor = RGBColor(0xE0, 0xE0, 0xE0);
const MUTED_TEXT: RGBColor = RGBColor(0x55, 0x55, 0x55);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("chart rendering failed: {0}")]
    RenderFailure(String),
}

fn failure(err: impl fmt::Display) -> RenderError {
    RenderError::RenderFailure(err.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpg),
            other => Err(RenderError::RenderFailure(format!(
                "unsupported image format '{other}' (expected png or jpg)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub format: OutputFormat,
    pub dpi: u32,
    pub background: String,
    pub font_path: Option<PathBuf>,
    pub font_family: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            dpi: DEFAULT_DPI,
            background: "#FFFFFF".to_string(),
            font_path: None,
            font_family: "STKaiti".to_string(),
        }
    }
}

/// Canvas size in pixels for `n_items` panels.
pub fn canvas_size(n_items: usize, dpi: u32) -> (u32, u32) {
    let rows = n_items.div_ceil(PANEL_COLUMNS).max(1);
    let width = (FIGURE_WIDTH_IN * dpi as f64).round() as u32;
    let height = (PANEL_HEIGHT_IN * rows as f64 * dpi as f64).round() as u32;
    (width.max(1), height.max(1))
}

struct Metrics {
    dpi: f64,
}

impl Metrics {
    /// Points to pixels.
    fn px(&self, pt: f64) -> f64 {
        pt * self.dpi / 72.0
    }

    fn pxu(&self, pt: f64) -> u32 {
        self.px(pt).round().max(1.0) as u32
    }

    fn pxi(&self, pt: f64) -> i32 {
        self.px(pt).round() as i32
    }
}

struct Panel<'a> {
    index: usize,
    title: &'a str,
    color: RGBColor,
    points: Vec<(f64, f64)>,
    notes: Vec<String>,
}

/// Renders one panel per question in a two-column grid and encodes the
/// result as PNG or JPEG.
///
/// `colors` is matched to `items` by position; missing or invalid entries
/// fall back to a fixed sky blue.
pub fn render_chart<S, T, C>(
    grid: &DataGrid,
    items: &[S],
    time_points: &[T],
    colors: &[C],
    options: &ChartOptions,
) -> Result<Vec<u8>, RenderError>
where
    S: AsRef<str>,
    T: AsRef<str>,
    C: AsRef<str>,
{
    if items.is_empty() {
        return Err(RenderError::RenderFailure("no questions to plot".into()));
    }
    if !(1..=MAX_DPI).contains(&options.dpi) {
        return Err(RenderError::RenderFailure(format!(
            "dpi {} outside 1..={MAX_DPI}",
            options.dpi
        )));
    }
    let (width, height) = canvas_size(items.len(), options.dpi);
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_PIXELS {
        return Err(RenderError::RenderFailure(format!(
            "canvas {width}x{height} at {} dpi exceeds {MAX_PIXELS} pixels",
            options.dpi
        )));
    }
    let background = parse_hex_color(&options.background).map_err(failure)?;
    let font = fonts::resolve(options.font_path.as_deref(), &options.font_family);

    let fallback = parse_hex_color(FALLBACK_COLOR).map_err(failure)?;

    let labels: Vec<&str> = time_points.iter().map(|tp| tp.as_ref()).collect();
    let panels: Vec<Panel> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let item = item.as_ref();
            let color = colors
                .get(index)
                .and_then(|c| parse_hex_color(c.as_ref()).ok())
                .unwrap_or(fallback);
            let (points, notes): (Vec<_>, Vec<_>) = labels
                .iter()
                .enumerate()
                .map(|(x, tp)| {
                    let entry = grid.entry(item, tp).cloned().unwrap_or_default();
                    ((x as f64, entry.score), entry.note)
                })
                .unzip();
            Panel {
                index,
                title: item,
                color,
                points,
                notes,
            }
        })
        .collect();

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw(&root, &panels, &labels, background, font.as_deref(), options.dpi).map_err(failure)?;
        root.present().map_err(failure)?;
    }

    let bytes = encode_image(&buffer, (width, height), options.format, options.dpi)?;
    tracing::info!(
        questions = items.len(),
        time_points = labels.len(),
        width,
        height,
        format = options.format.extension(),
        bytes = bytes.len(),
        "rendered chart"
    );
    Ok(bytes)
}

fn draw<DB>(
    root: &DrawingArea<DB, Shift>,
    panels: &[Panel],
    labels: &[&str],
    background: RGBColor,
    font: Option<&str>,
    dpi: u32,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&background)?;
    let metrics = Metrics { dpi: dpi as f64 };
    let rows = panels.len().div_ceil(PANEL_COLUMNS);
    let areas = root.split_evenly((rows, PANEL_COLUMNS));

    for (panel, area) in panels.iter().zip(areas.iter()) {
        draw_panel(root, area, panel, labels, font, &metrics)?;
    }
    Ok(())
}

fn draw_panel<DB>(
    root: &DrawingArea<DB, Shift>,
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    labels: &[&str],
    font: Option<&str>,
    m: &Metrics,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let first_row = panel.index < PANEL_COLUMNS;
    let x_max = labels.len().max(1) as f64 - 0.5;
    let top = if first_row { m.px(54.0) } else { m.px(36.0) };

    let mut chart = ChartBuilder::on(area)
        .margin(m.pxu(8.0))
        .margin_top(top.round() as u32)
        .set_label_area_size(LabelAreaPosition::Left, m.pxu(22.0))
        .build_cartesian_2d(-0.5f64..x_max, 0f64..Y_MAX)?;

    for y in (0..=100).step_by(Y_TICK_STEP) {
        let y = y as f64;
        chart.draw_series(LineSeries::new(
            vec![(-0.5, y), (x_max, y)],
            GUIDE_COLOR.stroke_width(1),
        ))?;
    }
    chart.draw_series(std::iter::once(Rectangle::new(
        [(-0.5, 0.0), (x_max, Y_MAX)],
        GUIDE_COLOR.stroke_width(m.pxu(1.5)),
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(-0.5, 0.0), (x_max, 0.0)],
        panel.color.stroke_width(m.pxu(2.0)),
    )))?;

    let color = panel.color;
    chart.draw_series(AreaSeries::new(
        panel.points.iter().copied(),
        0.0,
        color.mix(0.1).filled(),
    ))?;
    chart.draw_series(LineSeries::new(
        panel.points.iter().copied(),
        color.mix(0.9).stroke_width(m.pxu(2.0)),
    ))?;
    chart.draw_series(
        panel
            .points
            .iter()
            .map(|&p| Circle::new(p, m.pxu(6.0), color.mix(0.2).filled())),
    )?;
    chart.draw_series(
        panel
            .points
            .iter()
            .map(|&p| Circle::new(p, m.pxu(4.0), WHITE.filled())),
    )?;
    chart.draw_series(
        panel
            .points
            .iter()
            .map(|&p| Circle::new(p, m.pxu(3.0), color.filled())),
    )?;

    let Some(family) = font else {
        return Ok(());
    };
    let text = |size: f64| FontDesc::new(FontFamily::Name(family), m.px(size), FontStyle::Normal);

    let (width, _) = area.dim_in_pixel();
    area.draw(&Text::new(
        panel.title.to_string(),
        ((width / 2) as i32, m.pxi(6.0)),
        text(18.0)
            .color(&color)
            .pos(Pos::new(HPos::Center, VPos::Top)),
    ))?;

    let score_style = text(10.0)
        .color(&color)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(panel.points.iter().map(|&(x, y)| {
        EmptyElement::at((x, y))
            + Text::new(
                format!("{}", y.trunc() as i64),
                (0, -m.pxi(5.0)),
                score_style.clone(),
            )
    }))?;

    let note_style = text(11.0)
        .color(&MUTED_TEXT.mix(0.9))
        .pos(Pos::new(HPos::Center, VPos::Top));
    let line_height = m.pxi(13.0);
    for (&(x, y), note) in panel.points.iter().zip(&panel.notes) {
        for (k, line) in wrap_note(note).into_iter().enumerate() {
            chart.draw_series(std::iter::once(
                EmptyElement::at((x, y))
                    + Text::new(line, (0, m.pxi(6.0) + k as i32 * line_height), note_style.clone()),
            ))?;
        }
    }

    let tick_style = text(8.0)
        .color(&MUTED_TEXT.mix(0.4))
        .pos(Pos::new(HPos::Right, VPos::Center));
    for y in (0..=100).step_by(Y_TICK_STEP) {
        let (px, py) = chart.backend_coord(&(-0.5, y as f64));
        root.draw(&Text::new(
            y.to_string(),
            (px - m.pxi(4.0), py),
            tick_style.clone(),
        ))?;
    }

    if first_row {
        let label_style = text(8.0)
            .color(&color)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        for (x, label) in labels.iter().enumerate() {
            let (px, py) = chart.backend_coord(&(x as f64, Y_MAX));
            root.draw(&Text::new(
                label.to_string(),
                (px, py - m.pxi(4.0)),
                label_style.clone(),
            ))?;
        }
    }

    Ok(())
}

/// Splits a note into lines of at most five characters.
pub fn wrap_note(note: &str) -> Vec<String> {
    let chars: Vec<char> = note.chars().collect();
    chars
        .chunks(NOTE_WRAP)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn encode_image(
    buffer: &[u8],
    (width, height): (u32, u32),
    format: OutputFormat,
    dpi: u32,
) -> Result<Vec<u8>, RenderError> {
    let mut out = Vec::new();
    match format {
        OutputFormat::Png => PngEncoder::new(&mut out)
            .write_image(buffer, width, height, ExtendedColorType::Rgb8)
            .map_err(failure)?,
        OutputFormat::Jpg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            let density = u16::try_from(dpi).unwrap_or(u16::MAX);
            encoder.set_pixel_density(PixelDensity::dpi(density));
            encoder
                .write_image(buffer, width, height, ExtendedColorType::Rgb8)
                .map_err(failure)?
        }
    }
    Ok(out)
}
