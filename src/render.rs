//! Raster plots of trajectories, written with the `image` crate.
//!
//! Sizes follow matplotlib conventions: line widths in points, marker sizes as
//! areas in points², converted to pixels through the figure dpi. Axes use equal
//! scaling so a meter is the same length in x and y.

use std::path::Path;

use anyhow::{Context, Result};
use ego_kinematics::{Bounds, Trajectory, Waypoint};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};
use tracing::info;

use crate::config::FigureSettings;
use crate::scenario::{Color, ScenarioRun};

const POINTS_PER_INCH: f32 = 72.0;
/// Fraction of the data range added as padding on each side.
const PADDING: f64 = 0.06;
/// Smallest plotted extent (m), so a lone point still gets a sane scale.
const MIN_EXTENT: f64 = 1.0;
const TARGET_GRID_LINES: f64 = 8.0;
/// Side of one bitmap glyph cell before scaling.
const GLYPH_PX: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub at: Waypoint,
    pub shape: Shape,
    /// matplotlib `s`: marker area in points².
    pub area_pt2: f32,
    pub fill: Color,
    pub edge: Option<Color>,
    /// Legend name; unlabelled markers stay out of the legend.
    pub label: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct Series<'a> {
    pub label: &'a str,
    pub points: &'a [Waypoint],
    pub color: Color,
    pub opacity: f32,
    pub width_pt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub background: Color,
    pub grid: Color,
    pub grid_alpha: f32,
    pub grid_dashed: bool,
    pub title: Color,
    pub axis_label: Color,
    pub legend_frame: Color,
}

impl Style {
    /// matplotlib `dark_background` with a faint dashed grid.
    pub const DARK: Style = Style {
        background: Color::BLACK,
        grid: Color::WHITE,
        grid_alpha: 0.15,
        grid_dashed: true,
        title: Color::WHITE,
        axis_label: Color::rgb(0xaa, 0xaa, 0xaa),
        legend_frame: Color::rgb(0x11, 0x11, 0x11),
    };

    /// Default white axes with a solid light grid.
    pub const LIGHT: Style = Style {
        background: Color::WHITE,
        grid: Color::rgb(0xb0, 0xb0, 0xb0),
        grid_alpha: 0.6,
        grid_dashed: false,
        title: Color::BLACK,
        axis_label: Color::BLACK,
        legend_frame: Color::rgb(0xf0, 0xf0, 0xf0),
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Swatch {
    Line { width_pt: f32, opacity: f32 },
    Marker(Shape),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LegendEntry<'a> {
    label: &'a str,
    color: Color,
    swatch: Swatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Orientation {
    Horizontal,
    /// Rotated a quarter turn counter-clockwise, reading bottom to top.
    Vertical,
}

/// A figure: grid and series first, then the legend, markers above it, and
/// the title and axis labels in the margins.
#[derive(Debug, Clone)]
pub struct Plot<'a> {
    pub width: u32,
    pub height: u32,
    pub dpi: f32,
    pub style: Style,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series<'a>>,
    pub markers: Vec<Marker>,
}

/// Maps world meters to pixel coordinates with equal scaling on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    bounds: Bounds,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    height: f64,
}

impl Viewport {
    pub fn fit(data: Bounds, width: u32, height: u32, margin_px: f64) -> Self {
        let mut bounds = data;
        let pad_x = (bounds.width() * PADDING).max(MIN_EXTENT / 2.0);
        let pad_y = (bounds.height() * PADDING).max(MIN_EXTENT / 2.0);
        bounds.min_x -= pad_x;
        bounds.max_x += pad_x;
        bounds.min_y -= pad_y;
        bounds.max_y += pad_y;

        let avail_w = (width as f64 - 2.0 * margin_px).max(1.0);
        let avail_h = (height as f64 - 2.0 * margin_px).max(1.0);
        let scale = (avail_w / bounds.width()).min(avail_h / bounds.height());
        // Center the data in whichever axis has slack.
        let offset_x = margin_px + (avail_w - bounds.width() * scale) / 2.0;
        let offset_y = margin_px + (avail_h - bounds.height() * scale) / 2.0;
        Viewport {
            bounds,
            scale,
            offset_x,
            offset_y,
            height: height as f64,
        }
    }

    /// Pixels per meter.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Visible world region.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// World point to pixel (y grows downward).
    pub fn to_pixel(&self, p: Waypoint) -> (f64, f64) {
        let px = self.offset_x + (p.x - self.bounds.min_x) * self.scale;
        let py = self.height - (self.offset_y + (p.y - self.bounds.min_y) * self.scale);
        (px, py)
    }
}

/// A 1-2-5 step giving roughly `TARGET_GRID_LINES` lines across `extent`.
pub fn nice_step(extent: f64) -> f64 {
    if !(extent > 0.0) || !extent.is_finite() {
        return 1.0;
    }
    let raw = extent / TARGET_GRID_LINES;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual < 1.5 {
        1.0
    } else if residual < 3.5 {
        2.0
    } else if residual < 7.5 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

impl<'a> Plot<'a> {
    pub fn new(figure: &FigureSettings, style: Style) -> Self {
        let (width, height) = figure.pixel_size();
        Plot {
            width,
            height,
            dpi: figure.dpi,
            style,
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            series: Vec::new(),
            markers: Vec::new(),
        }
    }

    fn points_to_px(&self, points: f32) -> f64 {
        f64::from(points * self.dpi / POINTS_PER_INCH)
    }

    /// Bounding box of every series point and marker.
    pub fn data_bounds(&self) -> Bounds {
        let mut all = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .chain(self.markers.iter().map(|m| m.at));
        let mut bounds = Bounds::at(all.next().unwrap_or_default());
        for p in all {
            bounds.include(p);
        }
        bounds
    }

    pub fn viewport(&self) -> Viewport {
        let margin = self.points_to_px(24.0);
        Viewport::fit(self.data_bounds(), self.width, self.height, margin)
    }

    pub fn render(&self) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, opaque(self.style.background));
        let view = self.viewport();

        self.draw_grid(&mut canvas, &view);
        for series in &self.series {
            let width = self.points_to_px(series.width_pt);
            let pixels: Vec<(f64, f64)> = series.points.iter().map(|p| view.to_pixel(*p)).collect();
            stroke_polyline(&mut canvas, &pixels, width, series.color, series.opacity);
        }
        self.draw_legend(&mut canvas, &view);
        for marker in &self.markers {
            self.draw_marker(&mut canvas, &view, marker);
        }
        self.draw_labels(&mut canvas);
        canvas
    }

    /// Render and write a PNG, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
        self.render()
            .save(path)
            .with_context(|| format!("writing plot to {}", path.display()))?;
        info!(
            path = %path.display(),
            width = self.width,
            height = self.height,
            px_per_m = self.viewport().scale(),
            "Plot saved"
        );
        Ok(())
    }

    fn draw_grid(&self, canvas: &mut RgbaImage, view: &Viewport) {
        let bounds = view.bounds();
        let step = nice_step(bounds.width().max(bounds.height()));
        let dash = if self.style.grid_dashed {
            Some(self.points_to_px(3.0).max(2.0) as u32)
        } else {
            None
        };
        let (color, alpha) = (self.style.grid, self.style.grid_alpha);

        let mut x = (bounds.min_x / step).ceil() * step;
        while x <= bounds.max_x {
            let (px, _) = view.to_pixel(Waypoint::new(x, 0.0));
            vertical_line(canvas, px.round() as i64, dash, color, alpha);
            x += step;
        }
        let mut y = (bounds.min_y / step).ceil() * step;
        while y <= bounds.max_y {
            let (_, py) = view.to_pixel(Waypoint::new(0.0, y));
            horizontal_line(canvas, py.round() as i64, dash, color, alpha);
            y += step;
        }
    }

    fn draw_marker(&self, canvas: &mut RgbaImage, view: &Viewport, marker: &Marker) {
        let (cx, cy) = view.to_pixel(marker.at);
        // matplotlib `s` is the area of the marker's bounding square.
        let side = self.points_to_px(marker.area_pt2.sqrt());
        let edge_px = self.points_to_px(1.0).max(1.0);
        let half = side / 2.0;
        match marker.shape {
            Shape::Circle => {
                if let Some(edge) = marker.edge {
                    fill_circle(canvas, cx, cy, half, edge, 1.0);
                    fill_circle(canvas, cx, cy, (half - edge_px).max(0.0), marker.fill, 1.0);
                } else {
                    fill_circle(canvas, cx, cy, half, marker.fill, 1.0);
                }
            }
            Shape::Square => {
                if let Some(edge) = marker.edge {
                    fill_rect(canvas, cx - half, cy - half, side, side, edge, 1.0);
                    let inner = (side - 2.0 * edge_px).max(0.0);
                    fill_rect(canvas, cx - inner / 2.0, cy - inner / 2.0, inner, inner, marker.fill, 1.0);
                } else {
                    fill_rect(canvas, cx - half, cy - half, side, side, marker.fill, 1.0);
                }
            }
        }
    }

    /// Glyph scale for text `size_pt` tall, shrunk until `chars` glyphs fit in `max_width` px.
    fn text_scale(&self, size_pt: f32, chars: usize, max_width: f64) -> u32 {
        let cell = f64::from(GLYPH_PX);
        let wanted = (self.points_to_px(size_pt) / cell).round().max(1.0);
        let fits = (max_width / (chars.max(1) as f64 * cell)).floor().max(1.0);
        wanted.min(fits) as u32
    }

    fn legend_entries(&self) -> Vec<LegendEntry<'_>> {
        let lines = self.series.iter().filter(|s| !s.label.is_empty()).map(|s| LegendEntry {
            label: s.label,
            color: s.color,
            swatch: Swatch::Line {
                width_pt: s.width_pt,
                opacity: s.opacity,
            },
        });
        let markers = self.markers.iter().filter_map(|m| {
            m.label.map(|label| LegendEntry {
                label,
                color: m.fill,
                swatch: Swatch::Marker(m.shape),
            })
        });
        lines.chain(markers).collect()
    }

    /// Framed legend in the top-left corner of the axes: a swatch and a name per entry.
    fn draw_legend(&self, canvas: &mut RgbaImage, view: &Viewport) {
        let entries = self.legend_entries();
        if entries.is_empty() {
            return;
        }
        let (left, top) = view.to_pixel(Waypoint::new(view.bounds().min_x, view.bounds().max_y));
        let pad = self.points_to_px(6.0);
        let swatch_w = self.points_to_px(20.0);
        let longest = entries.iter().map(|e| e.label.chars().count()).max().unwrap_or(0);
        let scale = self.text_scale(10.0, longest, f64::from(self.width) / 2.0);
        let text_h = f64::from(GLYPH_PX * scale);
        let row_h = self.points_to_px(14.0).max(text_h + 2.0);
        let box_w = pad * 3.0 + swatch_w + text_width(longest, scale);
        let box_h = pad * 2.0 + row_h * entries.len() as f64;
        let (x0, y0) = (left + pad, top + pad);

        fill_rect(canvas, x0, y0, box_w, box_h, self.style.legend_frame, 0.9);
        for (i, entry) in entries.iter().enumerate() {
            let mid = y0 + pad + row_h * i as f64 + row_h / 2.0;
            let sx = x0 + pad;
            match entry.swatch {
                Swatch::Line { width_pt, opacity } => {
                    let thickness = self.points_to_px(width_pt).max(1.0);
                    fill_rect(canvas, sx, mid - thickness / 2.0, swatch_w, thickness, entry.color, opacity);
                }
                Swatch::Marker(Shape::Circle) => {
                    fill_circle(canvas, sx + swatch_w / 2.0, mid, text_h / 2.0, entry.color, 1.0)
                }
                Swatch::Marker(Shape::Square) => {
                    let side = text_h;
                    fill_rect(canvas, sx + (swatch_w - side) / 2.0, mid - side / 2.0, side, side, entry.color, 1.0)
                }
            }
            draw_text(
                canvas,
                entry.label,
                (sx + swatch_w + pad).round() as i64,
                (mid - text_h / 2.0).round() as i64,
                scale,
                self.style.title,
                Orientation::Horizontal,
            );
        }
    }

    /// Title centred in the top margin, x label in the bottom margin, y label up the left edge.
    fn draw_labels(&self, canvas: &mut RgbaImage) {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let pad = self.points_to_px(4.0);

        if !self.title.is_empty() {
            let chars = self.title.chars().count();
            let scale = self.text_scale(16.0, chars, w * 0.95);
            let x = (w - text_width(chars, scale)) / 2.0;
            let at = (x.round() as i64, pad.round() as i64);
            draw_text(canvas, &self.title, at.0, at.1, scale, self.style.title, Orientation::Horizontal);
        }
        if !self.x_label.is_empty() {
            let chars = self.x_label.chars().count();
            let scale = self.text_scale(12.0, chars, w * 0.9);
            let x = (w - text_width(chars, scale)) / 2.0;
            let y = h - pad - f64::from(GLYPH_PX * scale);
            let color = self.style.axis_label;
            draw_text(canvas, &self.x_label, x.round() as i64, y.round() as i64, scale, color, Orientation::Horizontal);
        }
        if !self.y_label.is_empty() {
            let chars = self.y_label.chars().count();
            let scale = self.text_scale(12.0, chars, h * 0.9);
            let bottom = (h + text_width(chars, scale)) / 2.0;
            let color = self.style.axis_label;
            draw_text(canvas, &self.y_label, pad.round() as i64, bottom.round() as i64, scale, color, Orientation::Vertical);
        }
    }
}

/// Dark multi-scenario figure: one line and end marker per run, ego square at the origin.
pub fn verification_plot<'a>(runs: &'a [ScenarioRun], figure: &FigureSettings) -> Plot<'a> {
    let mut plot = Plot::new(figure, Style::DARK);
    plot.title = "Alpamayo-R1 Motion Planning Engine: Multi-Scenario Verification".to_string();
    plot.x_label = "Longitudinal Distance (meters)".to_string();
    plot.y_label = "Lateral Offset (meters)".to_string();
    for run in runs {
        plot.series.push(Series {
            label: &run.scenario.name,
            points: run.trajectory.waypoints(),
            color: run.scenario.color,
            opacity: run.scenario.opacity,
            width_pt: 3.0,
        });
        if let Some(end) = run.trajectory.last() {
            plot.markers.push(Marker {
                at: end,
                shape: Shape::Circle,
                area_pt2: 100.0,
                fill: run.scenario.color,
                edge: Some(Color::WHITE),
                label: None,
            });
        }
    }
    plot.markers.push(ego_marker());
    plot
}

/// Light single-trajectory figure: blue path, green start, red end.
pub fn prediction_plot<'a>(trajectory: &'a Trajectory, figure: &FigureSettings) -> Plot<'a> {
    let mut plot = Plot::new(figure, Style::LIGHT);
    plot.title = "Predicted Safe 6-Second Trajectory".to_string();
    plot.x_label = "X (meters)".to_string();
    plot.y_label = "Y (meters)".to_string();
    plot.series.push(Series {
        label: "Predicted Trajectory",
        points: trajectory.waypoints(),
        color: Color::BLUE,
        opacity: 1.0,
        width_pt: 2.0,
    });
    let ends = [
        (trajectory.first(), Color::GREEN, "Start"),
        (trajectory.last(), Color::RED, "End"),
    ];
    for (at, fill, label) in ends {
        if let Some(at) = at {
            plot.markers.push(Marker {
                at,
                shape: Shape::Circle,
                area_pt2: 100.0,
                fill,
                edge: None,
                label: Some(label),
            });
        }
    }
    plot
}

/// The reference vehicle: a yellow square at the origin.
pub fn ego_marker() -> Marker {
    Marker {
        at: Waypoint::origin(),
        shape: Shape::Square,
        area_pt2: 200.0,
        fill: Color::YELLOW,
        edge: None,
        label: Some("Ego Vehicle"),
    }
}

fn text_width(chars: usize, scale: u32) -> f64 {
    chars as f64 * f64::from(GLYPH_PX * scale)
}

/// 8×8 bitmap text, each glyph pixel drawn as a `scale`-sized block.
///
/// Horizontal text is anchored at its top-left corner; vertical text at its
/// bottom-left corner, with the glyph tops facing left.
fn draw_text(canvas: &mut RgbaImage, text: &str, x: i64, y: i64, scale: u32, color: Color, orientation: Orientation) {
    let s = i64::from(scale.max(1));
    let cell = i64::from(GLYPH_PX) * s;
    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0; 8]);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_PX {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                let along = i as i64 * cell + i64::from(col) * s;
                let across = row as i64 * s;
                let (px, py) = match orientation {
                    Orientation::Horizontal => (x + along, y + across),
                    Orientation::Vertical => (x + across, y - along - s),
                };
                for dy in 0..s {
                    for dx in 0..s {
                        blend(canvas, px + dx, py + dy, color, 1.0);
                    }
                }
            }
        }
    }
}

fn opaque(c: Color) -> Rgba<u8> {
    Rgba([c.r, c.g, c.b, 255])
}

fn blend(canvas: &mut RgbaImage, x: i64, y: i64, color: Color, alpha: f32) {
    if x < 0 || y < 0 || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height()) {
        return;
    }
    let a = alpha.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let mix = |src: u8, dst: u8| (f32::from(src) * a + f32::from(dst) * (1.0 - a)).round() as u8;
    *dst = Rgba([
        mix(color.r, dst[0]),
        mix(color.g, dst[1]),
        mix(color.b, dst[2]),
        255,
    ]);
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (qx, qy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - qx).powi(2) + (p.1 - qy).powi(2)).sqrt()
}

/// Anti-aliased thick polyline. Coverage is accumulated in a mask first so
/// overlapping segment joints are not blended twice.
fn stroke_polyline(canvas: &mut RgbaImage, pixels: &[(f64, f64)], width: f64, color: Color, opacity: f32) {
    let (w, h) = (canvas.width() as usize, canvas.height() as usize);
    if pixels.is_empty() || w == 0 || h == 0 {
        return;
    }
    let half = (width / 2.0).max(0.5);
    let mut mask = vec![0f32; w * h];
    let segments: Vec<((f64, f64), (f64, f64))> = if pixels.len() == 1 {
        vec![(pixels[0], pixels[0])]
    } else {
        pixels.windows(2).map(|s| (s[0], s[1])).collect()
    };

    for (a, b) in segments {
        let x0 = (a.0.min(b.0) - half - 1.0).floor().max(0.0) as usize;
        let x1 = ((a.0.max(b.0) + half + 1.0).ceil().max(0.0) as usize).min(w - 1);
        let y0 = (a.1.min(b.1) - half - 1.0).floor().max(0.0) as usize;
        let y1 = ((a.1.max(b.1) + half + 1.0).ceil().max(0.0) as usize).min(h - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = distance_to_segment((x as f64 + 0.5, y as f64 + 0.5), a, b);
                let coverage = (half + 0.5 - d).clamp(0.0, 1.0) as f32;
                let cell = &mut mask[y * w + x];
                *cell = cell.max(coverage);
            }
        }
    }

    for (i, coverage) in mask.into_iter().enumerate() {
        if coverage > 0.0 {
            blend(canvas, (i % w) as i64, (i / w) as i64, color, coverage * opacity);
        }
    }
}

fn fill_circle(canvas: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Color, alpha: f32) {
    let x0 = (cx - radius - 1.0).floor() as i64;
    let x1 = (cx + radius + 1.0).ceil() as i64;
    let y0 = (cy - radius - 1.0).floor() as i64;
    let y1 = (cy + radius + 1.0).ceil() as i64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let d = ((x as f64 + 0.5 - cx).powi(2) + (y as f64 + 0.5 - cy).powi(2)).sqrt();
            let coverage = (radius + 0.5 - d).clamp(0.0, 1.0) as f32;
            if coverage > 0.0 {
                blend(canvas, x, y, color, coverage * alpha);
            }
        }
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: f64, y: f64, w: f64, h: f64, color: Color, alpha: f32) {
    let (x0, x1) = (x.round() as i64, (x + w).round() as i64);
    let (y0, y1) = (y.round() as i64, (y + h).round() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            blend(canvas, px, py, color, alpha);
        }
    }
}

fn vertical_line(canvas: &mut RgbaImage, x: i64, dash: Option<u32>, color: Color, alpha: f32) {
    for y in 0..canvas.height() {
        if dash.is_none_or(|d| (y / d) % 2 == 0) {
            blend(canvas, x, i64::from(y), color, alpha);
        }
    }
}

fn horizontal_line(canvas: &mut RgbaImage, y: i64, dash: Option<u32>, color: Color, alpha: f32) {
    for x in 0..canvas.width() {
        if dash.is_none_or(|d| (x / d) % 2 == 0) {
            blend(canvas, i64::from(x), y, color, alpha);
        }
    }
}
