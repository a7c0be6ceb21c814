//! Light-curve plot rendering.
//!
//! Draws the normalized series, the threshold line and the dip markers onto
//! an RGB canvas and hands it to the [`PlotStore`]. The canvas is owned by a
//! single `render` call; nothing is retained between requests.

use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;
use uuid::Uuid;

use super::glyphs::{draw_text, draw_text_vertical, text_height, text_width};
use super::plot_store::{PlotArtifact, PlotStore, RenderError};

/// Colors used on the plot.
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const GRID: Rgb<u8> = Rgb([225, 225, 225]);
    pub const RED: Rgb<u8> = Rgb([220, 20, 20]); // Threshold + detected dips
}

const MARGIN_LEFT: u32 = 100;
const MARGIN_RIGHT: u32 = 24;
const MARGIN_TOP: u32 = 44;
const MARGIN_BOTTOM: u32 = 64;
const MIN_WIDTH: u32 = MARGIN_LEFT + MARGIN_RIGHT + 80;
const MIN_HEIGHT: u32 = MARGIN_TOP + MARGIN_BOTTOM + 60;

const MAX_TICKS: usize = 32;

const SERIES_RADIUS: i32 = 1;
const DIP_RADIUS: i32 = 3;

/// Inputs for one plot.
#[derive(Debug, Clone, Copy)]
pub struct PlotRequest<'a> {
    pub request_id: Uuid,
    pub star_id: &'a str,
    pub title: &'a str,
    pub time: &'a [f64],
    pub flux: &'a [f64],
    pub mask: &'a [bool],
    pub threshold: f64,
}

impl PlotRequest<'_> {
    fn has_dip(&self) -> bool {
        self.mask.iter().any(|&dip| dip)
    }
}

/// Produces a plot artifact for a light curve.
pub trait PlotRenderer: Send + Sync {
    fn render(&self, request: &PlotRequest<'_>) -> Result<PlotArtifact, RenderError>;
}

/// PNG renderer backed by a [`PlotStore`].
#[derive(Debug, Clone)]
pub struct PngPlotRenderer {
    store: PlotStore,
    width: u32,
    height: u32,
}

impl PngPlotRenderer {
    pub fn new(store: PlotStore, width: u32, height: u32) -> Self {
        Self {
            store,
            width,
            height,
        }
    }

    /// Draw the full figure in memory.
    pub fn draw(&self, request: &PlotRequest<'_>) -> Result<RgbImage, RenderError> {
        if self.width < MIN_WIDTH || self.height < MIN_HEIGHT {
            return Err(RenderError::InvalidCanvas {
                width: self.width,
                height: self.height,
            });
        }
        if request.time.len() != request.flux.len() || request.mask.len() != request.flux.len() {
            return Err(RenderError::LengthMismatch {
                time: request.time.len(),
                flux: request.flux.len(),
                mask: request.mask.len(),
            });
        }

        let mut image = RgbImage::from_pixel(self.width, self.height, colors::WHITE);
        let frame = Frame::fit(self.width, self.height, request);

        draw_axes(&mut image, &frame);

        for (&t, &f) in request.time.iter().zip(request.flux) {
            if let Some(point) = frame.project(t, f) {
                draw_filled_circle_mut(&mut image, point, SERIES_RADIUS, colors::BLACK);
            }
        }

        if let Some(y) = frame.project_y(request.threshold) {
            draw_dashed_hline(&mut image, frame.left, frame.right, y, colors::RED);
        }

        let has_dip = request.has_dip();
        if has_dip {
            for ((&t, &f), _) in request
                .time
                .iter()
                .zip(request.flux)
                .zip(request.mask)
                .filter(|(_, &dip)| dip)
            {
                if let Some(point) = frame.project(t, f) {
                    draw_filled_circle_mut(&mut image, point, DIP_RADIUS, colors::RED);
                }
            }
        }

        draw_legend(&mut image, &frame, request.threshold, has_dip);
        draw_labels(&mut image, request.title);

        Ok(image)
    }
}

impl PlotRenderer for PngPlotRenderer {
    fn render(&self, request: &PlotRequest<'_>) -> Result<PlotArtifact, RenderError> {
        let image = self.draw(request)?;
        let key = self
            .store
            .key_for(request.request_id, request.star_id, request.threshold);
        self.store.persist(&key, &image)
    }
}

/// Linear mapping from one data axis to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Axis {
    pub min: f64,
    pub max: f64,
}

impl Axis {
    /// Padded range over the finite values, or `[0, 1]` if there are none.
    fn fit(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 1.0));

        let span = max - min;
        // spans of a few ULPs cannot be subdivided into ticks
        let resolvable = span > min.abs().max(max.abs()) * 4.0 * f64::EPSILON;
        let pad = if resolvable {
            span * 0.05
        } else {
            (min.abs() * 0.01).max(0.01)
        };
        Self {
            min: min - pad,
            max: max + pad,
        }
    }

    fn fraction(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }
}

/// Plot area within the canvas plus its data axes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
    pub x: Axis,
    pub y: Axis,
}

impl Frame {
    pub(crate) fn fit(width: u32, height: u32, request: &PlotRequest<'_>) -> Self {
        let threshold = std::iter::once(request.threshold);
        Self {
            left: MARGIN_LEFT as i32,
            right: (width - MARGIN_RIGHT) as i32,
            top: MARGIN_TOP as i32,
            bottom: (height - MARGIN_BOTTOM) as i32,
            x: Axis::fit(request.time.iter().copied()),
            y: Axis::fit(request.flux.iter().copied().chain(threshold)),
        }
    }

    pub(crate) fn project_x(&self, t: f64) -> Option<i32> {
        if !t.is_finite() {
            return None;
        }
        let px = self.left as f64 + self.x.fraction(t) * (self.right - self.left) as f64;
        (px >= self.left as f64 && px <= self.right as f64).then(|| px.round() as i32)
    }

    pub(crate) fn project_y(&self, f: f64) -> Option<i32> {
        if !f.is_finite() {
            return None;
        }
        let py = self.bottom as f64 - self.y.fraction(f) * (self.bottom - self.top) as f64;
        (py >= self.top as f64 && py <= self.bottom as f64).then(|| py.round() as i32)
    }

    pub(crate) fn project(&self, t: f64, f: f64) -> Option<(i32, i32)> {
        Some((self.project_x(t)?, self.project_y(f)?))
    }
}

/// Tick positions at 1/2/5 × 10ⁿ steps, plus the decimals needed to print them.
pub(crate) fn nice_ticks(axis: &Axis, target: usize) -> (Vec<f64>, usize) {
    let span = axis.max - axis.min;
    if !(span.is_finite() && span > 0.0) || target == 0 {
        return (vec![axis.min], 0);
    }

    let raw = span / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = match raw / magnitude {
        n if n < 1.5 => 1.0,
        n if n < 3.0 => 2.0,
        n if n < 7.0 => 5.0,
        _ => 10.0,
    } * magnitude;

    let decimals = (-step.log10().floor()).max(0.0) as usize;
    let start = (axis.min / step).ceil() * step;
    let count = ((axis.max + step * 1e-9 - start) / step).floor();
    if !(count.is_finite() && count >= 0.0) {
        return (vec![axis.min], decimals);
    }

    let ticks = (0..=(count as usize).min(MAX_TICKS))
        .map(|i| start + i as f64 * step)
        // avoid printing "-0.0"
        .map(|value| if value.abs() < step * 1e-9 { 0.0 } else { value })
        .collect();
    (ticks, decimals)
}

fn draw_axes(image: &mut RgbImage, frame: &Frame) {
    let (x_ticks, x_decimals) = nice_ticks(&frame.x, 8);
    let (y_ticks, y_decimals) = nice_ticks(&frame.y, 6);

    for t in &x_ticks {
        if let Some(px) = frame.project_x(*t) {
            let x = px as f32;
            draw_line_segment_mut(
                image,
                (x, frame.top as f32),
                (x, frame.bottom as f32),
                colors::GRID,
            );
            draw_line_segment_mut(
                image,
                (x, frame.bottom as f32),
                (x, frame.bottom as f32 + 5.0),
                colors::BLACK,
            );
            let label = format!("{:.*}", x_decimals, t);
            let w = text_width(&label, 1) as i32;
            draw_text(image, px - w / 2, frame.bottom + 9, 1, colors::BLACK, &label);
        }
    }

    for f in &y_ticks {
        if let Some(py) = frame.project_y(*f) {
            let y = py as f32;
            draw_line_segment_mut(
                image,
                (frame.left as f32, y),
                (frame.right as f32, y),
                colors::GRID,
            );
            draw_line_segment_mut(
                image,
                (frame.left as f32 - 5.0, y),
                (frame.left as f32, y),
                colors::BLACK,
            );
            let label = format!("{:.*}", y_decimals, f);
            let w = text_width(&label, 1) as i32;
            let h = text_height(1) as i32;
            draw_text(image, frame.left - 9 - w, py - h / 2, 1, colors::BLACK, &label);
        }
    }

    let frame_rect = Rect::at(frame.left, frame.top).of_size(
        (frame.right - frame.left + 1) as u32,
        (frame.bottom - frame.top + 1) as u32,
    );
    draw_hollow_rect_mut(image, frame_rect, colors::BLACK);
}

fn draw_dashed_hline(image: &mut RgbImage, from: i32, to: i32, y: i32, color: Rgb<u8>) {
    const DASH: i32 = 8;
    const GAP: i32 = 5;
    let mut x = from;
    while x <= to {
        let end = (x + DASH - 1).min(to);
        draw_line_segment_mut(image, (x as f32, y as f32), (end as f32, y as f32), color);
        // double thickness so the line reads at small sizes
        draw_line_segment_mut(
            image,
            (x as f32, y as f32 + 1.0),
            (end as f32, y as f32 + 1.0),
            color,
        );
        x += DASH + GAP;
    }
}

fn draw_legend(image: &mut RgbImage, frame: &Frame, threshold: f64, has_dip: bool) {
    let mut entries: Vec<(LegendMark, String)> = vec![
        (LegendMark::Dot(SERIES_RADIUS, colors::BLACK), "Brightness".to_string()),
        (LegendMark::Dash(colors::RED), format!("Threshold {}", threshold)),
    ];
    if has_dip {
        entries.push((LegendMark::Dot(DIP_RADIUS, colors::RED), "Detected Dip".to_string()));
    }

    let line_height = text_height(1) as i32 + 8;
    let swatch = 24;
    let text_w = entries
        .iter()
        .map(|(_, label)| text_width(label, 1))
        .max()
        .unwrap_or(0) as i32;
    let box_w = 8 + swatch + 6 + text_w + 8;
    let box_h = 6 + line_height * entries.len() as i32;
    let box_x = frame.right - box_w - 8;
    let box_y = frame.top + 8;

    let rect = Rect::at(box_x, box_y).of_size(box_w as u32, box_h as u32);
    draw_filled_rect_mut(image, rect, colors::WHITE);
    draw_hollow_rect_mut(image, rect, colors::BLACK);

    for (row, (mark, label)) in entries.iter().enumerate() {
        let cy = box_y + 6 + row as i32 * line_height + text_height(1) as i32 / 2;
        let sx = box_x + 8;
        match mark {
            LegendMark::Dot(radius, color) => {
                draw_filled_circle_mut(image, (sx + swatch / 2, cy), *radius, *color);
            }
            LegendMark::Dash(color) => {
                draw_dashed_hline(image, sx, sx + swatch, cy, *color);
            }
        }
        draw_text(
            image,
            sx + swatch + 6,
            cy - text_height(1) as i32 / 2,
            1,
            colors::BLACK,
            label,
        );
    }
}

enum LegendMark {
    Dot(i32, Rgb<u8>),
    Dash(Rgb<u8>),
}

fn draw_labels(image: &mut RgbImage, title: &str) {
    let (width, height) = image.dimensions();

    let title_w = text_width(title, 2) as i32;
    draw_text(
        image,
        (width as i32 - title_w) / 2,
        (MARGIN_TOP as i32 - text_height(2) as i32) / 2,
        2,
        colors::BLACK,
        title,
    );

    let x_label = "Time (days)";
    let x_w = text_width(x_label, 2) as i32;
    let plot_mid_x = (MARGIN_LEFT as i32 + width as i32 - MARGIN_RIGHT as i32) / 2;
    draw_text(
        image,
        plot_mid_x - x_w / 2,
        height as i32 - text_height(2) as i32 - 10,
        2,
        colors::BLACK,
        x_label,
    );

    let y_label = "Normalized Brightness";
    let y_len = text_width(y_label, 2) as i32;
    let plot_mid_y = (MARGIN_TOP as i32 + height as i32 - MARGIN_BOTTOM as i32) / 2;
    draw_text_vertical(image, 10, plot_mid_y + y_len / 2, 2, colors::BLACK, y_label);
}
