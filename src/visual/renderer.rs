use std::f32::consts::PI;

use super::state::RenderState;
use super::theme::{ThemeState, Tunables};
use super::transform;
use super::Algorithm;
use crate::error::VizError;
use crate::render::bitmap::Bitmap;
use crate::render::canvas::{DrawContext, FillRule, LinearGradient, Paint, Point, Rgba};

/// Whether a frame may advance the animation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameKind {
    /// Regular loop frame; `elapsed` is the time since the previous one.
    Animated { elapsed: f32 },
    /// Repaint of the current state (e.g. after a theme change while paused).
    Still,
}

impl FrameKind {
    /// Multiplier applied to per-frame steps, or `None` when nothing may move.
    fn step(self, tunables: &Tunables) -> Option<f32> {
        match self {
            FrameKind::Still => None,
            FrameKind::Animated { elapsed } => Some(match tunables.reference_hz {
                Some(hz) if hz > 0.0 => elapsed.max(0.0) * hz,
                _ => 1.0,
            }),
        }
    }
}

/// Pixel geometry for one canvas size.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    scale: f32,
    width: f32,
    height: f32,
    cx: f32,
    cy: f32,
    radius: f32,
    cover_radius: f32,
}

impl Geometry {
    fn new(t: &Tunables, width: usize, height: usize) -> Self {
        let scale = ThemeState::scale_for(width, height);
        let (width, height) = (width as f32, height as f32);
        Self {
            scale,
            width,
            height,
            cx: width / 2.0,
            cy: height / 2.0,
            radius: t.radius * scale,
            cover_radius: (t.radius - t.cover_inset).max(0.0) * scale,
        }
    }

    /// Points evenly spaced around the circle from angle π, pushed outwards by
    /// `max(magnitude * gain, floor)` reference pixels.
    fn loop_points(&self, samples: &[u8], gain: f32, floor: f32) -> Vec<Point> {
        let n = samples.len() as f32;
        samples
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                let angle = PI + (i as f32 / n) * 2.0 * PI;
                let r = self.radius + (m as f32 * gain).max(floor) * self.scale;
                (self.cx + r * angle.cos(), self.cy + r * angle.sin())
            })
            .collect()
    }
}

struct Backdrop {
    key: (u64, usize, usize),
    bitmap: Bitmap,
}

/// Draws one frame of the active algorithm and owns its animation state.
pub struct VisualizationRenderer {
    algorithm: Algorithm,
    state: RenderState,
    backdrop: Option<Backdrop>,
}

impl VisualizationRenderer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            state: RenderState::default(),
            backdrop: None,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Switch algorithm; returns whether anything changed.
    pub fn select(&mut self, algorithm: Algorithm) -> bool {
        if algorithm == self.algorithm {
            return false;
        }
        log::info!("Algorithm {} -> {}", self.algorithm, algorithm);
        self.algorithm = algorithm;
        self.state.on_algorithm_change();
        true
    }

    pub fn draw(
        &mut self,
        ctx: &mut DrawContext,
        spectrum: &[u8],
        cover: Option<&Bitmap>,
        theme: &ThemeState,
        kind: FrameKind,
    ) {
        let tunables = *theme.tunables();
        let geo = Geometry::new(&tunables, ctx.width(), ctx.height());
        let step = kind.step(&tunables);

        ctx.clear();
        if let Err(err) = self.draw_backdrop(ctx, cover, &tunables, &geo) {
            log::trace!("Backdrop skipped: {}", err);
        }

        match self.algorithm {
            Algorithm::Arc => {
                if tunables.dotted_ghost {
                    draw_dotted(ctx, spectrum, theme, &geo);
                }
                self.draw_cover_logged(ctx, cover, &tunables, &geo, step);
                draw_arc(ctx, spectrum, theme, &geo);
            }
            Algorithm::ArcLine => {
                self.draw_cover_logged(ctx, cover, &tunables, &geo, step);
                self.draw_arc_line(ctx, spectrum, theme, &geo, step);
            }
            Algorithm::ArcLineDotted => {
                draw_dotted(ctx, spectrum, theme, &geo);
                self.draw_cover_logged(ctx, cover, &tunables, &geo, step);
            }
            Algorithm::Bar => self.draw_bar(ctx, spectrum, &tunables, &geo, step),
        }
    }

    fn draw_backdrop(
        &mut self,
        ctx: &mut DrawContext,
        cover: Option<&Bitmap>,
        t: &Tunables,
        geo: &Geometry,
    ) -> Result<(), VizError> {
        let cover = cover.ok_or(VizError::MissingCoverImage)?;
        let key = (cover.id(), ctx.width(), ctx.height());
        if self.backdrop.as_ref().map(|b| b.key) != Some(key) {
            // blur is given in canvas pixels; the cover is stretched to twice
            // the canvas width
            let stretch = (2.0 * geo.width / cover.width().max(1) as f32).max(1e-3);
            let sigma = (t.backdrop_blur * geo.scale / stretch).max(0.5);
            log::debug!("Blurring {}x{} cover backdrop, sigma {:.1}", cover.width(), cover.height(), sigma);
            self.backdrop = cover.blurred(sigma).map(|bitmap| Backdrop { key, bitmap });
        }
        if let Some(backdrop) = &self.backdrop {
            ctx.draw_bitmap(&backdrop.bitmap, -geo.cx, -geo.cy, geo.width * 2.0, geo.height * 2.0);
        }
        Ok(())
    }

    fn draw_cover_logged(
        &mut self,
        ctx: &mut DrawContext,
        cover: Option<&Bitmap>,
        t: &Tunables,
        geo: &Geometry,
        step: Option<f32>,
    ) {
        if let Err(err) = self.draw_cover(ctx, cover, t, geo, step) {
            log::trace!("Cover skipped: {}", err);
        }
    }

    fn draw_cover(
        &mut self,
        ctx: &mut DrawContext,
        cover: Option<&Bitmap>,
        t: &Tunables,
        geo: &Geometry,
        step: Option<f32>,
    ) -> Result<(), VizError> {
        let cover = cover.ok_or(VizError::MissingCoverImage)?;
        let r = geo.cover_radius;
        ctx.save();
        ctx.begin_path();
        ctx.circle(geo.cx, geo.cy, r);
        ctx.clip();
        ctx.translate(geo.cx, geo.cy);
        ctx.rotate(self.state.rotation_angle);
        ctx.translate(-geo.cx, -geo.cy);
        ctx.draw_bitmap(cover, geo.cx - r, geo.cy - r, r * 2.0, r * 2.0);
        ctx.restore();

        if let Some(factor) = step {
            self.state.rotation_angle += t.rotation_step * factor;
        }
        Ok(())
    }

    fn draw_arc_line(
        &mut self,
        ctx: &mut DrawContext,
        spectrum: &[u8],
        theme: &ThemeState,
        geo: &Geometry,
        step: Option<f32>,
    ) {
        let t = theme.tunables();
        let shaped = transform::reshape(spectrum, Algorithm::ArcLine, t.dotted_stride);
        if shaped.is_empty() {
            return;
        }
        let paint = Paint::Solid(theme.color().with_alpha(255));
        let line_width = (t.line_width * geo.scale).max(1.0);

        ctx.begin_path();
        smooth_loop(ctx, &geo.loop_points(&shaped, t.line_gain, t.min_height));
        ctx.stroke(&paint, line_width);

        let ring_len = self.state.trail_ring.len();
        ctx.save();
        for (index, samples) in self.state.trail_ring.iter().enumerate() {
            let gain = t.line_gain - 0.1 * (index + 1) as f32;
            ctx.set_global_alpha(1.0 - index as f32 / ring_len as f32);
            ctx.begin_path();
            smooth_loop(ctx, &geo.loop_points(samples, gain, t.min_height));
            ctx.stroke(&paint, line_width);
        }
        ctx.restore();

        if step.is_some() {
            self.state.trail_ring.push(shaped);
        }
    }

    fn draw_bar(
        &mut self,
        ctx: &mut DrawContext,
        spectrum: &[u8],
        t: &Tunables,
        geo: &Geometry,
        step: Option<f32>,
    ) {
        let s = geo.scale;
        let margin_x = t.margin_x * s;
        let y_start = geo.height - t.margin_y * s;
        let y_end = t.margin_y * s;
        let pitch = (t.meter_width + t.meter_gap) * s;
        if !(pitch.is_finite() && pitch > 0.0) {
            log::trace!("Bar meter skipped: column pitch {}", pitch);
            return;
        }
        // bounded by the canvas width in whole pixels
        let columns = ((geo.width - 2.0 * margin_x) / pitch)
            .floor()
            .clamp(0.0, geo.width.max(0.0)) as usize;
        if columns == 0 {
            return;
        }

        let shaped = transform::reshape(spectrum, Algorithm::Bar, t.dotted_stride);
        if shaped.is_empty() {
            return;
        }
        let live: Vec<f32> = transform::sample_columns(&shaped, columns)
            .into_iter()
            .map(|m| (m as f32 * t.meter_gain).max(t.meter_floor))
            .collect();

        if let Some(factor) = step {
            self.state.peak_hold.update(&live, t.peak_decay * factor);
        }
        let peaks: &[f32] = if self.state.peak_hold.len() == columns {
            self.state.peak_hold.peaks()
        } else {
            &live
        };

        let gradient = LinearGradient::new((margin_x, y_end), (margin_x, y_start))
            .with_stop(0.0, Rgba::new(255, 0, 0, 255))
            .with_stop(0.5, Rgba::new(255, 255, 0, 255))
            .with_stop(1.0, Rgba::new(0, 255, 0, 255));
        let meter_w = t.meter_width * s;
        let cap = t.cap_height * s;

        ctx.begin_path();
        for (i, (&value, &peak)) in live.iter().zip(peaks).enumerate() {
            let x = margin_x + i as f32 * pitch;
            ctx.rect(x, y_start - peak * s, meter_w, cap);
            let h = value * s;
            ctx.round_rect(x, y_start - h + cap, meter_w, h, 2.0 * s);
        }
        ctx.fill(&Paint::Linear(gradient), FillRule::Winding);
    }
}

fn draw_arc(ctx: &mut DrawContext, spectrum: &[u8], theme: &ThemeState, geo: &Geometry) {
    let t = theme.tunables();
    let shaped = transform::reshape(spectrum, Algorithm::Arc, t.dotted_stride);
    if shaped.is_empty() {
        return;
    }
    let n = shaped.len() as f32;
    let w = t.bar_width * geo.scale;

    ctx.begin_path();
    for (i, &m) in shaped.iter().enumerate() {
        let h = (m as f32 * t.arc_gain).max(t.min_height) * geo.scale;
        let angle = PI + (i as f32 / n) * 2.0 * PI;
        ctx.save();
        ctx.translate(geo.cx + geo.radius * angle.cos(), geo.cy + geo.radius * angle.sin());
        ctx.rotate(angle + PI / 2.0);
        ctx.round_rect(-w / 2.0, -h, w, h, t.bar_corner * geo.scale);
        ctx.restore();
    }
    ctx.fill(&Paint::Solid(theme.color().with_alpha(255)), FillRule::Winding);
}

fn draw_dotted(ctx: &mut DrawContext, spectrum: &[u8], theme: &ThemeState, geo: &Geometry) {
    let t = theme.tunables();
    let shaped = transform::reshape(spectrum, Algorithm::ArcLineDotted, t.dotted_stride);
    if shaped.is_empty() {
        return;
    }
    let points = geo.loop_points(&shaped, t.dotted_gain, t.min_height);
    let paint = Paint::Solid(theme.color().with_alpha(255));

    ctx.save();
    ctx.set_global_alpha(0.5);
    ctx.begin_path();
    smooth_loop(ctx, &points);
    ctx.fill(&paint, FillRule::Winding);
    ctx.restore();

    let dot = (t.dot_radius * geo.scale).max(1.0);
    ctx.begin_path();
    for &(x, y) in &points {
        ctx.circle(x, y, dot);
    }
    ctx.fill(&paint, FillRule::Winding);
}

/// Closed curve through the midpoints of consecutive points, using each point
/// as the quadratic control.
fn smooth_loop(ctx: &mut DrawContext, points: &[Point]) {
    let n = points.len();
    if n < 3 {
        if let Some(&(x, y)) = points.first() {
            ctx.move_to(x, y);
            for &(x, y) in &points[1..] {
                ctx.line_to(x, y);
            }
            ctx.close_path();
        }
        return;
    }
    let mid = |a: Point, b: Point| ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    let start = mid(points[n - 1], points[0]);
    ctx.move_to(start.0, start.1);
    for i in 0..n {
        let ctrl = points[i];
        let end = mid(ctrl, points[(i + 1) % n]);
        ctx.quadratic_curve_to(ctrl.0, ctrl.1, end.0, end.1);
    }
    ctx.close_path();
}
