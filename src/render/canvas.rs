//! Canvas-2D style drawing over a `tiny_skia` pixmap.

use std::rc::Rc;

use tiny_skia::{
    BlendMode, Color, FilterQuality, GradientStop, Mask, PathBuilder, Pattern, Pixmap, PixmapPaint,
    Rect, Shader, SpreadMode, Stroke, Transform,
};

pub use tiny_skia::FillRule;

use super::bitmap::Bitmap;
use super::text::TextMask;

pub type Point = (f32, f32);

/// Cubic control distance for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_8;

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    fn to_color(self, alpha: f32) -> Color {
        let a = (self.a as f32 * alpha).round().clamp(0.0, 255.0) as u8;
        Color::from_rgba8(self.r, self.g, self.b, a)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    start: Point,
    end: Point,
    stops: Vec<(f32, Rgba)>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end, stops: Vec::new() }
    }

    pub fn with_stop(mut self, offset: f32, color: Rgba) -> Self {
        self.stops.push((offset.clamp(0.0, 1.0), color));
        self.stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    Linear(LinearGradient),
}

impl From<Rgba> for Paint {
    fn from(c: Rgba) -> Self {
        Paint::Solid(c)
    }
}

/// RGBA8 raster backed by a premultiplied pixmap.
#[derive(Clone)]
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    /// `None` for a zero-sized canvas.
    pub fn new(width: usize, height: usize) -> Option<Self> {
        let pixmap = Pixmap::new(u32::try_from(width).ok()?, u32::try_from(height).ok()?)?;
        Some(Self { pixmap })
    }

    pub fn width(&self) -> usize {
        self.pixmap.width() as usize
    }

    pub fn height(&self) -> usize {
        self.pixmap.height() as usize
    }

    /// Premultiplied RGBA bytes, i.e. the frame as composited over black.
    pub fn pixels(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Straight-alpha color at `(x, y)`; transparent outside the canvas.
    pub fn pixel(&self, x: usize, y: usize) -> Rgba {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return Rgba::TRANSPARENT;
        };
        self.pixmap.pixel(x, y).map_or(Rgba::TRANSPARENT, |p| {
            let c = p.demultiply();
            Rgba::new(c.red(), c.green(), c.blue(), c.alpha())
        })
    }

    /// Straight-alpha copy for image encoders.
    pub fn to_image(&self) -> Option<image::RgbaImage> {
        let raw = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        image::RgbaImage::from_raw(self.pixmap.width(), self.pixmap.height(), raw)
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }
}

#[derive(Clone)]
struct DrawState {
    transform: Transform,
    alpha: f32,
    clip: Option<Rc<Mask>>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self { transform: Transform::identity(), alpha: 1.0, clip: None }
    }
}

/// Immediate-mode drawing API over a [`Canvas`], modelled on the HTML canvas
/// 2D context. Path points are transformed as they are added, so one path may
/// mix shapes placed under different transforms. Painting consumes the path.
pub struct DrawContext<'a> {
    canvas: &'a mut Canvas,
    state: DrawState,
    stack: Vec<DrawState>,
    path: PathBuilder,
}

impl<'a> DrawContext<'a> {
    pub fn new(canvas: &'a mut Canvas) -> Self {
        Self {
            canvas,
            state: DrawState::default(),
            stack: Vec::new(),
            path: PathBuilder::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.canvas.width()
    }

    pub fn height(&self) -> usize {
        self.canvas.height()
    }

    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.state.transform = self.state.transform.pre_concat(Transform::from_translate(tx, ty));
    }

    pub fn rotate(&mut self, theta: f32) {
        let (sin, cos) = theta.sin_cos();
        let rotation = Transform::from_row(cos, sin, -sin, cos, 0.0, 0.0);
        self.state.transform = self.state.transform.pre_concat(rotation);
    }

    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn clear(&mut self) {
        self.canvas.clear();
    }

    // -- path building -------------------------------------------------------

    fn map(&self, x: f32, y: f32) -> Point {
        let t = &self.state.transform;
        (t.sx * x + t.kx * y + t.tx, t.ky * x + t.sy * y + t.ty)
    }

    pub fn begin_path(&mut self) {
        self.path = PathBuilder::new();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.path.move_to(x, y);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.path.line_to(x, y);
    }

    pub fn quadratic_curve_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let (cx, cy) = self.map(cx, cy);
        let (x, y) = self.map(x, y);
        self.path.quad_to(cx, cy, x, y);
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, end: Point) {
        let (x1, y1) = self.map(c1.0, c1.1);
        let (x2, y2) = self.map(c2.0, c2.1);
        let (x, y) = self.map(end.0, end.1);
        self.path.cubic_to(x1, y1, x2, y2, x, y);
    }

    pub fn close_path(&mut self) {
        self.path.close();
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.move_to(x, y);
        self.line_to(x + w, y);
        self.line_to(x + w, y + h);
        self.line_to(x, y + h);
        self.close_path();
    }

    /// Rounded rectangle; the radius is clamped to half the shorter side.
    pub fn round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) {
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
        if r <= 0.0 {
            self.rect(x, y, w, h);
            return;
        }
        let k = r * KAPPA;
        let (right, bottom) = (x + w, y + h);
        self.move_to(x + r, y);
        self.line_to(right - r, y);
        self.cubic_to((right - r + k, y), (right, y + r - k), (right, y + r));
        self.line_to(right, bottom - r);
        self.cubic_to((right, bottom - r + k), (right - r + k, bottom), (right - r, bottom));
        self.line_to(x + r, bottom);
        self.cubic_to((x + r - k, bottom), (x, bottom - r + k), (x, bottom - r));
        self.line_to(x, y + r);
        self.cubic_to((x, y + r - k), (x + r - k, y), (x + r, y));
        self.close_path();
    }

    /// Full circle as its own closed contour.
    pub fn circle(&mut self, cx: f32, cy: f32, r: f32) {
        let k = r * KAPPA;
        self.move_to(cx + r, cy);
        self.cubic_to((cx + r, cy + k), (cx + k, cy + r), (cx, cy + r));
        self.cubic_to((cx - k, cy + r), (cx - r, cy + k), (cx - r, cy));
        self.cubic_to((cx - r, cy - k), (cx - k, cy - r), (cx, cy - r));
        self.cubic_to((cx + k, cy - r), (cx + r, cy - k), (cx + r, cy));
        self.close_path();
    }

    fn take_path(&mut self) -> Option<tiny_skia::Path> {
        std::mem::replace(&mut self.path, PathBuilder::new()).finish()
    }

    // -- painting ------------------------------------------------------------

    fn sk_paint(&self, paint: &Paint) -> Option<tiny_skia::Paint<'static>> {
        let alpha = self.state.alpha;
        let mut sk = tiny_skia::Paint { anti_alias: true, ..Default::default() };
        match paint {
            Paint::Solid(c) => sk.set_color(c.to_color(alpha)),
            Paint::Linear(g) => {
                let (sx, sy) = self.map(g.start.0, g.start.1);
                let (ex, ey) = self.map(g.end.0, g.end.1);
                let stops = g
                    .stops
                    .iter()
                    .map(|&(offset, c)| GradientStop::new(offset, c.to_color(alpha)))
                    .collect();
                sk.shader = tiny_skia::LinearGradient::new(
                    tiny_skia::Point::from_xy(sx, sy),
                    tiny_skia::Point::from_xy(ex, ey),
                    stops,
                    SpreadMode::Pad,
                    Transform::identity(),
                )?;
            }
        }
        Some(sk)
    }

    pub fn fill(&mut self, paint: &Paint, rule: FillRule) {
        let (Some(path), Some(sk)) = (self.take_path(), self.sk_paint(paint)) else {
            return;
        };
        let clip = self.state.clip.as_deref();
        self.canvas.pixmap.fill_path(&path, &sk, rule, Transform::identity(), clip);
    }

    /// Stroke the current path with round joins.
    pub fn stroke(&mut self, paint: &Paint, width: f32) {
        let (Some(path), Some(sk)) = (self.take_path(), self.sk_paint(paint)) else {
            return;
        };
        let stroke = Stroke {
            width,
            line_join: tiny_skia::LineJoin::Round,
            ..Stroke::default()
        };
        let clip = self.state.clip.as_deref();
        self.canvas.pixmap.stroke_path(&path, &sk, &stroke, Transform::identity(), clip);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &Paint) {
        self.begin_path();
        self.rect(x, y, w, h);
        self.fill(paint, FillRule::Winding);
    }

    /// Erase to transparent. Device-space rectangle; the transform is ignored.
    pub fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let paint = tiny_skia::Paint {
            blend_mode: BlendMode::Clear,
            anti_alias: true,
            ..Default::default()
        };
        self.canvas.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// Intersect the clip region with the current path.
    pub fn clip(&mut self) {
        let Some(path) = self.take_path() else {
            return;
        };
        let mask = match self.state.clip.as_deref() {
            Some(prev) => {
                let mut mask = prev.clone();
                mask.intersect_path(&path, FillRule::Winding, true, Transform::identity());
                Some(mask)
            }
            None => Mask::new(self.canvas.pixmap.width(), self.canvas.pixmap.height()).map(|mut mask| {
                mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
                mask
            }),
        };
        if let Some(mask) = mask {
            self.state.clip = Some(Rc::new(mask));
        }
    }

    /// Draw `bitmap` scaled into the rectangle `(dx, dy, dw, dh)` under the
    /// current transform, sampling bilinearly.
    pub fn draw_bitmap(&mut self, bitmap: &Bitmap, dx: f32, dy: f32, dw: f32, dh: f32) {
        let Some(rect) = Rect::from_xywh(dx, dy, dw, dh) else {
            return;
        };
        let placement = Transform::from_row(
            dw / bitmap.width() as f32,
            0.0,
            0.0,
            dh / bitmap.height() as f32,
            dx,
            dy,
        );
        let shader: Shader = Pattern::new(
            bitmap.pixmap().as_ref(),
            SpreadMode::Pad,
            FilterQuality::Bilinear,
            self.state.alpha,
            placement,
        );
        let paint = tiny_skia::Paint { shader, anti_alias: true, ..Default::default() };
        let clip = self.state.clip.as_deref();
        self.canvas.pixmap.fill_rect(rect, &paint, self.state.transform, clip);
    }

    /// Composite another canvas (an offscreen layer) at integer offset.
    pub fn draw_canvas(&mut self, layer: &Canvas, dx: i32, dy: i32) {
        let paint = PixmapPaint { opacity: self.state.alpha, ..Default::default() };
        let clip = self.state.clip.as_deref();
        self.canvas
            .pixmap
            .draw_pixmap(dx, dy, layer.pixmap.as_ref(), &paint, Transform::identity(), clip);
    }

    /// Paint a glyph coverage mask in `color` with its top-left corner at
    /// `(x, y)`, rounded to whole pixels.
    pub fn fill_mask(&mut self, mask: &TextMask, x: f32, y: f32, color: Rgba) {
        let Some(mut glyphs) = Pixmap::new(mask.width as u32, mask.height as u32) else {
            return;
        };
        for (px, &coverage) in glyphs.data_mut().chunks_exact_mut(4).zip(&mask.coverage) {
            let a = color.a as u32 * coverage as u32 / 255;
            let premul = |c: u8| (c as u32 * a / 255) as u8;
            px.copy_from_slice(&[premul(color.r), premul(color.g), premul(color.b), a as u8]);
        }
        let paint = PixmapPaint { opacity: self.state.alpha, ..Default::default() };
        let clip = self.state.clip.as_deref();
        self.canvas.pixmap.draw_pixmap(
            x.round() as i32,
            y.round() as i32,
            glyphs.as_ref(),
            &paint,
            Transform::identity(),
            clip,
        );
    }
}
