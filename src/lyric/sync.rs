use super::{parse, resolve_active, ActiveLyricWindow, LyricLine};
use crate::error::VizError;
use crate::render::canvas::{Canvas, DrawContext, Rgba};
use crate::render::text::GlyphRasterizer;
use crate::visual::theme::ThemeState;

/// Time-synchronized lyric overlay with a left-to-right reveal highlight.
pub struct LyricSync {
    lines: Vec<LyricLine>,
    glyphs: Option<Box<dyn GlyphRasterizer>>,
    layer: Option<Canvas>,
}

impl Default for LyricSync {
    fn default() -> Self {
        Self::new()
    }
}

impl LyricSync {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            glyphs: None,
            layer: None,
        }
    }

    /// Replace the current track's lines.
    pub fn load<S: AsRef<str>>(&mut self, raw: &[S]) {
        self.lines = parse(raw);
        log::info!("Loaded {} lyric lines", self.lines.len());
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn set_glyphs(&mut self, glyphs: Box<dyn GlyphRasterizer>) {
        self.glyphs = Some(glyphs);
    }

    pub fn active(&self, time: f64) -> ActiveLyricWindow {
        resolve_active(&self.lines, time)
    }

    /// Paint the line active at `time`: once in white, then again in the theme
    /// color on a layer cut off at the reveal point.
    pub fn draw(&mut self, time: f64, ctx: &mut DrawContext, theme: &ThemeState) -> Result<(), VizError> {
        let glyphs = self.glyphs.as_deref().ok_or(VizError::NotReady("lyric font"))?;
        if self.lines.is_empty() {
            return Err(VizError::NotReady("lyric lines"));
        }
        let window = resolve_active(&self.lines, time);
        if window.text.is_empty() {
            return Ok(());
        }
        let percent = window.percent(time);

        let t = theme.tunables();
        let scale = ThemeState::scale_for(ctx.width(), ctx.height());
        let size = (t.lyric_font_size * scale).max(1.0);
        let text_width = glyphs.measure_width(&window.text, size);
        let mask = glyphs.rasterize_line(&window.text, size);
        if mask.width == 0 || mask.height == 0 {
            return Ok(());
        }

        let start_x = ctx.width() as f32 * 0.5 - text_width * 0.5;
        let top = t.lyric_baseline * scale - mask.height as f32;
        ctx.fill_mask(&mask, start_x, top, Rgba::WHITE);

        // the layer is mask-sized and composited at the mask's rounded origin
        let (ox, oy) = (start_x.round(), top.round());
        let fits = self
            .layer
            .as_ref()
            .is_some_and(|l| l.width() == mask.width && l.height() == mask.height);
        if !fits {
            self.layer = Canvas::new(mask.width, mask.height);
        }
        let Some(layer_canvas) = self.layer.as_mut() else {
            return Ok(());
        };
        {
            let mut layer = DrawContext::new(layer_canvas);
            layer.clear();
            layer.fill_mask(&mask, 0.0, 0.0, theme.color().with_alpha(255));
            let clear_x = start_x + text_width * percent - ox;
            layer.clear_rect(clear_x, 0.0, mask.width as f32 - clear_x, mask.height as f32);
        }
        ctx.draw_canvas(layer_canvas, ox as i32, oy as i32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::text::testing::BlockGlyphs;
    use crate::visual::theme::{ThemeColor, Tunables};

    fn synced(raw: &[&str]) -> LyricSync {
        let mut sync = LyricSync::new();
        sync.load(raw);
        sync.set_glyphs(Box::new(BlockGlyphs));
        sync
    }

    fn theme() -> ThemeState {
        ThemeState::new(ThemeColor::new(0, 0, 255), Tunables::default())
    }

    #[test]
    fn reveal_splits_the_line_at_elapsed_fraction() {
        // 216px canvas: font 8px, blocks 4px wide, bottom edge at y = 15
        let mut sync = synced(&["[00:00]AAAA", "[00:10]B"]);
        let mut canvas = Canvas::new(216, 216).unwrap();
        {
            let mut ctx = DrawContext::new(&mut canvas);
            sync.draw(5.0, &mut ctx, &theme()).unwrap();
        }
        // text spans x 100..116, rows 7..15; half revealed
        assert_eq!(canvas.pixel(101, 10), Rgba::new(0, 0, 255, 255));
        assert_eq!(canvas.pixel(107, 14), Rgba::new(0, 0, 255, 255));
        assert_eq!(canvas.pixel(108, 10), Rgba::WHITE);
        assert_eq!(canvas.pixel(115, 7), Rgba::WHITE);
        assert_eq!(canvas.pixel(99, 10).a, 0);
        assert_eq!(canvas.pixel(101, 16).a, 0);
    }

    #[test]
    fn final_line_draws_white_without_reveal() {
        let mut sync = synced(&["[00:05]Hello", "garbage", "[01:10]World"]);
        let mut canvas = Canvas::new(216, 216).unwrap();
        {
            let mut ctx = DrawContext::new(&mut canvas);
            sync.draw(70.0, &mut ctx, &theme()).unwrap();
        }
        // "World": 20px wide starting at x = 98
        assert_eq!(canvas.pixel(99, 10), Rgba::WHITE);
        assert_eq!(canvas.pixel(117, 10), Rgba::WHITE);
    }

    #[test]
    fn no_active_line_paints_nothing() {
        let mut sync = synced(&["[00:05]Hello"]);
        let mut canvas = Canvas::new(64, 64).unwrap();
        {
            let mut ctx = DrawContext::new(&mut canvas);
            sync.draw(1.0, &mut ctx, &theme()).unwrap();
        }
        assert!(canvas.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn missing_font_or_lines_is_not_ready() {
        let mut canvas = Canvas::new(32, 32).unwrap();
        let mut ctx = DrawContext::new(&mut canvas);

        let mut no_font = LyricSync::new();
        no_font.load(&["[00:00]x"]);
        assert!(matches!(no_font.draw(0.5, &mut ctx, &theme()), Err(VizError::NotReady(_))));

        let mut no_lines = LyricSync::new();
        no_lines.set_glyphs(Box::new(BlockGlyphs));
        assert!(matches!(no_lines.draw(0.5, &mut ctx, &theme()), Err(VizError::NotReady(_))));
    }
}
