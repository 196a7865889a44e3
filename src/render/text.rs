use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};
use std::path::{Path, PathBuf};

/// Coverage bitmap for one rendered line of text.
///
/// Row 0 is the top of the line box; `height` spans ascent to descent, so the
/// bottom row sits on the text's bottom edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMask {
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

/// Turns text into coverage masks at a given pixel size.
pub trait GlyphRasterizer {
    fn measure_width(&self, text: &str, size: f32) -> f32;
    fn rasterize_line(&self, text: &str, size: f32) -> TextMask;
}

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSerif-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSerif-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSerif-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSerif-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Times New Roman Bold.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\timesbd.ttf",
];

/// First commonly installed bold serif (or sans) font found on this machine.
pub fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONTS.iter().map(PathBuf::from).find(|p| p.exists())
}

pub struct TextOverlay {
    font: Font,
}

impl TextOverlay {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;
        let overlay = Self::from_bytes(&bytes)?;
        log::info!("Loaded font {}", path.display());
        Ok(overlay)
    }

    fn line_box(&self, size: f32) -> (f32, f32) {
        match self.font.horizontal_line_metrics(size) {
            Some(m) => (m.ascent, m.descent),
            None => (size * 0.8, -size * 0.2),
        }
    }
}

impl GlyphRasterizer for TextOverlay {
    fn measure_width(&self, text: &str, size: f32) -> f32 {
        text.chars()
            .map(|ch| self.font.metrics(ch, size).advance_width)
            .sum()
    }

    fn rasterize_line(&self, text: &str, size: f32) -> TextMask {
        let (ascent, descent) = self.line_box(size);
        let baseline = ascent.ceil() as i32;
        let height = (ascent - descent).ceil().max(1.0) as usize;
        let width = self.measure_width(text, size).ceil().max(0.0) as usize + 2;
        let mut coverage = vec![0u8; width * height];

        let mut cursor_x = 0.0f32;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, size);
            let glyph_x = (cursor_x + metrics.xmin as f32).round() as i32;
            let glyph_y = baseline - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }
                    let px = glyph_x + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px as usize >= width || py as usize >= height {
                        continue;
                    }
                    let idx = py as usize * width + px as usize;
                    coverage[idx] = coverage[idx].max(alpha);
                }
            }

            cursor_x += metrics.advance_width;
        }

        TextMask {
            width,
            height,
            coverage,
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Monospace rasterizer that draws every non-space char as a solid block
    /// `size/2` wide and `size` tall.
    pub struct BlockGlyphs;

    impl GlyphRasterizer for BlockGlyphs {
        fn measure_width(&self, text: &str, size: f32) -> f32 {
            text.chars().count() as f32 * (size / 2.0).floor()
        }

        fn rasterize_line(&self, text: &str, size: f32) -> TextMask {
            let advance = (size / 2.0).floor() as usize;
            let height = size as usize;
            let width = advance * text.chars().count();
            let mut coverage = vec![0u8; width * height];
            for (i, ch) in text.chars().enumerate() {
                if ch == ' ' {
                    continue;
                }
                for y in 0..height {
                    for x in i * advance..(i + 1) * advance {
                        coverage[y * width + x] = 255;
                    }
                }
            }
            TextMask {
                width,
                height,
                coverage,
            }
        }
    }

    #[test]
    fn block_glyphs_match_their_measured_width() {
        let mask = BlockGlyphs.rasterize_line("ab c", 20.0);
        assert_eq!(mask.width, BlockGlyphs.measure_width("ab c", 20.0) as usize);
        assert_eq!(mask.height, 20);
        // the space stays empty
        assert_eq!(mask.coverage[5 * mask.width + 25], 0);
        assert_eq!(mask.coverage[5 * mask.width + 5], 255);
    }
}
