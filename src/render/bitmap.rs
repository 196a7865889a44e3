use anyhow::{Context, Result};
use image::{imageops, RgbaImage};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tiny_skia::{IntSize, Pixmap};

static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded cover image, kept both as straight RGBA for image processing and
/// as a premultiplied pixmap for drawing.
#[derive(Clone)]
pub struct Bitmap {
    id: u64,
    image: RgbaImage,
    pixmap: Pixmap,
}

impl Bitmap {
    pub fn from_image(image: RgbaImage) -> Option<Self> {
        let size = IntSize::from_wh(image.width(), image.height())?;
        let mut data = image.as_raw().clone();
        data.par_chunks_exact_mut(4).for_each(|px| {
            let a = px[3] as u32;
            for c in &mut px[..3] {
                *c = ((*c as u32 * a + 127) / 255) as u8;
            }
        });
        let pixmap = Pixmap::from_vec(data, size)?;
        Some(Self {
            id: NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed),
            image,
            pixmap,
        })
    }

    pub fn from_rgba(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width * height * 4 {
            return None;
        }
        Self::from_image(RgbaImage::from_raw(width as u32, height as u32, pixels)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path)
            .with_context(|| format!("Failed to decode image: {}", path.display()))?
            .to_rgba8();
        log::info!("Loaded cover {}x{} from {}", decoded.width(), decoded.height(), path.display());
        Self::from_image(decoded).context("Cover image is empty")
    }

    /// Unique per decoded image; blurred copies get their own id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> usize {
        self.image.width() as usize
    }

    pub fn height(&self) -> usize {
        self.image.height() as usize
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Gaussian-like blur with standard deviation `sigma` in bitmap pixels.
    pub fn blurred(&self, sigma: f32) -> Option<Bitmap> {
        Self::from_image(imageops::fast_blur(&self.image, sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffers() {
        assert!(Bitmap::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Bitmap::from_rgba(2, 2, vec![0; 17]).is_none());
        assert!(Bitmap::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(Bitmap::from_rgba(0, 0, Vec::new()).is_none());
    }

    #[test]
    fn blur_spreads_a_bright_pixel_and_keeps_uniform_areas() {
        let mut pixels = vec![0u8; 9 * 9 * 4];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        let centre = (4 * 9 + 4) * 4;
        pixels[centre..centre + 4].copy_from_slice(&[255, 255, 255, 255]);
        let bitmap = Bitmap::from_rgba(9, 9, pixels).unwrap();
        let blurred = bitmap.blurred(1.5).unwrap();
        assert!(blurred.image.get_pixel(4, 4).0[0] < 255);
        assert!(blurred.image.get_pixel(5, 4).0[0] > 0);
        assert_ne!(blurred.id(), bitmap.id());

        let flat = Bitmap::from_rgba(4, 4, vec![100; 64]).unwrap().blurred(2.0).unwrap();
        assert!(flat.image.as_raw().iter().all(|&p| p.abs_diff(100) <= 1));
    }

    #[test]
    fn pixmap_is_premultiplied() {
        let bitmap = Bitmap::from_rgba(1, 1, vec![200, 100, 0, 128]).unwrap();
        let px = bitmap.pixmap().pixel(0, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.alpha()), (100, 50, 128));
    }
}
