use glam::Vec2;
use image::{ImageReader, RgbaImage};
use std::path::Path;

/// One RGBA8 pixel.
pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];
pub const FALLBACK_DARK: Rgba = [0, 0, 0, 255];
pub const FALLBACK_LIGHT: Rgba = [255, 0, 255, 255];

/// Errors from raster construction and image IO.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("pixel buffer holds {actual} bytes, {width}x{height} needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// CPU-side RGBA8 pixel buffer, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Raster {
    /// A fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let rgba = color.repeat(width as usize * height as usize);
        Self { width, height, rgba }
    }

    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RenderError::BufferSize {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self { width, height, rgba })
    }

    /// Decode any supported image file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let decoded = ImageReader::open(path.as_ref())?.decode()?;
        Ok(Self::from(decoded.to_rgba8()))
    }

    /// Encode as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        self.to_image().save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    pub fn to_image(&self) -> RgbaImage {
        // Length is checked on every constructor.
        RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }

    /// Write a pixel; out-of-range writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x < self.width && y < self.height {
            let i = self.offset(x, y);
            self.rgba[i..i + 4].copy_from_slice(&color);
        }
    }

    /// Source-over blend of one pixel.
    fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        match color[3] {
            0 => {}
            255 => self.put_pixel(x, y, color),
            alpha => {
                let i = self.offset(x, y);
                let a = alpha as u32;
                for c in 0..3 {
                    let dst = self.rgba[i + c] as u32;
                    self.rgba[i + c] = ((color[c] as u32 * a + dst * (255 - a)) / 255) as u8;
                }
                let dst_a = self.rgba[i + 3] as u32;
                self.rgba[i + 3] = (a + dst_a * (255 - a) / 255) as u8;
            }
        }
    }

    pub fn clear(&mut self, color: Rgba) {
        for px in self.rgba.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Clip a rectangle to the raster. Returns `(x0, y0, x1, y1)` or `None`
    /// when nothing is left.
    fn clip(&self, x: i64, y: i64, w: i64, h: i64) -> Option<(u32, u32, u32, u32)> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width as i64);
        let y1 = (y + h).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: Rgba) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, w as i64, h as i64) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                self.put_pixel(px, py, color);
            }
        }
    }

    /// Two-by-two checkerboard over the rectangle: `dark` everywhere, `light`
    /// on the top-left and bottom-right quarters.
    pub fn checkerboard(&mut self, x: i64, y: i64, w: u32, h: u32, dark: Rgba, light: Rgba) {
        let (hw, hh) = (w / 2, h / 2);
        self.fill_rect(x, y, w, h, dark);
        self.fill_rect(x, y, hw, hh, light);
        self.fill_rect(x + hw as i64, y + hh as i64, w - hw, h - hh, light);
    }

    /// Multiply the color channels of a rectangle by `factor`, leaving alpha.
    pub fn tint_rect(&mut self, x: i64, y: i64, w: u32, h: u32, factor: [f32; 3]) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, w as i64, h as i64) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                let i = self.offset(px, py);
                for c in 0..3 {
                    let v = self.rgba[i + c] as f32 * factor[c].clamp(0.0, 1.0);
                    self.rgba[i + c] = v.round() as u8;
                }
            }
        }
    }

    /// Nearest-neighbor draw of `src` into an integer rectangle, blending by
    /// source alpha.
    pub fn draw_scaled(&mut self, src: &Raster, x: i64, y: i64, w: u32, h: u32) {
        if src.width == 0 || src.height == 0 || w == 0 || h == 0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(x, y, w as i64, h as i64) else {
            return;
        };
        for py in y0..y1 {
            let sy = ((py as i64 - y) as u64 * src.height as u64 / h as u64) as u32;
            for px in x0..x1 {
                let sx = ((px as i64 - x) as u64 * src.width as u64 / w as u64) as u32;
                if let Some(color) = src.get_pixel(sx, sy) {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }

    /// Draw `src` stretched over a fractional screen rectangle. Pixel centers
    /// decide coverage, so adjacent rectangles tile without gaps or overlap.
    pub fn blit_scaled(&mut self, src: &Raster, top_left: Vec2, size: Vec2) {
        if src.width == 0 || src.height == 0 || size.x <= 0.0 || size.y <= 0.0 {
            return;
        }
        let x0 = (top_left.x - 0.5).ceil().max(0.0) as i64;
        let y0 = (top_left.y - 0.5).ceil().max(0.0) as i64;
        let x1 = ((top_left.x + size.x - 0.5).ceil() as i64).min(self.width as i64);
        let y1 = ((top_left.y + size.y - 0.5).ceil() as i64).min(self.height as i64);
        for py in y0..y1 {
            let v = (py as f32 + 0.5 - top_left.y) / size.y;
            let sy = ((v * src.height as f32) as u32).min(src.height - 1);
            for px in x0..x1 {
                let u = (px as f32 + 0.5 - top_left.x) / size.x;
                let sx = ((u * src.width as f32) as u32).min(src.width - 1);
                if let Some(color) = src.get_pixel(sx, sy) {
                    self.blend_pixel(px as u32, py as u32, color);
                }
            }
        }
    }
}

impl From<RgbaImage> for Raster {
    fn from(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        }
    }
}
