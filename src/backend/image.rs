//! In-memory raster target

use super::{Color, Content, Operator, Rect, Surface, Target};
use crate::core::error::{HarnessError, HarnessResult};

/// Software raster target producing [`ImageSurface`]s of one content kind.
#[derive(Debug, Clone)]
pub struct ImageTarget {
    name: &'static str,
    content: Content,
}

impl ImageTarget {
    pub fn new(name: &'static str, content: Content) -> Self {
        Self { name, content }
    }
}

impl Target for ImageTarget {
    fn name(&self) -> &str {
        self.name
    }

    fn content(&self) -> Content {
        self.content
    }

    fn create_surface(&self, width: u32, height: u32) -> HarnessResult<Box<dyn Surface>> {
        Ok(Box::new(ImageSurface::new(width, height, self.content)?))
    }
}

/// Row-major pixel buffer.
///
/// Color surfaces store little-endian `0xAARRGGBB` words (alpha forced to
/// 0xff for `Color`, premultiplied for `ColorAlpha`); alpha surfaces store
/// one coverage byte per pixel.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    width: u32,
    height: u32,
    content: Content,
    stride: usize,
    data: Vec<u8>,
}

impl ImageSurface {
    /// Allocate a cleared surface, reporting allocation failure instead of
    /// aborting.
    pub fn new(width: u32, height: u32, content: Content) -> HarnessResult<Self> {
        let stride = (width as usize)
            .checked_mul(content.bytes_per_pixel())
            .ok_or_else(|| HarnessError::AllocationFailure("surface stride overflows".into()))?;
        let len = stride.checked_mul(height as usize).ok_or_else(|| {
            HarnessError::AllocationFailure(format!("{}x{} surface overflows", width, height))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            HarnessError::AllocationFailure(format!(
                "{}x{} {} surface ({} bytes): {}",
                width, height, content, len, e
            ))
        })?;
        data.resize(len, 0);

        Ok(Self {
            width,
            height,
            content,
            stride,
            data,
        })
    }

    /// Raw bytes of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.content.bytes_per_pixel();
        let offset = y as usize * self.stride + x as usize * bpp;
        &self.data[offset..offset + bpp]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Source pixel bytes in storage order.
    fn source_pixel(&self, color: Color) -> [u8; 4] {
        match self.content {
            Content::Color => [color.b, color.g, color.r, 0xff],
            Content::ColorAlpha => [
                mul_un8(color.b, color.a),
                mul_un8(color.g, color.a),
                mul_un8(color.r, color.a),
                color.a,
            ],
            Content::Alpha => [color.a, 0, 0, 0],
        }
    }
}

impl Surface for ImageSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn content(&self) -> Content {
        self.content
    }

    fn fill_rect(&mut self, rect: Rect, color: Color, op: Operator) {
        let x0 = rect.x.min(self.width) as usize;
        let x1 = rect.x.saturating_add(rect.width).min(self.width) as usize;
        let y0 = rect.y.min(self.height) as usize;
        let y1 = rect.y.saturating_add(rect.height).min(self.height) as usize;
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let bpp = self.content.bytes_per_pixel();
        let src = self.source_pixel(color);
        let src = &src[..bpp];

        // Over with an opaque source is Source; with a clear source it is a no-op.
        let op = match (op, color.a) {
            (Operator::Over, 0xff) => Operator::Source,
            (Operator::Over, 0) => return,
            (op, _) => op,
        };

        for y in y0..y1 {
            let row = &mut self.data[y * self.stride + x0 * bpp..y * self.stride + x1 * bpp];
            match op {
                Operator::Source => {
                    for px in row.chunks_exact_mut(bpp) {
                        px.copy_from_slice(src);
                    }
                }
                Operator::Over => match self.content {
                    // Opaque destination: lerp toward the unpremultiplied source.
                    Content::Color => {
                        for px in row.chunks_exact_mut(bpp) {
                            px[0] = lerp_un8(px[0], color.b, color.a);
                            px[1] = lerp_un8(px[1], color.g, color.a);
                            px[2] = lerp_un8(px[2], color.r, color.a);
                        }
                    }
                    Content::ColorAlpha | Content::Alpha => {
                        let inv = 0xff - color.a;
                        for px in row.chunks_exact_mut(bpp) {
                            for (d, s) in px.iter_mut().zip(src) {
                                *d = s.saturating_add(mul_un8(*d, inv));
                            }
                        }
                    }
                },
            }
        }
    }
}

/// `a * b / 255`, rounded
#[inline]
fn mul_un8(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + 0x80;
    ((t + (t >> 8)) >> 8) as u8
}

/// `d + (s - d) * alpha / 255`
#[inline]
fn lerp_un8(d: u8, s: u8, alpha: u8) -> u8 {
    mul_un8(s, alpha).saturating_add(mul_un8(d, 0xff - alpha))
}
