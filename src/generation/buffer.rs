//! Pixel buffers and the base content every tier starts from.

use image::{Rgba, RgbaImage};

use super::error::TextureError;
use super::gradient::{ColorStop, paint_horizontal_gradient};

/// Square RGBA8 grid, one per texture channel.
pub type PixelBuffer = RgbaImage;

// specular base before water gloss is added
pub const SPECULAR_BASE: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// The three buffers that travel to the synthesizer and back
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceBuffers {
    pub height: PixelBuffer,
    pub specular: PixelBuffer,
    pub diffuse: PixelBuffer,
}

impl SurfaceBuffers {
    pub fn resolution(&self) -> u32 {
        self.height.width()
    }

    /// All three buffers must be `resolution` x `resolution`.
    pub fn check_resolution(&self, resolution: u32) -> Result<(), TextureError> {
        for buffer in [&self.height, &self.specular, &self.diffuse] {
            check_square(buffer, resolution)?;
        }
        Ok(())
    }
}

pub fn check_square(buffer: &PixelBuffer, resolution: u32) -> Result<(), TextureError> {
    if buffer.width() != resolution || buffer.height() != resolution {
        return Err(TextureError::DimensionMismatch {
            expected: resolution,
            found: buffer.width(),
        });
    }
    Ok(())
}

/// Allocates a buffer filled with `fill`, reporting allocation failure
/// instead of aborting.
pub fn try_allocate(resolution: u32, fill: Rgba<u8>) -> Result<PixelBuffer, TextureError> {
    let len = (resolution as usize)
        .checked_mul(resolution as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(TextureError::Allocation { resolution })?;

    let mut raw: Vec<u8> = Vec::new();
    raw.try_reserve_exact(len)
        .map_err(|_| TextureError::Allocation { resolution })?;
    for _ in 0..(len / 4) {
        raw.extend_from_slice(&fill.0);
    }

    RgbaImage::from_raw(resolution, resolution, raw).ok_or(TextureError::Allocation { resolution })
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Stretches `src` over the whole of `dst` with bilinear filtering.
pub fn resample_into(dst: &mut PixelBuffer, src: &PixelBuffer) {
    let (src_w, src_h) = src.dimensions();
    let (dst_w, dst_h) = dst.dimensions();
    if src_w == 0 || src_h == 0 {
        return;
    }
    if (src_w, src_h) == (dst_w, dst_h) {
        dst.copy_from_slice(src);
        return;
    }

    let scale_x = src_w as f32 / dst_w as f32;
    let scale_y = src_h as f32 / dst_h as f32;

    for (x, y, pixel) in dst.enumerate_pixels_mut() {
        // sample at pixel centres
        let sx = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (src_w - 1) as f32);
        let sy = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (src_h - 1) as f32);

        let x0 = sx.floor() as u32;
        let y0 = sy.floor() as u32;
        let x1 = (x0 + 1).min(src_w - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let tx = sx - x0 as f32;
        let ty = sy - y0 as f32;

        let p00 = src.get_pixel(x0, y0);
        let p10 = src.get_pixel(x1, y0);
        let p01 = src.get_pixel(x0, y1);
        let p11 = src.get_pixel(x1, y1);

        for c in 0..4 {
            let top = lerp(p00[c] as f32, p10[c] as f32, tx);
            let bottom = lerp(p01[c] as f32, p11[c] as f32, tx);
            pixel[c] = lerp(top, bottom, ty).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Builds the pre-noise content of a tier:
/// height from the reference image, flat specular, diffuse colour ramp.
pub fn prepare_base(
    reference: &PixelBuffer,
    resolution: u32,
    gradient: &[ColorStop],
) -> Result<SurfaceBuffers, TextureError> {
    if reference.width() == 0 || reference.height() == 0 {
        return Err(TextureError::Reference("reference image is empty".to_string()));
    }

    let mut height = try_allocate(resolution, Rgba([0, 0, 0, 255]))?;
    resample_into(&mut height, reference);

    let specular = try_allocate(resolution, SPECULAR_BASE)?;

    let mut diffuse = try_allocate(resolution, Rgba([0, 0, 0, 255]))?;
    paint_horizontal_gradient(&mut diffuse, gradient);

    Ok(SurfaceBuffers {
        height,
        specular,
        diffuse,
    })
}
