//! Normal map derivation from a height field.
//!
//! Output is a tangent-offset encoding: R and G carry the horizontal and
//! vertical slope around the neutral 128, B stays at 255. Edges replicate
//! the nearest height sample, for both kernel passes.

use image::Rgba;

use super::buffer::{PixelBuffer, resample_into, try_allocate};
use super::error::TextureError;

/// Flat outward normal
pub const NEUTRAL_NORMAL: Rgba<u8> = Rgba([128, 128, 255, 255]);

// elevation is encoded in the red channel of the height map
const HEIGHT_CHANNEL: usize = 0;

#[rustfmt::skip]
pub const HORIZONTAL_KERNEL: [i32; 9] = [
    -1, 0, 1,
    -2, 0, 2,
    -1, 0, 1,
];

#[rustfmt::skip]
pub const VERTICAL_KERNEL: [i32; 9] = [
    1, 2, 1,
    0, 0, 0,
    -1, -2, -1,
];

// source-over compositing of `top` onto `base`
fn composite_over(base: &mut PixelBuffer, top: &PixelBuffer) {
    for (dst, src) in base.pixels_mut().zip(top.pixels()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * (255 - alpha) + 127) / 255) as u8;
        }
        dst[3] = (alpha + dst[3] as u32 * (255 - alpha) / 255) as u8;
    }
}

/// Adds `kernel` applied to the height map into `channel` of `out`,
/// clamping to the byte range. Other channels are left alone.
fn convolve_into(height: &PixelBuffer, out: &mut PixelBuffer, kernel: &[i32; 9], channel: usize) {
    let (width, rows) = height.dimensions();
    let max_x = width as i64 - 1;
    let max_y = rows as i64 - 1;

    for y in 0..rows {
        for x in 0..width {
            let mut sum = 0i32;
            for ky in 0..3i64 {
                for kx in 0..3i64 {
                    let weight = kernel[(ky * 3 + kx) as usize];
                    if weight == 0 {
                        continue;
                    }
                    let sx = (x as i64 + kx - 1).clamp(0, max_x) as u32;
                    let sy = (y as i64 + ky - 1).clamp(0, max_y) as u32;
                    sum += weight * height.get_pixel(sx, sy)[HEIGHT_CHANNEL] as i32;
                }
            }

            let pixel = out.get_pixel_mut(x, y);
            pixel[channel] = (pixel[channel] as i32 + sum).clamp(0, 255) as u8;
        }
    }
}

/// Builds the normal map for one tier.
///
/// The previous tier's normal map (if any) is stretched and laid over the
/// neutral fill, so coarse undulation survives while this tier's slopes are
/// added on top.
pub fn derive_normal_map(
    height: &PixelBuffer,
    resolution: u32,
    previous: Option<&PixelBuffer>,
) -> Result<PixelBuffer, TextureError> {
    let mut out = try_allocate(resolution, NEUTRAL_NORMAL)?;

    if let Some(previous) = previous {
        let mut stretched = try_allocate(resolution, Rgba([0, 0, 0, 0]))?;
        resample_into(&mut stretched, previous);
        composite_over(&mut out, &stretched);
    }

    let resampled;
    let height = if height.dimensions() == (resolution, resolution) {
        height
    } else {
        let mut buffer = try_allocate(resolution, Rgba([0, 0, 0, 255]))?;
        resample_into(&mut buffer, height);
        resampled = buffer;
        &resampled
    };

    convolve_into(height, &mut out, &HORIZONTAL_KERNEL, 0);
    convolve_into(height, &mut out, &VERTICAL_KERNEL, 1);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn grey(level: u8) -> Rgba<u8> {
        Rgba([level, level, level, 255])
    }

    #[test]
    fn flat_height_gives_neutral_map() {
        let height = RgbaImage::from_pixel(16, 16, grey(90));
        let normal = derive_normal_map(&height, 16, None).unwrap();
        assert!(normal.pixels().all(|p| *p == NEUTRAL_NORMAL));
    }

    #[test]
    fn vertical_edge_shows_up_in_red_only() {
        // left half low, right half high
        let height = RgbaImage::from_fn(16, 16, |x, _| if x < 8 { grey(0) } else { grey(20) });
        let normal = derive_normal_map(&height, 16, None).unwrap();

        // columns touching the step see a positive x slope
        assert_eq!(normal.get_pixel(7, 5)[0], 128 + 80);
        assert_eq!(normal.get_pixel(8, 5)[0], 128 + 80);
        assert_eq!(normal.get_pixel(7, 5)[1], 128);
        // away from the edge nothing changes
        assert_eq!(*normal.get_pixel(2, 5), NEUTRAL_NORMAL);
        assert_eq!(*normal.get_pixel(13, 5), NEUTRAL_NORMAL);
    }

    #[test]
    fn horizontal_edge_shows_up_in_green_only() {
        // top half high, bottom half low
        let height = RgbaImage::from_fn(16, 16, |_, y| if y < 8 { grey(30) } else { grey(0) });
        let normal = derive_normal_map(&height, 16, None).unwrap();

        let pixel = normal.get_pixel(4, 8);
        assert_eq!(pixel[0], 128);
        assert_eq!(pixel[1], 128 + 120);
        assert_eq!(pixel[2], 255);
    }

    #[test]
    fn edges_replicate_instead_of_padding() {
        // zero padding would invent a cliff at the border
        let height = RgbaImage::from_pixel(8, 8, grey(200));
        let normal = derive_normal_map(&height, 8, None).unwrap();
        assert_eq!(*normal.get_pixel(0, 0), NEUTRAL_NORMAL);
        assert_eq!(*normal.get_pixel(7, 7), NEUTRAL_NORMAL);
    }

    #[test]
    fn previous_tier_is_the_base_layer() {
        let previous = RgbaImage::from_pixel(4, 4, Rgba([100, 150, 255, 255]));
        let height = RgbaImage::from_pixel(16, 16, grey(10));
        let normal = derive_normal_map(&height, 16, Some(&previous)).unwrap();
        assert!(normal.pixels().all(|p| *p == Rgba([100, 150, 255, 255])));

        // detail lands on top of the stretched base
        let mut stepped = height.clone();
        for y in 0..16 {
            for x in 8..16 {
                stepped.put_pixel(x, y, grey(20));
            }
        }
        let normal = derive_normal_map(&stepped, 16, Some(&previous)).unwrap();
        assert_eq!(normal.get_pixel(8, 4)[0], 100 + 40);
        assert_eq!(normal.get_pixel(8, 4)[1], 150);
    }

    #[test]
    fn slopes_saturate() {
        let height = RgbaImage::from_fn(8, 8, |x, _| if x < 4 { grey(0) } else { grey(255) });
        let normal = derive_normal_map(&height, 8, None).unwrap();
        assert_eq!(normal.get_pixel(4, 3)[0], 255);
    }

    #[test]
    fn height_is_resampled_to_the_tier() {
        let height = RgbaImage::from_pixel(4, 4, grey(50));
        let normal = derive_normal_map(&height, 8, None).unwrap();
        assert_eq!(normal.dimensions(), (8, 8));
        assert!(normal.pixels().all(|p| *p == NEUTRAL_NORMAL));
    }
}
