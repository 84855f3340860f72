//! Terrain noise synthesis, run on the worker thread.
//!
//! The height base holds an object-space normal map of a sphere, so every
//! pixel decodes to a point on the unit sphere. Sampling 3D noise at that
//! point gives a seamless surface regardless of the texture projection.

use image::Rgba;
use noise::{NoiseFn, Perlin};
use rayon::prelude::*;

use super::buffer::SurfaceBuffers;
use super::error::TextureError;
use super::layers::{NoiseConfiguration, NoiseLayer};

// specular value written where the surface sits at sea level
pub const WATER_GLOSS: u8 = 204;

// below-sea compression for soft layers
const SOFT_FLOOR: f32 = 0.3;

struct LayerField {
    perlin: Perlin,
    layer: NoiseLayer,
}

impl LayerField {
    fn new(seed: i32, layer: NoiseLayer) -> Self {
        Self {
            perlin: Perlin::new(seed as u32),
            layer,
        }
    }

    // fractal sum of `passes` octaves, normalised to [0, 1]
    fn raw(&self, point: [f64; 3]) -> f32 {
        let mut frequency = self.layer.roughness as f64;
        let mut amplitude = 1.0;
        let mut total = 0.0;
        let mut norm = 0.0;

        for _ in 0..self.layer.passes {
            let p = point.map(|c| c * frequency + self.layer.shift);
            total += amplitude * self.perlin.get(p);
            norm += amplitude;
            amplitude *= self.layer.resistance as f64;
            frequency *= 2.0;
        }

        ((total / norm) * 0.5 + 0.5).clamp(0.0, 1.0) as f32
    }

    fn shaped(&self, point: [f64; 3]) -> f32 {
        let value = self.raw(point);
        let minimum = self.layer.minimum;
        if value >= minimum {
            value
        } else if self.layer.hard_clamp {
            minimum
        } else {
            minimum - (minimum - value) * SOFT_FLOOR
        }
    }
}

fn decode_direction(rgb: &[u8]) -> [f64; 3] {
    let v = [0, 1, 2].map(|i| rgb[i] as f64 / 255.0 * 2.0 - 1.0);
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if length > 1e-6 {
        v.map(|c| c / length)
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Adds terrain detail to the three base buffers.
///
/// Pure: output depends only on the arguments. Every pixel is computed
/// independently, so the parallel row split gives the same bytes as a
/// serial pass.
pub fn synthesize(
    seed: i32,
    config: &NoiseConfiguration,
    mut buffers: SurfaceBuffers,
) -> Result<SurfaceBuffers, TextureError> {
    let resolution = buffers.resolution();
    if resolution == 0 {
        return Err(TextureError::Synthesis("buffers are empty".to_string()));
    }
    buffers.check_resolution(resolution)?;

    let fields: Vec<LayerField> = config
        .layers()
        .iter()
        .map(|layer| LayerField::new(seed, *layer))
        .collect();
    let total_strength: f32 = fields.iter().map(|f| f.layer.strength).sum();
    if total_strength <= 0.0 {
        return Err(TextureError::Synthesis(
            "noise layers carry no strength".to_string(),
        ));
    }
    let sea_level: f32 = fields
        .iter()
        .map(|f| f.layer.strength * f.layer.minimum)
        .sum::<f32>()
        / total_strength;

    // the diffuse base is a horizontal ramp, first row is enough
    let ramp: Vec<Rgba<u8>> = (0..resolution)
        .map(|x| *buffers.diffuse.get_pixel(x, 0))
        .collect();

    let row_len = resolution as usize * 4;
    let SurfaceBuffers {
        height,
        specular,
        diffuse,
    } = &mut buffers;

    height
        .par_chunks_mut(row_len)
        .zip(specular.par_chunks_mut(row_len))
        .zip(diffuse.par_chunks_mut(row_len))
        .for_each(|((height_row, specular_row), diffuse_row)| {
            for x in 0..resolution as usize {
                let px = x * 4;
                let point = decode_direction(&height_row[px..px + 3]);

                let elevation = fields
                    .iter()
                    .map(|f| f.layer.strength * f.shaped(point))
                    .sum::<f32>()
                    / total_strength;
                let elevation = elevation.clamp(0.0, 1.0);

                let level = (elevation * 255.0).round() as u8;
                height_row[px..px + 4].copy_from_slice(&[level, level, level, 255]);

                if elevation <= sea_level + f32::EPSILON {
                    specular_row[px..px + 3].fill(WATER_GLOSS);
                }

                let index = (elevation * (resolution - 1) as f32).round() as usize;
                diffuse_row[px..px + 4].copy_from_slice(&ramp[index].0);
            }
        });

    Ok(buffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanetOptions;
    use crate::generation::buffer::prepare_base;
    use crate::generation::gradient::generate_gradient;
    use image::RgbaImage;

    fn reference() -> RgbaImage {
        RgbaImage::from_fn(32, 32, |x, y| {
            Rgba([(x * 8) as u8, (y * 8) as u8, 200, 255])
        })
    }

    fn config(sea_level: f32) -> NoiseConfiguration {
        NoiseConfiguration::from_options(&PlanetOptions {
            roughness: 1,
            sea_level,
            ..Default::default()
        })
        .unwrap()
    }

    fn base(resolution: u32) -> SurfaceBuffers {
        prepare_base(&reference(), resolution, &generate_gradient(96354)).unwrap()
    }

    #[test]
    fn synthesis_is_deterministic() {
        let a = synthesize(96354, &config(20.0), base(24)).unwrap();
        let b = synthesize(96354, &config(20.0), base(24)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seed_changes_terrain() {
        let a = synthesize(1, &config(0.0), base(24)).unwrap();
        let b = synthesize(2, &config(0.0), base(24)).unwrap();
        assert_ne!(a.height, b.height);
    }

    #[test]
    fn height_is_grey_and_diffuse_comes_from_ramp() {
        let input = base(24);
        let ramp: Vec<Rgba<u8>> = input.diffuse.pixels().take(24).copied().collect();
        let out = synthesize(7, &config(10.0), input).unwrap();

        for pixel in out.height.pixels() {
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
            assert_eq!(pixel[3], 255);
        }
        assert!(out.diffuse.pixels().all(|p| ramp.contains(p)));
    }

    #[test]
    fn everything_below_a_high_sea_is_water() {
        let out = synthesize(7, &config(100.0), base(16)).unwrap();
        assert!(out.height.pixels().all(|p| p[0] == 255));
        assert!(out.specular.pixels().all(|p| p[0] == WATER_GLOSS));
    }

    #[test]
    fn mismatched_buffers_fail() {
        let mut input = base(16);
        input.specular = RgbaImage::new(8, 8);
        assert!(matches!(
            synthesize(7, &config(0.0), input),
            Err(TextureError::DimensionMismatch { .. })
        ));
    }
}
