use crate::config::PlanetOptions;

use super::error::TextureError;

/// Parameters for one stack of noise octaves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseLayer {
    // offset into noise space, decorrelates layers sharing a seed
    pub shift: f64,
    // octave count
    pub passes: u32,
    // weight of this layer in the final elevation
    pub strength: f32,
    // base frequency of the first octave
    pub roughness: f32,
    // amplitude falloff per octave
    pub resistance: f32,
    // elevation floor (sea level)
    pub minimum: f32,
    // flatten below `minimum` instead of compressing
    pub hard_clamp: bool,
}

impl NoiseLayer {
    fn validate(&self, index: usize) -> Result<(), TextureError> {
        let invalid = |reason: &str| TextureError::InvalidLayer {
            index,
            reason: reason.to_string(),
        };

        if self.passes == 0 {
            return Err(invalid("passes must be at least 1"));
        }
        if !self.shift.is_finite() {
            return Err(invalid("shift must be finite"));
        }
        if !self.strength.is_finite() || self.strength < 0.0 {
            return Err(invalid("strength must be finite and non-negative"));
        }
        if !self.roughness.is_finite() || self.roughness <= 0.0 {
            return Err(invalid("roughness must be finite and positive"));
        }
        if !self.resistance.is_finite() || self.resistance <= 0.0 || self.resistance > 1.0 {
            return Err(invalid("resistance must be within (0, 1]"));
        }
        if !self.minimum.is_finite() || !(-1.0..=1.0).contains(&self.minimum) {
            return Err(invalid("minimum must be within [-1, 1]"));
        }

        Ok(())
    }
}

/// Ordered, never-empty list of noise layers.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseConfiguration {
    layers: Vec<NoiseLayer>,
}

impl NoiseConfiguration {
    pub fn new(layers: Vec<NoiseLayer>) -> Result<Self, TextureError> {
        if layers.is_empty() {
            return Err(TextureError::EmptyConfiguration);
        }
        for (index, layer) in layers.iter().enumerate() {
            layer.validate(index)?;
        }
        // elevation is a strength-weighted mean
        let total_strength: f32 = layers.iter().map(|l| l.strength).sum();
        if total_strength <= 0.0 {
            return Err(TextureError::WeightlessConfiguration);
        }
        Ok(Self { layers })
    }

    /// Base continent layer, with detail layers prepended as roughness grows.
    pub fn from_options(options: &PlanetOptions) -> Result<Self, TextureError> {
        options.validate()?;

        let minimum = options.sea_level * 0.01;
        let mut layers = vec![NoiseLayer {
            shift: 5.0,
            passes: 14,
            strength: 0.65,
            roughness: 2.1 - options.land_mass_size * 0.02,
            resistance: 0.6,
            minimum,
            hard_clamp: true,
        }];

        if options.roughness >= 1 {
            layers.insert(
                0,
                NoiseLayer {
                    shift: 18.0,
                    passes: 15,
                    strength: 0.45,
                    roughness: 0.3,
                    resistance: 0.65,
                    minimum,
                    hard_clamp: true,
                },
            );
        }
        if options.roughness >= 2 {
            layers.insert(
                0,
                NoiseLayer {
                    shift: 0.0,
                    passes: 10,
                    strength: 0.8,
                    roughness: 0.6,
                    resistance: 0.70,
                    minimum,
                    hard_clamp: true,
                },
            );
        }

        Self::new(layers)
    }

    pub fn layers(&self) -> &[NoiseLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }
}
