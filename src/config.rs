use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::generation::error::TextureError;

// Planet measurements (in scene units)
pub const PLANET_RADIUS: f32 = 5.0;
pub const ATMOSPHERE_RADIUS: f32 = 5.15;

// direction the sunlight travels from
pub const SUN_DIRECTION: [f32; 3] = [1.0, 0.4, 1.0];

// Rotation speeds
pub const PLANET_ROTATION_SPEED: f32 = 0.05;

// Asset paths
pub const PLANET_OPTIONS_FILE: &str = "assets/planet.ron";
pub const HEIGHT_REFERENCE_TEXTURE: &str = "textures/planet_object_space_normal.png";
pub const ATMOSPHERE_TEXTURE: &str = "textures/atmosphere.png";
pub const CLOUDS_TEXTURE: &str = "textures/planet_clouds.png";
pub const PLANET_SHADER: &str = "shaders/planet.wgsl";

// Progressive refinement, lowest resolution first
pub const RESOLUTION_TIERS: [u32; 3] = [256, 512, 1024];

// how long a superseded texture set stays alive after a swap
// the renderer may still sample it for a few frames
pub const SUPERSEDED_GRACE: Duration = Duration::from_millis(2000);
pub const TEARDOWN_GRACE: Duration = Duration::from_millis(5000);

// Surface shading
pub const SURFACE_SPECULAR_COLOR: [f32; 3] = [0.2, 0.2, 0.2];
pub const SURFACE_SPECULAR_POWER: f32 = 14.0;

/// Fixed palette for the atmosphere overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtmosphereColor {
    #[default]
    Blue,
    Orange,
    White,
    Green,
    Purple,
}

impl AtmosphereColor {
    pub fn rgb(self) -> [f32; 3] {
        match self {
            AtmosphereColor::Blue => [0.1, 0.3, 0.5],
            AtmosphereColor::Orange => [0.5, 0.4, 0.2],
            AtmosphereColor::White => [0.3, 0.3, 0.4],
            AtmosphereColor::Green => [0.2, 0.3, 0.17],
            AtmosphereColor::Purple => [0.45, 0.2, 0.45],
        }
    }
}

/// Caller-facing planet settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetOptions {
    pub terrain_seed: String,
    pub land_mass_size: f32,
    pub sea_level: f32,
    // 0..=3, controls how many detail layers are stacked
    pub roughness: u8,
    pub atmosphere_density: f32,
    pub atmosphere_color: AtmosphereColor,
}

impl Default for PlanetOptions {
    fn default() -> Self {
        Self {
            terrain_seed: "planetforge".to_string(),
            land_mass_size: 50.0,
            sea_level: 40.0,
            roughness: 2,
            atmosphere_density: 1.0,
            atmosphere_color: AtmosphereColor::Blue,
        }
    }
}

impl PlanetOptions {
    /// Reads options from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let text = std::fs::read_to_string(path)?;
        let options: PlanetOptions = ron::from_str(&text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), TextureError> {
        if self.roughness > 3 {
            return Err(TextureError::InvalidOptions(format!(
                "roughness must be within 0..=3, got {}",
                self.roughness
            )));
        }

        let numbers = [
            ("land_mass_size", self.land_mass_size),
            ("sea_level", self.sea_level),
            ("atmosphere_density", self.atmosphere_density),
        ];
        for (name, value) in numbers {
            if !value.is_finite() {
                return Err(TextureError::InvalidOptions(format!("{name} must be finite")));
            }
        }
        if self.atmosphere_density < 0.0 {
            return Err(TextureError::InvalidOptions(
                "atmosphere_density must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}
