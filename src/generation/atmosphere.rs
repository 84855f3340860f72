use crate::config::{AtmosphereColor, PlanetOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmosphereBlend {
    Additive,
    // keeps the brighter of overlay and surface
    Maximized,
}

/// Everything the overlay material needs, derived from options alone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereLook {
    pub cloud_level: f32,
    pub alpha: f32,
    pub blend: AtmosphereBlend,
    pub specular_color: [f32; 3],
    pub diffuse_color: Option<[f32; 3]>,
    pub specular_power: f32,
    pub z_offset: f32,
}

fn scale(color: [f32; 3], factor: f32) -> [f32; 3] {
    color.map(|c| c * factor)
}

impl AtmosphereLook {
    pub fn from_options(options: &PlanetOptions) -> Self {
        let density = options.atmosphere_density;
        let color = options.atmosphere_color;

        let blend = match color {
            AtmosphereColor::Orange | AtmosphereColor::Green if density > 1.0 => {
                AtmosphereBlend::Maximized
            }
            _ => AtmosphereBlend::Additive,
        };

        let base = color.rgb();
        let diffuse_color = match color {
            AtmosphereColor::Green => Some(scale(base, 1.7)),
            _ => None,
        };
        let specular_color = if density >= 3.0 { scale(base, 1.7) } else { base };

        Self {
            cloud_level: density.min(1.2),
            alpha: (density + 1.0) * 0.15,
            blend,
            specular_color,
            diffuse_color,
            specular_power: 2.5,
            z_offset: -5.0,
        }
    }
}
