use bevy::prelude::*;
use bevy::render::render_resource::*;
use bevy::reflect::TypePath;
use bevy::asset::Asset;

use crate::config::{PLANET_SHADER, SURFACE_SPECULAR_COLOR, SURFACE_SPECULAR_POWER};
use crate::generation::atmosphere::{AtmosphereBlend, AtmosphereLook};

// lighting data for the surface shader
// bump_level and textured change on every tier commit
#[derive(ShaderType, Clone, Copy, Debug)]
pub struct SurfaceUniform {
    pub sun_direction: Vec3,
    pub bump_level: f32,
    pub specular_color: Vec3,
    pub specular_power: f32,
    // 0 until the first tier lands, the shader draws flat grey meanwhile
    pub textured: u32,
}

// planet surface material
// slots stay empty until the first commit
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct PlanetSurfaceMaterial {
    #[texture(0)]
    #[sampler(1)]
    pub diffuse_map: Option<Handle<Image>>,
    #[texture(2)]
    #[sampler(3)]
    pub specular_map: Option<Handle<Image>>,
    #[texture(4)]
    #[sampler(5)]
    pub normal_map: Option<Handle<Image>>,
    #[uniform(6)]
    pub surface: SurfaceUniform,
}

impl PlanetSurfaceMaterial {
    pub fn untextured(sun_direction: Vec3) -> Self {
        Self {
            diffuse_map: None,
            specular_map: None,
            normal_map: None,
            surface: SurfaceUniform {
                sun_direction,
                bump_level: 0.0,
                specular_color: Vec3::from(SURFACE_SPECULAR_COLOR),
                specular_power: SURFACE_SPECULAR_POWER,
                textured: 0,
            },
        }
    }
}

impl Material for PlanetSurfaceMaterial {
    fn fragment_shader() -> ShaderRef {
        PLANET_SHADER.into()
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Opaque
    }
}

// Blinn-Phong exponent to perceptual roughness
fn roughness_from_power(power: f32) -> f32 {
    (2.0 / (power + 2.0)).sqrt().clamp(0.089, 1.0)
}

/// Static cloud/glow shell around the planet, a pure function of the look
pub fn atmosphere_material(
    look: &AtmosphereLook,
    clouds: Handle<Image>,
    glow: Handle<Image>,
) -> StandardMaterial {
    let [r, g, b] = look.diffuse_color.unwrap_or([1.0, 1.0, 1.0]);
    let level = look.cloud_level;
    let [sr, sg, sb] = look.specular_color;

    StandardMaterial {
        base_color: Color::srgba(r * level, g * level, b * level, look.alpha),
        base_color_texture: Some(clouds),
        emissive: LinearRgba::rgb(sr, sg, sb),
        emissive_texture: Some(glow),
        perceptual_roughness: roughness_from_power(look.specular_power),
        depth_bias: look.z_offset,
        alpha_mode: match look.blend {
            AtmosphereBlend::Additive => AlphaMode::Add,
            AtmosphereBlend::Maximized => AlphaMode::Premultiplied,
        },
        ..default()
    }
}
