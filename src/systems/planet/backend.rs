use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::generation::buffer::PixelBuffer;
use crate::generation::coordinator::{MaterialSlots, RenderBackend, TextureKind};

use super::materials::PlanetSurfaceMaterial;

/// Bevy asset storage seen through the pipeline's backend trait.
/// Built fresh inside each system that drives the coordinator.
pub struct BevyBackend<'a> {
    pub images: &'a mut Assets<Image>,
    pub materials: &'a mut Assets<PlanetSurfaceMaterial>,
    pub sun_direction: Vec3,
}

impl RenderBackend for BevyBackend<'_> {
    type Texture = Handle<Image>;
    type Material = Handle<PlanetSurfaceMaterial>;

    fn create_material(&mut self, label: &str) -> Handle<PlanetSurfaceMaterial> {
        debug!("creating surface material {label}");
        self.materials
            .add(PlanetSurfaceMaterial::untextured(self.sun_direction))
    }

    fn upload(&mut self, kind: TextureKind, buffer: &PixelBuffer) -> Handle<Image> {
        // data maps are linear, only colour lives in sRGB
        let format = match kind {
            TextureKind::Diffuse | TextureKind::Specular => TextureFormat::Rgba8UnormSrgb,
            TextureKind::Height | TextureKind::Normal => TextureFormat::Rgba8Unorm,
        };

        let image = Image::new(
            Extent3d {
                width: buffer.width(),
                height: buffer.height(),
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            buffer.as_raw().clone(),
            format,
            // the pipeline keeps its own copy, no need for one in the main world
            RenderAssetUsages::RENDER_WORLD,
        );
        self.images.add(image)
    }

    fn bind(
        &mut self,
        material: &Handle<PlanetSurfaceMaterial>,
        slots: MaterialSlots<'_, Handle<Image>>,
    ) {
        // one mutable borrow for every slot, extraction sees all or nothing
        let Some(material) = self.materials.get_mut(material) else {
            warn!("surface material vanished before its textures were bound");
            return;
        };
        material.diffuse_map = Some(slots.diffuse.clone());
        material.specular_map = Some(slots.specular.clone());
        material.normal_map = Some(slots.normal.clone());
        material.surface.bump_level = slots.bump_level;
        material.surface.textured = 1;
    }

    fn release_texture(&mut self, texture: Handle<Image>) {
        self.images.remove(&texture);
    }

    fn release_material(&mut self, material: Handle<PlanetSurfaceMaterial>) {
        self.materials.remove(&material);
    }
}
