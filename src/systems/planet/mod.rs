use std::path::Path;

use bevy::asset::LoadState;
use bevy::prelude::*;

pub mod backend;
pub mod materials;

use backend::BevyBackend;
use materials::{PlanetSurfaceMaterial, atmosphere_material};

use crate::config::{
    ATMOSPHERE_RADIUS, ATMOSPHERE_TEXTURE, CLOUDS_TEXTURE, HEIGHT_REFERENCE_TEXTURE,
    PLANET_OPTIONS_FILE, PLANET_RADIUS, PLANET_ROTATION_SPEED, PlanetOptions, SUN_DIRECTION,
};
use crate::generation::buffer::PixelBuffer;
use crate::generation::coordinator::{PipelineSettings, ProgressiveTextureCoordinator};
use crate::generation::error::TextureError;
use crate::generation::worker::WorkerThread;

pub struct PlanetPlugin;

impl Plugin for PlanetPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MaterialPlugin::<PlanetSurfaceMaterial>::default())
            .add_systems(Startup, start)
            .add_systems(Update, (
                build_pipeline.run_if(resource_exists::<PendingPlanet>),
                (reconfigure, drive_pipeline)
                    .chain()
                    .run_if(resource_exists::<PlanetTextures>),
                rotate,
            ))
            .add_systems(Last, shutdown.run_if(resource_exists::<PlanetTextures>));
    }
}

// planet tag
#[derive(Component)]
pub struct Planet;

// atmosphere tag
#[derive(Component)]
pub struct Atmosphere;

pub type SurfaceCoordinator =
    ProgressiveTextureCoordinator<Handle<Image>, Handle<PlanetSurfaceMaterial>>;

// waiting for the height reference to load
#[derive(Resource)]
struct PendingPlanet {
    options: PlanetOptions,
    reference: Handle<Image>,
    clouds: Handle<Image>,
    glow: Handle<Image>,
    planet: Entity,
}

/// The running texture pipeline and the entity it dresses
#[derive(Resource)]
pub struct PlanetTextures {
    pub coordinator: SurfaceCoordinator,
    planet: Entity,
}

fn sun_direction() -> Vec3 {
    Vec3::from(SUN_DIRECTION).normalize()
}

fn load_options() -> PlanetOptions {
    if !Path::new(PLANET_OPTIONS_FILE).exists() {
        return PlanetOptions::default();
    }

    match PlanetOptions::load(PLANET_OPTIONS_FILE) {
        Ok(options) => {
            info!("loaded planet options from {PLANET_OPTIONS_FILE}");
            options
        }
        Err(e) => {
            warn!("ignoring {PLANET_OPTIONS_FILE}: {e}");
            PlanetOptions::default()
        }
    }
}

fn start(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    asset_server: Res<AssetServer>,
) {
    let options = load_options();

    // load static textures
    let reference = asset_server.load(HEIGHT_REFERENCE_TEXTURE);
    let clouds = asset_server.load(CLOUDS_TEXTURE);
    let glow = asset_server.load(ATMOSPHERE_TEXTURE);

    // uv sphere, tangents are needed for the normal map
    let mut surface = Sphere::new(PLANET_RADIUS).mesh().uv(128, 64);
    if let Err(e) = surface.generate_tangents() {
        warn!("planet mesh has no tangents, bump mapping disabled: {e}");
    }

    // material is attached once the pipeline hands one out
    let planet = commands
        .spawn((
            Planet,
            Mesh3d(meshes.add(surface)),
            Transform::default(),
        ))
        .id();

    commands.insert_resource(PendingPlanet {
        options,
        reference,
        clouds,
        glow,
        planet,
    });
}

fn reference_pixels(image: &Image) -> Result<PixelBuffer, TextureError> {
    image
        .clone()
        .try_into_dynamic()
        .map(|dynamic| dynamic.to_rgba8())
        .map_err(|e| TextureError::Reference(e.to_string()))
}

fn new_coordinator(
    options: PlanetOptions,
    reference: &Image,
) -> Result<SurfaceCoordinator, TextureError> {
    let pixels = reference_pixels(reference)?;
    let worker = WorkerThread::spawn()?;
    ProgressiveTextureCoordinator::new(
        "planet",
        options,
        pixels,
        Box::new(worker),
        PipelineSettings::default(),
    )
}

// construct the pipeline once the height reference is in memory
fn build_pipeline(
    mut commands: Commands,
    pending: Res<PendingPlanet>,
    asset_server: Res<AssetServer>,
    images: Res<Assets<Image>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut standard_materials: ResMut<Assets<StandardMaterial>>,
) {
    match asset_server.load_state(&pending.reference) {
        LoadState::Loaded => {}
        LoadState::Failed(e) => {
            // nothing to build textures from
            error!("could not load {HEIGHT_REFERENCE_TEXTURE}: {e}");
            commands.remove_resource::<PendingPlanet>();
            return;
        }
        _ => return, // wait for image to load
    }

    let Some(reference) = images.get(&pending.reference) else {
        return;
    };

    match new_coordinator(pending.options.clone(), reference) {
        Ok(coordinator) => {
            info!(
                "planet \"{}\" seeded with {}",
                coordinator.options().terrain_seed,
                coordinator.seed()
            );

            // atmosphere does not take part in the refinement
            let look = coordinator.atmosphere_look();
            let shell = Sphere::new(ATMOSPHERE_RADIUS).mesh().uv(64, 32);
            let overlay = atmosphere_material(&look, pending.clouds.clone(), pending.glow.clone());
            commands.spawn((
                Atmosphere,
                Mesh3d(meshes.add(shell)),
                MeshMaterial3d(standard_materials.add(overlay)),
                Transform::default(),
                ChildOf(pending.planet),
            ));

            commands.insert_resource(PlanetTextures {
                coordinator,
                planet: pending.planet,
            });
        }
        Err(e) => error!("planet texture pipeline failed to start: {e}"),
    }

    // cleanup - we're done with this resource
    commands.remove_resource::<PendingPlanet>();
}

// digits 0-3 rebuild the planet with that roughness
fn reconfigure(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time<Real>>,
    mut textures: ResMut<PlanetTextures>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<PlanetSurfaceMaterial>>,
) {
    let digits = [
        (KeyCode::Digit0, 0),
        (KeyCode::Digit1, 1),
        (KeyCode::Digit2, 2),
        (KeyCode::Digit3, 3),
    ];
    let Some(roughness) = digits
        .iter()
        .find(|(key, _)| keys.just_pressed(*key))
        .map(|(_, roughness)| *roughness)
    else {
        return;
    };

    let options = PlanetOptions {
        roughness,
        ..textures.coordinator.options().clone()
    };

    let mut backend = BevyBackend {
        images: &mut images,
        materials: &mut materials,
        sun_direction: sun_direction(),
    };
    if let Err(e) = textures
        .coordinator
        .set_options(options, &mut backend, time.elapsed())
    {
        warn!("could not reconfigure planet: {e}");
    }
}

// per frame: advance the pipeline and keep the planet on its current material
fn drive_pipeline(
    mut commands: Commands,
    time: Res<Time<Real>>,
    mut textures: ResMut<PlanetTextures>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<PlanetSurfaceMaterial>>,
    planets: Query<Option<&MeshMaterial3d<PlanetSurfaceMaterial>>, With<Planet>>,
) {
    let now = time.elapsed();
    let mut backend = BevyBackend {
        images: &mut images,
        materials: &mut materials,
        sun_direction: sun_direction(),
    };

    let textures = &mut *textures;
    let material = match textures.coordinator.request_material(&mut backend, now) {
        Ok(material) => material,
        Err(e) => {
            debug!("no planet material: {e}");
            return;
        }
    };
    textures.coordinator.update(&mut backend, now);

    let Ok(current) = planets.get(textures.planet) else {
        return;
    };
    if current.map(|m| &m.0) != Some(&material) {
        commands
            .entity(textures.planet)
            .insert(MeshMaterial3d(material));
    }
}

// release everything still waiting on a grace delay
fn shutdown(
    mut exits: EventReader<AppExit>,
    time: Res<Time<Real>>,
    mut textures: ResMut<PlanetTextures>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<PlanetSurfaceMaterial>>,
) {
    if exits.read().next().is_none() {
        return;
    }

    let mut backend = BevyBackend {
        images: &mut images,
        materials: &mut materials,
        sun_direction: sun_direction(),
    };
    textures.coordinator.dispose(time.elapsed());
    textures.coordinator.flush(&mut backend);
}

// rotate planet
fn rotate(time: Res<Time>, mut planets: Query<&mut Transform, With<Planet>>) {
    let delta_rotation = Quat::from_rotation_y(PLANET_ROTATION_SPEED * time.delta_secs());

    for mut transform in planets.iter_mut() {
        transform.rotation *= delta_rotation;
    }
}
