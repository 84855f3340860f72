use bevy::prelude::*;

mod config;
mod generation;
mod systems;

use config::{PLANET_RADIUS, SUN_DIRECTION};
use systems::planet::PlanetPlugin;
use systems::ui::PlanetUiPlugin;

fn main() -> bevy::app::AppExit {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(PlanetPlugin)
        .add_plugins(PlanetUiPlugin)
        .insert_resource(ClearColor(Color::srgb(0.0, 0.0, 0.0)))
        .add_systems(Startup, setup)
        .run()
}

// scene setup here
fn setup(mut commands: Commands) {
    // sun light, shines along the same direction the surface shader uses
    let sun = Vec3::from(SUN_DIRECTION);
    commands.spawn((
        DirectionalLight {
            illuminance: 1_500.,
            ..default()
        },
        Transform::from_translation(sun * 50.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // spawn camera
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(-2.5, 4.5, PLANET_RADIUS * 3.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
