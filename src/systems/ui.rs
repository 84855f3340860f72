use bevy::prelude::*;

use crate::generation::coordinator::PipelineState;
use crate::systems::planet::PlanetTextures;

pub struct PlanetUiPlugin;

impl Plugin for PlanetUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_ui)
           .add_systems(Update, (
               update_pipeline_status,
               update_planet_details.run_if(resource_exists_and_changed::<PlanetTextures>),
           ));
    }
}

// UI component to display the refinement state
#[derive(Component)]
pub struct PipelineStatus;

// UI component to display seed and layer count
#[derive(Component)]
pub struct PlanetDetails;

fn setup_ui(mut commands: Commands) {
    // create UI container
    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Start,
                justify_content: JustifyContent::Start,
                padding: UiRect::all(Val::Px(20.0)),
                ..default()
            },
            BackgroundColor(Color::NONE),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("Surface: Loading..."),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                PipelineStatus,
            ));

            parent.spawn((
                Text::new("Seed: -"),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                PlanetDetails,
                Node {
                    margin: UiRect::top(Val::Px(5.0)), // spacing
                    ..default()
                },
            ));

            parent.spawn((
                Text::new("Press 0-3 to change roughness"),
                TextFont {
                    font_size: 12.0,
                    ..default()
                },
                TextColor(Color::srgb(0.6, 0.6, 0.6)),
                Node {
                    margin: UiRect::top(Val::Px(5.0)),
                    ..default()
                },
            ));
        });
}

fn describe(state: PipelineState) -> String {
    match state {
        PipelineState::Idle => "Surface: waiting".to_string(),
        PipelineState::Synthesizing { resolution, .. } => {
            format!("Surface: generating {resolution}px")
        }
        PipelineState::Committed { resolution, .. } => {
            format!("Surface: showing {resolution}px, refining")
        }
        PipelineState::Settled { resolution } => format!("Surface: {resolution}px"),
        PipelineState::Halted { last_committed: Some(resolution) } => {
            format!("Surface: stopped at {resolution}px")
        }
        PipelineState::Halted { last_committed: None } => "Surface: generation failed".to_string(),
        PipelineState::Disposed => "Surface: released".to_string(),
    }
}

// update the pipeline state display
fn update_pipeline_status(
    textures: Option<Res<PlanetTextures>>,
    mut text_query: Query<&mut Text, With<PipelineStatus>>,
) {
    let Some(textures) = textures else {
        return;
    };

    if let Ok(mut text) = text_query.single_mut() {
        let coordinator = &textures.coordinator;
        let mut status = describe(coordinator.state());
        if let Some(live) = coordinator.live_set() {
            status.push_str(&format!(" (tier {} live)", live.tier + 1));
        }
        let retiring = coordinator.pending_disposals();
        if retiring > 0 {
            status.push_str(&format!(", {retiring} retiring"));
        }
        if text.0 != status {
            text.0 = status;
        }
    }
}

fn update_planet_details(
    textures: Res<PlanetTextures>,
    mut text_query: Query<&mut Text, With<PlanetDetails>>,
) {
    if let Ok(mut text) = text_query.single_mut() {
        let options = textures.coordinator.options();
        text.0 = format!(
            "Seed: {} ({}), {} noise layers",
            options.terrain_seed,
            textures.coordinator.seed(),
            textures.coordinator.noise_configuration().len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_runs_before_the_pipeline_exists() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(PlanetUiPlugin);
        app.update();
        app.update();

        let mut texts = app
            .world_mut()
            .query_filtered::<&Text, With<PipelineStatus>>();
        let status = texts.single(app.world()).unwrap();
        assert_eq!(status.0, "Surface: Loading...");
    }

    #[test]
    fn halted_status_names_the_surviving_resolution() {
        let text = describe(PipelineState::Halted { last_committed: Some(512) });
        assert_eq!(text, "Surface: stopped at 512px");
    }

    #[test]
    fn settled_status_shows_final_resolution() {
        assert_eq!(describe(PipelineState::Settled { resolution: 1024 }), "Surface: 1024px");
    }
}
