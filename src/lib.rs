pub mod camera;
pub mod clock;
pub mod config;
pub mod crosshair;
pub mod hit_detection;
pub mod history;
pub mod input;
pub mod phase;
pub mod player;
pub mod sensitivity;
pub mod session;
pub mod stats;
pub mod target;
pub mod ui;

use bevy::prelude::*;

use crate::clock::{Clock, FrameClock};
use crate::config::TrainerConfig;
use crate::crosshair::CrosshairState;
use crate::history::{HistoryStorage, HistoryStore};
use crate::input::InputPlugin;
use crate::session::SessionPlugin;
use crate::ui::HudPlugin;

fn apply_configured_crosshair(config: Res<TrainerConfig>, mut crosshair: ResMut<CrosshairState>) {
    if let Some(code) = config.crosshair_code.as_deref() {
        crosshair.apply_code(code);
    }
}

/// Input queue, HUD state and the session engine.
pub struct AimTrainerPlugin;

impl Plugin for AimTrainerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((InputPlugin, HudPlugin, SessionPlugin))
            .add_systems(Startup, apply_configured_crosshair);
    }
}

/// Builds an app with no window or renderer; callers drive it with `App::update`.
pub fn create_headless_app(
    config: TrainerConfig,
    clock: impl Clock + 'static,
    store: impl HistoryStore + 'static,
) -> App {
    let mut app = App::new();
    app.insert_resource(config)
        .insert_resource(FrameClock::new(clock))
        .insert_resource(HistoryStorage::new(store))
        .add_plugins(AimTrainerPlugin);
    app
}
