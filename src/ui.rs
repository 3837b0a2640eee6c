use bevy::prelude::*;

use crate::crosshair::CrosshairState;

// --- HUD Formatting ---

// Score is shown with at least three digits
pub fn format_score(score: i64) -> String {
    format!("{score:03}")
}

/// Remaining time as `M:SS`, seconds floored.
pub fn format_timer(remaining_secs: f64) -> String {
    let total = remaining_secs.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn format_accuracy(accuracy: u32) -> String {
    format!("{accuracy}%")
}

pub fn format_countdown(secs: u64) -> String {
    format!("NEXT TASK: {secs}s")
}

/// Text setters the session drives once per frame.
pub trait HudSink {
    fn set_score(&mut self, score: i64);
    fn set_timer(&mut self, remaining_secs: f64);
    fn set_accuracy(&mut self, accuracy: u32);
    fn set_phase_label(&mut self, label: &str);
    fn set_next_phase_countdown(&mut self, secs: u64);
}

// Latest HUD strings; a renderer copies these into its text nodes
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct HudState {
    pub score: String,
    pub timer: String,
    pub accuracy: String,
    pub phase_label: String,
    pub next_phase: String,
}

impl HudSink for HudState {
    fn set_score(&mut self, score: i64) {
        self.score = format_score(score);
    }

    fn set_timer(&mut self, remaining_secs: f64) {
        self.timer = format_timer(remaining_secs);
    }

    fn set_accuracy(&mut self, accuracy: u32) {
        self.accuracy = format_accuracy(accuracy);
    }

    fn set_phase_label(&mut self, label: &str) {
        if self.phase_label != label {
            self.phase_label = label.to_string();
        }
    }

    fn set_next_phase_countdown(&mut self, secs: u64) {
        self.next_phase = format_countdown(secs);
    }
}

// Plugin to organize HUD state
pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HudState>().init_resource::<CrosshairState>();
    }
}
