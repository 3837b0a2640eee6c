use bevy::prelude::*;
use std::collections::{HashSet, VecDeque};

// Upper bound on queued motion samples between two ticks
const MAX_QUEUED_SAMPLES: usize = 1000;

// --- Movement Keys ---

// Both QWERTY and AZERTY layouts walk forward and strafe left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKey {
    W,
    Z,
    S,
    A,
    Q,
    D,
}

impl MoveKey {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'w' => Some(Self::W),
            'z' => Some(Self::Z),
            's' => Some(Self::S),
            'a' => Some(Self::A),
            'q' => Some(Self::Q),
            'd' => Some(Self::D),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovementKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

// --- Input Queue ---

/// Host-side input gathered between ticks.
///
/// Events only land here; the session applies them during the next tick,
/// so every read-modify-write of session state happens inside one tick.
#[derive(Resource, Debug, Default)]
pub struct PointerInput {
    samples: VecDeque<Vec2>,
    clicks: u32,
    held: HashSet<MoveKey>,
    capture_changes: Vec<bool>,
}

/// Everything the session consumes in one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFrame {
    pub pointer_deltas: Vec<Vec2>,
    pub clicks: u32,
    pub capture_changes: Vec<bool>,
    pub movement: MovementKeys,
}

impl PointerInput {
    pub fn push_motion(&mut self, delta: Vec2) {
        self.samples.push_back(delta);
        if self.samples.len() > MAX_QUEUED_SAMPLES {
            self.samples.pop_front();
        }
    }

    pub fn push_click(&mut self) {
        self.clicks += 1;
    }

    pub fn key_down(&mut self, key: MoveKey) {
        self.held.insert(key);
    }

    pub fn key_up(&mut self, key: MoveKey) {
        self.held.remove(&key);
    }

    // Platform granted or released pointer capture
    pub fn capture_changed(&mut self, captured: bool) {
        self.capture_changes.push(captured);
    }

    pub fn movement(&self) -> MovementKeys {
        let held = |key: MoveKey| self.held.contains(&key);
        MovementKeys {
            forward: held(MoveKey::W) || held(MoveKey::Z),
            back: held(MoveKey::S),
            left: held(MoveKey::A) || held(MoveKey::Q),
            right: held(MoveKey::D),
        }
    }

    /// Drains queued events; held keys persist until released.
    pub fn take_frame(&mut self) -> InputFrame {
        InputFrame {
            pointer_deltas: self.samples.drain(..).collect(),
            clicks: std::mem::take(&mut self.clicks),
            capture_changes: std::mem::take(&mut self.capture_changes),
            movement: self.movement(),
        }
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerInput>();
    }
}
