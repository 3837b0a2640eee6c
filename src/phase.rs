use serde::{Deserialize, Serialize};

// --- Phase Descriptors ---

/// One entry of the training playlist.
///
/// A zero spawn interval means the phase has no interval spawning; combined
/// with `tracking` it runs a single continuously moving target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDescriptor {
    pub id: String,
    pub name: String,
    pub radius: f32,
    pub spawn_interval_ms: f64,
    pub x_range: f32,
    pub y_range: f32,
    pub color: u32,
    #[serde(default)]
    pub tracking: bool,
    // Pins spawns to y = 0 so only horizontal aim matters. Implied for `headshot`.
    #[serde(default)]
    pub lock_vertical: bool,
}

/// Steps run, in order, whenever a phase becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    ClearTargets,
    ResetCadence,
    SeedTrackingTarget,
}

impl PhaseDescriptor {
    fn new(id: &str, name: &str, radius: f32, spawn_interval_ms: f64, x_range: f32, y_range: f32, color: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            radius,
            spawn_interval_ms,
            x_range,
            y_range,
            color,
            tracking: false,
            lock_vertical: false,
        }
    }

    fn tracking(mut self) -> Self {
        self.tracking = true;
        self
    }

    fn lock_vertical(mut self) -> Self {
        self.lock_vertical = true;
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn pins_vertical(&self) -> bool {
        self.lock_vertical || self.id == "headshot"
    }

    // Interval spawning cadence, None for phases that never spawn on a timer
    pub fn spawn_interval(&self) -> Option<f64> {
        (self.spawn_interval_ms > 0.0).then_some(self.spawn_interval_ms)
    }

    pub fn entry_actions(&self) -> Vec<EntryAction> {
        let mut actions = vec![EntryAction::ClearTargets, EntryAction::ResetCadence];
        if self.tracking {
            actions.push(EntryAction::SeedTrackingTarget);
        }
        actions
    }
}

/// The nine-task default playlist.
pub fn default_playlist() -> Vec<PhaseDescriptor> {
    vec![
        PhaseDescriptor::new("gridshot", "GRIDSHOT", 0.45, 600.0, 14.0, 8.0, 0x00d2ff),
        PhaseDescriptor::new("tracking", "SMOOTH TRACKING", 0.35, 0.0, 16.0, 6.0, 0xffaa00).tracking(),
        PhaseDescriptor::new("microshot", "MICROSHOT", 0.18, 800.0, 5.0, 3.0, 0xff00ff),
        PhaseDescriptor::new("sixshot", "SIXSHOT", 0.12, 900.0, 12.0, 7.0, 0x00ff88),
        PhaseDescriptor::new("headshot", "HEADSHOT", 0.18, 700.0, 15.0, 0.1, 0xffffff).lock_vertical(),
        PhaseDescriptor::new("spidershot", "SPIDERSHOT", 0.35, 750.0, 16.0, 9.0, 0xffaa00),
        PhaseDescriptor::new("reflex", "REFLEX SHOT", 0.3, 350.0, 10.0, 5.0, 0x6ede8a),
        PhaseDescriptor::new("wallshot", "WIDE WALL", 0.4, 650.0, 20.0, 4.0, 0x8800ff),
        PhaseDescriptor::new("precision_final", "PRECISION FINAL", 0.1, 1000.0, 8.0, 4.0, 0xff0000),
    ]
}

// --- Phase Scheduler ---

/// Maps elapsed active time onto playlist slots of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseScheduler {
    session_duration_secs: f64,
    phase_count: usize,
    current: Option<usize>,
}

impl PhaseScheduler {
    pub fn new(session_duration_secs: f64, phase_count: usize) -> Self {
        Self {
            session_duration_secs,
            phase_count: phase_count.max(1),
            current: None,
        }
    }

    pub fn per_phase_secs(&self) -> f64 {
        self.session_duration_secs / self.phase_count as f64
    }

    pub fn session_duration_secs(&self) -> f64 {
        self.session_duration_secs
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    // Slot for an elapsed time, not bounded by the playlist length
    pub fn index_at(&self, elapsed_secs: f64) -> usize {
        (elapsed_secs / self.per_phase_secs()).floor().max(0.0) as usize
    }

    /// Enters phase 0; always a transition, so the first phase is announced too.
    pub fn begin(&mut self) -> usize {
        self.current = Some(0);
        0
    }

    /// Returns the newly entered phase, if elapsed time crossed into one.
    ///
    /// The final phase never transitions past the end of the playlist; the
    /// session end is checked separately with [`PhaseScheduler::is_finished`].
    pub fn advance(&mut self, elapsed_secs: f64) -> Option<usize> {
        let target = self.index_at(elapsed_secs);
        let moves_forward = self.current.map_or(true, |current| target > current);
        if moves_forward && target < self.phase_count {
            self.current = Some(target);
            return Some(target);
        }
        None
    }

    pub fn is_finished(&self, elapsed_secs: f64) -> bool {
        elapsed_secs >= self.session_duration_secs
    }

    pub fn remaining_secs(&self, elapsed_secs: f64) -> f64 {
        (self.session_duration_secs - elapsed_secs).max(0.0)
    }

    // Whole seconds until the next rotation, rounded up
    pub fn next_phase_countdown_secs(&self, elapsed_secs: f64) -> u64 {
        let per_phase = self.per_phase_secs();
        let into_phase = elapsed_secs.max(0.0) % per_phase;
        (per_phase - into_phase).ceil() as u64
    }
}
