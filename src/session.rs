use bevy::prelude::*;
use chrono::{DateTime, Utc};

use crate::camera::{center_ray, Orientation, OrientationMapper};
use crate::clock::{FrameClock, SessionClock};
use crate::config::TrainerConfig;
use crate::hit_detection::{resolve_click, resolve_tracking, ShotOutcome};
use crate::history::HistoryStorage;
use crate::input::{InputFrame, PointerInput};
use crate::phase::{EntryAction, PhaseDescriptor, PhaseScheduler};
use crate::player::Player;
use crate::sensitivity::SensitivityProfile;
use crate::stats::{finalize_session, HistoryLog, ScoreTracker, SessionSummary, TrackingScoring};
use crate::target::{Target, TargetId, TargetRegistry, TargetSpawner};
use crate::ui::{HudSink, HudState};

// --- Commands & Notifications ---

/// Requests from the menu layer, applied at the start of the next frame.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    // Also used for retry; a running session is replaced
    Start,
    Pause,
    Resume,
    Quit,
}

/// Everything the renderer, audio and menus need to hear about.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started,
    PhaseEntered {
        index: usize,
        id: String,
        name: String,
        color: u32,
    },
    TargetSpawned {
        id: TargetId,
        position: Vec3,
        radius: f32,
        color: u32,
    },
    TargetRemoved {
        id: TargetId,
    },
    TargetHit {
        id: TargetId,
        phase_id: String,
        reaction_ms: f64,
    },
    // Tracking target highlight follows whether the crosshair is on it
    TrackingEmphasis(bool),
    CaptureRequested,
    CaptureReleased,
    Paused,
    Resumed,
    Ended(SessionSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Ended,
}

// --- Session Engine ---

/// One viewer's training session and every subsystem it drives.
///
/// All mutation happens in `start`, `pause`, `resume`, `quit` and `tick`,
/// which the systems below call once per frame. Notifications queue up in an
/// outbox that is flushed into `SessionEvent`s at the end of the frame.
#[derive(Resource, Debug)]
pub struct SessionEngine {
    playlist: Vec<PhaseDescriptor>,
    profile: SensitivityProfile,
    tracking: TrackingScoring,
    status: SessionStatus,
    clock: SessionClock,
    scheduler: PhaseScheduler,
    orientation: OrientationMapper,
    player: Player,
    registry: TargetRegistry,
    spawner: TargetSpawner,
    score: ScoreTracker,
    history: HistoryLog,
    captured: bool,
    on_target: bool,
    last_tick_ms: f64,
    last_summary: Option<SessionSummary>,
    outbox: Vec<SessionEvent>,
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new(HistoryLog::default())
    }
}

impl SessionEngine {
    pub fn new(history: HistoryLog) -> Self {
        let config = TrainerConfig::default();
        Self {
            scheduler: PhaseScheduler::new(config.session_duration_secs, config.playlist.len()),
            profile: config.sensitivity_profile(),
            tracking: config.tracking,
            playlist: config.playlist,
            status: SessionStatus::Idle,
            clock: SessionClock::start(0.0),
            orientation: OrientationMapper::default(),
            player: Player::default(),
            registry: TargetRegistry::default(),
            spawner: TargetSpawner::new(0),
            score: ScoreTracker::default(),
            history,
            captured: false,
            on_target: false,
            last_tick_ms: 0.0,
            last_summary: None,
            outbox: Vec::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, SessionStatus::Running | SessionStatus::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.status == SessionStatus::Paused
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation.orientation()
    }

    pub fn sensitivity(&self) -> &SensitivityProfile {
        &self.profile
    }

    pub fn eye(&self) -> Vec3 {
        self.player.position
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.registry.iter()
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn spawner(&self) -> &TargetSpawner {
        &self.spawner
    }

    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn set_history(&mut self, history: HistoryLog) {
        self.history = history;
    }

    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    pub fn current_phase(&self) -> Option<&PhaseDescriptor> {
        self.scheduler.current().and_then(|index| self.playlist.get(index))
    }

    pub fn elapsed_secs(&self, now_ms: f64) -> f64 {
        self.clock.elapsed_active_secs(now_ms)
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Starts a fresh session, replacing whatever was running.
    pub fn start(&mut self, now_ms: f64, config: &TrainerConfig) -> bool {
        if let Err(err) = config.validate() {
            warn!("Refusing to start session: {err}");
            return false;
        }

        self.clear_targets();
        self.playlist = config.playlist.clone();
        self.profile = config.sensitivity_profile();
        self.tracking = config.tracking;
        self.scheduler = PhaseScheduler::new(config.session_duration_secs, self.playlist.len());
        self.spawner = TargetSpawner::new(config.seed.unwrap_or_else(rand::random));
        self.clock = SessionClock::start(now_ms);
        self.score = ScoreTracker::default();
        self.orientation.reset();
        self.player.reset();
        self.on_target = false;
        self.last_tick_ms = now_ms;
        self.status = SessionStatus::Running;

        info!(
            "Session started: {} phases over {}s",
            self.playlist.len(),
            config.session_duration_secs
        );
        self.outbox.push(SessionEvent::Started);
        let first = self.scheduler.begin();
        self.enter_phase(first, now_ms);
        if !self.captured {
            self.outbox.push(SessionEvent::CaptureRequested);
        }
        true
    }

    /// Returns false when there was nothing running to pause.
    pub fn pause(&mut self, now_ms: f64) -> bool {
        if self.status != SessionStatus::Running || !self.clock.pause(now_ms) {
            return false;
        }
        self.status = SessionStatus::Paused;
        info!("Session paused at {:.1}s", self.clock.elapsed_active_secs(now_ms));
        self.outbox.push(SessionEvent::Paused);
        self.release_capture();
        true
    }

    /// Closes the pause and moves every spawn-time reference past it.
    pub fn resume(&mut self, now_ms: f64) -> bool {
        if self.status != SessionStatus::Paused {
            return false;
        }
        let Some(paused_for) = self.clock.resume(now_ms) else {
            return false;
        };
        self.registry.shift_spawn_times(paused_for);
        self.spawner.shift(paused_for);
        self.last_tick_ms = now_ms;
        self.status = SessionStatus::Running;
        info!("Session resumed after {paused_for:.0}ms");
        self.outbox.push(SessionEvent::Resumed);
        if !self.captured {
            self.outbox.push(SessionEvent::CaptureRequested);
        }
        true
    }

    pub fn quit(&mut self) {
        if self.status == SessionStatus::Idle {
            return;
        }
        self.clear_targets();
        self.score = ScoreTracker::default();
        self.status = SessionStatus::Idle;
        info!("Session quit");
        self.release_capture();
    }

    /// Advances the session by one frame.
    ///
    /// Returns the summary on the frame the session ends.
    pub fn tick(&mut self, now_ms: f64, wall_time: DateTime<Utc>, frame: InputFrame) -> Option<SessionSummary> {
        for captured in frame.capture_changes {
            self.captured = captured;
            if !captured && self.status == SessionStatus::Running {
                info!("Input capture lost, pausing");
                self.pause(now_ms);
            }
        }

        let delta_secs = ((now_ms - self.last_tick_ms).max(0.0) / 1000.0) as f32;
        self.last_tick_ms = now_ms;
        if self.status != SessionStatus::Running {
            return None;
        }

        let elapsed = self.clock.elapsed_active_secs(now_ms);
        if let Some(index) = self.scheduler.advance(elapsed) {
            self.enter_phase(index, now_ms);
        }
        if self.scheduler.is_finished(elapsed) {
            return Some(self.finish(wall_time));
        }

        let phase = self.scheduler.current().and_then(|index| self.playlist.get(index))?;

        if let Some(id) = self.spawner.tick(phase, &mut self.registry, now_ms) {
            self.outbox.push(spawned(&self.registry, id, phase));
        }

        self.player.walk(&frame.movement, &self.orientation.orientation(), delta_secs);
        if self.captured {
            for delta in &frame.pointer_deltas {
                self.orientation.apply_delta(*delta, &self.profile);
            }
        }
        let ray = center_ray(self.player.position, &self.orientation.orientation());

        for _ in 0..frame.clicks {
            if !self.captured {
                // The first click only grabs the pointer
                self.outbox.push(SessionEvent::CaptureRequested);
                break;
            }
            if phase.is_tracking() {
                continue;
            }
            let outcome = resolve_click(&ray, now_ms, phase, &mut self.registry, &mut self.spawner, &mut self.score);
            if let ShotOutcome::Hit {
                target,
                reaction_ms,
                replacement,
            } = outcome
            {
                self.outbox.push(SessionEvent::TargetRemoved { id: target });
                self.outbox.push(SessionEvent::TargetHit {
                    id: target,
                    phase_id: phase.id.clone(),
                    reaction_ms,
                });
                self.outbox.push(spawned(&self.registry, replacement, phase));
            }
        }

        if phase.is_tracking() {
            for target in self.registry.iter_mut() {
                target.advance(delta_secs, phase.x_range, phase.y_range);
            }
            let on_target = resolve_tracking(&ray, &self.registry, &self.tracking, &mut self.score).is_some();
            if on_target != self.on_target {
                self.on_target = on_target;
                self.outbox.push(SessionEvent::TrackingEmphasis(on_target));
            }
        }

        None
    }

    /// Pushes the live readouts to the HUD; idle and finished sessions leave it untouched.
    pub fn publish_hud(&self, now_ms: f64, hud: &mut dyn HudSink) {
        if !self.is_active() {
            return;
        }
        let elapsed = self.clock.elapsed_active_secs(now_ms);
        hud.set_score(self.score.score);
        hud.set_timer(self.scheduler.remaining_secs(elapsed));
        hud.set_accuracy(self.score.hud_accuracy());
        if let Some(phase) = self.current_phase() {
            hud.set_phase_label(&phase.name);
        }
        hud.set_next_phase_countdown(self.scheduler.next_phase_countdown_secs(elapsed));
    }

    fn enter_phase(&mut self, index: usize, now_ms: f64) {
        let Some(phase) = self.playlist.get(index).cloned() else {
            return;
        };
        info!("Entering phase {}: {}", index + 1, phase.name);
        self.outbox.push(SessionEvent::PhaseEntered {
            index,
            id: phase.id.clone(),
            name: phase.name.clone(),
            color: phase.color,
        });

        for action in phase.entry_actions() {
            match action {
                EntryAction::ClearTargets => self.clear_targets(),
                EntryAction::ResetCadence => self.spawner.reset_cadence(),
                EntryAction::SeedTrackingTarget => {
                    if let Some(id) = self.spawner.seed_tracking(&phase, &mut self.registry, now_ms) {
                        self.outbox.push(spawned(&self.registry, id, &phase));
                    }
                }
            }
        }
    }

    fn finish(&mut self, wall_time: DateTime<Utc>) -> SessionSummary {
        let summary = finalize_session(&self.score, &mut self.history, wall_time);
        info!(
            "Session ended: score {} accuracy {}% reaction {}ms",
            summary.record.score, summary.record.accuracy, summary.record.reaction_ms
        );
        self.clear_targets();
        self.status = SessionStatus::Ended;
        self.release_capture();
        self.outbox.push(SessionEvent::Ended(summary.clone()));
        self.last_summary = Some(summary.clone());
        summary
    }

    fn clear_targets(&mut self) {
        for id in self.registry.clear() {
            self.outbox.push(SessionEvent::TargetRemoved { id });
        }
        if self.on_target {
            self.on_target = false;
            self.outbox.push(SessionEvent::TrackingEmphasis(false));
        }
    }

    fn release_capture(&mut self) {
        if self.captured {
            self.captured = false;
            self.outbox.push(SessionEvent::CaptureReleased);
        }
    }
}

fn spawned(registry: &TargetRegistry, id: TargetId, phase: &PhaseDescriptor) -> SessionEvent {
    let position = registry.get(id).map(|target| target.position).unwrap_or_default();
    SessionEvent::TargetSpawned {
        id,
        position,
        radius: phase.radius,
        color: phase.color,
    }
}

// --- Systems ---

fn load_history(storage: Option<Res<HistoryStorage>>, mut engine: ResMut<SessionEngine>) {
    if let Some(storage) = storage {
        let history = storage.0.load();
        info!("Loaded {} past sessions", history.len());
        engine.set_history(history);
    }
}

pub fn handle_session_commands(
    mut commands: EventReader<SessionCommand>,
    mut engine: ResMut<SessionEngine>,
    config: Res<TrainerConfig>,
    clock: Res<FrameClock>,
) {
    let now = clock.now_ms();
    for command in commands.read() {
        match command {
            SessionCommand::Start => {
                engine.start(now, &config);
            }
            SessionCommand::Pause => {
                engine.pause(now);
            }
            SessionCommand::Resume => {
                engine.resume(now);
            }
            SessionCommand::Quit => engine.quit(),
        }
    }
}

pub fn advance_session(
    mut engine: ResMut<SessionEngine>,
    mut input: ResMut<PointerInput>,
    clock: Res<FrameClock>,
    storage: Option<Res<HistoryStorage>>,
) {
    let frame = input.take_frame();
    if engine.tick(clock.now_ms(), clock.wall_time(), frame).is_some() {
        if let Some(storage) = storage {
            if let Err(err) = storage.0.save(engine.history()) {
                warn!("Failed to save session history: {err}");
            }
        }
    }
}

pub fn publish_hud(engine: Res<SessionEngine>, clock: Res<FrameClock>, mut hud: ResMut<HudState>) {
    engine.publish_hud(clock.now_ms(), &mut *hud);
}

pub fn emit_session_events(mut engine: ResMut<SessionEngine>, mut events: EventWriter<SessionEvent>) {
    for event in engine.drain_events() {
        events.send(event);
    }
}

// Plugin to organize session systems
pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SessionEngine>()
            .init_resource::<TrainerConfig>()
            .init_resource::<FrameClock>()
            .init_resource::<HudState>()
            .init_resource::<PointerInput>()
            .add_event::<SessionCommand>()
            .add_event::<SessionEvent>()
            .add_systems(Startup, load_history)
            .add_systems(
                Update,
                (handle_session_commands, advance_session, publish_hud, emit_session_events).chain(),
            );
    }
}
