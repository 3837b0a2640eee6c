use bevy::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

// --- Time Sources ---

/// Millisecond time source read once per tick.
///
/// Every timestamp the engine stores (session start, pause instants, spawn
/// times) comes from the same `now_ms` base, so only differences matter.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;

    /// Calendar time stamped onto persisted stats records.
    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// Real clock backed by a monotonic Instant
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for deterministic simulation and tests.
///
/// Clones share the same underlying instant, so a test can keep a handle
/// while the app owns another.
#[derive(Clone, Default)]
pub struct ManualClock {
    now_bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        let clock = Self::default();
        clock.set(start_ms);
        clock
    }

    pub fn set(&self, now_ms: f64) {
        self.now_bits.store(now_ms.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.set(self.now_ms() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::SeqCst))
    }

    fn wall_time(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_ms() as i64)
            .single()
            .unwrap_or_default()
    }
}

// Resource handing the injected clock to systems
#[derive(Resource)]
pub struct FrameClock(pub Box<dyn Clock>);

impl FrameClock {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self(Box::new(clock))
    }

    pub fn now_ms(&self) -> f64 {
        self.0.now_ms()
    }

    pub fn wall_time(&self) -> DateTime<Utc> {
        self.0.wall_time()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(SystemClock::default())
    }
}

// --- Session Clock (pause accounting) ---

/// Active-time bookkeeping for one session.
///
/// `elapsed = now - start - paused_total`, frozen at the pause instant while
/// paused and never negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionClock {
    started_at_ms: f64,
    paused_total_ms: f64,
    pause_started_ms: Option<f64>,
}

impl SessionClock {
    pub fn start(now_ms: f64) -> Self {
        Self {
            started_at_ms: now_ms,
            paused_total_ms: 0.0,
            pause_started_ms: None,
        }
    }

    pub fn started_at_ms(&self) -> f64 {
        self.started_at_ms
    }

    pub fn paused_total_ms(&self) -> f64 {
        self.paused_total_ms
    }

    pub fn is_paused(&self) -> bool {
        self.pause_started_ms.is_some()
    }

    pub fn elapsed_active_ms(&self, now_ms: f64) -> f64 {
        let reference = self.pause_started_ms.unwrap_or(now_ms);
        (reference - self.started_at_ms - self.paused_total_ms).max(0.0)
    }

    pub fn elapsed_active_secs(&self, now_ms: f64) -> f64 {
        self.elapsed_active_ms(now_ms) / 1000.0
    }

    /// Returns false when already paused.
    pub fn pause(&mut self, now_ms: f64) -> bool {
        if self.pause_started_ms.is_some() {
            return false;
        }
        self.pause_started_ms = Some(now_ms);
        true
    }

    /// Closes the open pause and returns its length, which callers use to
    /// shift every other timestamp kept in this time base.
    pub fn resume(&mut self, now_ms: f64) -> Option<f64> {
        let pause_started = self.pause_started_ms.take()?;
        let pause_duration = (now_ms - pause_started).max(0.0);
        self.paused_total_ms += pause_duration;
        Some(pause_duration)
    }
}
