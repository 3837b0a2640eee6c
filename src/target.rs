use bevy::math::Ray3d;
use bevy::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

use crate::phase::PhaseDescriptor;

// Discrete phases never hold more live targets than this
pub const MAX_LIVE_TARGETS: usize = 5;
// Every target sits on the same plane in front of the viewer
pub const TARGET_DEPTH: f32 = -5.0;
// Tracking velocity components are drawn from (-SPEED/2, SPEED/2), units per second
pub const TRACKING_SPEED: f32 = 6.0;
// Crossings closer than this to the ray origin do not count
const SURFACE_EPSILON: f32 = 1e-6;

// --- Core Target Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: TargetId,
    pub position: Vec3,
    pub hitbox: Hitbox,
    // Only tracking targets move
    pub velocity: Option<Vec3>,
}

impl Target {
    // Breathing scale the renderer applies to every live target
    pub fn pulse_scale(now_ms: f64) -> f32 {
        1.0 + ((now_ms * 0.005).sin() * 0.05) as f32
    }

    /// Advances a moving target and reflects its velocity at the range edges.
    pub fn advance(&mut self, delta_secs: f32, x_range: f32, y_range: f32) {
        let Some(velocity) = self.velocity.as_mut() else {
            return;
        };
        self.position += *velocity * delta_secs;

        let half_extents = [x_range / 2.0, y_range / 2.0];
        for (axis, half_extent) in half_extents.into_iter().enumerate() {
            // Only flip when heading further out, so a target never sticks to an edge
            if (self.position[axis] > half_extent && velocity[axis] > 0.0)
                || (self.position[axis] < -half_extent && velocity[axis] < 0.0)
            {
                velocity[axis] *= -1.0;
            }
        }
    }
}

// --- Hitbox Component & Logic ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hitbox {
    Sphere { radius: f32 },
}

impl Hitbox {
    pub fn radius(&self) -> f32 {
        match self {
            Hitbox::Sphere { radius } => *radius,
        }
    }

    /// Distance along the ray to the first surface crossing in front of the origin.
    pub fn intersect_ray(&self, ray: &Ray3d, center: Vec3) -> Option<f32> {
        match self {
            Hitbox::Sphere { radius } => {
                // Solve |origin + t * dir - center| = radius for t
                let offset = ray.origin - center;
                let half_b = offset.dot(*ray.direction);
                let c = offset.length_squared() - radius * radius;
                let discriminant = half_b * half_b - c;
                if discriminant < 0.0 {
                    return None;
                }
                let root = discriminant.sqrt();
                [-half_b - root, -half_b + root]
                    .into_iter()
                    .find(|t| *t > SURFACE_EPSILON)
            }
        }
    }
}

// --- Target Registry ---

/// Live targets plus the spawn timestamp of each.
///
/// A target and its timestamp are always inserted and removed together.
/// Iteration follows insertion order.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    spawned_at: HashMap<TargetId, f64>,
    next_id: u64,
}

impl TargetRegistry {
    pub fn insert(&mut self, position: Vec3, hitbox: Hitbox, velocity: Option<Vec3>, spawned_at_ms: f64) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.targets.push(Target { id, position, hitbox, velocity });
        self.spawned_at.insert(id, spawned_at_ms);
        id
    }

    /// Removes a target and hands back its spawn timestamp.
    pub fn remove(&mut self, id: TargetId) -> Option<(Target, f64)> {
        let index = self.targets.iter().position(|target| target.id == id)?;
        let target = self.targets.remove(index);
        let spawned_at = self.spawned_at.remove(&id).unwrap_or_default();
        Some((target, spawned_at))
    }

    // Bulk removal, returning what was live
    pub fn clear(&mut self) -> Vec<TargetId> {
        self.spawned_at.clear();
        self.targets.drain(..).map(|target| target.id).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Target> {
        self.targets.iter_mut()
    }

    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.targets.iter().find(|target| target.id == id)
    }

    pub fn spawned_at(&self, id: TargetId) -> Option<f64> {
        self.spawned_at.get(&id).copied()
    }

    /// Moves every spawn timestamp forward, used to discount paused time.
    pub fn shift_spawn_times(&mut self, delta_ms: f64) {
        for spawned_at in self.spawned_at.values_mut() {
            *spawned_at += delta_ms;
        }
    }
}

// --- Spawner Logic ---

/// Decides when and where targets appear for the active phase.
#[derive(Debug)]
pub struct TargetSpawner {
    // None until the first spawn of a phase, which makes that spawn immediate
    last_spawn_ms: Option<f64>,
    max_targets: usize,
    rng: ChaCha8Rng,
}

impl TargetSpawner {
    pub fn new(seed: u64) -> Self {
        Self {
            last_spawn_ms: None,
            max_targets: MAX_LIVE_TARGETS,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn last_spawn_ms(&self) -> Option<f64> {
        self.last_spawn_ms
    }

    pub fn reset_cadence(&mut self) {
        self.last_spawn_ms = None;
    }

    // Keeps the cadence measured in active time across a pause
    pub fn shift(&mut self, delta_ms: f64) {
        if let Some(last_spawn) = self.last_spawn_ms.as_mut() {
            *last_spawn += delta_ms;
        }
    }

    /// Interval spawn for discrete phases, gated by cadence and the live cap.
    pub fn tick(&mut self, phase: &PhaseDescriptor, registry: &mut TargetRegistry, now_ms: f64) -> Option<TargetId> {
        // Tracking holds its single seeded target whatever the interval says
        if phase.is_tracking() {
            return None;
        }
        let interval = phase.spawn_interval()?;
        let due = self.last_spawn_ms.map_or(true, |last| now_ms - last > interval);
        if !due || registry.len() >= self.max_targets {
            return None;
        }
        Some(self.spawn(phase, registry, now_ms))
    }

    // Tracking phases start with exactly one target
    pub fn seed_tracking(&mut self, phase: &PhaseDescriptor, registry: &mut TargetRegistry, now_ms: f64) -> Option<TargetId> {
        if !phase.is_tracking() || !registry.is_empty() {
            return None;
        }
        Some(self.spawn(phase, registry, now_ms))
    }

    /// Unconditional spawn; also used for the replacement after a hit.
    pub fn spawn(&mut self, phase: &PhaseDescriptor, registry: &mut TargetRegistry, now_ms: f64) -> TargetId {
        let position = self.placement(phase);
        let velocity = phase.is_tracking().then(|| {
            Vec3::new(
                (self.rng.gen::<f32>() - 0.5) * TRACKING_SPEED,
                (self.rng.gen::<f32>() - 0.5) * TRACKING_SPEED,
                0.0,
            )
        });
        let hitbox = Hitbox::Sphere { radius: phase.radius };
        self.last_spawn_ms = Some(now_ms);
        registry.insert(position, hitbox, velocity, now_ms)
    }

    fn placement(&mut self, phase: &PhaseDescriptor) -> Vec3 {
        let x = (self.rng.gen::<f32>() - 0.5) * phase.x_range;
        let y = if phase.pins_vertical() {
            0.0
        } else {
            (self.rng.gen::<f32>() - 0.5) * phase.y_range
        };
        Vec3::new(x, y, TARGET_DEPTH)
    }
}
