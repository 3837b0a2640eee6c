use bevy::math::Ray3d;

use crate::phase::PhaseDescriptor;
use crate::stats::{ScoreTracker, TrackingScoring};
use crate::target::{TargetId, TargetRegistry, TargetSpawner};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub target: TargetId,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotOutcome {
    Miss,
    Hit {
        target: TargetId,
        reaction_ms: f64,
        replacement: TargetId,
    },
}

/// Nearest live target along the ray.
///
/// Exactly equal distances keep the earlier target in registry order.
pub fn nearest_hit(ray: &Ray3d, registry: &TargetRegistry) -> Option<RayHit> {
    let mut closest: Option<RayHit> = None;
    for target in registry.iter() {
        if let Some(distance) = target.hitbox.intersect_ray(ray, target.position) {
            if closest.map_or(true, |hit| distance < hit.distance) {
                closest = Some(RayHit { target: target.id, distance });
            }
        }
    }
    closest
}

/// Click on a discrete phase: counts the shot and, on a hit, scores it,
/// samples the reaction time and replaces the target.
pub fn resolve_click(
    ray: &Ray3d,
    now_ms: f64,
    phase: &PhaseDescriptor,
    registry: &mut TargetRegistry,
    spawner: &mut TargetSpawner,
    score: &mut ScoreTracker,
) -> ShotOutcome {
    score.record_click();

    let Some(hit) = nearest_hit(ray, registry) else {
        return ShotOutcome::Miss;
    };
    let Some((_, spawned_at)) = registry.remove(hit.target) else {
        return ShotOutcome::Miss;
    };

    let reaction_ms = now_ms - spawned_at;
    score.record_hit(reaction_ms);
    let replacement = spawner.spawn(phase, registry, now_ms);

    ShotOutcome::Hit {
        target: hit.target,
        reaction_ms,
        replacement,
    }
}

/// One continuous-sampling tick of a tracking phase. Returns the target under
/// the crosshair, if any; nothing is removed or respawned.
pub fn resolve_tracking(
    ray: &Ray3d,
    registry: &TargetRegistry,
    scoring: &TrackingScoring,
    score: &mut ScoreTracker,
) -> Option<TargetId> {
    let on_target = nearest_hit(ray, registry).map(|hit| hit.target);
    score.record_tracking_sample(on_target.is_some(), scoring);
    on_target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{center_ray, Orientation, CAMERA_START};
    use crate::phase::default_playlist;
    use crate::target::{Hitbox, MAX_LIVE_TARGETS, TARGET_DEPTH};
    use bevy::prelude::*;

    fn straight_ahead() -> Ray3d {
        center_ray(CAMERA_START, &Orientation::default())
    }

    fn ball(radius: f32) -> Hitbox {
        Hitbox::Sphere { radius }
    }

    #[test]
    fn empty_registry_never_hits() {
        let registry = TargetRegistry::default();
        assert_eq!(nearest_hit(&straight_ahead(), &registry), None);
    }

    #[test]
    fn target_on_the_crosshair_is_hit() {
        let mut registry = TargetRegistry::default();
        let off_axis = registry.insert(Vec3::new(4.0, 0.0, TARGET_DEPTH), ball(0.4), None, 0.0);
        let centered = registry.insert(Vec3::new(0.0, 0.0, TARGET_DEPTH), ball(0.4), None, 0.0);
        let hit = nearest_hit(&straight_ahead(), &registry).unwrap();
        assert_eq!(hit.target, centered);
        assert_ne!(hit.target, off_axis);
    }

    #[test]
    fn overlapping_targets_resolve_to_the_nearer_one() {
        let mut registry = TargetRegistry::default();
        let far = registry.insert(Vec3::new(0.0, 0.0, -5.0), ball(0.5), None, 0.0);
        let near = registry.insert(Vec3::new(0.1, 0.0, -4.6), ball(0.5), None, 0.0);
        let hit = nearest_hit(&straight_ahead(), &registry).unwrap();
        assert_eq!(hit.target, near);
        assert_ne!(hit.target, far);
    }

    #[test]
    fn equal_distances_keep_iteration_order() {
        let mut registry = TargetRegistry::default();
        let first = registry.insert(Vec3::new(0.0, 0.0, TARGET_DEPTH), ball(0.3), None, 0.0);
        registry.insert(Vec3::new(0.0, 0.0, TARGET_DEPTH), ball(0.3), None, 0.0);
        assert_eq!(nearest_hit(&straight_ahead(), &registry).unwrap().target, first);
    }

    #[test]
    fn click_hit_scores_and_keeps_population_steady() {
        let gridshot = default_playlist().remove(0);
        let mut registry = TargetRegistry::default();
        let mut spawner = TargetSpawner::new(5);
        let mut score = ScoreTracker::default();

        registry.insert(Vec3::new(6.0, 3.0, TARGET_DEPTH), ball(0.45), None, 0.0);
        registry.insert(Vec3::new(-6.0, -3.0, TARGET_DEPTH), ball(0.45), None, 0.0);
        let centered = registry.insert(Vec3::new(0.0, 0.0, TARGET_DEPTH), ball(0.45), None, 1_000.0);
        let before = registry.len();

        let outcome = resolve_click(&straight_ahead(), 1_350.0, &gridshot, &mut registry, &mut spawner, &mut score);
        match outcome {
            ShotOutcome::Hit { target, reaction_ms, replacement } => {
                assert_eq!(target, centered);
                assert_eq!(reaction_ms, 350.0);
                assert!(registry.get(replacement).is_some());
                assert_eq!(registry.spawned_at(replacement), Some(1_350.0));
            }
            ShotOutcome::Miss => panic!("expected a hit"),
        }
        assert_eq!(registry.len(), before);
        assert!(registry.len() <= MAX_LIVE_TARGETS);
        assert_eq!(registry.spawned_at(centered), None);
        assert_eq!(spawner.last_spawn_ms(), Some(1_350.0));
        assert_eq!(score.score, 100);
        assert_eq!(score.hits, 1.0);
        assert_eq!(score.clicks, 1.0);
        assert_eq!(score.reaction_times_ms, vec![350.0]);
    }

    #[test]
    fn click_miss_only_counts_the_shot() {
        let gridshot = default_playlist().remove(0);
        let mut registry = TargetRegistry::default();
        let mut spawner = TargetSpawner::new(5);
        let mut score = ScoreTracker::default();
        registry.insert(Vec3::new(5.0, 2.0, TARGET_DEPTH), ball(0.45), None, 0.0);

        let outcome = resolve_click(&straight_ahead(), 500.0, &gridshot, &mut registry, &mut spawner, &mut score);
        assert_eq!(outcome, ShotOutcome::Miss);
        assert_eq!(registry.len(), 1);
        assert_eq!(score.clicks, 1.0);
        assert_eq!(score.hits, 0.0);
        assert_eq!(score.score, 0);
    }

    #[test]
    fn tracking_samples_accumulate_fractionally() {
        let mut registry = TargetRegistry::default();
        let scoring = TrackingScoring::default();
        let mut score = ScoreTracker::default();
        let id = registry.insert(Vec3::new(0.0, 0.0, TARGET_DEPTH), ball(0.35), Some(Vec3::X), 0.0);

        assert_eq!(resolve_tracking(&straight_ahead(), &registry, &scoring, &mut score), Some(id));
        assert_eq!(score.score, 2);
        assert!((score.hits - 0.02).abs() < 1e-12);
        assert!((score.clicks - 0.02).abs() < 1e-12);

        let looking_away = center_ray(CAMERA_START, &Orientation { yaw: 1.0, pitch: 0.0 });
        assert_eq!(resolve_tracking(&looking_away, &registry, &scoring, &mut score), None);
        assert_eq!(score.score, 2);
        assert!((score.clicks - 0.04).abs() < 1e-12);
        assert_eq!(registry.len(), 1);
    }
}
