use bevy::math::{Dir3, Ray3d};
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

use crate::sensitivity::SensitivityProfile;

// Keeps the view from flipping over the vertical axis
pub const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.1;
// Eye position at session start, five units back from the origin
pub const CAMERA_START: Vec3 = Vec3::new(0.0, 0.0, 5.0);

// --- Orientation State ---

/// First-person view angles in radians.
///
/// Yaw is unbounded and wraps through the trigonometry; pitch is clamped to
/// `[-PITCH_LIMIT, PITCH_LIMIT]` after every update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Orientation {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    // Viewing direction; the camera looks down -Z at rest
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    // Horizontal basis used for walking, ignoring pitch
    pub fn ground_axes(&self) -> (Vec3, Vec3) {
        let yaw_only = Quat::from_rotation_y(self.yaw);
        (yaw_only * Vec3::NEG_Z, yaw_only * Vec3::X)
    }
}

// --- Orientation Mapper ---

/// Turns raw pointer deltas into view rotation.
///
/// Deltas are subtracted so that moving the pointer right turns the view
/// right under the YXZ euler convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationMapper {
    orientation: Orientation,
}

impl OrientationMapper {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn reset(&mut self) {
        self.orientation = Orientation::default();
    }

    pub fn apply_delta(&mut self, delta: Vec2, profile: &SensitivityProfile) {
        let radians_per_pixel = profile.radians_per_pixel();
        self.orientation.yaw -= delta.x * radians_per_pixel;
        self.orientation.pitch -= delta.y * radians_per_pixel;
        self.orientation.pitch = self.orientation.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

/// Ray through the viewport center, where the fixed crosshair sits.
pub fn center_ray(eye: Vec3, orientation: &Orientation) -> Ray3d {
    Ray3d {
        origin: eye,
        direction: Dir3::new(orientation.forward()).unwrap_or(Dir3::NEG_Z),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SensitivityProfile {
        SensitivityProfile::default()
    }

    #[test]
    fn pointer_right_turns_view_right() {
        let mut mapper = OrientationMapper::default();
        mapper.apply_delta(Vec2::new(200.0, 0.0), &profile());
        let orientation = mapper.orientation();
        assert!(orientation.yaw < 0.0);
        assert!(orientation.forward().x > 0.0);
    }

    #[test]
    fn pointer_down_looks_down() {
        let mut mapper = OrientationMapper::default();
        mapper.apply_delta(Vec2::new(0.0, 150.0), &profile());
        assert!(mapper.orientation().pitch < 0.0);
        assert!(mapper.orientation().forward().y < 0.0);
    }

    #[test]
    fn delta_converts_through_calibration_constants() {
        let mut mapper = OrientationMapper::default();
        mapper.apply_delta(Vec2::new(100.0, 0.0), &profile());
        let expected = -(100.0_f32 * 1.08 * 0.25 * 0.07).to_radians();
        assert!((mapper.orientation().yaw - expected).abs() < 1e-6);
    }

    #[test]
    fn pitch_stays_clamped_for_any_delta_sequence() {
        let mut mapper = OrientationMapper::default();
        let fast = SensitivityProfile { sensitivity: 7.5, device_pixel_ratio: 2.0 };
        let deltas = [
            Vec2::new(0.0, 90_000.0),
            Vec2::new(15.0, -3.0),
            Vec2::new(0.0, -250_000.0),
            Vec2::new(-40.0, 1.0e6),
            Vec2::new(0.0, -1.0e6),
            Vec2::new(3.0, 17.0),
        ];
        for delta in deltas.iter().cycle().take(60) {
            mapper.apply_delta(*delta, &fast);
            let pitch = mapper.orientation().pitch;
            assert!((-PITCH_LIMIT..=PITCH_LIMIT).contains(&pitch), "pitch {pitch} escaped");
        }
    }

    #[test]
    fn yaw_is_unbounded() {
        let mut mapper = OrientationMapper::default();
        for _ in 0..100 {
            mapper.apply_delta(Vec2::new(-5_000.0, 0.0), &profile());
        }
        assert!(mapper.orientation().yaw > std::f32::consts::TAU);
    }

    #[test]
    fn zero_sensitivity_freezes_the_view() {
        let mut mapper = OrientationMapper::default();
        let frozen = SensitivityProfile { sensitivity: 0.0, ..Default::default() };
        mapper.apply_delta(Vec2::new(500.0, -500.0), &frozen);
        assert_eq!(mapper.orientation(), Orientation::default());
    }

    #[test]
    fn center_ray_starts_at_eye_and_follows_view() {
        let ray = center_ray(CAMERA_START, &Orientation::default());
        assert_eq!(ray.origin, CAMERA_START);
        assert!((*ray.direction - Vec3::NEG_Z).length() < 1e-6);
    }
}
