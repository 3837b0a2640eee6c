use bevy::prelude::*;

use crate::camera::{Orientation, CAMERA_START};
use crate::input::MovementKeys;

// Walking speed in units per second (0.15 per frame at 60 Hz)
pub const MOVE_SPEED: f32 = 9.0;
// Walkable box on the ground plane
pub const MOVE_BOUNDS_X: (f32, f32) = (-10.0, 10.0);
pub const MOVE_BOUNDS_Z: (f32, f32) = (-5.0, 15.0);

// Eye position of the viewer; movement never changes height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub position: Vec3,
    pub speed: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            position: CAMERA_START,
            speed: MOVE_SPEED,
        }
    }
}

impl Player {
    pub fn reset(&mut self) {
        self.position = CAMERA_START;
    }

    /// Walks along the view's ground projection and clamps into the arena.
    pub fn walk(&mut self, keys: &MovementKeys, orientation: &Orientation, delta_secs: f32) {
        let (forward, right) = orientation.ground_axes();
        let mut direction = Vec3::ZERO;

        if keys.forward {
            direction += forward;
        }
        if keys.back {
            direction -= forward;
        }
        if keys.left {
            direction -= right;
        }
        if keys.right {
            direction += right;
        }

        direction.y = 0.0;
        if let Some(normalized_direction) = direction.try_normalize() {
            self.position += normalized_direction * self.speed * delta_secs;
        }

        self.position.x = self.position.x.clamp(MOVE_BOUNDS_X.0, MOVE_BOUNDS_X.1);
        self.position.z = self.position.z.clamp(MOVE_BOUNDS_Z.0, MOVE_BOUNDS_Z.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_walks_toward_negative_z_at_rest() {
        let mut player = Player::default();
        let keys = MovementKeys { forward: true, ..Default::default() };
        player.walk(&keys, &Orientation::default(), 0.5);
        assert!((player.position.z - 0.5).abs() < 1e-5);
        assert_eq!(player.position.y, 0.0);
    }

    #[test]
    fn diagonal_walk_is_normalized() {
        let mut player = Player::default();
        let keys = MovementKeys { forward: true, right: true, ..Default::default() };
        player.walk(&keys, &Orientation::default(), 0.1);
        let travelled = (player.position - CAMERA_START).length();
        assert!((travelled - MOVE_SPEED * 0.1).abs() < 1e-4);
    }

    #[test]
    fn pitch_does_not_lift_the_viewer() {
        let mut player = Player::default();
        let keys = MovementKeys { forward: true, ..Default::default() };
        let looking_up = Orientation { yaw: 0.0, pitch: 1.2 };
        player.walk(&keys, &looking_up, 0.2);
        assert_eq!(player.position.y, 0.0);
        assert!(player.position.z < CAMERA_START.z);
    }

    #[test]
    fn walking_stops_at_arena_bounds() {
        let mut player = Player::default();
        let keys = MovementKeys { left: true, back: true, ..Default::default() };
        for _ in 0..600 {
            player.walk(&keys, &Orientation::default(), 1.0 / 60.0);
        }
        assert_eq!(player.position.x, MOVE_BOUNDS_X.0);
        assert_eq!(player.position.z, MOVE_BOUNDS_Z.1);
    }

    #[test]
    fn no_keys_no_motion() {
        let mut player = Player::default();
        player.walk(&MovementKeys::default(), &Orientation::default(), 1.0);
        assert_eq!(player.position, CAMERA_START);
    }
}
