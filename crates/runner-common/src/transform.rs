//! World/local transforms for track geometry.
//!
//! Axis convention follows the host scene graph: `+Y` is up, `+Z` is
//! forward and `-X` is the local left of any socket.

use std::ops::Mul;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Local forward axis of a socket.
pub const LOCAL_FORWARD: Vec3 = Vec3::Z;

/// Local left axis of a socket (clearance probes are cast along it).
pub const LOCAL_LEFT: Vec3 = Vec3::NEG_X;

/// Local up axis.
pub const LOCAL_UP: Vec3 = Vec3::Y;

/// Rigid transform (position + rotation), no scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation
    pub position: Vec3,
    /// Orientation
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform at the origin.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Creates a new transform.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Creates a pure translation.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Creates a transform with a yaw (rotation about up) in degrees.
    /// Positive yaw turns right.
    #[must_use]
    pub fn from_yaw_degrees(position: Vec3, yaw_deg: f32) -> Self {
        Self::new(position, Quat::from_rotation_y(yaw_deg.to_radians()))
    }

    /// Maps a point from this transform's local space to its parent space.
    #[must_use]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Rotates a direction vector into parent space.
    #[must_use]
    pub fn transform_vector(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// Returns `self * local`: the world transform of a child whose local
    /// transform relative to `self` is `local`.
    #[must_use]
    pub fn compose(&self, local: &Self) -> Self {
        Self {
            position: self.transform_point(local.position),
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    /// Returns the inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: rotation * -self.position,
            rotation,
        }
    }

    /// World-space left direction.
    #[must_use]
    pub fn left(&self) -> Vec3 {
        self.rotation * LOCAL_LEFT
    }

    /// World-space forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * LOCAL_FORWARD
    }

    /// World-space up direction.
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.rotation * LOCAL_UP
    }

    /// Approximate equality on both position and orientation.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && self.rotation.dot(other.rotation).abs() >= 1.0 - epsilon
    }
}

impl Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identity_is_neutral() {
        let t = Transform::from_yaw_degrees(Vec3::new(1.0, 2.0, 3.0), 45.0);
        assert!((Transform::IDENTITY * t).approx_eq(&t, 1e-6));
        assert!((t * Transform::IDENTITY).approx_eq(&t, 1e-6));
    }

    #[test]
    fn test_right_turn_maps_forward_to_positive_x() {
        let t = Transform::from_yaw_degrees(Vec3::ZERO, 90.0);
        assert!(t.forward().abs_diff_eq(Vec3::X, 1e-5));
        assert!(t.left().abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn test_compose_chains_translation() {
        let a = Transform::from_position(Vec3::new(0.0, 0.0, 10.0));
        let b = Transform::from_yaw_degrees(Vec3::new(0.0, 0.0, 10.0), 90.0);
        let c = a * b * a;
        assert!(c.position.abs_diff_eq(Vec3::new(10.0, 0.0, 20.0), 1e-4));
    }

    #[test]
    fn test_serde_roundtrip_json() {
        let t = Transform::from_yaw_degrees(Vec3::new(4.0, 0.0, -2.0), 30.0);
        let json = serde_json::to_string(&t).expect("serialize");
        let back: Transform = serde_json::from_str(&json).expect("deserialize");
        assert!(back.approx_eq(&t, 1e-6));
    }

    proptest! {
        #[test]
        fn prop_inverse_cancels(x in -100.0f32..100.0, z in -100.0f32..100.0, yaw in -180.0f32..180.0) {
            let t = Transform::from_yaw_degrees(Vec3::new(x, 0.0, z), yaw);
            let round = t * t.inverse();
            prop_assert!(round.approx_eq(&Transform::IDENTITY, 1e-3));
        }
    }
}
