//! Components of the spaceship pipeline.
//!
//! [`Transform`](cadence_math::Transform) lives in `cadence_math`; the rest
//! are defined here.

use cadence_ecs::Component;
use cadence_math::Vec3;
use serde::{Deserialize, Serialize};

/// A 3D velocity component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Velocity {
    /// Linear velocity in world units per second.
    pub linear: Vec3,
}

impl Velocity {
    /// Zero velocity.
    pub const ZERO: Self = Self { linear: Vec3::ZERO };

    /// Create a new velocity.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            linear: Vec3::new(x, y, z),
        }
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Seconds an entity has existed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Age {
    pub seconds: f32,
}

impl Component for Age {
    fn type_name() -> &'static str {
        "Age"
    }
}

/// Age at which an entity is despawned.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Lifetime {
    pub seconds: f32,
}

impl Lifetime {
    /// Returns `true` once `age` has reached this lifetime.
    #[must_use]
    pub fn is_expired(&self, age: &Age) -> bool {
        age.seconds >= self.seconds
    }
}

impl Component for Lifetime {
    fn type_name() -> &'static str {
        "Lifetime"
    }
}
