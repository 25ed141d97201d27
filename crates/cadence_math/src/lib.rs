//! # cadence_math
//!
//! Math types for the cadence frame scheduler. Re-exports [`glam`] for linear
//! algebra and defines the spatial component that implements
//! [`Component`](cadence_ecs::Component).

pub mod transform;

// Re-export glam types for convenience.
pub use glam::{Affine3A, Mat3, Mat4, Quat, Vec3, Vec4};

pub use transform::{Float3x4, Transform};
