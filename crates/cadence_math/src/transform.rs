//! 3D affine transform component.
//!
//! [`Transform`] holds a 3-row by 4-column affine matrix: a 3x3 linear part
//! (rotation and scale) followed by a translation column. [`Float3x4`] is the
//! row-major layout handed to renderers.

use cadence_ecs::Component;
use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A 3D affine transform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// The affine matrix. The implicit fourth row is `[0, 0, 0, 1]`.
    pub matrix: Affine3A,
}

impl Transform {
    /// The identity transform: origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        matrix: Affine3A::IDENTITY,
    };

    /// Create a transform that only translates.
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            matrix: Affine3A::from_translation(translation),
        }
    }

    /// Create a transform from scale, rotation and translation.
    #[must_use]
    pub fn from_scale_rotation_translation(scale: Vec3, rotation: Quat, translation: Vec3) -> Self {
        Self {
            matrix: Affine3A::from_scale_rotation_translation(scale, rotation, translation),
        }
    }

    /// Returns the translation column.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.matrix.translation.into()
    }

    /// Move the transform by `offset` in world space.
    pub fn translate(&mut self, offset: Vec3) {
        self.matrix.translation += glam::Vec3A::from(offset);
    }

    /// Returns a copy moved by `offset`.
    #[must_use]
    pub fn translated(mut self, offset: Vec3) -> Self {
        self.translate(offset);
        self
    }

    /// Returns the three matrix rows in renderer layout.
    #[must_use]
    pub fn rows(&self) -> Float3x4 {
        let c = self.matrix.to_cols_array();
        Float3x4([
            [c[0], c[3], c[6], c[9]],
            [c[1], c[4], c[7], c[10]],
            [c[2], c[5], c[8], c[11]],
        ])
    }

    /// Compute the full 4x4 model matrix.
    #[must_use]
    pub fn to_matrix(&self) -> glam::Mat4 {
        glam::Mat4::from(self.matrix)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {
    fn type_name() -> &'static str {
        "Transform"
    }
}

/// A row-major 3x4 float matrix, the layout renderers consume.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Float3x4(pub [[f32; 4]; 3]);

impl Float3x4 {
    /// Returns the translation column.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.0[0][3], self.0[1][3], self.0[2][3])
    }
}

impl From<Transform> for Float3x4 {
    fn from(transform: Transform) -> Self {
        transform.rows()
    }
}
