//! # engine_math
//!
//! Math types for the scene graph. Re-exports [`glam`] for linear algebra and
//! defines [`Transform`], the position / euler rotation / scale triple stored
//! in `Transform` attributes.

pub mod transform;

// Re-export glam types for convenience.
pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};

pub use transform::Transform;
