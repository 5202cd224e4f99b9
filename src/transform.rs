//! Per-frame model transform and the static view/projection matrices.
//!
//! The model matrix is always composed as `translation * rotation_y * scale`,
//! so the mesh spins about its own origin before being moved into place.
//!
//! # Example
//!
//! ```
//! use meshview::{ModelTransform, Vec3};
//!
//! let mut transform = ModelTransform::new(Vec3::new(1.0, 0.0, 0.0), 2.0);
//! transform.advance(0.016);
//! let model = transform.matrix();
//! assert_eq!(model.w_axis.x, 1.0);
//! ```

use glam::{Mat4, Vec3};

/// Multiplier applied to the frame delta before taking its sine.
///
/// Each frame adds `sin(elapsed * ROTATION_RATE)` degrees to the spin angle.
/// This is a time-warped oscillation, not a constant angular velocity.
pub const ROTATION_RATE: f32 = 50.0;

/// Builds the model matrix from a translation, a uniform scale and a Y-axis
/// rotation in degrees.
pub fn compose_model_matrix(translation: Vec3, scale: f32, rotation_degrees: f32) -> Mat4 {
    Mat4::from_translation(translation)
        * Mat4::from_rotation_y(rotation_degrees.to_radians())
        * Mat4::from_scale(Vec3::splat(scale))
}

/// Builds a right-handed view matrix looking from `position` at `target`.
pub fn compose_view_matrix(position: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(position, target, up)
}

/// Builds a right-handed perspective projection with wgpu's `0..1` depth range.
pub fn compose_projection_matrix(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_degrees.to_radians(), aspect, near, far)
}

/// Spin-angle delta for one frame.
///
/// Non-positive or non-finite deltas (first frame, clock stall) contribute
/// nothing.
pub fn rotation_step(elapsed_secs: f32) -> f32 {
    if elapsed_secs.is_finite() && elapsed_secs > 0.0 {
        (elapsed_secs * ROTATION_RATE).sin()
    } else {
        0.0
    }
}

/// The model's placement: fixed translation and scale plus an accumulated spin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelTransform {
    translation: Vec3,
    scale: f32,
    rotation_degrees: f32,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 1.0)
    }
}

impl ModelTransform {
    /// Creates a transform with a zero spin angle.
    pub fn new(translation: Vec3, scale: f32) -> Self {
        Self {
            translation,
            scale,
            rotation_degrees: 0.0,
        }
    }

    /// Accumulates one frame of spin for a frame that took `elapsed_secs`.
    pub fn advance(&mut self, elapsed_secs: f32) {
        self.rotation_degrees += rotation_step(elapsed_secs);
    }

    /// Current model matrix.
    pub fn matrix(&self) -> Mat4 {
        compose_model_matrix(self.translation, self.scale, self.rotation_degrees)
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Accumulated spin in degrees. Never wrapped; the trig functions
    /// downstream take care of periodicity.
    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }
}

/// The three matrices a shading program receives each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameMatrices {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}
