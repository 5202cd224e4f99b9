use glam::{Mat4, Vec3};

use crate::transform::{compose_projection_matrix, compose_view_matrix};

/// A fixed look-at camera.
///
/// The viewer builds its view matrix from this once at startup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view_matrix(&self) -> Mat4 {
        compose_view_matrix(self.position, self.target, self.up)
    }
}

/// Perspective projection parameters.
///
/// `aspect` is taken from the window size at creation and kept for the
/// lifetime of the viewer, even across resizes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn new(aspect: f32) -> Self {
        Self {
            fov_degrees: 67.0,
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Projection for a `width` x `height` drawable. A zero height falls back
    /// to a square aspect.
    pub fn for_size(width: u32, height: u32) -> Self {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        Self::new(aspect)
    }

    pub fn matrix(&self) -> Mat4 {
        compose_projection_matrix(self.fov_degrees, self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_matches_viewer_setup() {
        let camera = Camera::default();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.target, Vec3::ZERO);
        assert_eq!(camera.up, Vec3::Y);
    }

    #[test]
    fn aspect_comes_from_size() {
        assert_eq!(Projection::for_size(800, 400).aspect, 2.0);
        assert_eq!(Projection::for_size(800, 0).aspect, 1.0);
    }
}
