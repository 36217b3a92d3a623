use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::frustum::Frustum;

/// Projection parameters. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Perspective {
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_degrees,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_degrees.to_radians(), aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }

    pub fn near(&self) -> f32 {
        match *self {
            Projection::Perspective { near, .. } | Projection::Orthographic { near, .. } => near,
        }
    }

    pub fn far(&self) -> f32 {
        match *self {
            Projection::Perspective { far, .. } | Projection::Orthographic { far, .. } => far,
        }
    }
}

/// Look-at camera with cached view, projection and frustum.
///
/// Every setter refreshes the cached matrices, so readers never observe a
/// stale view-projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    eye: Vec3,
    center: Vec3,
    up: Vec3,
    projection: Projection,
    view: Mat4,
    view_projection: Mat4,
    frustum: Frustum,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl Camera {
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Perspective {
            fov_degrees,
            aspect,
            near,
            far,
        })
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        })
    }

    fn with_projection(projection: Projection) -> Self {
        let mut camera = Self {
            eye: Vec3::new(0.0, 10.0, 15.0),
            center: Vec3::ZERO,
            up: Vec3::Y,
            projection,
            view: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::from_view_projection(&Mat4::IDENTITY),
        };
        camera.refresh();
        camera
    }

    /// Orient the camera. A degenerate `up` (parallel to the view direction)
    /// is replaced by the world axis least aligned with the view direction.
    pub fn look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.eye = eye;
        self.center = center;
        self.up = stable_up(center - eye, up);
        self.refresh();
    }

    pub fn set_perspective(&mut self, fov_degrees: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Projection::Perspective {
            fov_degrees,
            aspect,
            near,
            far,
        };
        self.refresh();
    }

    pub fn set_orthographic(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        };
        self.refresh();
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn near(&self) -> f32 {
        self.projection.near()
    }

    pub fn far(&self) -> f32 {
        self.projection.far()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Conservative box visibility test against the cached frustum.
    pub fn test_box_in_frustum(&self, center: Vec3, half_size: Vec3) -> bool {
        self.frustum.intersects_box(center, half_size)
    }

    fn refresh(&mut self) {
        self.view = Mat4::look_at_rh(self.eye, self.center, self.up);
        self.view_projection = self.projection.matrix() * self.view;
        self.frustum = Frustum::from_view_projection(&self.view_projection);
    }
}

fn stable_up(forward: Vec3, up: Vec3) -> Vec3 {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO || forward.cross(up).length_squared() > 1e-6 {
        return up;
    }
    if forward.dot(Vec3::Y).abs() < 0.9 { Vec3::Y } else { Vec3::Z }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_has_valid_matrices() {
        let cam = Camera::default();
        assert!(cam.eye().y > 0.0);
        assert!(!cam.view_projection().col(0).x.is_nan());
    }

    #[test]
    fn look_at_updates_frustum() {
        let mut cam = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        cam.look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        assert!(cam.test_box_in_frustum(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE));

        cam.look_at(Vec3::ZERO, Vec3::Z, Vec3::Y);
        assert!(!cam.test_box_in_frustum(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE));
    }

    #[test]
    fn degenerate_up_is_replaced() {
        let mut cam = Camera::perspective(45.0, 1.0, 1.0, 50.0);
        cam.look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Y);
        assert_eq!(cam.up(), Vec3::Z);
        assert!(!cam.view_projection().col(0).x.is_nan());
        assert!(cam.test_box_in_frustum(Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn orthographic_near_far() {
        let cam = Camera::orthographic(-10.0, 10.0, -10.0, 10.0, 1.0, 500.0);
        assert_eq!(cam.near(), 1.0);
        assert_eq!(cam.far(), 500.0);
    }

    #[test]
    fn orthographic_culls_outside_extent() {
        let mut cam = Camera::orthographic(-10.0, 10.0, -10.0, 10.0, 1.0, 100.0);
        cam.look_at(Vec3::new(0.0, 0.0, 50.0), Vec3::ZERO, Vec3::Y);
        assert!(cam.test_box_in_frustum(Vec3::ZERO, Vec3::ONE));
        assert!(!cam.test_box_in_frustum(Vec3::new(30.0, 0.0, 0.0), Vec3::ONE));
    }
}
