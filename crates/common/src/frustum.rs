use glam::{Mat4, Vec3, Vec4};

/// Six clip planes extracted from a view-projection matrix.
///
/// Each plane is `(n, d)` with `dot(n, p) + d >= 0` on the inside. Planes are
/// normalized so distances are in world units. Assumes a `[0, 1]` clip-space
/// depth range (glam `*_rh` projections, wgpu).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let r0 = vp.row(0);
        let r1 = vp.row(1);
        let r2 = vp.row(2);
        let r3 = vp.row(3);
        let planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r2,      // near
            r3 - r2, // far
        ]
        .map(normalize_plane);
        Self { planes }
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Box-vs-frustum test. Returns `false` only when the box lies entirely
    /// on the outside of at least one plane.
    pub fn intersects_box(&self, center: Vec3, half_size: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let distance = normal.dot(center) + plane.w;
            let radius = normal.abs().dot(half_size.abs());
            distance >= -radius
        })
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.intersects_box(point, Vec3::ZERO)
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let len = plane.truncate().length();
    if len > f32::EPSILON { plane / len } else { plane }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_neg_z() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
        Frustum::from_view_projection(&(proj * view))
    }

    #[test]
    fn box_in_front_is_visible() {
        let f = looking_down_neg_z();
        assert!(f.intersects_box(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE));
    }

    #[test]
    fn box_behind_is_culled() {
        let f = looking_down_neg_z();
        assert!(!f.intersects_box(Vec3::new(0.0, 0.0, 10.0), Vec3::ONE));
    }

    #[test]
    fn box_beyond_far_plane_is_culled() {
        let f = looking_down_neg_z();
        assert!(!f.intersects_box(Vec3::new(0.0, 0.0, -200.0), Vec3::ONE));
    }

    #[test]
    fn box_far_to_the_side_is_culled() {
        let f = looking_down_neg_z();
        assert!(!f.intersects_box(Vec3::new(100.0, 0.0, -10.0), Vec3::ONE));
        assert!(!f.intersects_box(Vec3::new(0.0, -100.0, -10.0), Vec3::ONE));
    }

    #[test]
    fn box_straddling_a_plane_is_visible() {
        let f = looking_down_neg_z();
        // Center is behind the near plane but the box reaches into the frustum.
        assert!(f.intersects_box(Vec3::new(0.0, 0.0, 1.0), Vec3::splat(5.0)));
    }

    #[test]
    fn point_containment() {
        let f = looking_down_neg_z();
        assert!(f.contains_point(Vec3::new(0.0, 0.0, -50.0)));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, 0.5)));
    }
}
