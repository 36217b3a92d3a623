use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box stored as center + half extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec3,
    pub half_size: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, half_size: Vec3) -> Self {
        Self {
            center,
            half_size: half_size.abs(),
        }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    /// Smallest box enclosing all `points`. Empty input yields a degenerate box at the origin.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::new(Vec3::ZERO, Vec3::ZERO);
        };
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Self::from_min_max(min, max)
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_size
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_size
    }

    /// World-space box enclosing this box after `matrix` is applied.
    ///
    /// Uses the absolute-value rotation trick: the new half extents are the
    /// old ones projected onto each world axis through |M|.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let center = matrix.transform_point3(self.center);
        let x = matrix.x_axis.truncate().abs() * self.half_size.x;
        let y = matrix.y_axis.truncate().abs() * self.half_size.y;
        let z = matrix.z_axis.truncate().abs() * self.half_size.z;
        Self {
            center,
            half_size: x + y + z,
        }
    }
}
