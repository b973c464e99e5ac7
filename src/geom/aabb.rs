//! Axis-aligned bounding boxes
//!
//! [`Aabb`] is the unit of storage for the bounds cache: min/max corners in
//! resource space, scaled at resolution time and placed into world space per
//! node. [`BoundingVolume`] wraps it with the explicit "no geometry" answer so
//! an empty mesh is a cacheable fact rather than a missing entry.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box with inclusive min/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from min/max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "inverted AABB: {min:?} > {max:?}"
        );
        Self { min, max }
    }

    /// Create an AABB with inverted extents, ready for encapsulation.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Create an AABB from a center point and half extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest AABB enclosing all points, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut bounds = Self::empty();
        let mut any = false;
        for p in points {
            bounds.encapsulate(p);
            any = true;
        }
        any.then_some(bounds)
    }

    /// Expand to include a point.
    #[inline]
    pub fn encapsulate(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check that min <= max on all axes.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Inclusive overlap test. Boxes sharing only a face, edge, or corner
    /// still intersect.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Inclusive point containment test.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Smallest AABB enclosing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Copy translated by an offset.
    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Copy scaled per axis about the origin. Negative components flip the
    /// box, so corners are re-ordered to keep min <= max.
    pub fn scaled(&self, scale: Vec3) -> Aabb {
        let a = self.min * scale;
        let b = self.max * scale;
        Aabb {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Enclosing AABB after rotating about the origin and translating.
    ///
    /// Uses the absolute rotation matrix on the half extents, which is exact
    /// for boxes and avoids materializing all eight corners.
    pub fn rotated_translated(&self, rotation: Quat, translation: Vec3) -> Aabb {
        let m = Mat3::from_quat(rotation);
        let abs = Mat3::from_cols(m.x_axis.abs(), m.y_axis.abs(), m.z_axis.abs());
        let center = m * self.center() + translation;
        let half_extents = abs * self.half_extents();
        Aabb::from_center_half_extents(center, half_extents)
    }
}

/// Cacheable answer of a bounds resolution.
///
/// `NoGeometry` records that a resource parsed cleanly but produced no
/// vertices. Caching the sentinel keeps such resources from being re-fetched
/// on every selection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BoundingVolume {
    Box(Aabb),
    NoGeometry,
}

impl BoundingVolume {
    /// Smallest volume enclosing all points; `NoGeometry` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        match Aabb::from_points(points) {
            Some(aabb) => BoundingVolume::Box(aabb),
            None => BoundingVolume::NoGeometry,
        }
    }

    pub fn aabb(&self) -> Option<&Aabb> {
        match self {
            BoundingVolume::Box(aabb) => Some(aabb),
            BoundingVolume::NoGeometry => None,
        }
    }

    pub fn has_geometry(&self) -> bool {
        matches!(self, BoundingVolume::Box(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_faces_intersect() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_touching_corner_intersects() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::ONE, Vec3::splat(2.0));
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_disjoint_boxes_do_not_intersect() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(1.5, 0.0, 0.0), Vec3::new(2.5, 1.0, 1.0));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_from_points_folds_extremes() {
        let bounds = Aabb::from_points([
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-4.0, 5.0, 0.0),
            Vec3::new(0.5, 0.5, -6.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Vec3::new(-4.0, -2.0, -6.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 5.0, 3.0));
    }

    #[test]
    fn test_from_points_empty_is_none() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
        assert_eq!(
            BoundingVolume::from_points(std::iter::empty()),
            BoundingVolume::NoGeometry
        );
    }

    #[test]
    fn test_negative_scale_reorders_corners() {
        let a = Aabb::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 4.0, 6.0));
        let scaled = a.scaled(Vec3::new(-1.0, 2.0, 1.0));
        assert!(scaled.is_valid());
        assert_eq!(scaled.min, Vec3::new(-2.0, 4.0, 3.0));
        assert_eq!(scaled.max, Vec3::new(-1.0, 8.0, 6.0));
    }

    #[test]
    fn test_rotated_translated_quarter_turn() {
        // Box of half extents (2, 1, 1) rotated 90 degrees about Z swaps the
        // X and Y extents.
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let rotated = a.rotated_translated(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(10.0, 0.0, 0.0),
        );
        let half = rotated.half_extents();
        assert!((half.x - 1.0).abs() < 1e-4);
        assert!((half.y - 2.0).abs() < 1e-4);
        assert!((half.z - 1.0).abs() < 1e-4);
        assert!((rotated.center() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_identity_placement_is_exact() {
        let a = Aabb::new(Vec3::new(-3.0, -1.0, 0.5), Vec3::new(2.0, 7.0, 9.0));
        let placed = a.rotated_translated(Quat::IDENTITY, Vec3::ZERO);
        assert_eq!(placed, a);
    }
}
