//! Selection volumes
//!
//! A selection pass probes the world with either an axis-aligned box or an
//! oriented box captured in-world by the caller. The oriented test is a full
//! 15-axis separating-axis run against each candidate AABB, kept inclusive so
//! touching geometry is selected.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::Aabb;

/// Oriented bounding box: center, half extents, and a rotation taking local
/// axes into world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

impl Obb {
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self {
            center,
            half_extents,
            rotation,
        }
    }

    /// World-space axes of the box, one per local axis.
    pub fn axes(&self) -> [Vec3; 3] {
        let m = Mat3::from_quat(self.rotation);
        [m.x_axis, m.y_axis, m.z_axis]
    }

    /// Smallest AABB enclosing this box.
    pub fn aabb_hull(&self) -> Aabb {
        obb_hull(self)
    }

    /// Inclusive separating-axis test against an AABB.
    ///
    /// Axes tested: the three world axes, the three box axes, and the nine
    /// cross products. Separation requires a strictly larger projected
    /// distance, so contact on a face, edge, or corner counts as overlap.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let a_half = aabb.half_extents();
        let b_axes = self.axes();
        let b_half = self.half_extents;
        // Center offset in world space.
        let t = self.center - aabb.center();

        const WORLD_AXES: [Vec3; 3] = [Vec3::X, Vec3::Y, Vec3::Z];

        for axis in WORLD_AXES {
            if separated_on(axis, t, a_half, &b_axes, b_half) {
                return false;
            }
        }
        for axis in b_axes {
            if separated_on(axis, t, a_half, &b_axes, b_half) {
                return false;
            }
        }
        for world in WORLD_AXES {
            for b_axis in b_axes {
                let axis = world.cross(b_axis);
                // Parallel edge pair; this axis duplicates one already tested.
                if axis.length_squared() < 1e-10 {
                    continue;
                }
                if separated_on(axis, t, a_half, &b_axes, b_half) {
                    return false;
                }
            }
        }
        true
    }
}

fn obb_hull(obb: &Obb) -> Aabb {
    let m = Mat3::from_quat(obb.rotation);
    let abs = Mat3::from_cols(m.x_axis.abs(), m.y_axis.abs(), m.z_axis.abs());
    Aabb::from_center_half_extents(obb.center, abs * obb.half_extents)
}

/// Projected-interval separation test on one candidate axis. The axis need
/// not be normalized; both radii scale with its length.
#[inline]
fn separated_on(axis: Vec3, t: Vec3, a_half: Vec3, b_axes: &[Vec3; 3], b_half: Vec3) -> bool {
    let ra = a_half.x * axis.x.abs() + a_half.y * axis.y.abs() + a_half.z * axis.z.abs();
    let rb = b_half.x * b_axes[0].dot(axis).abs()
        + b_half.y * b_axes[1].dot(axis).abs()
        + b_half.z * b_axes[2].dot(axis).abs();
    t.dot(axis).abs() > ra + rb
}

/// The probe shape of a selection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SelectionVolume {
    Aabb(Aabb),
    Obb(Obb),
}

impl SelectionVolume {
    /// Inclusive test of a candidate world AABB against the probe.
    pub fn intersects_aabb(&self, candidate: &Aabb) -> bool {
        match self {
            SelectionVolume::Aabb(probe) => probe.intersects(candidate),
            SelectionVolume::Obb(probe) => probe.intersects_aabb(candidate),
        }
    }

    /// Smallest AABB enclosing the probe.
    pub fn aabb_hull(&self) -> Aabb {
        match self {
            SelectionVolume::Aabb(probe) => *probe,
            SelectionVolume::Obb(probe) => obb_hull(probe),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_aligned_obb_matches_aabb_semantics() {
        let candidate = Aabb::new(Vec3::ZERO, Vec3::ONE);
        // Identical box, identity rotation.
        let probe = Obb::new(Vec3::splat(0.5), Vec3::splat(0.5), Quat::IDENTITY);
        assert!(probe.intersects_aabb(&candidate));

        // Face contact at x = 1 is inclusive.
        let touching = Obb::new(Vec3::new(1.5, 0.5, 0.5), Vec3::splat(0.5), Quat::IDENTITY);
        assert!(touching.intersects_aabb(&candidate));

        // A strict gap separates.
        let apart = Obb::new(Vec3::new(2.01, 0.5, 0.5), Vec3::splat(0.5), Quat::IDENTITY);
        assert!(!apart.intersects_aabb(&candidate));
    }

    #[test]
    fn test_edge_contact_is_inclusive() {
        // Probe meets the candidate along the single edge x = 1, y = 1.
        let candidate = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);
        let probe = Obb::new(Vec3::new(2.0, 2.0, 0.0), Vec3::ONE, Quat::IDENTITY);
        assert!(probe.intersects_aabb(&candidate));

        // Backing off along either axis opens a strict gap.
        let apart = Obb::new(Vec3::new(2.5, 2.0, 0.0), Vec3::ONE, Quat::IDENTITY);
        assert!(!apart.intersects_aabb(&candidate));
    }

    #[test]
    fn test_rotated_obb_misses_where_hull_overlaps() {
        // A cube rotated 45 degrees about Z has an AABB hull wider than the
        // cube itself. Place it so the hulls overlap but the boxes do not.
        let candidate = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);
        let rot = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        // Corner reach along X is sqrt(2); 1 + sqrt(2) ~ 2.414.
        let probe = Obb::new(Vec3::new(2.6, 0.0, 0.0), Vec3::ONE, rot);
        assert!(obb_hull(&probe).intersects(&candidate));
        assert!(!probe.intersects_aabb(&candidate));
    }

    #[test]
    fn test_rotated_obb_hits_within_reach() {
        let candidate = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);
        let rot = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        let probe = Obb::new(Vec3::new(2.2, 0.0, 0.0), Vec3::ONE, rot);
        assert!(probe.intersects_aabb(&candidate));
    }

    #[test]
    fn test_obb_contained_in_aabb_intersects() {
        let candidate = Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0));
        let probe = Obb::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::splat(0.25),
            Quat::from_rotation_y(0.7),
        );
        assert!(probe.intersects_aabb(&candidate));
    }

    #[test]
    fn test_selection_volume_dispatch() {
        let candidate = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let aabb_probe = SelectionVolume::Aabb(Aabb::new(Vec3::ONE, Vec3::splat(2.0)));
        assert!(aabb_probe.intersects_aabb(&candidate));

        let obb_probe = SelectionVolume::Obb(Obb::new(
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::ONE,
            Quat::from_rotation_x(0.3),
        ));
        assert!(!obb_probe.intersects_aabb(&candidate));
    }
}
