//! Node placement in world space.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::geom::Aabb;

/// Position, rotation, and per-axis scale of a placed node.
///
/// Scale participates in bounds resolution (it is folded into the cached
/// volume), while rotation and position are applied per placement. Two nodes
/// sharing a resource at the same scale therefore share one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub pos: Vec3,
    pub rot: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        pos: Vec3::ZERO,
        rot: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_pos(pos: Vec3) -> Self {
        Transform {
            pos,
            ..Self::IDENTITY
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Place a resource-space AABB (scale already folded in) into world
    /// space. Identity rotations stay on the exact translate-only path.
    pub fn placed_aabb(&self, local: &Aabb) -> Aabb {
        if self.rot == Quat::IDENTITY {
            local.translated(self.pos)
        } else {
            local.rotated_translated(self.rot, self.pos)
        }
    }
}
