//! Geometry primitives for bounds caching and selection
//!
//! Everything here is plain data over `glam` vectors. The cache persists
//! [`BoundingVolume`]s in resource space; the selection engine places them in
//! world space and tests them against a [`SelectionVolume`]. Intersection is
//! inclusive on every path, so volumes that merely touch still count as hits.

mod aabb;
mod volume;

pub use aabb::{Aabb, BoundingVolume};
pub use volume::{Obb, SelectionVolume};
