//! Geometry resolution
//!
//! Bridges node records to the bounds cache: derives the canonical
//! [`ResourceKey`] for a record, fetches payload bytes through the
//! [`GeometrySource`] seam, and folds them down to a resource-local bounding
//! volume with the record's scale applied.
//!
//! The key string is injective over (path, scale, fingerprint): the path is
//! normalized, scale components are encoded by their exact f32 bit patterns,
//! and the optional content fingerprint rides along for modded resources.
//! Precision tier is deliberately absent; tiers are whole partitions, not key
//! components.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec3;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CarveError, CarveResult};
use crate::geom::BoundingVolume;
use crate::model::NodeRecord;
use crate::payload;

/// Source of raw geometry payload bytes, keyed by resource path.
///
/// Implementations wrap archive readers, loose-file trees, or network
/// fetchers. `Ok(None)` means the source does not contain the resource;
/// errors mean the source itself failed.
pub trait GeometrySource: Send + Sync {
    fn fetch_geometry(&self, resource_path: &str) -> CarveResult<Option<Vec<u8>>>;
}

/// Canonical cache key for one resolvable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Build a key from a resource path, placement scale, and optional
    /// content fingerprint.
    pub fn new(resource_path: &str, scale: Vec3, source_hash: Option<u32>) -> Self {
        let path = normalize_resource_path(resource_path);
        let mut key = format!(
            "{path}#s={:08x},{:08x},{:08x}",
            scale.x.to_bits(),
            scale.y.to_bits(),
            scale.z.to_bits()
        );
        if let Some(hash) = source_hash {
            key.push_str(&format!("#c={hash:08x}"));
        }
        ResourceKey(key)
    }

    /// Key for a record's referenced resource, `None` when the record
    /// references nothing.
    pub fn for_node(node: &NodeRecord) -> Option<ResourceKey> {
        node.resource_path()
            .map(|path| ResourceKey::new(path, node.transform().scale, node.source_hash()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase a resource path and unify its separators.
pub fn normalize_resource_path(path: &str) -> String {
    path.trim().replace('\\', "/").to_lowercase()
}

/// Content fingerprint of a payload, as carried in modded resource keys.
pub fn content_fingerprint(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Outcome of one provider run: the volume to cache plus the size of the
/// payload it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBounds {
    pub volume: BoundingVolume,
    pub source_size: u64,
}

/// Fetch, decode, and scale one resource's bounds.
///
/// Every failure mode (source error, missing resource, payload corruption)
/// surfaces as [`CarveError::ResolutionFailed`] carrying the key, so cache
/// callers see one error shape.
pub fn resolve_bounds<S>(
    source: &S,
    key: &ResourceKey,
    resource_path: &str,
    scale: Vec3,
) -> CarveResult<ResolvedBounds>
where
    S: GeometrySource + ?Sized,
{
    let bytes = source
        .fetch_geometry(resource_path)
        .map_err(|e| CarveError::resolution(key.as_str(), e.to_string()))?
        .ok_or_else(|| CarveError::resolution(key.as_str(), "resource not found"))?;

    let volume = payload::decode_bounds(&bytes)
        .map_err(|e| CarveError::resolution(key.as_str(), e.to_string()))?;
    let volume = match volume {
        BoundingVolume::Box(aabb) => BoundingVolume::Box(aabb.scaled(scale)),
        BoundingVolume::NoGeometry => BoundingVolume::NoGeometry,
    };

    Ok(ResolvedBounds {
        volume,
        source_size: bytes.len() as u64,
    })
}

/// In-memory geometry source for tests and fixtures.
///
/// Counts fetches so callers can assert how often resolution actually ran.
#[derive(Default)]
pub struct MemoryGeometrySource {
    payloads: Mutex<FxHashMap<String, Vec<u8>>>,
    fetch_count: AtomicUsize,
}

impl MemoryGeometrySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a payload under a resource path (normalized on insert).
    pub fn insert(&self, resource_path: &str, payload: Vec<u8>) {
        self.payloads
            .lock()
            .insert(normalize_resource_path(resource_path), payload);
    }

    /// Register plain vertices, encoding them as an uncompressed payload.
    pub fn insert_vertices(&self, resource_path: &str, vertices: &[Vec3]) {
        self.insert(resource_path, payload::encode_payload(vertices, false));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl GeometrySource for MemoryGeometrySource {
    fn fetch_geometry(&self, resource_path: &str) -> CarveResult<Option<Vec<u8>>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .payloads
            .lock()
            .get(&normalize_resource_path(resource_path))
            .cloned())
    }
}
