//! World Carver
//!
//! Bounds cache and spatial selection engine for streamed world sectors.
//! Given a selection volume and a stream of placement records, the crate
//! resolves each record's bounding volume (memoized in a persistent
//! four-partition cache), tests it against the volume, and assembles the
//! intersecting subset into a report an external writer can persist.
//!
//! Leaf-to-root: [`geom`] and [`model`] are pure data, [`payload`] decodes
//! geometry bytes, [`resolver`] derives cache keys and computes bounds
//! through the [`resolver::GeometrySource`] boundary, [`cache`] persists
//! them, [`select`] runs the intersection query, and [`output`] carries the
//! result to disk.

// Foundations
pub mod error;
pub mod geom;
pub mod model;

// Bounds pipeline
pub mod cache;
pub mod payload;
pub mod resolver;

// Query and output
pub mod filter;
pub mod output;
pub mod select;

pub use error::{CarveError, CarveResult};

pub use geom::{Aabb, BoundingVolume, Obb, SelectionVolume};

pub use model::{
    nodes_from_json, AudioNode, GenericNode, GeometryClass, MeshNode, NodeRecord, ProxyMeshNode,
    Transform,
};

pub use cache::{BoundsCache, CacheEntry, CacheStats, Partition, PartitionStats};

pub use resolver::{GeometrySource, MemoryGeometrySource, ResolvedBounds, ResourceKey};

pub use filter::{CandidateFilter, FilterMode, NameFilter, NodeTypeFilter};

pub use select::{CancelToken, ProgressEvent, SelectionEngine, SelectionOptions};

pub use output::{JsonReportWriter, ReportWriter, SaveMode, SelectionReport, UnresolvedNode};
