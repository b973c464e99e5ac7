//! World node data model
//!
//! Typed records for everything a streamed sector can place in the world,
//! the placement transform, and the closed catalog of node kinds. Parsing is
//! permissive about extra fields and strict about required ones; identity
//! tags live on the types, never in mutable state.

mod node;
mod node_types;
mod transform;

// Typed records
pub use node::{nodes_from_json, AudioNode, GenericNode, MeshNode, NodeRecord, ProxyMeshNode};

// Node kind catalog
pub use node_types::{
    geometry_class, is_known_type, GeometryClass, NodeTypeId, NodeTypeInfo, NODE_TYPES,
    NODE_TYPE_COUNT,
};

// Placement
pub use transform::Transform;
