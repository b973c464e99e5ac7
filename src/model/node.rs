//! Typed world node records
//!
//! Records arrive from sector catalogs as permissive JSON, get validated into
//! one of the typed variants here, and flow through filtering and selection.
//! Each variant's identity tags (node type, module path, data type) are fixed
//! at the type level and emitted during serialization; they are not mutable
//! state, so a record can never drift away from its kind.
//!
//! Absent optional fields take their construction defaults. A record missing
//! a required field, carrying a wrong-typed field, or naming an uncataloged
//! node type fails fast as [`CarveError::MalformedRecord`].

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CarveError, CarveResult};
use crate::geom::Aabb;
use crate::model::node_types::{self, GeometryClass};
use crate::model::transform::Transform;

/// Static mesh reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshNode {
    /// Path of the referenced geometry resource.
    pub mesh: String,
    pub appearance: String,
    pub debug_name: String,
    #[serde(flatten)]
    pub transform: Transform,
    /// Content fingerprint of the referenced resource, when the catalog
    /// carries one. Folded into the resource key for modded content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<u32>,
}

impl MeshNode {
    pub const NODE_TYPE: &'static str = "worldMeshNode";
    pub const MODULE_PATH: &'static str = "mesh/mesh";

    pub fn new(mesh: impl Into<String>) -> Self {
        MeshNode {
            mesh: mesh.into(),
            appearance: "default".to_string(),
            debug_name: String::new(),
            transform: Transform::IDENTITY,
            source_hash: None,
        }
    }
}

/// Distant-geometry stand-in that auto-hides when the camera gets close.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyMeshNode {
    pub mesh: String,
    pub near_auto_hide_distance: f32,
    pub debug_name: String,
    #[serde(flatten)]
    pub transform: Transform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<u32>,
}

impl ProxyMeshNode {
    pub const NODE_TYPE: &'static str = "worldGenericProxyMeshNode";
    pub const MODULE_PATH: &'static str = "mesh/proxyMesh";
    pub const DEFAULT_NEAR_AUTO_HIDE: f32 = 15.0;

    pub fn new(mesh: impl Into<String>) -> Self {
        ProxyMeshNode {
            mesh: mesh.into(),
            near_auto_hide_distance: Self::DEFAULT_NEAR_AUTO_HIDE,
            debug_name: String::new(),
            transform: Transform::IDENTITY,
            source_hash: None,
        }
    }
}

/// Static sound emitter with a spherical audible range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioNode {
    pub emitter_metadata_name: String,
    pub radius: f32,
    pub use_doppler: bool,
    pub use_physics_obstruction: bool,
    pub debug_name: String,
    #[serde(flatten)]
    pub transform: Transform,
}

impl AudioNode {
    pub const NODE_TYPE: &'static str = "worldStaticSoundEmitterNode";
    pub const MODULE_PATH: &'static str = "visual/audio";
    pub const DATA_TYPE: &'static str = "Sounds";
    pub const DEFAULT_RADIUS: f32 = 5.0;

    pub fn new() -> Self {
        AudioNode {
            emitter_metadata_name: String::new(),
            radius: Self::DEFAULT_RADIUS,
            use_doppler: true,
            use_physics_obstruction: true,
            debug_name: String::new(),
            transform: Transform::IDENTITY,
        }
    }
}

impl Default for AudioNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Any cataloged node kind without a dedicated variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericNode {
    /// Catalog name of the kind. Emitted through the identity tags, not as
    /// part of the body.
    #[serde(skip)]
    pub node_type: String,
    /// Geometry resource path for mesh-backed kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Half extents for fixed-extent kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Vec3>,
    pub debug_name: String,
    #[serde(flatten)]
    pub transform: Transform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<u32>,
}

impl GenericNode {
    pub const MODULE_PATH: &'static str = "world/node";

    pub fn new(node_type: impl Into<String>) -> Self {
        GenericNode {
            node_type: node_type.into(),
            resource: None,
            extent: None,
            debug_name: String::new(),
            transform: Transform::IDENTITY,
            source_hash: None,
        }
    }
}

/// A validated world node record.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRecord {
    Mesh(MeshNode),
    ProxyMesh(ProxyMeshNode),
    Audio(AudioNode),
    Generic(GenericNode),
}

impl NodeRecord {
    pub fn node_type(&self) -> &str {
        match self {
            NodeRecord::Mesh(_) => MeshNode::NODE_TYPE,
            NodeRecord::ProxyMesh(_) => ProxyMeshNode::NODE_TYPE,
            NodeRecord::Audio(_) => AudioNode::NODE_TYPE,
            NodeRecord::Generic(n) => &n.node_type,
        }
    }

    pub fn module_path(&self) -> &'static str {
        match self {
            NodeRecord::Mesh(_) => MeshNode::MODULE_PATH,
            NodeRecord::ProxyMesh(_) => ProxyMeshNode::MODULE_PATH,
            NodeRecord::Audio(_) => AudioNode::MODULE_PATH,
            NodeRecord::Generic(_) => GenericNode::MODULE_PATH,
        }
    }

    /// Content category tag, present only on audible/visualized kinds.
    pub fn data_type(&self) -> Option<&'static str> {
        match self {
            NodeRecord::Audio(_) => Some(AudioNode::DATA_TYPE),
            _ => None,
        }
    }

    pub fn debug_name(&self) -> &str {
        match self {
            NodeRecord::Mesh(n) => &n.debug_name,
            NodeRecord::ProxyMesh(n) => &n.debug_name,
            NodeRecord::Audio(n) => &n.debug_name,
            NodeRecord::Generic(n) => &n.debug_name,
        }
    }

    pub fn transform(&self) -> &Transform {
        match self {
            NodeRecord::Mesh(n) => &n.transform,
            NodeRecord::ProxyMesh(n) => &n.transform,
            NodeRecord::Audio(n) => &n.transform,
            NodeRecord::Generic(n) => &n.transform,
        }
    }

    /// Referenced geometry resource path, for mesh-backed kinds.
    pub fn resource_path(&self) -> Option<&str> {
        match self {
            NodeRecord::Mesh(n) => Some(&n.mesh),
            NodeRecord::ProxyMesh(n) => Some(&n.mesh),
            NodeRecord::Audio(_) => None,
            NodeRecord::Generic(n) => n.resource.as_deref(),
        }
    }

    pub fn source_hash(&self) -> Option<u32> {
        match self {
            NodeRecord::Mesh(n) => n.source_hash,
            NodeRecord::ProxyMesh(n) => n.source_hash,
            NodeRecord::Audio(_) => None,
            NodeRecord::Generic(n) => n.source_hash,
        }
    }

    /// Geometry class from the catalog. Kinds constructed with an
    /// uncataloged name fall back to extentless.
    pub fn geometry_class(&self) -> GeometryClass {
        node_types::geometry_class(self.node_type()).unwrap_or(GeometryClass::Extentless)
    }

    /// Resource-space AABB for fixed-extent kinds. `None` when the record
    /// carries no extent data.
    pub fn local_fixed_aabb(&self) -> Option<Aabb> {
        match self {
            NodeRecord::Audio(n) => Some(Aabb::from_center_half_extents(
                Vec3::ZERO,
                Vec3::splat(n.radius),
            )),
            NodeRecord::Generic(n) => n
                .extent
                .map(|half| Aabb::from_center_half_extents(Vec3::ZERO, half)),
            _ => None,
        }
    }

    /// Parse a single record from catalog JSON.
    pub fn from_json(json: &str) -> CarveResult<NodeRecord> {
        let raw: RawNode = serde_json::from_str(json)
            .map_err(|e| CarveError::malformed(format!("record JSON: {e}")))?;
        NodeRecord::from_raw(raw)
    }

    fn from_raw(raw: RawNode) -> CarveResult<NodeRecord> {
        let node_type = raw
            .node_type
            .ok_or_else(|| CarveError::malformed("nodeType missing"))?;
        let transform = Transform {
            pos: raw.pos.unwrap_or(Vec3::ZERO),
            rot: raw.rot.unwrap_or(Quat::IDENTITY),
            scale: raw.scale.unwrap_or(Vec3::ONE),
        };
        let debug_name = raw.debug_name.unwrap_or_default();

        if node_type == MeshNode::NODE_TYPE {
            let mesh = raw.mesh.ok_or_else(|| {
                CarveError::malformed(format!("{node_type} record without mesh path"))
            })?;
            Ok(NodeRecord::Mesh(MeshNode {
                mesh,
                appearance: raw.appearance.unwrap_or_else(|| "default".to_string()),
                debug_name,
                transform,
                source_hash: raw.source_hash,
            }))
        } else if node_type == ProxyMeshNode::NODE_TYPE {
            let mesh = raw.mesh.ok_or_else(|| {
                CarveError::malformed(format!("{node_type} record without mesh path"))
            })?;
            Ok(NodeRecord::ProxyMesh(ProxyMeshNode {
                mesh,
                near_auto_hide_distance: raw
                    .near_auto_hide_distance
                    .unwrap_or(ProxyMeshNode::DEFAULT_NEAR_AUTO_HIDE),
                debug_name,
                transform,
                source_hash: raw.source_hash,
            }))
        } else if node_type == AudioNode::NODE_TYPE {
            Ok(NodeRecord::Audio(AudioNode {
                emitter_metadata_name: raw.emitter_metadata_name.unwrap_or_default(),
                radius: raw.radius.unwrap_or(AudioNode::DEFAULT_RADIUS),
                use_doppler: raw.use_doppler.unwrap_or(true),
                use_physics_obstruction: raw.use_physics_obstruction.unwrap_or(true),
                debug_name,
                transform,
            }))
        } else if node_types::is_known_type(&node_type) {
            Ok(NodeRecord::Generic(GenericNode {
                resource: raw.resource.or(raw.mesh),
                extent: raw.extent,
                debug_name,
                transform,
                source_hash: raw.source_hash,
                node_type,
            }))
        } else {
            Err(CarveError::malformed(format!(
                "unknown nodeType '{node_type}'"
            )))
        }
    }
}

/// Parse a catalog JSON array into records, failing on the first bad entry.
pub fn nodes_from_json(json: &str) -> CarveResult<Vec<NodeRecord>> {
    let raws: Vec<RawNode> = serde_json::from_str(json)
        .map_err(|e| CarveError::malformed(format!("catalog JSON: {e}")))?;
    raws.into_iter().map(NodeRecord::from_raw).collect()
}

/// Serialization wrapper that emits the identity tags ahead of the body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tagged<'a, T: Serialize> {
    node_type: &'a str,
    module_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_type: Option<&'a str>,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for NodeRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NodeRecord::Mesh(n) => Tagged {
                node_type: MeshNode::NODE_TYPE,
                module_path: MeshNode::MODULE_PATH,
                data_type: None,
                body: n,
            }
            .serialize(serializer),
            NodeRecord::ProxyMesh(n) => Tagged {
                node_type: ProxyMeshNode::NODE_TYPE,
                module_path: ProxyMeshNode::MODULE_PATH,
                data_type: None,
                body: n,
            }
            .serialize(serializer),
            NodeRecord::Audio(n) => Tagged {
                node_type: AudioNode::NODE_TYPE,
                module_path: AudioNode::MODULE_PATH,
                data_type: Some(AudioNode::DATA_TYPE),
                body: n,
            }
            .serialize(serializer),
            NodeRecord::Generic(n) => Tagged {
                node_type: &n.node_type,
                module_path: GenericNode::MODULE_PATH,
                data_type: None,
                body: n,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for NodeRecord {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawNode::deserialize(deserializer)?;
        NodeRecord::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

/// Permissive catalog form. Unknown fields are ignored; typed validation
/// happens in [`NodeRecord::from_raw`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    node_type: Option<String>,
    mesh: Option<String>,
    appearance: Option<String>,
    near_auto_hide_distance: Option<f32>,
    emitter_metadata_name: Option<String>,
    radius: Option<f32>,
    use_doppler: Option<bool>,
    use_physics_obstruction: Option<bool>,
    resource: Option<String>,
    extent: Option<Vec3>,
    debug_name: Option<String>,
    source_hash: Option<u32>,
    pos: Option<Vec3>,
    rot: Option<Quat>,
    scale: Option<Vec3>,
}
