//! World node type catalog
//!
//! Every node kind the streamed sectors can carry, with the geometry class
//! that decides how its bounds are produced. Mesh-backed kinds go through the
//! bounds cache, fixed-extent kinds carry their footprint on the record, and
//! extentless kinds are logical content that no volume can select.
//!
//! The catalog is a fixed table; [`NodeTypeId`] is an index into it and is
//! only minted through name lookup, so a held id is always valid.

use std::fmt;

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;
use static_assertions::const_assert;

/// Number of node kinds in the catalog.
pub const NODE_TYPE_COUNT: usize = 122;

// Ids are u16 indices into the table.
const_assert!(NODE_TYPE_COUNT <= u16::MAX as usize);

/// How a node kind obtains its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryClass {
    /// References a geometry resource; bounds come from its payload.
    MeshBacked,
    /// Carries its extent directly on the record.
    FixedExtent,
    /// Logical content with no spatial footprint.
    Extentless,
}

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeInfo {
    pub name: &'static str,
    pub class: GeometryClass,
}

const fn t(name: &'static str, class: GeometryClass) -> NodeTypeInfo {
    NodeTypeInfo { name, class }
}

use GeometryClass::{Extentless, FixedExtent, MeshBacked};

/// The full catalog, grouped by family. Order is stable; persisted data never
/// references indices, only names, so reordering between releases is safe.
pub static NODE_TYPES: [NodeTypeInfo; NODE_TYPE_COUNT] = [
    // Meshes
    t("worldMeshNode", MeshBacked),
    t("worldInstancedMeshNode", MeshBacked),
    t("worldBendedMeshNode", MeshBacked),
    t("worldDynamicMeshNode", MeshBacked),
    t("worldClothMeshNode", MeshBacked),
    t("worldRotatingMeshNode", MeshBacked),
    t("worldCableMeshNode", MeshBacked),
    t("worldTerrainMeshNode", MeshBacked),
    t("worldWaterPatchNode", MeshBacked),
    t("worldFoliageNode", MeshBacked),
    // Foliage, destruction, and proxy geometry
    t("worldInstancedFoliageNode", MeshBacked),
    t("worldInstancedDestructibleMeshNode", MeshBacked),
    t("worldPhysicalDestructionNode", MeshBacked),
    t("worldBakedDestructionNode", MeshBacked),
    t("worldGenericProxyMeshNode", MeshBacked),
    t("worldRoadProxyMeshNode", MeshBacked),
    t("worldBuildingProxyMeshNode", MeshBacked),
    t("worldTerrainProxyMeshNode", MeshBacked),
    t("worldQuestProxyMeshNode", MeshBacked),
    t("worldPrefabProxyMeshNode", MeshBacked),
    // Entities and occlusion
    t("worldEntityProxyMeshNode", MeshBacked),
    t("worldDestructibleEntityProxyMeshNode", MeshBacked),
    t("worldEntityNode", MeshBacked),
    t("worldDeviceNode", MeshBacked),
    t("worldStaticOccluderMeshNode", MeshBacked),
    t("worldInstancedOccluderNode", MeshBacked),
    t("worldLightChannelShadowProxyNode", MeshBacked),
    t("worldAdvertisementNode", MeshBacked),
    t("worldStaticDecalNode", FixedExtent),
    t("worldStaticParticleNode", FixedExtent),
    // Visual volumes and lighting
    t("worldEffectNode", FixedExtent),
    t("worldStaticLightNode", FixedExtent),
    t("worldReflectionProbeNode", FixedExtent),
    t("worldStaticFogVolumeNode", FixedExtent),
    t("worldStaticGIShapeNode", FixedExtent),
    t("worldStaticGIWindowNode", FixedExtent),
    t("worldLightChannelVolumeNode", FixedExtent),
    t("worldDistantLightsNode", FixedExtent),
    t("worldMirrorNode", FixedExtent),
    t("worldStaticStickerNode", FixedExtent),
    // Audio
    t("worldStaticSoundEmitterNode", FixedExtent),
    t("worldAmbientAreaNode", FixedExtent),
    t("worldAudioAttractAreaNode", FixedExtent),
    t("worldAcousticPortalNode", FixedExtent),
    t("worldAcousticSectorNode", FixedExtent),
    t("worldAcousticZoneNode", FixedExtent),
    t("worldAudioTagNode", Extentless),
    t("worldAudioSignpostTriggerNode", Extentless),
    t("worldReverbAreaNode", FixedExtent),
    t("worldVehicleAudioAreaNode", FixedExtent),
    // Gameplay areas
    t("worldAreaShapeNode", FixedExtent),
    t("worldInteriorAreaNode", FixedExtent),
    t("worldLocationAreaNode", FixedExtent),
    t("worldGuardAreaNode", FixedExtent),
    t("worldSecurityAreaNode", FixedExtent),
    t("worldVehicleForbiddenAreaNode", FixedExtent),
    t("worldPreventionFreeAreaNode", FixedExtent),
    t("worldMinimapConfigAreaNode", FixedExtent),
    t("worldAmbientPaletteExclusionAreaNode", FixedExtent),
    t("worldWaterNullAreaNode", FixedExtent),
    // More areas and physics
    t("worldCameraContextAreaNode", FixedExtent),
    t("worldInterestingConversationsAreaNode", FixedExtent),
    t("worldQuestExclusionAreaNode", FixedExtent),
    t("worldRainOcclusionAreaNode", FixedExtent),
    t("worldPhysicalTriggerAreaNode", FixedExtent),
    t("worldPhysicalImpulseAreaNode", FixedExtent),
    t("worldPhysicalFractureFieldNode", FixedExtent),
    t("worldTriggerAreaNode", FixedExtent),
    t("worldCollisionNode", FixedExtent),
    t("worldSimpleShapeCollisionNode", FixedExtent),
    // Navigation and AI
    t("worldNavigationDeniedAreaNode", FixedExtent),
    t("worldNavigationConfigurationNode", Extentless),
    t("worldOffMeshConnectionNode", Extentless),
    t("worldOffMeshSmartObjectLinkNode", Extentless),
    t("worldNavmeshMarkerNode", Extentless),
    t("worldAISpotNode", Extentless),
    t("worldSmartObjectNode", Extentless),
    t("worldWorkspotNode", Extentless),
    t("worldPatrolSplineNode", Extentless),
    t("worldRacingSplineNode", Extentless),
    // Splines and markers
    t("worldSplineNode", Extentless),
    t("worldSpeedSplineNode", Extentless),
    t("worldStaticQuestMarkerNode", Extentless),
    t("worldSceneMarkerNode", Extentless),
    t("worldMapPinNode", Extentless),
    t("worldInteriorMapNode", Extentless),
    t("worldBinkNode", FixedExtent),
    t("worldDebugShapeNode", Extentless),
    t("worldPointOfInterestNode", Extentless),
    t("worldCompiledCommunityAreaNode", Extentless),
    // Communities, population, traffic
    t("worldCompiledCommunityAreaNode_Streamable", Extentless),
    t("worldCommunityRegistryNode", Extentless),
    t("worldPopulationSpawnerNode", FixedExtent),
    t("worldCrowdNullAreaNode", FixedExtent),
    t("worldCrowdPortalNode", FixedExtent),
    t("worldTrafficCompiledNode", Extentless),
    t("worldTrafficPersistentNode", Extentless),
    t("worldTrafficSourceNode", Extentless),
    t("worldTrafficSplineNode", Extentless),
    t("worldTrafficIntersectionNode", Extentless),
    // Streaming and environment
    t("worldStreamingBlockNode", Extentless),
    t("worldStreamingExclusionAreaNode", FixedExtent),
    t("worldSectorVariantNode", Extentless),
    t("worldPersistentStateNode", Extentless),
    t("worldWeatherAreaNode", FixedExtent),
    t("worldWindImpulseAreaNode", FixedExtent),
    t("worldFastTravelPointNode", Extentless),
    t("worldDropPointNode", Extentless),
    t("worldMapRevealAreaNode", FixedExtent),
    t("worldLandmarkAreaNode", FixedExtent),
    // Remaining gameplay and geometry kinds
    t("worldParkingSpotNode", Extentless),
    t("worldVehicleSummonPointNode", Extentless),
    t("worldSaveSanitizationForbiddenAreaNode", FixedExtent),
    t("worldRestrictedAreaNode", FixedExtent),
    t("worldCompiledSmartObjectsNode", Extentless),
    t("worldConversationsAreaNode", FixedExtent),
    t("worldGeometryShapeNode", FixedExtent),
    t("worldTerrainCollisionNode", FixedExtent),
    t("worldHeightmapNode", MeshBacked),
    t("worldMergedMeshNode", MeshBacked),
    t("worldImposterNode", MeshBacked),
    t("worldLightBlockerNode", FixedExtent),
];

lazy_static! {
    static ref NODE_TYPE_INDEX: FxHashMap<&'static str, NodeTypeId> = {
        let mut index = FxHashMap::default();
        for (i, info) in NODE_TYPES.iter().enumerate() {
            index.insert(info.name, NodeTypeId(i as u16));
        }
        index
    };
}

/// Identifier of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeTypeId(u16);

impl NodeTypeId {
    /// Look up a node kind by its exact name.
    pub fn of(name: &str) -> Option<NodeTypeId> {
        NODE_TYPE_INDEX.get(name).copied()
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn info(self) -> &'static NodeTypeInfo {
        &NODE_TYPES[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn class(self) -> GeometryClass {
        self.info().class
    }
}

impl fmt::Display for NodeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Geometry class for a node kind name, `None` if the name is not cataloged.
pub fn geometry_class(name: &str) -> Option<GeometryClass> {
    NodeTypeId::of(name).map(NodeTypeId::class)
}

/// Whether a node kind name is in the catalog.
pub fn is_known_type(name: &str) -> bool {
    NODE_TYPE_INDEX.contains_key(name)
}
