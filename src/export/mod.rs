//! A serializable snapshot of a converted live tree, what the packaging step writes out.

use hecs::{Entity, EntityRef, World};
use serde::Serialize;

use crate::engine::Engine;
use crate::engine::assets::{AssetLoad, AssetName, LoadState, MaterialAsset, MeshAsset, TextureAsset};
use crate::engine::components::avatar::{
    AvatarDescriptor, BipedRig, DynamicBoneChain, DynamicBoneCollider, EyeController, FaceTrackingDriver,
    FirstPersonVisibility, RigRoot, VisemeDriver,
};
use crate::engine::components::hierarchy::{Active, Enabled, SourceReference, Transform};
use crate::engine::components::render::{FirstPersonMaterials, MeshRenderer, SkinnedMeshRenderer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagedTransform {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl From<&Transform> for PackagedTransform {
    fn from(transform: &Transform) -> Self {
        Self {
            position: transform.translation.to_array(),
            rotation: transform.rotation.to_array(),
            scale: transform.scale.to_array(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagedComponent {
    pub kind: &'static str,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<u64>,
    /// Name of the mesh a renderer draws.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_person_materials: Option<Vec<Option<String>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagedSlot {
    pub name: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<u64>,
    pub transform: PackagedTransform,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<PackagedComponent>,
    /// Humanoid bones detected below this slot, as canonical names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rig: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PackagedSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagedAsset {
    pub name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<u64>,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submeshes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagedGraph {
    pub root: PackagedSlot,
    pub assets: Vec<PackagedAsset>,
}

fn component_kind(component: &EntityRef<'_>) -> &'static str {
    if component.has::<MeshRenderer>() {
        "MeshRenderer"
    } else if component.has::<SkinnedMeshRenderer>() {
        "SkinnedMeshRenderer"
    } else if component.has::<RigRoot>() {
        "HumanoidRig"
    } else if component.has::<AvatarDescriptor>() {
        "AvatarDescriptor"
    } else if component.has::<EyeController>() {
        "EyeController"
    } else if component.has::<VisemeDriver>() {
        "VisemeDriver"
    } else if component.has::<FaceTrackingDriver>() {
        "FaceTrackingDriver"
    } else if component.has::<DynamicBoneChain>() {
        "DynamicBoneChain"
    } else if component.has::<DynamicBoneCollider>() {
        "DynamicBoneCollider"
    } else if component.has::<FirstPersonVisibility>() {
        "FirstPersonVisibility"
    } else {
        "Unknown"
    }
}

fn asset_kind(asset: &EntityRef<'_>) -> &'static str {
    if asset.has::<MeshAsset>() {
        "Mesh"
    } else if asset.has::<MaterialAsset>() {
        "Material"
    } else if asset.has::<TextureAsset>() {
        "Texture"
    } else {
        "Unknown"
    }
}

fn asset_name(world: &World, asset: Option<Entity>) -> Option<String> {
    world.get::<&AssetName>(asset?).ok().map(|name| name.0.clone())
}

fn asset_names(world: &World, assets: &[Option<Entity>]) -> Vec<Option<String>> {
    assets.iter().map(|&asset| asset_name(world, asset)).collect()
}

fn source_id(world: &World, entity: Entity) -> Option<u64> {
    world.get::<&SourceReference>(entity).ok().map(|source| source.id)
}

impl PackagedGraph {
    /// Walks the tree below `root`. Attached entities with an asset name are listed as assets,
    /// everything else attached is a component of its slot.
    pub fn capture(engine: &Engine, root: Entity) -> PackagedGraph {
        let mut assets = vec![];
        let root = Self::capture_slot(engine, root, &mut assets);
        PackagedGraph { root, assets }
    }

    fn capture_slot(engine: &Engine, slot: Entity, assets: &mut Vec<PackagedAsset>) -> PackagedSlot {
        let world = engine.world();
        let mut components = vec![];

        for attached in engine.attached(slot) {
            let Ok(entity) = world.entity(attached) else {
                continue;
            };

            if entity.has::<AssetName>() {
                assets.push(Self::capture_asset(world, attached, &entity));
            } else {
                components.push(Self::capture_component(world, attached, &entity));
            }
        }

        let rig = world
            .get::<&BipedRig>(slot)
            .map(|rig| rig.bones.keys().map(|bone| bone.canonical_name()).collect())
            .unwrap_or_default();

        PackagedSlot {
            name: engine.name(slot).unwrap_or_default(),
            active: world.get::<&Active>(slot).map_or(true, |active| active.0),
            source_id: source_id(world, slot),
            transform: world
                .get::<&Transform>(slot)
                .map(|transform| PackagedTransform::from(&*transform))
                .unwrap_or_else(|_| PackagedTransform::from(&Transform::default())),
            components,
            rig,
            children: engine
                .children(slot)
                .into_iter()
                .map(|child| Self::capture_slot(engine, child, assets))
                .collect(),
        }
    }

    fn capture_component(world: &World, component: Entity, entity: &EntityRef<'_>) -> PackagedComponent {
        let mut packaged = PackagedComponent {
            kind: component_kind(entity),
            enabled: entity.get::<&Enabled>().map_or(true, |enabled| enabled.0),
            source_id: source_id(world, component),
            mesh: None,
            materials: vec![],
            first_person_materials: None,
        };

        if let Some(renderer) = entity.get::<&MeshRenderer>() {
            packaged.mesh = asset_name(world, renderer.mesh);
            packaged.materials = asset_names(world, &renderer.materials);
        }
        if let Some(renderer) = entity.get::<&SkinnedMeshRenderer>() {
            packaged.mesh = asset_name(world, renderer.mesh);
            packaged.materials = asset_names(world, &renderer.materials);
        }
        if let Some(first_person) = entity.get::<&FirstPersonMaterials>() {
            packaged.first_person_materials = Some(asset_names(world, &first_person.0));
        }

        packaged
    }

    fn capture_asset(world: &World, asset: Entity, entity: &EntityRef<'_>) -> PackagedAsset {
        PackagedAsset {
            name: asset_name(world, Some(asset)).unwrap_or_default(),
            kind: asset_kind(entity),
            source_id: source_id(world, asset),
            loaded: entity
                .get::<&AssetLoad>()
                .is_none_or(|load| load.state == LoadState::Ready),
            submeshes: entity.get::<&MeshAsset>().map(|mesh| mesh.mesh.submeshes.len()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Number of slots in the snapshot.
    pub fn slot_count(&self) -> usize {
        fn count(slot: &PackagedSlot) -> usize {
            1 + slot.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::rendering::common::types::{Mesh, Submesh, VertexBuffers};

    #[test]
    fn snapshot_separates_assets_from_components() -> Result<(), anyhow::Error> {
        let mut engine = Engine::default();
        let root = engine.spawn_slot("Avatar", None)?;
        let body = engine.spawn_slot("Body", Some(root))?;
        let assets = engine.spawn_slot("Assets", Some(root))?;

        let mesh = engine.attach_bundle(
            assets,
            (
                AssetName("BodyMesh".to_string()),
                MeshAsset {
                    mesh: Arc::new(Mesh {
                        vertex_buffers: VertexBuffers::default(),
                        submeshes: vec![Submesh::triangles(vec![])],
                        bind_poses: vec![],
                        blendshapes: vec![],
                    }),
                },
            ),
        )?;
        let renderer = engine.attach(
            body,
            MeshRenderer {
                mesh: Some(mesh),
                materials: vec![None],
            },
        )?;
        engine.world_mut().insert_one(renderer, SourceReference { id: 7, is_asset: false })?;
        engine.set_enabled(renderer, false)?;

        let graph = PackagedGraph::capture(&engine, root);
        assert_eq!(graph.slot_count(), 3);
        assert_eq!(graph.assets.len(), 1);
        assert_eq!(graph.assets[0].kind, "Mesh");
        assert_eq!(graph.assets[0].submeshes, Some(1));
        assert!(graph.assets[0].loaded);

        let body = &graph.root.children[0];
        assert_eq!(body.name, "Body");
        assert_eq!(body.components.len(), 1);
        assert_eq!(body.components[0].kind, "MeshRenderer");
        assert_eq!(body.components[0].source_id, Some(7));
        assert_eq!(body.components[0].mesh.as_deref(), Some("BodyMesh"));
        assert!(!body.components[0].enabled);

        let json = graph.to_json()?;
        assert!(json.contains("\"BodyMesh\""));
        Ok(())
    }
}
