use std::sync::Arc;

use hecs::{Entity, World};
use itertools::Itertools;
use log::{debug, trace};
use rigport_files::scene::types::{Component, ComponentPayload};

use crate::conversion::context::ConversionContext;
use crate::conversion::error::ConversionError;
use crate::conversion::work::DeferredWork;
use crate::engine::assets::{AssetName, MeshAsset};
use crate::engine::components::avatar::FirstPersonVisibility;
use crate::engine::components::hierarchy::Enabled;
use crate::engine::components::render::{FirstPersonMaterials, MeshRenderer, SkinnedMeshRenderer};
use crate::engine::hierarchy;
use crate::rendering::common::visibility_partitioner::{PartitionResult, VisibilityMeshPartitioner};

pub fn build_first_person_visibility(
    ctx: &mut ConversionContext<'_>,
    slot: Entity,
    component: &Component,
) -> Result<Entity, ConversionError> {
    let ComponentPayload::FirstPersonVisibility(data) = &component.payload else {
        return Err(ConversionError::UnknownType {
            tag: component.payload.type_tag().to_string(),
        });
    };

    let flag = ctx.engine.attach(slot, FirstPersonVisibility { visible: data.visible })?;
    Ok(flag)
}

/// An enabled visibility flag directly on `slot`.
fn explicit_flag(ctx: &ConversionContext<'_>, slot: Entity) -> Option<bool> {
    let world = ctx.engine.world();
    ctx.engine.attached(slot).into_iter().find_map(|component| {
        let enabled = world.get::<&Enabled>(component).map_or(true, |enabled| enabled.0);
        if !enabled {
            return None;
        }
        world
            .get::<&FirstPersonVisibility>(component)
            .ok()
            .map(|flag| flag.visible)
    })
}

/// The nearest flag on the bone or its ancestors decides; a slot hidden by the avatar (the head)
/// hides its subtree unless a flag further down says otherwise.
pub fn bone_visible_in_first_person(ctx: &ConversionContext<'_>, bone: Entity) -> bool {
    for slot in hierarchy::ancestors(ctx.engine.world(), bone) {
        if let Some(visible) = explicit_flag(ctx, slot) {
            return visible;
        }
        if ctx.hidden_in_first_person.contains(&slot) {
            return false;
        }
    }

    true
}

fn is_shared(world: &World, mesh: Entity, renderer: Entity) -> bool {
    let skinned = world
        .query::<&SkinnedMeshRenderer>()
        .iter()
        .any(|(other, r)| other != renderer && r.mesh == Some(mesh));
    let rigid = world
        .query::<&MeshRenderer>()
        .iter()
        .any(|(_, r)| r.mesh == Some(mesh));
    skinned || rigid
}

/// Splits the renderer's mesh by bone visibility and gives the renderer a first person material set
/// that hides the split off and fully hidden submeshes.
pub fn partition_renderer(ctx: &mut ConversionContext<'_>, renderer: Entity) -> Result<(), ConversionError> {
    let (mesh_entity, bones) = {
        let live = ctx.engine.world().get::<&SkinnedMeshRenderer>(renderer)?;
        (live.mesh, live.bones.clone())
    };
    let Some(mesh_entity) = mesh_entity else {
        return Ok(());
    };

    let bone_visible = bones
        .iter()
        .map(|bone| bone.is_none_or(|bone| bone_visible_in_first_person(ctx, bone)))
        .collect_vec();
    if bone_visible.iter().all(|visible| *visible) {
        trace!("Renderer {:?} is fully visible in first person", renderer);
        return Ok(());
    }

    let (name, source) = {
        let world = ctx.engine.world();
        let name = world
            .get::<&AssetName>(mesh_entity)
            .map(|name| name.0.clone())
            .unwrap_or_default();
        (name, world.get::<&MeshAsset>(mesh_entity)?.mesh.clone())
    };

    // partition a copy, whoever else draws the original must not see the split
    let mut mesh = (*source).clone();
    let result = VisibilityMeshPartitioner::partition(&mut mesh, &bone_visible, ctx.settings.visibility_epsilon)
        .map_err(|source| ConversionError::MalformedMeshIndex {
            mesh: name.clone(),
            source,
        })?;
    if !result.misaligned_submeshes.is_empty() {
        ctx.report.warn(format!(
            "Mesh {} has submeshes {:?} with a partial last primitive, they are not split",
            name, result.misaligned_submeshes
        ));
    }
    if result.is_noop() {
        trace!("No geometry of {:?} is weighted to hidden bones", renderer);
        return Ok(());
    }

    let submesh_count = mesh.submeshes.len();
    if result.clone_to_original.is_empty() {
        // the geometry stays as it is, only the first-person materials change
        apply_materials(ctx, renderer, submesh_count, &result)?;
        debug!(
            "Hiding {} submeshes of {} in first person, nothing to split",
            result.always_invisible.len(),
            name
        );
        return Ok(());
    }

    let target = if is_shared(ctx.engine.world(), mesh_entity, renderer) {
        debug!("Mesh {} is shared, duplicating it for {:?}", name, renderer);
        let duplicate_name = ctx.unique_asset_name(&format!("{}_FirstPerson", name), None);
        let duplicate = ctx.engine.attach_bundle(
            ctx.assets_root,
            (
                AssetName(duplicate_name),
                MeshAsset { mesh: Arc::new(mesh) },
            ),
        )?;
        ctx.engine
            .world()
            .get::<&mut SkinnedMeshRenderer>(renderer)?
            .mesh = Some(duplicate);
        duplicate
    } else {
        ctx.engine.world().get::<&mut MeshAsset>(mesh_entity)?.mesh = Arc::new(mesh);
        mesh_entity
    };

    apply_materials(ctx, renderer, submesh_count, &result)?;

    let (world, pipeline) = ctx.engine.world_and_pipeline();
    pipeline.submit_mesh_upload(world, target)?;
    ctx.defer(DeferredWork::AwaitAsset {
        asset: target,
        required: true,
    })?;

    debug!(
        "Split {} submeshes of {} off for first person, {} hidden entirely",
        result.clone_to_original.len(),
        name,
        result.always_invisible.len()
    );
    Ok(())
}

fn apply_materials(
    ctx: &mut ConversionContext<'_>,
    renderer: Entity,
    submesh_count: usize,
    result: &PartitionResult,
) -> Result<(), ConversionError> {
    let invisible = ctx.invisible_material()?;
    let original_count = submesh_count - result.clone_to_original.len();

    let materials = {
        let mut live = ctx.engine.world().get::<&mut SkinnedMeshRenderer>(renderer)?;
        if live.materials.len() > original_count {
            trace!(
                "Renderer {:?} has {} materials for {} submeshes, dropping the extra ones",
                renderer,
                live.materials.len(),
                original_count
            );
            live.materials.truncate(original_count);
        }
        live.materials.resize(submesh_count, None);
        for (&clone, &original) in &result.clone_to_original {
            live.materials[clone] = live.materials[original];
        }
        live.materials.clone()
    };

    let mut first_person = materials;
    for &index in result.always_invisible.iter().chain(result.clone_to_original.keys()) {
        first_person[index] = Some(invisible);
    }

    ctx.engine
        .world_mut()
        .insert_one(renderer, FirstPersonMaterials(first_person))?;
    Ok(())
}
