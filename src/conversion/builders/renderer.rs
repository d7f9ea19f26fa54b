use hecs::Entity;
use itertools::Itertools;
use log::debug;
use rigport_files::common::types::AssetId;
use rigport_files::scene::types::{Component, ComponentPayload, SkinnedMeshRendererData};

use crate::conversion::context::ConversionContext;
use crate::conversion::error::ConversionError;
use crate::conversion::work::DeferredWork;
use crate::engine::assets::{MaterialAsset, MeshAsset};
use crate::engine::components::hierarchy::Slot;
use crate::engine::components::render::{MeshRenderer, SkinnedMeshRenderer};

fn unexpected(component: &Component) -> ConversionError {
    ConversionError::UnknownType {
        tag: component.payload.type_tag().to_string(),
    }
}

/// Assets were all built before the first node, so these resolve right away.
fn resolve_mesh_and_materials(
    ctx: &mut ConversionContext<'_>,
    mesh: AssetId,
    materials: &[AssetId],
) -> Result<(Option<Entity>, Vec<Option<Entity>>), ConversionError> {
    let world = ctx.engine.world();
    let mesh = ctx.registry.resolve::<MeshAsset, _>(world, mesh)?;
    let resolved = materials
        .iter()
        .map(|&id| ctx.registry.resolve_weak::<MaterialAsset, _>(world, id))
        .collect_vec();

    let missing = materials
        .iter()
        .zip(&resolved)
        .filter(|(id, material)| !id.is_null() && material.is_none())
        .map(|(id, _)| id.to_string())
        .collect_vec();
    if !missing.is_empty() {
        ctx.report
            .warn(format!("Renderer materials {} are missing, those slots stay empty", missing.join(", ")));
    }

    Ok((mesh, resolved))
}

pub fn build_mesh_renderer(
    ctx: &mut ConversionContext<'_>,
    slot: Entity,
    component: &Component,
) -> Result<Entity, ConversionError> {
    let ComponentPayload::MeshRenderer(data) = &component.payload else {
        return Err(unexpected(component));
    };

    let (mesh, materials) = resolve_mesh_and_materials(ctx, data.mesh, &data.materials)?;
    let renderer = ctx.engine.attach(slot, MeshRenderer { mesh, materials })?;
    Ok(renderer)
}

pub fn build_skinned_mesh_renderer(
    ctx: &mut ConversionContext<'_>,
    slot: Entity,
    component: &Component,
) -> Result<Entity, ConversionError> {
    let ComponentPayload::SkinnedMeshRenderer(data) = &component.payload else {
        return Err(unexpected(component));
    };

    let (mesh, materials) = resolve_mesh_and_materials(ctx, data.mesh, &data.materials)?;
    let renderer = ctx.engine.attach(
        slot,
        SkinnedMeshRenderer {
            mesh,
            materials,
            bones: vec![],
            root_bone: None,
            blendshape_weights: data.blendshape_weights.clone(),
        },
    )?;

    // bones are nodes, most of which don't exist yet
    ctx.defer(DeferredWork::BindSkinnedMesh {
        renderer,
        data: data.clone(),
    })?;
    ctx.defer(DeferredWork::PartitionFirstPerson { renderer })?;

    Ok(renderer)
}

pub fn bind_skinned_mesh(
    ctx: &mut ConversionContext<'_>,
    renderer: Entity,
    data: &SkinnedMeshRendererData,
) -> Result<(), ConversionError> {
    let world = ctx.engine.world();
    let bones = data
        .bones
        .iter()
        .map(|&id| ctx.registry.resolve_weak::<Slot, _>(world, id))
        .collect_vec();
    let root_bone = ctx.registry.resolve_weak::<Slot, _>(world, data.root_bone);

    let missing = data
        .bones
        .iter()
        .zip(&bones)
        .filter(|(_, bone)| bone.is_none())
        .count();
    if missing > 0 {
        ctx.report.warn(format!(
            "{} of {} bones of renderer {:?} could not be found, vertices weighted to them stay in bind pose",
            missing,
            data.bones.len(),
            renderer
        ));
    }

    let mesh = ctx.engine.world().get::<&SkinnedMeshRenderer>(renderer)?.mesh;
    if let Some(mesh) = mesh {
        let bind_poses = ctx.engine.world().get::<&MeshAsset>(mesh)?.mesh.bone_count();
        if bind_poses != bones.len() {
            ctx.report.warn(format!(
                "Renderer {:?} has {} bones, but its mesh has {} bind poses",
                renderer,
                bones.len(),
                bind_poses
            ));
        }
    }

    debug!("Bound {} bones to renderer {:?}", bones.len() - missing, renderer);
    let mut live = ctx.engine.world().get::<&mut SkinnedMeshRenderer>(renderer)?;
    live.bones = bones;
    live.root_bone = root_bone;
    Ok(())
}
