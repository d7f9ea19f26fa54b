use std::sync::Arc;

use glam::Vec3;
use hecs::Entity;
use itertools::Itertools;
use log::debug;
use rigport_files::common::types::ObjectId;
use rigport_files::scene::types::{AvatarDescriptorData, Component, ComponentPayload};

use crate::conversion::context::ConversionContext;
use crate::conversion::error::ConversionError;
use crate::conversion::work::DeferredWork;
use crate::engine::assets::MeshAsset;
use crate::engine::components::avatar::{
    AvatarDescriptor, BipedRig, EyeController, FaceTrackingDriver, ViewPoint, VisemeDriver,
};
use crate::engine::components::hierarchy::{AttachedTo, Slot, Transform};
use crate::engine::components::render::SkinnedMeshRenderer;
use crate::engine::humanoid::{HumanBone, Side};
use crate::rendering::common::types::Mesh;

pub fn build_avatar_descriptor(
    ctx: &mut ConversionContext<'_>,
    slot: Entity,
    component: &Component,
) -> Result<Entity, ConversionError> {
    let ComponentPayload::AvatarDescriptor(data) = &component.payload else {
        return Err(ConversionError::UnknownType {
            tag: component.payload.type_tag().to_string(),
        });
    };

    let view_point = ctx.engine.spawn_slot("ViewPoint", Some(slot))?;
    ctx.engine.set_transform(
        view_point,
        Transform {
            translation: Vec3::from_array(data.view_position),
            ..Transform::default()
        },
    )?;
    ctx.engine.world_mut().insert_one(view_point, ViewPoint)?;

    let descriptor = ctx.engine.attach(
        slot,
        AvatarDescriptor {
            view_point,
            hide_head_in_first_person: data.hide_head_in_first_person && ctx.settings.hide_head_in_first_person,
        },
    )?;

    // needs the detected rig
    ctx.defer(DeferredWork::SetupAvatar {
        descriptor,
        data: data.clone(),
    })?;

    Ok(descriptor)
}

/// The rig detected on `slot` or the first one below it.
fn find_rig(ctx: &ConversionContext<'_>, slot: Entity) -> Option<BipedRig> {
    ctx.engine
        .subtree(slot)
        .into_iter()
        .find_map(|candidate| ctx.engine.world().get::<&BipedRig>(candidate).ok().map(|rig| (*rig).clone()))
}

/// The mesh a skinned renderer draws, for blendshape lookups.
fn renderer_mesh(ctx: &ConversionContext<'_>, renderer: Entity) -> Option<Arc<Mesh>> {
    let world = ctx.engine.world();
    let mesh = world.get::<&SkinnedMeshRenderer>(renderer).ok()?.mesh?;
    let mesh = world.get::<&MeshAsset>(mesh).ok()?.mesh.clone();
    Some(mesh)
}

fn resolve_renderer(ctx: &mut ConversionContext<'_>, id: ObjectId, purpose: &str) -> Option<Entity> {
    let renderer = ctx
        .registry
        .resolve_weak::<SkinnedMeshRenderer, _>(ctx.engine.world(), id);
    if renderer.is_none() {
        ctx.report
            .warn(format!("The {} renderer {} does not exist", purpose, id));
    }
    renderer
}

pub fn setup_avatar(
    ctx: &mut ConversionContext<'_>,
    descriptor: Entity,
    data: &AvatarDescriptorData,
) -> Result<(), ConversionError> {
    let slot = ctx.engine.world().get::<&AttachedTo>(descriptor)?.0;
    let hide_head = ctx.engine.world().get::<&AvatarDescriptor>(descriptor)?.hide_head_in_first_person;
    let rig = find_rig(ctx, slot);
    if rig.is_none() {
        ctx.report
            .warn(format!("Avatar on {:?} has no humanoid rig", slot));
    }

    let rig_bone = |bone: HumanBone| rig.as_ref().and_then(|rig| rig.bone(bone));

    if hide_head {
        match rig_bone(HumanBone::Head) {
            Some(head) => {
                ctx.hidden_in_first_person.insert(head);
            }
            None => ctx
                .report
                .warn("The head should be hidden in first person, but there is no head bone".to_string()),
        }
    }

    let world = ctx.engine.world();
    let left = ctx
        .registry
        .resolve_weak::<Slot, _>(world, data.left_eye)
        .or_else(|| rig_bone(HumanBone::Eye(Side::Left)));
    let right = ctx
        .registry
        .resolve_weak::<Slot, _>(world, data.right_eye)
        .or_else(|| rig_bone(HumanBone::Eye(Side::Right)));
    if left.is_some() || right.is_some() {
        ctx.engine.attach(slot, EyeController { left, right })?;
    }

    if let Some(visemes) = &data.visemes {
        if let Some(renderer) = resolve_renderer(ctx, visemes.renderer, "viseme") {
            let indices = match renderer_mesh(ctx, renderer) {
                Some(mesh) => visemes
                    .blendshapes
                    .iter()
                    .map(|name| mesh.blendshape_index(name))
                    .collect_vec(),
                None => vec![None; visemes.blendshapes.len()],
            };

            let missing = visemes
                .blendshapes
                .iter()
                .zip(&indices)
                .filter(|(name, index)| !name.is_empty() && index.is_none())
                .map(|(name, _)| name.as_str())
                .collect_vec();
            if !missing.is_empty() {
                ctx.report
                    .warn(format!("Viseme blendshapes not found on the mesh: {}", missing.join(", ")));
            }

            ctx.engine.attach(
                slot,
                VisemeDriver {
                    renderer,
                    blendshapes: indices,
                },
            )?;
        }
    }

    if let Some(face_tracking) = &data.face_tracking {
        if let Some(renderer) = resolve_renderer(ctx, face_tracking.renderer, "face tracking") {
            let mesh = renderer_mesh(ctx, renderer);
            let mut expressions = vec![];
            for binding in &face_tracking.expressions {
                match mesh.as_ref().and_then(|mesh| mesh.blendshape_index(&binding.blendshape)) {
                    Some(index) => expressions.push((binding.expression.clone(), index)),
                    None => ctx.report.warn(format!(
                        "Expression {} maps to blendshape {}, which the mesh does not have",
                        binding.expression, binding.blendshape
                    )),
                }
            }

            ctx.engine.attach(slot, FaceTrackingDriver { renderer, expressions })?;
        }
    }

    debug!("Avatar on {:?} set up (rig: {})", slot, rig.is_some());
    Ok(())
}
