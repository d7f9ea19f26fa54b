use std::collections::HashSet;

use glam::Vec3;
use hecs::Entity;
use itertools::Itertools;
use log::trace;
use rigport_files::scene::types::{Component, ComponentPayload, DynamicBoneChainData};

use crate::conversion::context::ConversionContext;
use crate::conversion::error::ConversionError;
use crate::conversion::work::DeferredWork;
use crate::engine::components::avatar::{DynamicBoneChain, DynamicBoneCollider};
use crate::engine::components::hierarchy::{AttachedTo, Slot};

fn unexpected(component: &Component) -> ConversionError {
    ConversionError::UnknownType {
        tag: component.payload.type_tag().to_string(),
    }
}

pub fn build_chain(ctx: &mut ConversionContext<'_>, slot: Entity, component: &Component) -> Result<Entity, ConversionError> {
    let ComponentPayload::DynamicBoneChain(data) = &component.payload else {
        return Err(unexpected(component));
    };

    let chain = ctx.engine.attach(
        slot,
        DynamicBoneChain {
            root: None,
            bones: vec![],
            colliders: vec![],
            radius: data.radius,
            stiffness: data.stiffness,
            damping: data.damping,
            gravity: Vec3::from_array(data.gravity),
        },
    )?;

    // root, exclusions and colliders may all be further down the tree
    ctx.defer(DeferredWork::WireDynamicBoneChain {
        chain,
        data: data.clone(),
    })?;

    Ok(chain)
}

pub fn build_collider(
    ctx: &mut ConversionContext<'_>,
    slot: Entity,
    component: &Component,
) -> Result<Entity, ConversionError> {
    let ComponentPayload::DynamicBoneCollider(data) = &component.payload else {
        return Err(unexpected(component));
    };

    let collider = ctx.engine.attach(
        slot,
        DynamicBoneCollider {
            shape: data.shape,
            radius: data.radius,
            height: data.height,
            center: Vec3::from_array(data.center),
            inside_bounds: data.inside_bounds,
        },
    )?;
    Ok(collider)
}

/// Resolves the chain's references and expands it to the root's subtree minus excluded branches.
/// A chain without a root hangs off the slot it is attached to.
pub fn wire_chain(ctx: &mut ConversionContext<'_>, chain: Entity, data: &DynamicBoneChainData) -> Result<(), ConversionError> {
    let owner = ctx.engine.world().get::<&AttachedTo>(chain)?.0;
    let world = ctx.engine.world();

    let root = if data.root.is_null() {
        Some(owner)
    } else {
        ctx.registry.resolve_weak::<Slot, _>(world, data.root)
    };

    let excluded: HashSet<Entity> = data
        .exclusions
        .iter()
        .filter_map(|&id| ctx.registry.resolve_weak::<Slot, _>(world, id))
        .collect();

    let colliders = data
        .colliders
        .iter()
        .map(|&id| (id, ctx.registry.resolve_weak::<DynamicBoneCollider, _>(world, id)))
        .collect_vec();

    let bones = match root {
        Some(root) => collect_chain(ctx, root, &excluded),
        None => {
            ctx.report
                .warn(format!("Dynamic bone chain {:?} points at missing root {}", chain, data.root));
            vec![]
        }
    };

    for (id, collider) in &colliders {
        if collider.is_none() {
            ctx.report
                .warn(format!("Dynamic bone chain {:?} references missing collider {}", chain, id));
        }
    }

    trace!("Dynamic bone chain {:?} covers {} bones", chain, bones.len());
    let mut live = ctx.engine.world().get::<&mut DynamicBoneChain>(chain)?;
    live.root = root;
    live.bones = bones;
    live.colliders = colliders.into_iter().filter_map(|(_, collider)| collider).collect();
    Ok(())
}

fn collect_chain(ctx: &ConversionContext<'_>, root: Entity, excluded: &HashSet<Entity>) -> Vec<Entity> {
    let mut bones = vec![];
    let mut stack = vec![root];

    while let Some(bone) = stack.pop() {
        if excluded.contains(&bone) {
            continue;
        }
        bones.push(bone);
        stack.extend(ctx.engine.children(bone).into_iter().rev());
    }

    bones
}
