use std::collections::BTreeMap;

use hecs::Entity;
use log::{debug, info};
use rigport_files::scene::types::{Component, ComponentPayload, HumanoidBoneBinding};

use crate::conversion::context::ConversionContext;
use crate::conversion::error::ConversionError;
use crate::conversion::rig::renamer::RigBoneRenamer;
use crate::conversion::work::DeferredWork;
use crate::engine::components::avatar::{BipedRig, RigDetectionRequest, RigRoot};
use crate::engine::components::hierarchy::Slot;
use crate::engine::humanoid::HumanBone;

pub fn build_humanoid_rig(
    ctx: &mut ConversionContext<'_>,
    slot: Entity,
    component: &Component,
) -> Result<Entity, ConversionError> {
    let ComponentPayload::HumanoidRig(data) = &component.payload else {
        return Err(ConversionError::UnknownType {
            tag: component.payload.type_tag().to_string(),
        });
    };

    let marker = ctx.engine.attach(slot, RigRoot)?;
    ctx.defer(DeferredWork::EnterRigScope {
        rig_root: slot,
        bones: data.bones.clone(),
    })?;

    Ok(marker)
}

/// Role names to live bones. Unknown roles and missing nodes are reported, the first binding of a role wins.
fn bone_map(ctx: &mut ConversionContext<'_>, bindings: &[HumanoidBoneBinding]) -> BTreeMap<HumanBone, Entity> {
    let mut bones = BTreeMap::new();

    for binding in bindings {
        let Some(bone) = HumanBone::parse_role(&binding.bone) else {
            ctx.report
                .warn(format!("Unknown humanoid bone role {}, ignoring it", binding.bone));
            continue;
        };

        let Some(slot) = ctx.registry.resolve_weak::<Slot, _>(ctx.engine.world(), binding.node) else {
            ctx.report
                .warn(format!("Bone {} points at {}, which does not exist", bone, binding.node));
            continue;
        };

        if bones.contains_key(&bone) {
            ctx.report
                .warn(format!("Bone {} is assigned twice, keeping the first", bone));
            continue;
        }

        bones.insert(bone, slot);
    }

    bones
}

/// Renames the skeleton so the runtime detects exactly our bones, then asks for detection. The
/// detector runs on the tick after this item, before any avatar setup reads the rig.
pub fn enter_rig_scope(
    ctx: &mut ConversionContext<'_>,
    rig_root: Entity,
    bindings: &[HumanoidBoneBinding],
) -> Result<(), ConversionError> {
    let bones = bone_map(ctx, bindings);
    let scope = RigBoneRenamer::enter_scope(ctx.engine, rig_root, &bones)?;
    ctx.open_rig_scope(scope);

    ctx.engine
        .world_mut()
        .insert_one(rig_root, RigDetectionRequest)?;
    ctx.defer(DeferredWork::ExitRigScope { rig_root })?;

    debug!("Requested rig detection below {:?} with {} known bones", rig_root, bones.len());
    Ok(())
}

pub fn exit_rig_scope(ctx: &mut ConversionContext<'_>, rig_root: Entity) -> Result<(), ConversionError> {
    if let Some(restored) = ctx.close_rig_scope(rig_root) {
        debug!("Restored {} names below {:?}", restored, rig_root);
    }

    let missing = {
        let Ok(mut rig) = ctx.engine.world().get::<&mut BipedRig>(rig_root) else {
            ctx.report
                .warn(format!("No rig was detected below {:?}, it stays undriven", rig_root));
            return Ok(());
        };
        rig.enabled = true;
        rig.missing_required()
    };

    if missing.is_empty() {
        info!("Humanoid rig below {:?} is complete", rig_root);
    } else {
        let names = missing.iter().map(HumanBone::canonical_name).collect::<Vec<_>>();
        ctx.report.warn(format!(
            "Humanoid rig below {:?} is missing required bones: {}",
            rig_root,
            names.join(", ")
        ));
    }

    Ok(())
}
