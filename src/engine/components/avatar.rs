use std::collections::BTreeMap;

use glam::Vec3;
use hecs::Entity;
use rigport_files::scene::types::ColliderShape;

use crate::engine::humanoid::HumanBone;

/// The component marking a skeleton root.
#[derive(Debug, Copy, Clone, Default)]
pub struct RigRoot;

/// Asks the runtime to run its skeleton detector over the slot's subtree on the next tick.
#[derive(Debug, Copy, Clone, Default)]
pub struct RigDetectionRequest;

/// The result of skeleton detection. Drives nothing until enabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BipedRig {
    pub bones: BTreeMap<HumanBone, Entity>,
    pub enabled: bool,
}

impl BipedRig {
    pub fn bone(&self, bone: HumanBone) -> Option<Entity> {
        self.bones.get(&bone).copied()
    }

    pub fn missing_required(&self) -> Vec<HumanBone> {
        HumanBone::REQUIRED
            .into_iter()
            .filter(|bone| !self.bones.contains_key(bone))
            .collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AvatarDescriptor {
    pub view_point: Entity,
    pub hide_head_in_first_person: bool,
}

/// Marks the slot the first person camera is attached to.
#[derive(Debug, Copy, Clone, Default)]
pub struct ViewPoint;

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct EyeController {
    pub left: Option<Entity>,
    pub right: Option<Entity>,
}

/// Blendshape index per viseme, in the order the descriptor lists them.
#[derive(Debug, Clone, PartialEq)]
pub struct VisemeDriver {
    pub renderer: Entity,
    pub blendshapes: Vec<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceTrackingDriver {
    pub renderer: Entity,
    /// (expression, blendshape index)
    pub expressions: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicBoneChain {
    pub root: Option<Entity>,
    /// Root and all its descendants that are not excluded, pre-order.
    pub bones: Vec<Entity>,
    pub colliders: Vec<Entity>,
    pub radius: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub gravity: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DynamicBoneCollider {
    pub shape: ColliderShape,
    pub radius: f32,
    pub height: f32,
    pub center: Vec3,
    pub inside_bounds: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FirstPersonVisibility {
    pub visible: bool,
}
