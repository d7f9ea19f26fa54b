use hecs::{Entity, World};
use itertools::Itertools;
use log::{debug, warn};

use crate::engine::components::avatar::{BipedRig, RigDetectionRequest};
use crate::engine::components::hierarchy::Name;
use crate::engine::hierarchy;
use crate::engine::humanoid::HumanoidDetector;

/// Answers `RigDetectionRequest`s: runs the detector over the names below the requesting slot and
/// replaces the request with a disabled `BipedRig`.
pub struct RigDetectionSystem {}

impl RigDetectionSystem {
    pub fn update(world: &mut World) {
        let requests = world
            .query_mut::<&RigDetectionRequest>()
            .into_iter()
            .map(|(entity, _)| entity)
            .collect_vec();

        for root in requests {
            let candidates = hierarchy::subtree(world, root)
                .into_iter()
                .filter_map(|slot| world.get::<&Name>(slot).ok().map(|name| (slot, name.0.clone())))
                .collect_vec();

            let bones = HumanoidDetector::detect(&candidates);
            debug!("Detected {} humanoid bones below {:?}", bones.len(), root);

            if let Err(e) = Self::replace_request(world, root, BipedRig { bones, enabled: false }) {
                warn!("Could not store the detected rig on {:?}: {}", root, e);
            }
        }
    }

    fn replace_request(world: &mut World, root: Entity, rig: BipedRig) -> Result<(), hecs::ComponentError> {
        world.remove_one::<RigDetectionRequest>(root)?;
        world.insert_one(root, rig)?;
        Ok(())
    }
}
