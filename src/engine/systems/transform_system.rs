use glam::Affine3A;
use hecs::{Entity, Without, World};

use crate::engine::components::hierarchy::{GlobalTransform, Parent, Slot, Transform};
use crate::engine::hierarchy;

/// Recomputes `GlobalTransform` for every slot from the root slots down.
pub struct TransformSystem {}

impl TransformSystem {
    pub fn update(world: &mut World) {
        profiling::scope!("TransformSystem::update");

        let roots: Vec<Entity> = world
            .query_mut::<Without<&Slot, &Parent>>()
            .into_iter()
            .map(|(entity, _)| entity)
            .collect();

        let mut globals = Vec::<(Entity, Affine3A)>::new();
        let mut stack = roots.into_iter().map(|root| (root, Affine3A::IDENTITY)).collect::<Vec<_>>();

        while let Some((slot, parent_global)) = stack.pop() {
            let local = world
                .get::<&Transform>(slot)
                .map(|transform| transform.to_affine())
                .unwrap_or(Affine3A::IDENTITY);
            let global = parent_global * local;

            globals.push((slot, global));
            stack.extend(hierarchy::children(world, slot).into_iter().map(|child| (child, global)));
        }

        for (slot, global) in globals {
            // slots are never despawned while the system runs
            let _ = world.insert_one(slot, GlobalTransform(global));
        }
    }
}
