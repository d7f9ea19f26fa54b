use hecs::{Entity, World};

use crate::engine::components::hierarchy::{Children, Parent};

pub fn children(world: &World, slot: Entity) -> Vec<Entity> {
    world
        .get::<&Children>(slot)
        .map(|children| children.0.clone())
        .unwrap_or_default()
}

pub fn parent(world: &World, slot: Entity) -> Option<Entity> {
    world.get::<&Parent>(slot).ok().map(|parent| parent.0)
}

/// The slot and everything below it, pre-order, children in their stored order.
pub fn subtree(world: &World, root: Entity) -> Vec<Entity> {
    let mut result = vec![];
    let mut stack = vec![root];

    while let Some(slot) = stack.pop() {
        if !world.contains(slot) {
            continue;
        }

        result.push(slot);
        // reversed, so the first child is popped first
        stack.extend(children(world, slot).into_iter().rev());
    }

    result
}

/// Walks up from `slot` (inclusive).
pub fn ancestors(world: &World, slot: Entity) -> Vec<Entity> {
    let mut result = vec![slot];
    let mut current = slot;
    while let Some(next) = parent(world, current) {
        result.push(next);
        current = next;
    }
    result
}

pub fn is_ancestor(world: &World, ancestor: Entity, slot: Entity) -> bool {
    ancestors(world, slot).contains(&ancestor)
}
