//! A small live runtime: one mutation thread advancing in ticks, a tree of slots with components
//! attached to them, and an asset pipeline that works in the background.

use std::time::Duration;

use hecs::{Component, DynamicBundle, Entity, World};
use itertools::Itertools;
use log::trace;
use thiserror::Error;

use crate::engine::assets::AssetPipeline;
use crate::engine::components::hierarchy::{
    Active, AttachedComponents, AttachedTo, Children, Enabled, Name, Parent, Slot, Transform,
};
use crate::engine::systems::rig_detection_system::RigDetectionSystem;
use crate::engine::systems::transform_system::TransformSystem;

pub mod assets;
pub mod components;
pub mod hierarchy;
pub mod humanoid;
pub mod systems;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Component(#[from] hecs::ComponentError),
    #[error(transparent)]
    NoSuchEntity(#[from] hecs::NoSuchEntity),
    #[error("{0:?} is not a slot")]
    NotASlot(Entity),
    #[error("Parenting {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle { child: Entity, parent: Entity },
}

pub struct Engine {
    world: World,
    pipeline: AssetPipeline,
    tick: u64,
    tick_interval: Duration,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(Duration::ZERO)
    }
}

impl Engine {
    /// A zero interval only yields to the scheduler between ticks.
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            world: World::new(),
            pipeline: AssetPipeline::new(),
            tick: 0,
            tick_interval,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn pipeline(&self) -> &AssetPipeline {
        &self.pipeline
    }

    /// World and pipeline at once, for submitting work.
    pub fn world_and_pipeline(&mut self) -> (&mut World, &AssetPipeline) {
        (&mut self.world, &self.pipeline)
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Lets background work progress, then runs the systems.
    pub async fn tick(&mut self) {
        if self.tick_interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.tick_interval).await;
        }

        self.pipeline.poll(&mut self.world);
        RigDetectionSystem::update(&mut self.world);
        TransformSystem::update(&mut self.world);
        self.tick += 1;
    }

    pub fn spawn_slot(&mut self, name: impl Into<String>, parent: Option<Entity>) -> Result<Entity, EngineError> {
        let slot = self.world.spawn((
            Slot,
            Name(name.into()),
            Transform::default(),
            Active(true),
            Children::default(),
            AttachedComponents::default(),
        ));

        if let Some(parent) = parent {
            if let Err(e) = self.set_parent(slot, Some(parent)) {
                let _ = self.world.despawn(slot);
                return Err(e);
            }
        }

        Ok(slot)
    }

    pub fn is_slot(&self, entity: Entity) -> bool {
        self.world
            .entity(entity)
            .is_ok_and(|entity| entity.has::<Slot>())
    }

    /// Moves `child` to the end of `parent`'s children, or makes it a root for `None`.
    pub fn set_parent(&mut self, child: Entity, parent: Option<Entity>) -> Result<(), EngineError> {
        if !self.is_slot(child) {
            return Err(EngineError::NotASlot(child));
        }

        if let Some(parent) = parent {
            if !self.is_slot(parent) {
                return Err(EngineError::NotASlot(parent));
            }

            if hierarchy::is_ancestor(&self.world, child, parent) {
                return Err(EngineError::HierarchyCycle { child, parent });
            }
        }

        if let Some(old_parent) = hierarchy::parent(&self.world, child) {
            if let Ok(mut children) = self.world.get::<&mut Children>(old_parent) {
                children.0.retain(|&c| c != child);
            }
        }

        match parent {
            Some(parent) => {
                self.world.get::<&mut Children>(parent)?.0.push(child);
                self.world.insert_one(child, Parent(parent))?;
            }
            None => {
                let _ = self.world.remove_one::<Parent>(child);
            }
        }

        Ok(())
    }

    pub fn attach<C: Component>(&mut self, slot: Entity, component: C) -> Result<Entity, EngineError> {
        self.attach_bundle(slot, (component,))
    }

    /// Spawns a component entity made of `bundle` on `slot`.
    pub fn attach_bundle(&mut self, slot: Entity, bundle: impl DynamicBundle) -> Result<Entity, EngineError> {
        if !self.is_slot(slot) {
            return Err(EngineError::NotASlot(slot));
        }

        let entity = self.world.spawn(bundle);
        self.world.insert(entity, (AttachedTo(slot), Enabled(true)))?;
        self.world.get::<&mut AttachedComponents>(slot)?.0.push(entity);
        Ok(entity)
    }

    /// Despawns a single component entity and unlinks it from its slot.
    pub fn detach(&mut self, component: Entity) -> Result<(), EngineError> {
        let slot = self.world.get::<&AttachedTo>(component)?.0;
        if let Ok(mut attached) = self.world.get::<&mut AttachedComponents>(slot) {
            attached.0.retain(|&c| c != component);
        }
        self.world.despawn(component)?;
        Ok(())
    }

    pub fn attached(&self, slot: Entity) -> Vec<Entity> {
        self.world
            .get::<&AttachedComponents>(slot)
            .map(|attached| attached.0.clone())
            .unwrap_or_default()
    }

    /// The first component on `slot` carrying a `C`.
    pub fn find_attached<C: Component>(&self, slot: Entity) -> Option<Entity> {
        self.attached(slot).into_iter().find(|&component| {
            self.world
                .entity(component)
                .is_ok_and(|component| component.has::<C>())
        })
    }

    pub fn children(&self, slot: Entity) -> Vec<Entity> {
        hierarchy::children(&self.world, slot)
    }

    pub fn parent(&self, slot: Entity) -> Option<Entity> {
        hierarchy::parent(&self.world, slot)
    }

    /// Direct child by name.
    pub fn find_child(&self, slot: Entity, name: &str) -> Option<Entity> {
        self.children(slot)
            .into_iter()
            .find(|&child| self.name(child).as_deref() == Some(name))
    }

    /// Everything below `slot`, pre-order, without `slot` itself.
    pub fn descendants(&self, slot: Entity) -> Vec<Entity> {
        hierarchy::subtree(&self.world, slot).into_iter().skip(1).collect_vec()
    }

    /// `slot` followed by its descendants.
    pub fn subtree(&self, slot: Entity) -> Vec<Entity> {
        hierarchy::subtree(&self.world, slot)
    }

    pub fn name(&self, slot: Entity) -> Option<String> {
        self.world.get::<&Name>(slot).ok().map(|name| name.0.clone())
    }

    pub fn rename(&mut self, slot: Entity, name: impl Into<String>) -> Result<(), EngineError> {
        self.world.get::<&mut Name>(slot)?.0 = name.into();
        Ok(())
    }

    pub fn set_transform(&mut self, slot: Entity, transform: Transform) -> Result<(), EngineError> {
        *self.world.get::<&mut Transform>(slot)? = transform;
        Ok(())
    }

    pub fn set_active(&mut self, slot: Entity, active: bool) -> Result<(), EngineError> {
        self.world.get::<&mut Active>(slot)?.0 = active;
        Ok(())
    }

    pub fn set_enabled(&mut self, component: Entity, enabled: bool) -> Result<(), EngineError> {
        self.world.get::<&mut Enabled>(component)?.0 = enabled;
        Ok(())
    }

    /// Despawns `slot`, its descendants and every component attached to any of them.
    /// Returns the number of despawned entities.
    pub fn destroy(&mut self, slot: Entity) -> usize {
        if let Some(parent) = self.parent(slot) {
            if let Ok(mut children) = self.world.get::<&mut Children>(parent) {
                children.0.retain(|&c| c != slot);
            }
        }

        let mut doomed = vec![];
        for node in self.subtree(slot) {
            doomed.extend(self.attached(node));
            doomed.push(node);
        }

        let despawned = doomed
            .into_iter()
            .filter(|&entity| self.world.despawn(entity).is_ok())
            .count();
        trace!("Destroyed {:?} ({} entities)", slot, despawned);
        despawned
    }
}
