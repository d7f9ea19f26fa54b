use std::any::type_name;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use hecs::{Component, Entity, World};
use log::warn;
use rigport_files::common::types::{AssetId, ObjectId};

use crate::conversion::error::ConversionError;

/// A wire identifier kind. Objects (nodes and components) and assets live in separate tables.
pub trait Identifier: Copy + Eq + Hash + Display {
    fn is_null(&self) -> bool;
    fn table(registry: &IdentifierRegistry) -> &HashMap<Self, Entity>;
    fn table_mut(registry: &mut IdentifierRegistry) -> &mut HashMap<Self, Entity>;
}

impl Identifier for ObjectId {
    fn is_null(&self) -> bool {
        ObjectId::is_null(self)
    }

    fn table(registry: &IdentifierRegistry) -> &HashMap<Self, Entity> {
        &registry.objects
    }

    fn table_mut(registry: &mut IdentifierRegistry) -> &mut HashMap<Self, Entity> {
        &mut registry.objects
    }
}

impl Identifier for AssetId {
    fn is_null(&self) -> bool {
        AssetId::is_null(self)
    }

    fn table(registry: &IdentifierRegistry) -> &HashMap<Self, Entity> {
        &registry.assets
    }

    fn table_mut(registry: &mut IdentifierRegistry) -> &mut HashMap<Self, Entity> {
        &mut registry.assets
    }
}

fn short_type_name<C>() -> &'static str {
    let full = type_name::<C>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Maps wire identifiers to live entities. An identifier maps to at most one entity, several
/// identifiers may share one (de-duplicated assets).
#[derive(Debug, Default, Clone)]
pub struct IdentifierRegistry {
    objects: HashMap<ObjectId, Entity>,
    assets: HashMap<AssetId, Entity>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        IdentifierRegistry::default()
    }

    pub fn register<I: Identifier>(&mut self, id: I, entity: Entity) -> Result<(), ConversionError> {
        if id.is_null() {
            return Err(ConversionError::NullIdentifier);
        }

        let table = I::table_mut(self);
        if table.contains_key(&id) {
            return Err(ConversionError::DuplicateIdentifier { id: id.to_string() });
        }

        table.insert(id, entity);
        Ok(())
    }

    /// Untyped lookup. `None` for the null identifier and for anything never registered.
    pub fn get<I: Identifier>(&self, id: I) -> Option<Entity> {
        if id.is_null() {
            return None;
        }
        I::table(self).get(&id).copied()
    }

    pub fn contains<I: Identifier>(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Strict lookup: `Ok(None)` for the null identifier, an error for identifiers that were never
    /// created and for entities that don't carry a `C`.
    pub fn resolve<C: Component, I: Identifier>(&self, world: &World, id: I) -> Result<Option<Entity>, ConversionError> {
        if id.is_null() {
            return Ok(None);
        }

        let entity = self
            .get(id)
            .ok_or_else(|| ConversionError::UnresolvedReference { id: id.to_string() })?;

        if !world.entity(entity).is_ok_and(|e| e.has::<C>()) {
            return Err(ConversionError::ReferenceTypeMismatch {
                id: id.to_string(),
                expected: short_type_name::<C>(),
            });
        }

        Ok(Some(entity))
    }

    /// Lenient lookup for references that are allowed to dangle on malformed input.
    pub fn resolve_weak<C: Component, I: Identifier>(&self, world: &World, id: I) -> Option<Entity> {
        let entity = self.get(id)?;
        if world.entity(entity).is_ok_and(|e| e.has::<C>()) {
            Some(entity)
        } else {
            warn!("{} is registered, but is not a {}", id, short_type_name::<C>());
            None
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len() + self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, Entity)> + '_ {
        self.objects.iter().map(|(id, entity)| (*id, *entity))
    }

    pub fn assets(&self) -> impl Iterator<Item = (AssetId, Entity)> + '_ {
        self.assets.iter().map(|(id, entity)| (*id, *entity))
    }
}
