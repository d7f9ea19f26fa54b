use glam::{Affine3A, Quat, Vec3};
use hecs::Entity;

/// Marks an entity as a node of the live tree, as opposed to a component or an asset.
#[derive(Debug, Copy, Clone, Default)]
pub struct Slot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

/// Local transform, relative to the parent slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Written by the transform system on every tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlobalTransform(pub Affine3A);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Active(pub bool);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(pub Vec<Entity>);

/// Component entities living on a slot, in attach order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachedComponents(pub Vec<Entity>);

/// The slot a component entity lives on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttachedTo(pub Entity);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Enabled(pub bool);

/// The wire identifier a live object was built from, kept for tooling that maps back to the source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub id: u64,
    pub is_asset: bool,
}
