use std::collections::{BTreeMap, HashSet};

use hecs::Entity;
use log::{debug, warn};

use crate::conversion::error::ConversionError;
use crate::engine::Engine;
use crate::engine::humanoid::HumanBone;

const PLACEHOLDER_PREFIX: &str = "__rig_node_";

/// Names taken away by `RigBoneRenamer::enter_scope`. Has to be handed back through `restore`.
#[derive(Debug)]
#[must_use = "names stay mangled until the scope is restored"]
pub struct RenameScope {
    root: Entity,
    originals: Vec<(Entity, String)>,
}

impl RenameScope {
    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Puts every original name back, whatever happened to the names in between.
    /// Slots destroyed in the meantime are skipped. Returns the number of restored names.
    pub fn restore(self, engine: &mut Engine) -> usize {
        let mut restored = 0;
        for (slot, name) in self.originals {
            match engine.rename(slot, name) {
                Ok(()) => restored += 1,
                Err(_) => debug!("{:?} is gone, not restoring its name", slot),
            }
        }
        restored
    }
}

/// Makes the runtime's skeleton detector see exactly the bones we know about: the root and everything
/// below it get a placeholder name, the bones then get their canonical names.
pub enum RigBoneRenamer {}

impl RigBoneRenamer {
    pub fn enter_scope(
        engine: &mut Engine,
        root: Entity,
        bones: &BTreeMap<HumanBone, Entity>,
    ) -> Result<RenameScope, ConversionError> {
        let mut scope = RenameScope {
            root,
            originals: vec![],
        };

        match Self::rename_all(engine, &mut scope, bones) {
            Ok(()) => Ok(scope),
            Err(e) => {
                scope.restore(engine);
                Err(e)
            }
        }
    }

    fn rename_all(
        engine: &mut Engine,
        scope: &mut RenameScope,
        bones: &BTreeMap<HumanBone, Entity>,
    ) -> Result<(), ConversionError> {
        let subtree = engine.subtree(scope.root);
        let members: HashSet<Entity> = subtree.iter().copied().collect();

        for (index, slot) in subtree.iter().enumerate() {
            Self::rename(engine, scope, *slot, format!("{}{}", PLACEHOLDER_PREFIX, index))?;
        }

        let mut named = HashSet::new();
        for (bone, slot) in bones {
            if !members.contains(slot) {
                warn!("{} is assigned to {:?}, which is not below the rig root", bone, slot);
                continue;
            }

            if !named.insert(*slot) {
                warn!("{:?} is assigned to more than one bone, keeping the first", slot);
                continue;
            }

            Self::rename(engine, scope, *slot, bone.canonical_name())?;
        }

        debug!(
            "Renamed {} slots below {:?}, {} of them to bone names",
            scope.len(),
            scope.root,
            named.len()
        );
        Ok(())
    }

    fn rename(engine: &mut Engine, scope: &mut RenameScope, slot: Entity, name: String) -> Result<(), ConversionError> {
        // the first rename of a slot remembers the original
        if !scope.originals.iter().any(|(renamed, _)| *renamed == slot) {
            let original = engine
                .name(slot)
                .ok_or(ConversionError::MissingEntity(slot))?;
            scope.originals.push((slot, original));
        }

        engine.rename(slot, name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::humanoid::Side;

    fn skeleton(engine: &mut Engine) -> Result<Vec<Entity>, anyhow::Error> {
        let root = engine.spawn_slot("Armature", None)?;
        let hips = engine.spawn_slot("Hips", Some(root))?;
        let decoy = engine.spawn_slot("Hips_Ribbon", Some(hips))?;
        let spine = engine.spawn_slot("Spine", Some(hips))?;
        let hand = engine.spawn_slot("Hand.L", Some(spine))?;
        Ok(vec![root, hips, decoy, spine, hand])
    }

    #[test]
    fn bones_get_canonical_names_and_others_placeholders() -> Result<(), anyhow::Error> {
        let mut engine = Engine::default();
        let slots = skeleton(&mut engine)?;
        let bones = BTreeMap::from([
            (HumanBone::Hips, slots[1]),
            (HumanBone::Spine, slots[3]),
            (HumanBone::Hand(Side::Left), slots[4]),
        ]);

        let scope = RigBoneRenamer::enter_scope(&mut engine, slots[0], &bones)?;
        assert_eq!(engine.name(slots[0]).as_deref(), Some("__rig_node_0"));
        assert_eq!(engine.name(slots[1]).as_deref(), Some("hips"));
        assert_eq!(engine.name(slots[2]).as_deref(), Some("__rig_node_2"));
        assert_eq!(engine.name(slots[4]).as_deref(), Some("left_hand"));

        assert_eq!(scope.restore(&mut engine), 5);
        assert_eq!(engine.name(slots[0]).as_deref(), Some("Armature"));
        Ok(())
    }

    #[test]
    fn every_name_comes_back() -> Result<(), anyhow::Error> {
        let mut engine = Engine::default();
        let slots = skeleton(&mut engine)?;
        let before = slots.iter().map(|&slot| engine.name(slot)).collect::<Vec<_>>();
        let bones = BTreeMap::from([(HumanBone::Hips, slots[1])]);

        let scope = RigBoneRenamer::enter_scope(&mut engine, slots[0], &bones)?;
        // somebody else touches names inside the scope, and adds a slot
        engine.rename(slots[2], "changed")?;
        engine.rename(slots[1], "changed too")?;
        let added = engine.spawn_slot("Added", Some(slots[3]))?;
        scope.restore(&mut engine);

        let after = slots.iter().map(|&slot| engine.name(slot)).collect::<Vec<_>>();
        assert_eq!(before, after);
        assert_eq!(engine.name(added).as_deref(), Some("Added"));
        Ok(())
    }

    #[test]
    fn destroyed_slots_are_skipped_on_restore() -> Result<(), anyhow::Error> {
        let mut engine = Engine::default();
        let slots = skeleton(&mut engine)?;

        let scope = RigBoneRenamer::enter_scope(&mut engine, slots[0], &BTreeMap::new())?;
        engine.destroy(slots[3]);

        assert_eq!(scope.restore(&mut engine), 3);
        assert_eq!(engine.name(slots[2]).as_deref(), Some("Hips_Ribbon"));
        Ok(())
    }

    #[test]
    fn bones_outside_the_root_are_ignored() -> Result<(), anyhow::Error> {
        let mut engine = Engine::default();
        let slots = skeleton(&mut engine)?;
        let stranger = engine.spawn_slot("Head", None)?;
        let bones = BTreeMap::from([(HumanBone::Head, stranger)]);

        let scope = RigBoneRenamer::enter_scope(&mut engine, slots[0], &bones)?;
        assert_eq!(engine.name(stranger).as_deref(), Some("Head"));
        scope.restore(&mut engine);
        Ok(())
    }
}
