use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

use hecs::Entity;
use itertools::Itertools;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn prefix(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    pub const ALL: [Finger; 5] = [Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Little];

    fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Little => "little",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FingerJoint {
    Metacarpal,
    Proximal,
    Intermediate,
    Distal,
}

impl FingerJoint {
    pub const ALL: [FingerJoint; 4] = [
        FingerJoint::Metacarpal,
        FingerJoint::Proximal,
        FingerJoint::Intermediate,
        FingerJoint::Distal,
    ];

    fn name(self) -> &'static str {
        match self {
            FingerJoint::Metacarpal => "metacarpal",
            FingerJoint::Proximal => "proximal",
            FingerJoint::Intermediate => "intermediate",
            FingerJoint::Distal => "distal",
        }
    }
}

/// A role in the canonical biped skeleton the runtime's rig detector understands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HumanBone {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    Jaw,
    Eye(Side),
    Shoulder(Side),
    UpperArm(Side),
    LowerArm(Side),
    Hand(Side),
    Finger(Side, Finger, FingerJoint),
    UpperLeg(Side),
    LowerLeg(Side),
    Foot(Side),
    Toes(Side),
}

impl HumanBone {
    /// Bones a rig cannot be driven without.
    pub const REQUIRED: [HumanBone; 15] = [
        HumanBone::Hips,
        HumanBone::Spine,
        HumanBone::Head,
        HumanBone::UpperArm(Side::Left),
        HumanBone::UpperArm(Side::Right),
        HumanBone::LowerArm(Side::Left),
        HumanBone::LowerArm(Side::Right),
        HumanBone::Hand(Side::Left),
        HumanBone::Hand(Side::Right),
        HumanBone::UpperLeg(Side::Left),
        HumanBone::UpperLeg(Side::Right),
        HumanBone::LowerLeg(Side::Left),
        HumanBone::LowerLeg(Side::Right),
        HumanBone::Foot(Side::Left),
        HumanBone::Foot(Side::Right),
    ];

    /// Every role, trunk first, in detection priority order.
    pub fn all() -> Vec<HumanBone> {
        let mut bones = vec![
            HumanBone::Hips,
            HumanBone::Spine,
            HumanBone::Chest,
            HumanBone::UpperChest,
            HumanBone::Neck,
            HumanBone::Head,
            HumanBone::Jaw,
        ];

        for side in [Side::Left, Side::Right] {
            bones.extend([
                HumanBone::Eye(side),
                HumanBone::Shoulder(side),
                HumanBone::UpperArm(side),
                HumanBone::LowerArm(side),
                HumanBone::Hand(side),
                HumanBone::UpperLeg(side),
                HumanBone::LowerLeg(side),
                HumanBone::Foot(side),
                HumanBone::Toes(side),
            ]);

            for finger in Finger::ALL {
                bones.extend(FingerJoint::ALL.map(|joint| HumanBone::Finger(side, finger, joint)));
            }
        }

        bones
    }

    pub fn canonical_name(&self) -> String {
        match self {
            HumanBone::Hips => "hips".to_string(),
            HumanBone::Spine => "spine".to_string(),
            HumanBone::Chest => "chest".to_string(),
            HumanBone::UpperChest => "upper_chest".to_string(),
            HumanBone::Neck => "neck".to_string(),
            HumanBone::Head => "head".to_string(),
            HumanBone::Jaw => "jaw".to_string(),
            HumanBone::Eye(side) => format!("{}_eye", side.prefix()),
            HumanBone::Shoulder(side) => format!("{}_shoulder", side.prefix()),
            HumanBone::UpperArm(side) => format!("{}_upper_arm", side.prefix()),
            HumanBone::LowerArm(side) => format!("{}_lower_arm", side.prefix()),
            HumanBone::Hand(side) => format!("{}_hand", side.prefix()),
            HumanBone::Finger(side, finger, joint) => {
                format!("{}_{}_{}", side.prefix(), finger.name(), joint.name())
            }
            HumanBone::UpperLeg(side) => format!("{}_upper_leg", side.prefix()),
            HumanBone::LowerLeg(side) => format!("{}_lower_leg", side.prefix()),
            HumanBone::Foot(side) => format!("{}_foot", side.prefix()),
            HumanBone::Toes(side) => format!("{}_toes", side.prefix()),
        }
    }

    /// Exact match against the canonical names only.
    pub fn from_canonical_name(name: &str) -> Option<HumanBone> {
        HumanBone::all().into_iter().find(|bone| bone.canonical_name() == name)
    }

    /// Accepts canonical names as well as the authoring tool's spelling (`LeftUpperArm`, `Left Upper Arm`).
    pub fn parse_role(role: &str) -> Option<HumanBone> {
        let key = normalize(role);
        HumanBone::all()
            .into_iter()
            .find(|bone| normalize(&bone.canonical_name()) == key)
    }
}

impl Display for HumanBone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

/// Lowercase with separators stripped, so `Left_UpperArm`, `left upper arm` and `left_upper_arm` compare equal.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The runtime's automatic skeleton detector. Exact canonical names win; whatever is still unassigned
/// afterwards is matched by substring against the normalized node names, first candidate in order wins.
pub enum HumanoidDetector {}

impl HumanoidDetector {
    pub fn detect(candidates: &[(Entity, String)]) -> BTreeMap<HumanBone, Entity> {
        let mut found = BTreeMap::new();
        let mut claimed = HashSet::new();

        for (entity, name) in candidates {
            if let Some(bone) = HumanBone::from_canonical_name(name) {
                if !found.contains_key(&bone) {
                    found.insert(bone, *entity);
                    claimed.insert(*entity);
                }
            }
        }

        let normalized = candidates
            .iter()
            .map(|(entity, name)| (*entity, normalize(name)))
            .collect_vec();

        for bone in HumanBone::all() {
            if found.contains_key(&bone) {
                continue;
            }

            let key = normalize(&bone.canonical_name());
            let hit = normalized
                .iter()
                .find(|(entity, name)| !claimed.contains(entity) && name.contains(&key));

            if let Some((entity, _)) = hit {
                found.insert(bone, *entity);
                claimed.insert(*entity);
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    #[test]
    fn canonical_table_is_complete_and_unique() {
        let bones = HumanBone::all();
        // 7 trunk, 2 * (9 limb + 5 fingers * 4 joints)
        assert_eq!(bones.len(), 7 + 2 * (9 + 20));
        assert_eq!(bones.iter().map(HumanBone::canonical_name).unique().count(), bones.len());
    }

    #[test]
    fn roles_parse_in_both_spellings() {
        assert_eq!(HumanBone::parse_role("LeftUpperArm"), Some(HumanBone::UpperArm(Side::Left)));
        assert_eq!(HumanBone::parse_role("left_upper_arm"), Some(HumanBone::UpperArm(Side::Left)));
        assert_eq!(
            HumanBone::parse_role("Right Index Distal"),
            Some(HumanBone::Finger(Side::Right, Finger::Index, FingerJoint::Distal))
        );
        assert_eq!(HumanBone::parse_role("Tail"), None);
        assert_eq!(HumanBone::from_canonical_name("LeftHand"), None);
    }

    #[test]
    fn exact_names_beat_substring_matches() {
        let mut world = World::new();
        let decoy = world.spawn(());
        let hips = world.spawn(());
        let candidates = vec![(decoy, "HipsAccessory".to_string()), (hips, "hips".to_string())];

        let found = HumanoidDetector::detect(&candidates);
        assert_eq!(found.get(&HumanBone::Hips), Some(&hips));
    }

    #[test]
    fn substring_heuristic_picks_up_loose_names() {
        let mut world = World::new();
        let hips = world.spawn(());
        let head = world.spawn(());
        let candidates = vec![(hips, "Armature_Hips".to_string()), (head, "J_Bip_Head".to_string())];

        let found = HumanoidDetector::detect(&candidates);
        assert_eq!(found.get(&HumanBone::Hips), Some(&hips));
        assert_eq!(found.get(&HumanBone::Head), Some(&head));
        assert_eq!(found.len(), 2);
    }
}
