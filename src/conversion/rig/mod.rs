/// Scoped renaming of a skeleton for the runtime's rig detector.
pub mod renamer;
