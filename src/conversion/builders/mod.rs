//! Build functions per wire type tag, plus the deferred halves they schedule.
pub mod assets;
pub mod avatar;
pub mod dynamic_bone;
pub mod first_person;
pub mod renderer;
pub mod rig;
