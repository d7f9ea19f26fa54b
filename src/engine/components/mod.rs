/// Live tree structure: slots, names, transforms, parent/child links and attachments.
pub mod hierarchy;
/// Renderers, the first person material override and the asset records they point at.
pub mod render;
/// Rig, avatar and secondary motion components.
pub mod avatar;
