use hecs::Entity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshRenderer {
    pub mesh: Option<Entity>,
    /// One slot per submesh.
    pub materials: Vec<Option<Entity>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinnedMeshRenderer {
    pub mesh: Option<Entity>,
    pub materials: Vec<Option<Entity>>,
    /// Index-aligned with the mesh's bind poses. `None` where the bone could not be found.
    pub bones: Vec<Option<Entity>>,
    pub root_bone: Option<Entity>,
    pub blendshape_weights: Vec<f32>,
}

/// Materials used while the owner looks through the avatar's eyes, index-aligned with the
/// submeshes of the renderer's mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirstPersonMaterials(pub Vec<Option<Entity>>);
