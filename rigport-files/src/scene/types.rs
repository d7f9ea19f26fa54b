use serde::Deserialize;
use serde_json::{Map, Value};

use crate::common::types::{AssetId, ObjectId, TransformData};
use crate::mesh::types::MeshData;

fn default_true() -> bool {
    true
}

/// A complete serialized snapshot: one root node and the flat list of assets it references.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneDocument {
    pub root: Node,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub transform: TransformData,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Node {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            transform: TransformData::default(),
            children: vec![],
            components: vec![],
        }
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_transform(mut self, transform: TransformData) -> Self {
        self.transform = transform;
        self
    }

    /// Number of nodes in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawComponent")]
pub struct Component {
    pub id: ObjectId,
    pub enabled: bool,
    pub payload: ComponentPayload,
}

impl Component {
    pub fn new(id: ObjectId, payload: ComponentPayload) -> Self {
        Self {
            id,
            enabled: true,
            payload,
        }
    }
}

// The wire form: a "type" tag next to the payload fields.
#[derive(Deserialize)]
struct RawComponent {
    #[serde(default)]
    id: ObjectId,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl TryFrom<RawComponent> for Component {
    type Error = serde_json::Error;

    fn try_from(raw: RawComponent) -> Result<Self, Self::Error> {
        Ok(Component {
            id: raw.id,
            enabled: raw.enabled,
            payload: ComponentPayload::from_tagged(&raw.type_tag, Value::Object(raw.payload))?,
        })
    }
}

#[derive(Debug, Clone)]
pub enum ComponentPayload {
    MeshRenderer(MeshRendererData),
    SkinnedMeshRenderer(SkinnedMeshRendererData),
    HumanoidRig(HumanoidRigData),
    AvatarDescriptor(AvatarDescriptorData),
    DynamicBoneChain(DynamicBoneChainData),
    DynamicBoneCollider(DynamicBoneColliderData),
    FirstPersonVisibility(FirstPersonVisibilityData),
    /// A tag this reader has no schema for. Kept so the consumer can report it.
    Unknown { tag: String },
}

impl ComponentPayload {
    pub fn type_tag(&self) -> &str {
        match self {
            ComponentPayload::MeshRenderer(_) => "MeshRenderer",
            ComponentPayload::SkinnedMeshRenderer(_) => "SkinnedMeshRenderer",
            ComponentPayload::HumanoidRig(_) => "HumanoidRig",
            ComponentPayload::AvatarDescriptor(_) => "AvatarDescriptor",
            ComponentPayload::DynamicBoneChain(_) => "DynamicBoneChain",
            ComponentPayload::DynamicBoneCollider(_) => "DynamicBoneCollider",
            ComponentPayload::FirstPersonVisibility(_) => "FirstPersonVisibility",
            ComponentPayload::Unknown { tag } => tag,
        }
    }

    fn from_tagged(tag: &str, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match tag {
            "MeshRenderer" => ComponentPayload::MeshRenderer(serde_json::from_value(payload)?),
            "SkinnedMeshRenderer" => ComponentPayload::SkinnedMeshRenderer(serde_json::from_value(payload)?),
            "HumanoidRig" => ComponentPayload::HumanoidRig(serde_json::from_value(payload)?),
            "AvatarDescriptor" => ComponentPayload::AvatarDescriptor(serde_json::from_value(payload)?),
            "DynamicBoneChain" => ComponentPayload::DynamicBoneChain(serde_json::from_value(payload)?),
            "DynamicBoneCollider" => ComponentPayload::DynamicBoneCollider(serde_json::from_value(payload)?),
            "FirstPersonVisibility" => ComponentPayload::FirstPersonVisibility(serde_json::from_value(payload)?),
            other => ComponentPayload::Unknown { tag: other.to_string() },
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MeshRendererData {
    pub mesh: AssetId,
    pub materials: Vec<AssetId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SkinnedMeshRendererData {
    pub mesh: AssetId,
    pub materials: Vec<AssetId>,
    /// Index-aligned with the mesh's bind poses.
    pub bones: Vec<ObjectId>,
    pub root_bone: ObjectId,
    pub blendshape_weights: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HumanoidBoneBinding {
    /// Role name, either canonical (`left_upper_arm`) or the authoring tool's (`LeftUpperArm`).
    pub bone: String,
    pub node: ObjectId,
}

/// Marks the skeleton root and carries the humanoid bone assignment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HumanoidRigData {
    pub bones: Vec<HumanoidBoneBinding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisemeData {
    pub renderer: ObjectId,
    #[serde(default)]
    pub blendshapes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpressionBinding {
    pub expression: String,
    pub blendshape: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaceTrackingData {
    pub renderer: ObjectId,
    #[serde(default)]
    pub expressions: Vec<ExpressionBinding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AvatarDescriptorData {
    /// Relative to the node carrying the descriptor.
    pub view_position: [f32; 3],
    pub hide_head_in_first_person: bool,
    pub visemes: Option<VisemeData>,
    pub left_eye: ObjectId,
    pub right_eye: ObjectId,
    pub face_tracking: Option<FaceTrackingData>,
}

impl Default for AvatarDescriptorData {
    fn default() -> Self {
        Self {
            view_position: [0.0, 1.6, 0.0],
            hide_head_in_first_person: true,
            visemes: None,
            left_eye: ObjectId::NULL,
            right_eye: ObjectId::NULL,
            face_tracking: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamicBoneChainData {
    pub root: ObjectId,
    pub exclusions: Vec<ObjectId>,
    pub colliders: Vec<ObjectId>,
    pub radius: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub gravity: [f32; 3],
}

impl Default for DynamicBoneChainData {
    fn default() -> Self {
        Self {
            root: ObjectId::NULL,
            exclusions: vec![],
            colliders: vec![],
            radius: 0.05,
            stiffness: 0.2,
            damping: 0.1,
            gravity: [0.0; 3],
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
pub enum ColliderShape {
    #[default]
    Sphere,
    Capsule,
    Plane,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DynamicBoneColliderData {
    pub shape: ColliderShape,
    pub radius: f32,
    pub height: f32,
    pub center: [f32; 3],
    pub inside_bounds: bool,
}

/// Attached to a bone: geometry weighted to it (and its descendants, unless overridden further
/// down) is shown or hidden in first person.
#[derive(Debug, Clone, Deserialize)]
pub struct FirstPersonVisibilityData {
    pub visible: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawAsset")]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    /// Content hash or persistent GUID, stable across exports.
    pub stable_id: Option<String>,
    pub payload: AssetPayload,
}

impl Asset {
    pub fn new(id: AssetId, name: impl Into<String>, payload: AssetPayload) -> Self {
        Self {
            id,
            name: name.into(),
            stable_id: None,
            payload,
        }
    }
}

#[derive(Deserialize)]
struct RawAsset {
    id: AssetId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    stable_id: Option<String>,
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl TryFrom<RawAsset> for Asset {
    type Error = serde_json::Error;

    fn try_from(raw: RawAsset) -> Result<Self, Self::Error> {
        Ok(Asset {
            id: raw.id,
            name: raw.name,
            stable_id: raw.stable_id,
            payload: AssetPayload::from_tagged(&raw.type_tag, Value::Object(raw.payload))?,
        })
    }
}

#[derive(Debug, Clone)]
pub enum AssetPayload {
    Texture(TextureData),
    Material(MaterialData),
    Mesh(MeshAssetData),
    Unknown { tag: String },
}

impl AssetPayload {
    pub fn type_tag(&self) -> &str {
        match self {
            AssetPayload::Texture(_) => "Texture",
            AssetPayload::Material(_) => "Material",
            AssetPayload::Mesh(_) => "Mesh",
            AssetPayload::Unknown { tag } => tag,
        }
    }

    fn from_tagged(tag: &str, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match tag {
            "Texture" => AssetPayload::Texture(serde_json::from_value(payload)?),
            "Material" => AssetPayload::Material(serde_json::from_value(payload)?),
            "Mesh" => AssetPayload::Mesh(serde_json::from_value(payload)?),
            other => AssetPayload::Unknown { tag: other.to_string() },
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Relative to the scene document. Textures without a file are placeholders.
    pub file: Option<String>,
    pub has_alpha: bool,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
pub enum RenderMode {
    #[default]
    Opaque,
    Cutout,
    Transparent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaterialData {
    /// Shader family name as the authoring tool reports it; mapping is done elsewhere.
    pub family: String,
    pub render_mode: RenderMode,
    pub color: [f32; 4],
    pub main_texture: AssetId,
    pub normal_map: AssetId,
    pub emission_map: AssetId,
    pub emission_color: [f32; 3],
    pub alpha_cutoff: f32,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            family: "Standard".to_string(),
            render_mode: RenderMode::Opaque,
            color: [1.0; 4],
            main_texture: AssetId::NULL,
            normal_map: AssetId::NULL,
            emission_map: AssetId::NULL,
            emission_color: [0.0; 3],
            alpha_cutoff: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MeshAssetData {
    /// External `RGMS` blob, relative to the scene document. Inlined by the loader.
    pub file: Option<String>,
    pub data: Option<MeshData>,
}

impl MeshAssetData {
    pub fn inline(data: MeshData) -> Self {
        Self {
            file: None,
            data: Some(data),
        }
    }
}
