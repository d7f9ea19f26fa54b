use serde::{Deserialize, Serialize};

pub const FOURCC_MESH: u32 = u32::from_le_bytes(*b"RGMS");
pub const MESH_FORMAT_VERSION: u32 = 1;

/// The renderer limits skinning to four influences per vertex.
pub const MAX_BONE_INFLUENCES: usize = 4;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    #[default]
    Triangles,
    Lines,
    Points,
}

impl Topology {
    /// Number of indices forming one primitive.
    pub fn element_size(self) -> usize {
        match self {
            Topology::Triangles => 3,
            Topology::Lines => 2,
            Topology::Points => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Topology> {
        match value {
            0 => Some(Topology::Triangles),
            1 => Some(Topology::Lines),
            2 => Some(Topology::Points),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Topology::Triangles => 0,
            Topology::Lines => 1,
            Topology::Points => 2,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneWeightData {
    pub bone: u32,
    pub weight: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmeshData {
    #[serde(default)]
    pub topology: Topology,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendshapeFrameData {
    pub weight: f32,
    #[serde(default)]
    pub position_deltas: Vec<[f32; 3]>,
    #[serde(default)]
    pub normal_deltas: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendshapeData {
    pub name: String,
    #[serde(default)]
    pub frames: Vec<BlendshapeFrameData>,
}

/// Raw vertex and index data of a mesh asset, either inline in the scene document or loaded
/// from an external `RGMS` blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 4]>,
    pub colors: Vec<[f32; 4]>,
    pub uv0: Vec<[f32; 2]>,
    pub uv1: Vec<[f32; 2]>,
    /// Column-major 4x4 inverse bind matrices, one per bone.
    pub bind_poses: Vec<[f32; 16]>,
    /// Either empty (static mesh) or one entry per vertex with up to four influences.
    pub bone_weights: Vec<Vec<BoneWeightData>>,
    pub submeshes: Vec<SubmeshData>,
    pub blendshapes: Vec<BlendshapeData>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_skinned(&self) -> bool {
        !self.bind_poses.is_empty() && !self.bone_weights.is_empty()
    }
}
