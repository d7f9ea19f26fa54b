use std::fmt::{Debug, Formatter};

use glam::{Mat4, Vec2, Vec3, Vec4};
use rigport_files::mesh::types::Topology;

#[derive(Clone, PartialEq)]
pub struct Mesh {
    pub vertex_buffers: VertexBuffers,
    pub submeshes: Vec<Submesh>,
    /// Inverse bind matrices, index-aligned with the bone list of whichever renderer draws this mesh.
    pub bind_poses: Vec<Mat4>,
    pub blendshapes: Vec<Blendshape>,
}

impl Debug for Mesh {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ vertex_buffers: {:?}, ", self.vertex_buffers)?;
        write!(f, "submeshes: {:?}, ", self.submeshes)?;
        write!(f, "bind_poses: [{}], ", self.bind_poses.len())?;
        write!(f, "blendshapes: [{}] }}", self.blendshapes.len())
    }
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertex_buffers.position_buffer.len()
    }

    pub fn bone_count(&self) -> usize {
        self.bind_poses.len()
    }

    pub fn is_skinned(&self) -> bool {
        !self.bind_poses.is_empty() && !self.vertex_buffers.bone_bindings.is_empty()
    }

    pub fn blendshape_index(&self, name: &str) -> Option<usize> {
        self.blendshapes.iter().position(|shape| shape.name == name)
    }

    /// Axis aligned bounds of all positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self.vertex_buffers.position_buffer.iter();
        let first = *positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))))
    }
}

#[derive(Clone, Default, PartialEq)]
pub struct VertexBuffers {
    pub position_buffer: Vec<Vec3>,
    pub normals_buffer: Vec<Vec3>,
    pub tangents_buffer: Vec<Vec4>,
    pub texcoord_buffer_0: Vec<Vec2>,
    pub texcoord_buffer_1: Vec<Vec2>,
    pub vertex_color_0: Vec<[u8; 4]>,
    /// Either empty or one entry per vertex.
    pub bone_bindings: Vec<[BoneBinding; 4]>,
}

impl Debug for VertexBuffers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ position_buffer: [{}], ", self.position_buffer.len())?;
        write!(f, "normals_buffer: [{}], ", self.normals_buffer.len())?;
        write!(f, "tangents_buffer: [{}], ", self.tangents_buffer.len())?;
        write!(f, "texcoord_buffer_0: [{}], ", self.texcoord_buffer_0.len())?;
        write!(f, "texcoord_buffer_1: [{}], ", self.texcoord_buffer_1.len())?;
        write!(f, "vertex_color_0: [{}], ", self.vertex_color_0.len())?;
        write!(f, "bone_bindings: [{}] }}", self.bone_bindings.len())
    }
}

/// A single (bone, weight) influence. Unused slots carry a zero weight.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct BoneBinding {
    pub bone: u32,
    pub weight: f32,
}

#[derive(Clone, PartialEq)]
pub struct Submesh {
    pub topology: Topology,
    pub indices: Vec<u32>,
}

impl Debug for Submesh {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ {:?}: [{}] }}", self.topology, self.indices.len())
    }
}

impl Submesh {
    pub fn triangles(indices: Vec<u32>) -> Self {
        Self {
            topology: Topology::Triangles,
            indices,
        }
    }

    pub fn element_count(&self) -> usize {
        self.indices.len() / self.topology.element_size()
    }

    /// Whether the index count is a whole number of primitives.
    pub fn is_aligned(&self) -> bool {
        self.indices.len() % self.topology.element_size() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blendshape {
    pub name: String,
    pub frames: Vec<BlendshapeFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendshapeFrame {
    pub weight: f32,
    pub position_deltas: Vec<Vec3>,
    pub normal_deltas: Vec<Vec3>,
}
