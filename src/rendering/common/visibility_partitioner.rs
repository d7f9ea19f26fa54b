use std::collections::BTreeMap;

use itertools::Itertools;
use log::{trace, warn};
use thiserror::Error;

use crate::rendering::common::types::{Mesh, Submesh};

/// Bone weights at or below this are treated as noise, which matches 8 bit weight quantization.
pub const DEFAULT_EPSILON: f32 = 0.01;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Submesh {submesh} references vertex {index}, but the mesh only has {vertex_count} vertices")]
    MalformedMeshIndex {
        submesh: usize,
        index: u32,
        vertex_count: usize,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartitionResult {
    /// Original submeshes whose every primitive is hidden. They are left in place, the caller is
    /// expected to give them an invisible material instead of cloning anything.
    pub always_invisible: Vec<usize>,
    /// Appended submesh index -> the original submesh it was split off from.
    pub clone_to_original: BTreeMap<usize, usize>,
    /// Submeshes whose index count is not a multiple of the primitive size. Left untouched.
    pub misaligned_submeshes: Vec<usize>,
}

impl PartitionResult {
    pub fn is_noop(&self) -> bool {
        self.always_invisible.is_empty() && self.clone_to_original.is_empty()
    }
}

/// Splits the submeshes of a skinned mesh by first person visibility of the bones they are weighted to.
pub enum VisibilityMeshPartitioner {}

impl VisibilityMeshPartitioner {
    /// Per vertex: whether a significant part of it is weighted to a hidden bone.
    /// Unknown bones and vertices without bindings count as visible.
    pub fn classify_vertices(mesh: &Mesh, bone_visible: &[bool], epsilon: f32) -> Vec<bool> {
        let bindings = &mesh.vertex_buffers.bone_bindings;
        (0..mesh.vertex_count())
            .map(|vertex| {
                bindings.get(vertex).is_some_and(|slots| {
                    slots
                        .iter()
                        .any(|binding| binding.weight > epsilon && bone_visible.get(binding.bone as usize) == Some(&false))
                })
            })
            .collect_vec()
    }

    /// Compacts the visible primitives of every submesh to the front and moves the hidden ones,
    /// in their original order, into a submesh appended to the mesh.
    ///
    /// The mesh is only mutated once every index has been checked against the vertex count.
    pub fn partition(mesh: &mut Mesh, bone_visible: &[bool], epsilon: f32) -> Result<PartitionResult, PartitionError> {
        profiling::scope!("VisibilityMeshPartitioner::partition");

        if !mesh.is_skinned() || bone_visible.iter().all(|visible| *visible) {
            trace!("Nothing to partition, mesh has no hidden bones");
            return Ok(PartitionResult::default());
        }

        Self::check_indices(mesh)?;

        let invisible = Self::classify_vertices(mesh, bone_visible, epsilon);
        let mut result = PartitionResult::default();
        let original_count = mesh.submeshes.len();

        for submesh_index in 0..original_count {
            let submesh = &mut mesh.submeshes[submesh_index];
            if !submesh.is_aligned() {
                warn!(
                    "Submesh {} has {} indices, which is not a whole number of {:?} primitives. Leaving it untouched",
                    submesh_index,
                    submesh.indices.len(),
                    submesh.topology
                );
                result.misaligned_submeshes.push(submesh_index);
                continue;
            }

            let (visible_indices, hidden_indices) = Self::split_elements(submesh, &invisible);
            if hidden_indices.is_empty() {
                continue;
            }

            if visible_indices.is_empty() {
                result.always_invisible.push(submesh_index);
                continue;
            }

            let topology = submesh.topology;
            submesh.indices = visible_indices;
            mesh.submeshes.push(Submesh {
                topology,
                indices: hidden_indices,
            });
            result.clone_to_original.insert(mesh.submeshes.len() - 1, submesh_index);
        }

        trace!(
            "Partitioned {} submeshes: {} split, {} always invisible, {} misaligned",
            original_count,
            result.clone_to_original.len(),
            result.always_invisible.len(),
            result.misaligned_submeshes.len()
        );

        Ok(result)
    }

    fn check_indices(mesh: &Mesh) -> Result<(), PartitionError> {
        let vertex_count = mesh.vertex_count();
        for (submesh, data) in mesh.submeshes.iter().enumerate() {
            if let Some(&index) = data.indices.iter().find(|&&index| index as usize >= vertex_count) {
                return Err(PartitionError::MalformedMeshIndex {
                    submesh,
                    index,
                    vertex_count,
                });
            }
        }

        Ok(())
    }

    fn split_elements(submesh: &Submesh, invisible: &[bool]) -> (Vec<u32>, Vec<u32>) {
        let mut visible_indices = Vec::with_capacity(submesh.indices.len());
        let mut hidden_indices = vec![];

        for element in submesh.indices.chunks_exact(submesh.topology.element_size()) {
            if element.iter().any(|&index| invisible[index as usize]) {
                hidden_indices.extend_from_slice(element);
            } else {
                visible_indices.extend_from_slice(element);
            }
        }

        (visible_indices, hidden_indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::common::types::{BoneBinding, VertexBuffers};
    use glam::{Mat4, Vec3};
    use rigport_files::mesh::types::Topology;

    fn single_bone(bone: u32) -> [BoneBinding; 4] {
        let mut slots = [BoneBinding::default(); 4];
        slots[0] = BoneBinding { bone, weight: 1.0 };
        slots
    }

    /// A strip of vertices, vertex `v` weighted fully to `bones[v]`.
    fn skinned_mesh(bones: &[u32], submeshes: Vec<Submesh>, bone_count: usize) -> Mesh {
        Mesh {
            vertex_buffers: VertexBuffers {
                position_buffer: (0..bones.len()).map(|v| Vec3::new(v as f32, 0.0, 0.0)).collect_vec(),
                normals_buffer: vec![],
                tangents_buffer: vec![],
                texcoord_buffer_0: vec![],
                texcoord_buffer_1: vec![],
                vertex_color_0: vec![],
                bone_bindings: bones.iter().map(|&bone| single_bone(bone)).collect_vec(),
            },
            submeshes,
            bind_poses: vec![Mat4::IDENTITY; bone_count],
            blendshapes: vec![],
        }
    }

    #[test]
    fn all_bones_visible_is_a_noop() -> Result<(), anyhow::Error> {
        let mut mesh = skinned_mesh(
            &[0, 1, 1, 0],
            vec![Submesh::triangles(vec![0, 1, 2]), Submesh::triangles(vec![0, 2, 3])],
            2,
        );
        let before = mesh.clone();

        let result = VisibilityMeshPartitioner::partition(&mut mesh, &[true, true], DEFAULT_EPSILON)?;
        assert!(result.is_noop());
        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh, before);
        Ok(())
    }

    #[test]
    fn unskinned_mesh_is_a_noop() -> Result<(), anyhow::Error> {
        let mut mesh = skinned_mesh(&[0, 0, 0], vec![Submesh::triangles(vec![0, 1, 2])], 0);
        mesh.vertex_buffers.bone_bindings.clear();

        let result = VisibilityMeshPartitioner::partition(&mut mesh, &[false], DEFAULT_EPSILON)?;
        assert_eq!(result, PartitionResult::default());
        assert_eq!(mesh.submeshes.len(), 1);
        Ok(())
    }

    #[test]
    fn fully_hidden_submesh_is_always_invisible() -> Result<(), anyhow::Error> {
        // submesh 0 only touches bone 1 (the head), submesh 1 only bone 0
        let mut mesh = skinned_mesh(
            &[1, 1, 1, 0, 0, 0],
            vec![Submesh::triangles(vec![0, 1, 2]), Submesh::triangles(vec![3, 4, 5])],
            2,
        );

        let result = VisibilityMeshPartitioner::partition(&mut mesh, &[true, false], DEFAULT_EPSILON)?;
        assert_eq!(result.always_invisible, vec![0]);
        assert!(result.clone_to_original.is_empty());
        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh.submeshes[0].indices, vec![0, 1, 2]);
        Ok(())
    }

    #[test]
    fn mixed_submesh_is_split_in_order() -> Result<(), anyhow::Error> {
        // vertices 0..4 on the body, 4 and 5 on the head
        let bones = [0, 0, 0, 0, 1, 1];
        let indices = vec![
            0, 1, 4, // hidden
            0, 1, 2, // visible
            2, 3, 5, // hidden
            1, 2, 3, // visible
        ];
        let mut mesh = skinned_mesh(&bones, vec![Submesh::triangles(indices)], 2);

        let result = VisibilityMeshPartitioner::partition(&mut mesh, &[true, false], DEFAULT_EPSILON)?;
        assert!(result.always_invisible.is_empty());
        assert_eq!(result.clone_to_original, BTreeMap::from([(1, 0)]));

        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh.submeshes[0].indices, vec![0, 1, 2, 1, 2, 3]);
        assert_eq!(mesh.submeshes[1].indices, vec![0, 1, 4, 2, 3, 5]);
        assert_eq!(mesh.submeshes[0].element_count(), 2);
        assert_eq!(mesh.submeshes[1].element_count(), 2);
        Ok(())
    }

    #[test]
    fn weights_below_epsilon_do_not_hide() {
        let mut mesh = skinned_mesh(&[0, 0, 0], vec![Submesh::triangles(vec![0, 1, 2])], 2);
        mesh.vertex_buffers.bone_bindings[0][1] = BoneBinding { bone: 1, weight: 0.005 };
        mesh.vertex_buffers.bone_bindings[1][1] = BoneBinding { bone: 1, weight: 0.2 };

        let invisible = VisibilityMeshPartitioner::classify_vertices(&mesh, &[true, false], DEFAULT_EPSILON);
        assert_eq!(invisible, vec![false, true, false]);
    }

    #[test]
    fn unknown_bones_are_treated_as_visible() -> Result<(), anyhow::Error> {
        let mut mesh = skinned_mesh(&[7, 7, 7], vec![Submesh::triangles(vec![0, 1, 2])], 2);

        let result = VisibilityMeshPartitioner::partition(&mut mesh, &[true, false], DEFAULT_EPSILON)?;
        assert!(result.is_noop());
        Ok(())
    }

    #[test]
    fn out_of_range_index_fails_without_touching_the_mesh() {
        let mut mesh = skinned_mesh(
            &[1, 1, 1],
            vec![Submesh::triangles(vec![0, 1, 2]), Submesh::triangles(vec![0, 1, 9])],
            2,
        );
        let before = mesh.clone();

        let result = VisibilityMeshPartitioner::partition(&mut mesh, &[true, false], DEFAULT_EPSILON);
        assert_eq!(
            result,
            Err(PartitionError::MalformedMeshIndex {
                submesh: 1,
                index: 9,
                vertex_count: 3
            })
        );
        assert_eq!(mesh, before);
    }

    #[test]
    fn misaligned_submesh_is_flagged_and_left_alone() -> Result<(), anyhow::Error> {
        let mut mesh = skinned_mesh(
            &[1, 1, 1, 0],
            vec![Submesh::triangles(vec![0, 1, 2, 3]), Submesh::triangles(vec![0, 1, 2])],
            2,
        );

        let result = VisibilityMeshPartitioner::partition(&mut mesh, &[true, false], DEFAULT_EPSILON)?;
        assert_eq!(result.misaligned_submeshes, vec![0]);
        assert_eq!(result.always_invisible, vec![1]);
        assert_eq!(mesh.submeshes[0].indices, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn lines_are_split_in_pairs() -> Result<(), anyhow::Error> {
        let mut mesh = skinned_mesh(
            &[0, 0, 1],
            vec![Submesh {
                topology: Topology::Lines,
                indices: vec![0, 1, 1, 2],
            }],
            2,
        );

        let result = VisibilityMeshPartitioner::partition(&mut mesh, &[true, false], DEFAULT_EPSILON)?;
        assert_eq!(result.clone_to_original, BTreeMap::from([(1, 0)]));
        assert_eq!(mesh.submeshes[0].indices, vec![0, 1]);
        assert_eq!(mesh.submeshes[1].indices, vec![1, 2]);
        Ok(())
    }
}
