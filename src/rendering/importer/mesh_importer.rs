use glam::{Mat4, Vec2, Vec3, Vec4};
use itertools::Itertools;
use log::warn;
use rigport_files::mesh::types::{BoneWeightData, MAX_BONE_INFLUENCES, MeshData};

use crate::rendering::common::types::{
    Blendshape, BlendshapeFrame, BoneBinding, Mesh, Submesh, VertexBuffers,
};

pub struct MeshImporter {}

impl MeshImporter {
    pub fn create_mesh(data: &MeshData) -> Mesh {
        let vertex_count = data.vertex_count();

        let bone_bindings = if data.bone_weights.iter().all(|weights| weights.is_empty()) {
            vec![]
        } else {
            if data.bone_weights.len() != vertex_count {
                warn!(
                    "Mesh has bone weights for {} of {} vertices, the rest stay unweighted",
                    data.bone_weights.len(),
                    vertex_count
                );
            }

            let overfull = data
                .bone_weights
                .iter()
                .filter(|weights| weights.len() > MAX_BONE_INFLUENCES)
                .count();
            if overfull > 0 {
                warn!(
                    "{} vertices have more than {} bone influences, keeping the strongest",
                    overfull, MAX_BONE_INFLUENCES
                );
            }

            (0..vertex_count)
                .map(|v| Self::bone_bindings(data.bone_weights.get(v).map(Vec::as_slice).unwrap_or(&[])))
                .collect_vec()
        };

        Mesh {
            vertex_buffers: VertexBuffers {
                position_buffer: data.positions.iter().map(|p| Vec3::from_array(*p)).collect_vec(),
                normals_buffer: data.normals.iter().map(|n| Vec3::from_array(*n)).collect_vec(),
                tangents_buffer: data.tangents.iter().map(|t| Vec4::from_array(*t)).collect_vec(),
                texcoord_buffer_0: data.uv0.iter().map(|uv| Vec2::from_array(*uv)).collect_vec(),
                texcoord_buffer_1: data.uv1.iter().map(|uv| Vec2::from_array(*uv)).collect_vec(),
                vertex_color_0: data.colors.iter().map(Self::color_to_rgba8).collect_vec(),
                bone_bindings,
            },
            submeshes: data
                .submeshes
                .iter()
                .map(|submesh| Submesh {
                    topology: submesh.topology,
                    indices: submesh.indices.clone(),
                })
                .collect_vec(),
            bind_poses: data.bind_poses.iter().map(Mat4::from_cols_array).collect_vec(),
            blendshapes: data
                .blendshapes
                .iter()
                .map(|shape| Blendshape {
                    name: shape.name.clone(),
                    frames: shape
                        .frames
                        .iter()
                        .map(|frame| BlendshapeFrame {
                            weight: frame.weight,
                            position_deltas: frame.position_deltas.iter().map(|d| Vec3::from_array(*d)).collect_vec(),
                            normal_deltas: frame.normal_deltas.iter().map(|d| Vec3::from_array(*d)).collect_vec(),
                        })
                        .collect_vec(),
                })
                .collect_vec(),
        }
    }

    fn bone_bindings(weights: &[BoneWeightData]) -> [BoneBinding; 4] {
        let mut bindings = [BoneBinding::default(); 4];
        let strongest = weights
            .iter()
            .sorted_by(|a, b| b.weight.total_cmp(&a.weight))
            .take(MAX_BONE_INFLUENCES);
        for (slot, weight) in bindings.iter_mut().zip(strongest) {
            slot.bone = weight.bone;
            slot.weight = weight.weight;
        }
        bindings
    }

    fn color_to_rgba8(color: &[f32; 4]) -> [u8; 4] {
        color.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}
