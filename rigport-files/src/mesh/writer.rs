use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::ParserError;
use crate::common::writer::{Writable, write_counted_array, write_string};
use crate::mesh::types::{
    BlendshapeData, BlendshapeFrameData, BoneWeightData, FOURCC_MESH, MAX_BONE_INFLUENCES, MESH_FORMAT_VERSION,
    MeshData, SubmeshData,
};

impl Writable for BoneWeightData {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError> {
        w.write_u32::<LittleEndian>(self.bone)?;
        w.write_f32::<LittleEndian>(self.weight)?;
        Ok(())
    }
}

impl Writable for SubmeshData {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError> {
        w.write_u8(self.topology.as_u8())?;
        write_counted_array(w, &self.indices)
    }
}

impl Writable for BlendshapeFrameData {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError> {
        w.write_f32::<LittleEndian>(self.weight)?;
        write_counted_array(w, &self.position_deltas)?;
        write_counted_array(w, &self.normal_deltas)
    }
}

impl Writable for BlendshapeData {
    fn write<W: Write>(&self, w: &mut W) -> Result<(), ParserError> {
        write_string(w, &self.name)?;
        write_counted_array(w, &self.frames)
    }
}

pub struct MeshWriter {}

impl MeshWriter {
    pub fn write_mesh<W: Write>(w: &mut W, mesh: &MeshData) -> Result<(), ParserError> {
        w.write_u32::<LittleEndian>(FOURCC_MESH)?;
        w.write_u32::<LittleEndian>(MESH_FORMAT_VERSION)?;

        write_counted_array(w, &mesh.positions)?;
        write_counted_array(w, &mesh.normals)?;
        write_counted_array(w, &mesh.tangents)?;
        write_counted_array(w, &mesh.colors)?;
        write_counted_array(w, &mesh.uv0)?;
        write_counted_array(w, &mesh.uv1)?;
        write_counted_array(w, &mesh.bind_poses)?;

        w.write_u32::<LittleEndian>(mesh.bone_weights.len() as u32)?;
        for vertex in &mesh.bone_weights {
            if vertex.len() > MAX_BONE_INFLUENCES {
                return Err(ParserError::FormatError {
                    reason: "Vertex has more than four bone influences",
                });
            }

            w.write_u8(vertex.len() as u8)?;
            for weight in vertex {
                weight.write(w)?;
            }
        }

        write_counted_array(w, &mesh.submeshes)?;
        write_counted_array(w, &mesh.blendshapes)
    }
}
