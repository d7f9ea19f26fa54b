use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::ParserError;
use crate::common::reader::{Parseable, read_counted_array, read_string};
use crate::mesh::types::{
    BlendshapeData, BlendshapeFrameData, BoneWeightData, FOURCC_MESH, MAX_BONE_INFLUENCES, MESH_FORMAT_VERSION,
    MeshData, SubmeshData, Topology,
};

impl Parseable<BoneWeightData> for BoneWeightData {
    fn parse<R: Read>(rdr: &mut R) -> Result<BoneWeightData, ParserError> {
        Ok(BoneWeightData {
            bone: rdr.read_u32::<LittleEndian>()?,
            weight: rdr.read_f32::<LittleEndian>()?,
        })
    }
}

impl Parseable<SubmeshData> for SubmeshData {
    fn parse<R: Read>(rdr: &mut R) -> Result<SubmeshData, ParserError> {
        let topology = Topology::from_u8(rdr.read_u8()?).ok_or(ParserError::FormatError {
            reason: "Unknown submesh topology",
        })?;

        Ok(SubmeshData {
            topology,
            indices: read_counted_array(rdr)?,
        })
    }
}

impl Parseable<BlendshapeFrameData> for BlendshapeFrameData {
    fn parse<R: Read>(rdr: &mut R) -> Result<BlendshapeFrameData, ParserError> {
        Ok(BlendshapeFrameData {
            weight: rdr.read_f32::<LittleEndian>()?,
            position_deltas: read_counted_array(rdr)?,
            normal_deltas: read_counted_array(rdr)?,
        })
    }
}

impl Parseable<BlendshapeData> for BlendshapeData {
    fn parse<R: Read>(rdr: &mut R) -> Result<BlendshapeData, ParserError> {
        Ok(BlendshapeData {
            name: read_string(rdr)?,
            frames: read_counted_array(rdr)?,
        })
    }
}

pub struct MeshReader {}

impl MeshReader {
    pub fn parse_mesh<R: Read>(rdr: &mut R) -> Result<MeshData, ParserError> {
        let magic = rdr.read_u32::<LittleEndian>()?;
        if magic != FOURCC_MESH {
            return Err(ParserError::InvalidMagicValue { magic });
        }

        let version = rdr.read_u32::<LittleEndian>()?;
        if version != MESH_FORMAT_VERSION {
            return Err(ParserError::UnsupportedVersion { version });
        }

        let positions = read_counted_array(rdr)?;
        let normals = read_counted_array(rdr)?;
        let tangents = read_counted_array(rdr)?;
        let colors = read_counted_array(rdr)?;
        let uv0 = read_counted_array(rdr)?;
        let uv1 = read_counted_array(rdr)?;
        let bind_poses = read_counted_array(rdr)?;
        let bone_weights = MeshReader::read_bone_weights(rdr)?;
        let submeshes = read_counted_array(rdr)?;
        let blendshapes = read_counted_array(rdr)?;

        Ok(MeshData {
            positions,
            normals,
            tangents,
            colors,
            uv0,
            uv1,
            bind_poses,
            bone_weights,
            submeshes,
            blendshapes,
        })
    }

    // Per vertex: a u8 influence count followed by (u32 bone, f32 weight) pairs.
    fn read_bone_weights<R: Read>(rdr: &mut R) -> Result<Vec<Vec<BoneWeightData>>, ParserError> {
        let vertex_count = rdr.read_u32::<LittleEndian>()? as usize;
        let mut weights = Vec::with_capacity(vertex_count.min(1 << 16));

        for _ in 0..vertex_count {
            let influences = rdr.read_u8()? as usize;
            if influences > MAX_BONE_INFLUENCES {
                return Err(ParserError::FormatError {
                    reason: "Vertex has more than four bone influences",
                });
            }

            let mut vertex = Vec::with_capacity(influences);
            for _ in 0..influences {
                vertex.push(BoneWeightData::parse(rdr)?);
            }
            weights.push(vertex);
        }

        Ok(weights)
    }
}
