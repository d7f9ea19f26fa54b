use std::io::Read;

use crate::ParserError;
use crate::common::types::AssetId;
use crate::mesh::types::MeshData;
use crate::scene::types::{AssetPayload, SceneDocument};

pub struct SceneReader {}

impl SceneReader {
    pub fn parse_document<R: Read>(rdr: &mut R) -> Result<SceneDocument, ParserError> {
        let document: SceneDocument = serde_json::from_reader(rdr)?;
        SceneReader::check_document(&document)?;
        Ok(document)
    }

    pub fn parse_document_str(json: &str) -> Result<SceneDocument, ParserError> {
        let document: SceneDocument = serde_json::from_str(json)?;
        SceneReader::check_document(&document)?;
        Ok(document)
    }

    /// Mesh assets that still point at an external blob, as (asset, relative path).
    pub fn external_mesh_files(document: &SceneDocument) -> Vec<(AssetId, String)> {
        document
            .assets
            .iter()
            .filter_map(|asset| match &asset.payload {
                AssetPayload::Mesh(mesh) if mesh.data.is_none() => mesh.file.clone().map(|file| (asset.id, file)),
                _ => None,
            })
            .collect()
    }

    /// Replaces the external reference of a mesh asset with the loaded data.
    pub fn attach_mesh_data(document: &mut SceneDocument, asset: AssetId, data: MeshData) -> bool {
        for entry in document.assets.iter_mut().filter(|entry| entry.id == asset) {
            if let AssetPayload::Mesh(mesh) = &mut entry.payload {
                mesh.file = None;
                mesh.data = Some(data);
                return true;
            }
        }

        false
    }

    fn check_document(document: &SceneDocument) -> Result<(), ParserError> {
        if document.assets.iter().any(|asset| asset.id.is_null()) {
            return Err(ParserError::FormatError {
                reason: "Asset with the null identifier",
            });
        }

        Ok(())
    }
}
