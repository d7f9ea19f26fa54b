use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use log::{debug, trace};
use rigport_files::mesh::reader::MeshReader;
use rigport_files::scene::reader::SceneReader;
use rigport_files::scene::types::SceneDocument;

use crate::io::common::loader::RawAssetLoader;
use crate::io::fs::loader::FsLoader;

/// Reads a scene document and inlines the external mesh blobs it references, so the conversion
/// itself never touches the filesystem for meshes.
pub fn load_document(path: &Path) -> anyhow::Result<SceneDocument> {
    let file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
    let mut document = SceneReader::parse_document(&mut BufReader::new(file))
        .with_context(|| format!("Parsing {}", path.display()))?;
    debug!(
        "Read {}: {} nodes, {} assets",
        path.display(),
        document.root.subtree_len(),
        document.assets.len()
    );

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    inline_external_meshes(&mut document, &FsLoader::new(base_dir))?;
    Ok(document)
}

/// Returns how many meshes were inlined.
pub fn inline_external_meshes<L: RawAssetLoader>(document: &mut SceneDocument, loader: &L) -> anyhow::Result<usize> {
    let external = SceneReader::external_mesh_files(document);

    for (asset, file) in &external {
        let buf = loader
            .load_raw_owned(file)
            .with_context(|| format!("Loading mesh blob {} of {}", file, asset))?;
        let mesh = MeshReader::parse_mesh(&mut buf.as_slice())
            .with_context(|| format!("Parsing mesh blob {} of {}", file, asset))?;
        trace!("{}: {} vertices from {}", asset, mesh.vertex_count(), file);

        SceneReader::attach_mesh_data(document, *asset, mesh);
    }

    Ok(external.len())
}
