/// Where side files of a document (mesh blobs, textures) come from.
pub trait RawAssetLoader {
    /// in case of a caching implementation, this may need to clone the whole buffer!
    fn load_raw_owned(&self, path: &str) -> std::io::Result<Vec<u8>>;
}
