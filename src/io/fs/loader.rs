use std::fs;
use std::path::{Path, PathBuf};

use log::trace;

use crate::io::common::loader::RawAssetLoader;

/// Reads side files relative to the directory of the scene document.
pub struct FsLoader {
    base_dir: PathBuf,
}

impl FsLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl RawAssetLoader for FsLoader {
    fn load_raw_owned(&self, path: &str) -> std::io::Result<Vec<u8>> {
        let full_path = self.base_dir.join(path);
        let buf = fs::read(&full_path)?;
        trace!("Loaded {} ({} bytes)", full_path.display(), buf.len());
        Ok(buf)
    }
}
