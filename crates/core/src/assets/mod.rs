//! Inline asset handling: detection, validation and extraction of `data:`
//! payloads embedded in a document.

pub mod extract;
pub mod inline;
pub mod validate;

/// Directory (relative to the repository root) that receives extracted assets.
pub const DEFAULT_UPLOAD_DIR: &str = "assets/uploads";

/// Per-asset ceiling on decoded bytes.
pub const DEFAULT_MAX_ASSET_BYTES: usize = 6 * 1024 * 1024;

/// Where extracted assets go and how large they may be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPolicy {
    pub upload_dir: String,
    pub max_bytes: usize,
}

impl Default for AssetPolicy {
    fn default() -> Self {
        Self {
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            max_bytes: DEFAULT_MAX_ASSET_BYTES,
        }
    }
}

impl AssetPolicy {
    /// Repository-relative path for the `index`-th asset of a publish pass.
    pub fn asset_path(&self, timestamp_ms: i64, index: usize, ext: &str) -> String {
        let dir = self.upload_dir.trim_matches('/');
        format!("{dir}/{timestamp_ms}-{index}.{ext}")
    }
}
