//! Code bundle assets.
//!
//! The function code is referenced, never built: the bundle path must already
//! exist. Its content hash becomes the asset key, so the key changes exactly
//! when the bundle content does.

use crate::error::SynthError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const INPUT: &str = "code_bundle_path";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAsset {
    pub source: PathBuf,
    /// Lowercase hex SHA-256 of the bundle content.
    pub hash: String,
}

impl CodeAsset {
    /// Validate and fingerprint the bundle at `path` (a file or a directory).
    pub fn from_path(path: &Path) -> Result<Self, SynthError> {
        if path.as_os_str().is_empty() {
            return Err(SynthError::configuration(INPUT, "no code bundle path given"));
        }
        let metadata = std::fs::metadata(path).map_err(|e| {
            SynthError::configuration(
                INPUT,
                format!("cannot read code bundle '{}': {}", path.display(), e),
            )
        })?;
        let hash = if metadata.is_dir() {
            hash_directory(path)?
        } else {
            let bytes = std::fs::read(path).map_err(|e| unreadable(path, e))?;
            format!("{:x}", Sha256::digest(&bytes))
        };
        tracing::debug!(path = %path.display(), %hash, "fingerprinted code bundle");
        Ok(CodeAsset {
            source: path.to_path_buf(),
            hash,
        })
    }

    /// Object key under which the packaged bundle is uploaded.
    pub fn object_key(&self) -> String {
        format!("{}.zip", self.hash)
    }
}

fn hash_directory(root: &Path) -> Result<String, SynthError> {
    let mut hasher = Sha256::new();
    let mut files = 0usize;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            SynthError::configuration(
                INPUT,
                format!("cannot walk code bundle '{}': {}", root.display(), e),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path());
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let bytes = std::fs::read(entry.path()).map_err(|e| unreadable(entry.path(), e))?;
        hasher.update(relative.join("/").as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
        hasher.update([0u8]);
        files += 1;
    }
    if files == 0 {
        return Err(SynthError::configuration(
            INPUT,
            format!("code bundle '{}' contains no files", root.display()),
        ));
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn unreadable(path: &Path, e: std::io::Error) -> SynthError {
    SynthError::configuration(INPUT, format!("cannot read '{}': {}", path.display(), e))
}
