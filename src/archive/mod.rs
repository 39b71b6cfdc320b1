mod zip;

pub use zip::ZipReader;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A failure extracting a single archive entry.
///
/// These are captured per entry and reported inline; they never abort the
/// rest of the batch.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The entry's compressed stream is damaged or its checksum does not match.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// The destination filesystem refused the write.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The entry name resolves outside the destination directory.
    #[error("entry path escapes the destination: {0}")]
    PathConflict(String),

    /// The entry is encrypted and the password is wrong or missing.
    #[error("wrong or missing password")]
    WrongPassword,

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// One item from the archive's directory listing.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Relative path inside the archive, forward-slash separated.
    pub name: String,
    /// True iff the name ends with a path separator.
    pub is_dir: bool,
    /// Position in the archive's central directory.
    pub index: usize,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub encrypted: bool,
}

impl Entry {
    /// Resolve this entry's output path under `root`, normalizing the name.
    ///
    /// Returns `None` for names that would land outside `root`: absolute
    /// names, or names with more `..` components than parents. Empty and `.`
    /// components are dropped.
    pub fn resolved_path(&self, root: &Path) -> Option<PathBuf> {
        if self.name.starts_with('/') || self.name.starts_with('\\') {
            return None;
        }
        let mut parts: Vec<&str> = Vec::new();
        for component in self.name.split(['/', '\\']) {
            match component {
                "" | "." => {}
                ".." => {
                    parts.pop()?;
                }
                _ => parts.push(component),
            }
        }
        if parts.is_empty() {
            return None;
        }
        let mut path = root.to_path_buf();
        path.extend(parts);
        Some(path)
    }
}

/// Trait for reading entries out of an opened archive container.
///
/// Implementations must support concurrent `extract_entry` calls for
/// independent entries; the scheduler issues up to the configured pool size
/// of them at once.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// All entries, in the archive's listing order.
    fn entries(&self) -> &[Entry];

    /// Extract one entry beneath `dest_root`.
    async fn extract_entry(&self, entry: &Entry, dest_root: &Path) -> Result<(), ExtractError>;
}
