use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use memmap2::Mmap;
use zip::ZipArchive;
use zip::result::ZipError;

use super::{ArchiveReader, Entry, ExtractError};

/// Shared read-only view of the archive bytes.
///
/// `ZipArchive` keeps its central directory behind an `Arc`, so cloning the
/// archive only clones the reader. Backing the reader with a shared mmap
/// gives every worker an independent cursor over the same pages, which is
/// what makes concurrent entry reads safe.
#[derive(Clone)]
struct SharedMmap(Arc<Mmap>);

impl AsRef<[u8]> for SharedMmap {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

type ArchiveCursor = Cursor<SharedMmap>;

/// ZIP-backed archive reader.
///
/// Owns the opened archive for the lifetime of the run and holds the
/// optional decryption password applied to every encrypted entry.
pub struct ZipReader {
    archive: ZipArchive<ArchiveCursor>,
    entries: Vec<Entry>,
    password: Option<String>,
}

impl ZipReader {
    /// Open an archive and parse its central directory.
    ///
    /// Any failure here (missing file, not a ZIP) is fatal pre-flight: no
    /// extraction has started yet.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open archive: {}", path.display()))?;
        // Safety: the mapping is read-only and the archive file is not
        // expected to be truncated underneath a running extraction.
        let map = unsafe { Mmap::map(&file) }
            .with_context(|| format!("failed to map archive: {}", path.display()))?;
        let cursor = Cursor::new(SharedMmap(Arc::new(map)));
        let mut archive = ZipArchive::new(cursor)
            .with_context(|| format!("not a valid ZIP archive: {}", path.display()))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let raw = archive
                .by_index_raw(index)
                .with_context(|| format!("failed to read entry {index} of {}", path.display()))?;
            let name = raw.name().to_string();
            entries.push(Entry {
                is_dir: name.ends_with('/') || name.ends_with('\\'),
                index,
                uncompressed_size: raw.size(),
                compressed_size: raw.compressed_size(),
                encrypted: raw.encrypted(),
                name,
            });
        }
        tracing::debug!(entries = entries.len(), "opened archive");

        Ok(Self {
            archive,
            entries,
            password: None,
        })
    }

    /// Set the password used to decrypt encrypted entries.
    ///
    /// Unencrypted entries ignore it. A wrong password surfaces as a
    /// per-entry failure at extraction time, not here.
    pub fn set_password(&mut self, secret: String) {
        self.password = Some(secret);
    }
}

#[async_trait]
impl ArchiveReader for ZipReader {
    fn entries(&self) -> &[Entry] {
        &self.entries
    }

    async fn extract_entry(&self, entry: &Entry, dest_root: &Path) -> Result<(), ExtractError> {
        // Decompression and the destination write are blocking work; run them
        // on the blocking pool with a private clone of the archive cursor.
        let archive = self.archive.clone();
        let password = self.password.clone();
        let entry = entry.clone();
        let dest_root = dest_root.to_path_buf();
        tokio::task::spawn_blocking(move || extract_blocking(archive, password, &entry, &dest_root))
            .await
            .map_err(|e| ExtractError::Other(format!("extraction task aborted: {e}")))?
    }
}

fn extract_blocking(
    mut archive: ZipArchive<ArchiveCursor>,
    password: Option<String>,
    entry: &Entry,
    dest_root: &Path,
) -> Result<(), ExtractError> {
    let out_path = entry
        .resolved_path(dest_root)
        .ok_or_else(|| ExtractError::PathConflict(entry.name.clone()))?;

    if entry.is_dir {
        return create_dir(&out_path);
    }

    let mut reader = match &password {
        Some(secret) => archive.by_index_decrypt(entry.index, secret.as_bytes()),
        None => archive.by_index(entry.index),
    }
    .map_err(|e| classify_zip_error(&entry.name, e))?;

    // Archives without explicit directory entries still need the parents.
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| classify_io_error(parent, e))?;
        }
    }

    let mut out = File::create(&out_path).map_err(|e| classify_io_error(&out_path, e))?;
    // The zip reader verifies the CRC as it drains; a mismatch or truncated
    // stream shows up here as an I/O error.
    io::copy(&mut reader, &mut out).map_err(|e| classify_io_error(&out_path, e))?;

    Ok(())
}

fn create_dir(path: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(path).map_err(|e| classify_io_error(path, e))
}

fn classify_zip_error(name: &str, err: ZipError) -> ExtractError {
    match err {
        ZipError::InvalidPassword => ExtractError::WrongPassword,
        ZipError::UnsupportedArchive(msg) if msg.contains("assword") => {
            ExtractError::WrongPassword
        }
        ZipError::InvalidArchive(msg) => ExtractError::CorruptData(format!("{name}: {msg}")),
        ZipError::Io(e) => classify_io_error(Path::new(name), e),
        other => ExtractError::Other(format!("{name}: {other}")),
    }
}

fn classify_io_error(path: &Path, err: io::Error) -> ExtractError {
    let detail = format!("{}: {err}", path.display());
    match err.kind() {
        io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied(detail),
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            ExtractError::CorruptData(detail)
        }
        _ => ExtractError::Other(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::unstable::write::FileOptionsExt;
    use zip::write::SimpleFileOptions;

    fn write_plain_archive(path: &Path) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let opts = SimpleFileOptions::default();

        writer.add_directory("sub/", opts).unwrap();
        writer.start_file("sub/a.txt", opts).unwrap();
        writer.write_all(b"alpha").unwrap();
        writer.start_file("sub/b.bin", opts).unwrap();
        writer.write_all(&[0u8, 1, 2, 3, 255]).unwrap();
        writer.start_file("top.txt", opts).unwrap();
        writer.write_all(b"top level").unwrap();
        writer.finish().unwrap();
    }

    fn write_encrypted_archive(path: &Path, password: &str) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let plain = SimpleFileOptions::default();
        let secret = plain.with_deprecated_encryption(password.as_bytes());

        writer.start_file("open.txt", plain).unwrap();
        writer.write_all(b"not encrypted").unwrap();
        writer.start_file("locked.txt", secret).unwrap();
        writer.write_all(b"encrypted payload").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn open_lists_entries_in_archive_order() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("t.zip");
        write_plain_archive(&archive_path);

        let reader = ZipReader::open(&archive_path).unwrap();
        let names: Vec<_> = reader.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["sub/", "sub/a.txt", "sub/b.bin", "top.txt"]);
        assert!(reader.entries()[0].is_dir);
        assert!(!reader.entries()[1].is_dir);
        assert_eq!(reader.entries()[1].uncompressed_size, 5);
        assert!(!reader.entries()[1].encrypted);
    }

    #[test]
    fn open_rejects_non_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.zip");
        fs::write(&path, b"just some text").unwrap();
        assert!(ZipReader::open(&path).is_err());
    }

    #[tokio::test]
    async fn extracts_byte_identical_contents() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("t.zip");
        write_plain_archive(&archive_path);
        let dest = dir.path().join("out");

        let reader = ZipReader::open(&archive_path).unwrap();
        for entry in reader.entries().to_vec() {
            reader.extract_entry(&entry, &dest).await.unwrap();
        }

        assert_eq!(fs::read(dest.join("sub/a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(dest.join("sub/b.bin")).unwrap(), [0u8, 1, 2, 3, 255]);
        assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"top level");
        assert!(dest.join("sub").is_dir());
    }

    #[tokio::test]
    async fn creates_missing_parents_for_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("t.zip");
        // No directory entry for "deep/" at all.
        let file = File::create(&archive_path).unwrap();
        let mut writer = ZipWriter::new(file);
        writer
            .start_file("deep/nested/file.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"x").unwrap();
        writer.finish().unwrap();

        let dest = dir.path().join("out");
        let reader = ZipReader::open(&archive_path).unwrap();
        let entry = reader.entries()[0].clone();
        reader.extract_entry(&entry, &dest).await.unwrap();
        assert_eq!(fs::read(dest.join("deep/nested/file.txt")).unwrap(), b"x");
    }

    #[tokio::test]
    async fn traversal_names_fail_with_path_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("t.zip");
        write_plain_archive(&archive_path);
        let dest = dir.path().join("out");

        let reader = ZipReader::open(&archive_path).unwrap();
        let mut entry = reader.entries()[1].clone();
        entry.name = "../evil.txt".to_string();

        let err = reader.extract_entry(&entry, &dest).await.unwrap_err();
        assert!(matches!(err, ExtractError::PathConflict(_)));
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn wrong_password_fails_only_encrypted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("t.zip");
        write_encrypted_archive(&archive_path, "secret");
        let dest = dir.path().join("out");

        let mut reader = ZipReader::open(&archive_path).unwrap();
        reader.set_password("wrong".to_string());

        let entries = reader.entries().to_vec();
        assert!(!entries[0].encrypted);
        assert!(entries[1].encrypted);

        // Password is ignored for the unencrypted entry.
        reader.extract_entry(&entries[0], &dest).await.unwrap();
        assert_eq!(fs::read(dest.join("open.txt")).unwrap(), b"not encrypted");

        // ZipCrypto detects most wrong passwords up front via its check byte;
        // the rest fail the CRC after decompression.
        let err = reader.extract_entry(&entries[1], &dest).await.unwrap_err();
        assert!(matches!(
            err,
            ExtractError::WrongPassword | ExtractError::CorruptData(_)
        ));
    }

    #[tokio::test]
    async fn missing_password_is_a_per_entry_failure() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("t.zip");
        write_encrypted_archive(&archive_path, "secret");
        let dest = dir.path().join("out");

        let reader = ZipReader::open(&archive_path).unwrap();
        let entries = reader.entries().to_vec();
        reader.extract_entry(&entries[0], &dest).await.unwrap();
        let err = reader.extract_entry(&entries[1], &dest).await.unwrap_err();
        assert!(matches!(err, ExtractError::WrongPassword));
    }

    #[tokio::test]
    async fn correct_password_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("t.zip");
        write_encrypted_archive(&archive_path, "secret");
        let dest = dir.path().join("out");

        let mut reader = ZipReader::open(&archive_path).unwrap();
        reader.set_password("secret".to_string());
        for entry in reader.entries().to_vec() {
            reader.extract_entry(&entry, &dest).await.unwrap();
        }
        assert_eq!(
            fs::read(dest.join("locked.txt")).unwrap(),
            b"encrypted payload"
        );
    }
}
