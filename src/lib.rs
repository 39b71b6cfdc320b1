//! # punzip
//!
//! A parallel unzip utility.
//!
//! This library extracts the contents of a ZIP archive to a destination
//! directory, fanning per-entry extraction out across a bounded worker pool.
//! On archives with many small files the dominant cost per entry is I/O
//! wait, so running up to `N` extractions at once cuts wall-clock time well
//! below a sequential unzip.
//!
//! ## Pipeline
//!
//! 1. [`ZipReader::open`] maps the archive and parses its listing (fatal on
//!    failure — nothing has been extracted yet).
//! 2. [`extract::create_directories`] creates the destination root and every
//!    directory entry, idempotently, as a synchronous barrier.
//! 3. [`extract::extract_archive`] spawns one task per file entry, bounded
//!    by a semaphore of `N` permits, and drains outcomes in completion
//!    order. A failed entry is captured in its [`extract::TaskOutcome`] and
//!    never stops the batch.
//! 4. [`Reporter`] renders live progress and one error line per failure.
//!
//! ## Example
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//! use std::path::Path;
//! use std::sync::Arc;
//! use punzip::archive::ArchiveReader;
//! use punzip::{ZipReader, extract};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(ZipReader::open(Path::new("archive.zip"))?);
//!     let dest = Path::new("out");
//!
//!     extract::create_directories(reader.entries(), dest)?;
//!     let workers = NonZeroUsize::new(100).unwrap();
//!     let summary = extract::extract_archive(reader, dest, workers, |outcome| {
//!         if let Some(error) = &outcome.error {
//!             eprintln!("ERROR: {}: {error}", outcome.entry_name);
//!         }
//!     })
//!     .await;
//!
//!     println!("{} extracted, {} failed", summary.total - summary.failed, summary.failed);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod extract;
pub mod progress;

pub use archive::{ArchiveReader, Entry, ExtractError, ZipReader};
pub use cli::Cli;
pub use extract::{ExtractSummary, TaskOutcome};
pub use progress::Reporter;
