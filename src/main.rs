//! Main entry point for the punzip CLI application.
//!
//! This binary extracts ZIP archives to a destination directory, running
//! per-entry extraction across a bounded worker pool so archives with many
//! small files finish faster than a sequential unzip.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use punzip::archive::{ArchiveReader, Entry};
use punzip::{Cli, Reporter, ZipReader, extract};

/// Application entry point.
///
/// Parses command-line arguments, opens the archive, and either lists its
/// contents or runs the parallel extraction pipeline. The process exits
/// non-zero if the archive cannot be opened or if any entry failed.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut reader = ZipReader::open(&cli.file)?;
    if let Some(secret) = cli.password.clone() {
        reader.set_password(secret);
    }

    // List mode: display archive contents and exit
    if cli.list || cli.verbose {
        list_entries(reader.entries(), cli.verbose);
        return Ok(());
    }

    extract_all(Arc::new(reader), &cli).await
}

/// Run the extraction pipeline: directory barrier, fan-out, fan-in.
///
/// Directory entries are created synchronously before any file task is
/// spawned; per-entry failures are reported inline and only surface in the
/// final exit status.
async fn extract_all(reader: Arc<ZipReader>, cli: &Cli) -> Result<()> {
    extract::create_directories(reader.entries(), &cli.dir).with_context(|| {
        format!(
            "failed to create destination directories under {}",
            cli.dir.display()
        )
    })?;

    let file_count = reader.entries().iter().filter(|e| !e.is_dir).count();
    let mut reporter = Reporter::new(file_count as u64);

    let summary = extract::extract_archive(reader, &cli.dir, cli.num_threads, |outcome| {
        reporter.observe(outcome)
    })
    .await;
    reporter.finish();

    if summary.failed > 0 {
        bail!(
            "{} of {} entries failed to extract",
            summary.failed,
            summary.total
        );
    }
    Ok(())
}

/// List archive entries.
///
/// Supports two output formats:
/// - Simple format (`-l`): just entry names, one per line
/// - Verbose format (`-v`): table with sizes and compression ratio
fn list_entries(entries: &[Entry], verbose: bool) {
    if !verbose {
        for entry in entries {
            println!("{}", entry.name);
        }
        return;
    }

    println!("{:>10}  {:>10}  {:>5}  Name", "Length", "Size", "Cmpr");
    println!("{}", "-".repeat(60));

    // Track totals for the summary line, excluding directories
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        println!(
            "{:>10}  {:>10}  {}  {}{}",
            entry.uncompressed_size,
            entry.compressed_size,
            compression_ratio(entry.compressed_size, entry.uncompressed_size),
            entry.name,
            if entry.encrypted { "  [encrypted]" } else { "" }
        );
        if !entry.is_dir {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(60));
    println!(
        "{:>10}  {:>10}  {}  {} files",
        total_uncompressed,
        total_compressed,
        compression_ratio(total_compressed, total_uncompressed),
        file_count
    );
}

/// Compression ratio as percentage saved, `"  0%"` for empty entries.
///
/// Tiny or incompressible entries can grow under deflate framing, making
/// the stored size exceed the original; that clamps to 0% rather than
/// underflowing.
fn compression_ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 {
        format!("{:>4}%", 100u64.saturating_sub(compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}
