use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Default worker pool size. The work is I/O-bound, so this deliberately
/// oversubscribes CPU cores.
pub const DEFAULT_WORKERS: NonZeroUsize = NonZeroUsize::new(100).unwrap();

#[derive(Parser, Debug)]
#[command(name = "punzip")]
#[command(version)]
#[command(about = "Extract ZIP archives in parallel", long_about = None)]
#[command(after_help = "Examples:\n  \
  punzip data.zip -d out/        extract data.zip into out/\n  \
  punzip -n 16 big.zip           extract with a pool of 16 workers\n  \
  punzip -p hunter2 vault.zip    extract an encrypted archive\n  \
  punzip -l data.zip             list the archive contents")]
pub struct Cli {
    /// ZIP file to extract
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Extract files into DIR (created if missing)
    #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = "./")]
    pub dir: PathBuf,

    /// Number of parallel extraction workers
    #[arg(
        short = 'n',
        long = "num-threads",
        value_name = "N",
        default_value_t = DEFAULT_WORKERS
    )]
    pub num_threads: NonZeroUsize,

    /// Password for encrypted entries
    #[arg(short = 'p', long = "password", value_name = "SECRET")]
    pub password: Option<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List files verbosely
    #[arg(short = 'v')]
    pub verbose: bool,
}
