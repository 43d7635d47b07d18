/// hdrkit command-line tool: inspect and validate the headers of GZIP,
/// RIFF/AVI, MPEG audio, ID3v2 and PDF files.
///
/// # Command overview
///
/// ```text
/// hdrkit <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print the decoded header(s) of a file
///   validate   Check magic, reserved values, checksums and containers
///   frames     List the MPEG audio frames of a file
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Debug logging on stderr (RUST_LOG overrides)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                 |
/// |------|-----------------------------------------|
/// | 0    | Success                                 |
/// | 1    | Error (I/O failure, invalid file, etc.) |
///
/// Reports go to stdout; logs and error details go to stderr.
use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_frames;
mod cmd_inspect;
mod cmd_validate;
mod report;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hdrkit", version, about = "Binary container header toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log parser internals (container walks, resync, buffer top-ups).
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print the decoded header(s) of a file.
    Inspect(InspectArgs),
    /// Check a file's headers for structural and checksum errors.
    Validate(ValidateArgs),
    /// List the MPEG audio frames of a file.
    Frames(FramesArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `hdrkit inspect`.
///
/// The format is sniffed from the leading magic bytes.
#[derive(clap::Args)]
pub struct InspectArgs {
    pub file: PathBuf,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `hdrkit validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    pub file: PathBuf,
}

/// Arguments for `hdrkit frames`.
///
/// ```text
/// ┌────────────────┬──────────────────────────────────────────────┐
/// │ Flag           │ Effect                                       │
/// ├────────────────┼──────────────────────────────────────────────┤
/// │ --verify-crc   │ check the CRC-16 of protected frames         │
/// │ --no-skip-id3  │ treat a leading ID3v2 tag as junk            │
/// │ --max-frames N │ stop after N frames                          │
/// │ --quiet        │ summary line only                            │
/// └────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct FramesArgs {
    pub file: PathBuf,

    #[arg(long)]
    pub verify_crc: bool,

    #[arg(long)]
    pub no_skip_id3: bool,

    #[arg(long)]
    pub max_frames: Option<usize>,

    /// Print only the summary.
    #[arg(short, long)]
    pub quiet: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
        Commands::Frames(args) => cmd_frames::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
