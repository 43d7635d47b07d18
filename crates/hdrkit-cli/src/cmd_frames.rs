/// Implementation of `hdrkit frames`.
///
/// Walks every MPEG audio frame of a file, skipping a leading ID3v2 tag
/// and any junk between frames, and prints one line per frame followed
/// by a summary:
///
/// ```text
///        0  MPEG Version 1, Layer III, 128 kbps, 44100 Hz, Stereo, 417 bytes, 26.122 ms
///      417  MPEG Version 1, Layer III, 128 kbps, 44100 Hz, Stereo, 417 bytes, 26.122 ms
/// frames: 2, audio bytes: 826, duration: 52.244 ms, skipped: 0
/// ```
use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use hdrkit_formats::mpeg::StreamSummary;
use hdrkit_formats::{FrameScanner, ScanConfig};

use crate::FramesArgs;
use crate::report::millis;

/// Run the `hdrkit frames` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a protected frame fails
/// its CRC check under `--verify-crc`, or the stream stops resynchronising.
pub fn run(args: &FramesArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let config = ScanConfig {
        skip_id3v2: !args.no_skip_id3,
        verify_crc: args.verify_crc,
        max_frames: args.max_frames,
        ..ScanConfig::default()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    list(&bytes, config, args.quiet, &mut out)
        .with_context(|| format!("failed to walk {}", args.file.display()))
}

/// Write the frame listing and summary for `bytes` to `out`.
///
/// # Errors
///
/// A scan error, or a write error on `out`.
pub fn list(bytes: &[u8], config: ScanConfig, quiet: bool, out: &mut impl Write) -> Result<()> {
    let mut scanner = FrameScanner::with_config(bytes, config);
    let mut summary = StreamSummary::default();
    for scanned in scanner.by_ref() {
        let scanned = scanned?;
        if !quiet {
            writeln!(out, "{:>8}  {}", scanned.offset, scanned.frame.header)?;
        }
        summary.add(&scanned.frame);
    }
    if scanner.id3v2_len() > 0 && !quiet {
        writeln!(out, "id3v2 tag: {} bytes", scanner.id3v2_len())?;
    }
    writeln!(
        out,
        "frames: {}, audio bytes: {}, duration: {}, skipped: {}",
        summary.frames,
        summary.audio_bytes,
        millis(summary.duration),
        scanner.skipped_bytes()
    )?;
    Ok(())
}
