/// Implementation of `hdrkit validate`.
///
/// Runs every check the format allows without decompressing or decoding
/// payloads, and prints one line per check:
///
/// ```text
/// ✓ Header: valid gzip member header (23 bytes)
/// ✓ Header CRC: FHCRC matches
/// ✓ Trailer: present (CRC-32 0x3610A686, ISIZE 5)
/// ```
///
/// The first failing check prints a `✗` line and stops; the main
/// dispatcher turns the returned error into exit code 1.
///
/// ```text
/// ┌────────────┬─────────────────────────────────────────────────────┐
/// │ Format     │ Checks                                              │
/// ├────────────┼─────────────────────────────────────────────────────┤
/// │ gzip       │ header (magic, CM, reserved flags, FHCRC), trailer  │
/// │ riff / avi │ form header, size vs file, hdrl walk, stream count  │
/// │ id3v2      │ header, frame walk, then the MPEG audio checks      │
/// │ mpeg audio │ every frame parses, CRC-16 of protected frames      │
/// │ pdf        │ header line                                         │
/// └────────────┴─────────────────────────────────────────────────────┘
/// ```
use std::fs;

use anyhow::{Context, Result, anyhow};
use hdrkit_formats::gzip::TRAILER_LEN;
use hdrkit_formats::mpeg::StreamSummary;
use hdrkit_formats::riff::FourCc;
use hdrkit_formats::{
    AviHeaderList, Format, FormatError, FrameScanner, GzipHeader, GzipTrailer, HeaderCodec,
    Id3v2Tag, PdfHeader, RiffFormHeader, ScanConfig, sniff,
};

use crate::ValidateArgs;

/// Run the `hdrkit validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any check fails.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let mut lines = Vec::new();
    let outcome = validate(&bytes, &mut lines);
    for line in &lines {
        println!("✓ {line}");
    }
    match outcome {
        Ok(()) => Ok(()),
        Err(e) => {
            println!("✗ Error: {e}");
            Err(anyhow!("validation failed"))
        }
    }
}

/// Run the checks for whatever format `bytes` holds, pushing one line per
/// passed check onto `passed`.
///
/// # Errors
///
/// The first failed check.
pub fn validate(bytes: &[u8], passed: &mut Vec<String>) -> Result<(), FormatError> {
    let Some(format) = sniff(bytes) else {
        return Err(FormatError::MalformedHeader {
            format: "input",
            reason: "no known magic at offset 0".to_string(),
        });
    };
    match format {
        Format::Gzip => gzip(bytes, passed),
        Format::Riff => riff(bytes, passed),
        Format::Id3v2 => {
            let (tag, consumed) = Id3v2Tag::parse(bytes).into_result()?;
            passed.push(format!(
                "Tag: ID3v2.{}.{} with {} frame(s), {consumed} bytes",
                tag.header.version,
                tag.header.revision,
                tag.frames.len()
            ));
            mpeg(bytes, passed)
        }
        Format::MpegAudio => mpeg(bytes, passed),
        Format::Pdf => {
            let (header, _) = PdfHeader::parse(bytes).into_result()?;
            passed.push(format!("Header: %PDF-{}", header.version));
            Ok(())
        }
    }
}

fn gzip(bytes: &[u8], passed: &mut Vec<String>) -> Result<(), FormatError> {
    let (header, len) = GzipHeader::parse(bytes).into_result()?;
    passed.push(format!("Header: valid gzip member header ({len} bytes)"));
    if header.header_crc {
        passed.push("Header CRC: FHCRC matches".to_string());
    }
    if bytes.len() < len + TRAILER_LEN {
        return Err(FormatError::InsufficientData {
            needed: len + TRAILER_LEN - bytes.len(),
        }
        .at(len, "gzip trailer"));
    }
    let (trailer, _) = GzipTrailer::parse(&bytes[bytes.len() - TRAILER_LEN..]).into_result()?;
    passed.push(format!(
        "Trailer: present (CRC-32 {:#010X}, ISIZE {})",
        trailer.crc32, trailer.isize
    ));
    Ok(())
}

fn riff(bytes: &[u8], passed: &mut Vec<String>) -> Result<(), FormatError> {
    let (form, _) = RiffFormHeader::parse(bytes).into_result()?;
    passed.push(format!("Header: RIFF '{}'", form.form_type));

    let declared = 8 + u64::from(form.size);
    if declared > bytes.len() as u64 {
        return Err(FormatError::TruncatedContainer {
            tag: FourCc::RIFF,
            offset: 0,
            declared: u64::from(form.size),
            available: bytes.len().saturating_sub(8),
        });
    }
    passed.push(format!("Size: {declared} bytes declared, {} in file", bytes.len()));

    if form.form_type == FourCc::AVI {
        let hdrl = AviHeaderList::find_in_file(bytes)?;
        let found = hdrl.streams().count();
        passed.push(format!("Header list: 'hdrl' with {found} stream list(s)"));
        if found != hdrl.main.streams as usize {
            return Err(FormatError::MalformedHeader {
                format: "avi",
                reason: format!(
                    "main header declares {} stream(s), found {found}",
                    hdrl.main.streams
                ),
            });
        }
        passed.push("Streams: count matches main header".to_string());
    }
    Ok(())
}

fn mpeg(bytes: &[u8], passed: &mut Vec<String>) -> Result<(), FormatError> {
    let config = ScanConfig {
        verify_crc: true,
        ..ScanConfig::default()
    };
    let mut scanner = FrameScanner::with_config(bytes, config);
    let mut summary = StreamSummary::default();
    let mut protected = 0usize;
    for scanned in scanner.by_ref() {
        let scanned = scanned?;
        if scanned.frame.crc.is_some() {
            protected += 1;
        }
        summary.add(&scanned.frame);
    }
    if summary.frames == 0 {
        return Err(FormatError::MalformedHeader {
            format: "mpeg audio",
            reason: "no frames found".to_string(),
        });
    }
    passed.push(format!(
        "Frames: {} parsed, {:.3} s of audio",
        summary.frames,
        summary.duration.as_secs_f64()
    ));
    passed.push(format!("CRC: {protected} protected frame(s) verified"));
    if scanner.skipped_bytes() > 0 {
        passed.push(format!("Resync: {} junk byte(s) skipped", scanner.skipped_bytes()));
    }
    Ok(())
}
