/// Implementation of `hdrkit inspect`.
///
/// Sniffs the format from the leading magic, decodes the header(s) and
/// prints one section per structure:
///
/// ```text
/// Format: gzip
/// [gzip member header]
///   length     23
///   flags      FNAME
///   mtime      0
///   os         Unix
///   filename   hello.txt
/// [gzip member trailer]
///   crc32      0x3610A686
///   isize      5
/// ```
///
/// ID3v2 files also get a section for the first MPEG audio frame after
/// the tag; AVI files get the `hdrl` list.
use std::fs;

use anyhow::{Context, Result, bail};
use hdrkit_formats::avi::HdrlEntry;
use hdrkit_formats::gzip::latin1;
use hdrkit_formats::mpeg::ChannelMode;
use hdrkit_formats::{
    AviHeaderList, Format, FrameScanner, GzipFlags, GzipHeader, GzipTrailer, HeaderCodec,
    Id3v2Flags, Id3v2Header, Id3v2Tag, MpegAudioHeader, PdfHeader, RiffFormHeader, sniff,
};
use hdrkit_formats::gzip::TRAILER_LEN;
use hdrkit_formats::pdf::LineEnding;
use hdrkit_formats::riff::FourCc;

use crate::InspectArgs;
use crate::report::{Report, Section, flag_list, millis, yes_no};

/// Run the `hdrkit inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, its format is not
/// recognised, or its header does not decode.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let report =
        build(&bytes).with_context(|| format!("failed to inspect {}", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}

/// Decode whatever `bytes` holds into a report.
pub fn build(bytes: &[u8]) -> Result<Report> {
    let Some(format) = sniff(bytes) else {
        bail!("unrecognised format");
    };
    let mut report = Report::new(format.name());
    match format {
        Format::Gzip => gzip(bytes, &mut report)?,
        Format::Riff => riff(bytes, &mut report)?,
        Format::Id3v2 => id3v2(bytes, &mut report)?,
        Format::MpegAudio => first_frame(bytes, &mut report)?,
        Format::Pdf => pdf(bytes, &mut report)?,
    }
    Ok(report)
}

// ── GZIP ──────────────────────────────────────────────────────────────────────

fn gzip(bytes: &[u8], report: &mut Report) -> Result<()> {
    let (header, len) = GzipHeader::parse(bytes)
        .into_result()
        .context("invalid gzip member header")?;
    report.push(gzip_section(&header, len));

    if bytes.len() >= len + TRAILER_LEN {
        let (trailer, _) = GzipTrailer::parse(&bytes[bytes.len() - TRAILER_LEN..])
            .into_result()
            .context("invalid gzip trailer")?;
        report.push(
            Section::new("gzip member trailer")
                .field("crc32", format!("{:#010X}", trailer.crc32))
                .field("isize", trailer.isize),
        );
    }
    Ok(())
}

fn gzip_section(header: &GzipHeader, len: usize) -> Section {
    let flags = header.flags();
    let names: Vec<&str> = [
        (GzipFlags::FTEXT, "FTEXT"),
        (GzipFlags::FHCRC, "FHCRC"),
        (GzipFlags::FEXTRA, "FEXTRA"),
        (GzipFlags::FNAME, "FNAME"),
        (GzipFlags::FCOMMENT, "FCOMMENT"),
    ]
    .into_iter()
    .filter(|(flag, _)| flags.contains(*flag))
    .map(|(_, name)| name)
    .collect();

    let mut section = Section::new("gzip member header")
        .field("length", len)
        .field("flags", flag_list(&names))
        .field("mtime", header.mtime)
        .field("xfl", format!("{:#04X}", header.xfl))
        .field("os", header.os)
        .field_opt("filename", header.filename.as_deref().map(latin1))
        .field_opt("comment", header.comment.as_deref().map(latin1));
    if let Some(extra) = &header.extra {
        section = section.field("extra", format!("{} bytes", extra.len()));
        for sub in header.subfields() {
            section = match sub {
                Ok(sub) => section.field(
                    format!("  subfield {}", String::from_utf8_lossy(&sub.id)),
                    format!("{} bytes", sub.data.len()),
                ),
                Err(e) => section.field("  subfield", format!("unreadable: {e}")),
            };
        }
    }
    if header.header_crc {
        section = section.field("header crc", "present, verified");
    }
    section
}

// ── RIFF / AVI ────────────────────────────────────────────────────────────────

fn riff(bytes: &[u8], report: &mut Report) -> Result<()> {
    let (form, _) = RiffFormHeader::parse(bytes)
        .into_result()
        .context("invalid RIFF header")?;
    report.push(
        Section::new("riff header")
            .field("form type", form.form_type)
            .field("declared size", form.size)
            .field("file size", bytes.len()),
    );
    if form.form_type != FourCc::AVI {
        return Ok(());
    }

    let hdrl = AviHeaderList::find_in_file(bytes).context("invalid AVI header list")?;
    report.push(avi_main_section(&hdrl));
    let mut stream_index = 0;
    for entry in &hdrl.entries {
        match entry {
            HdrlEntry::Stream(stream) => {
                let mut section = Section::new(format!("stream {stream_index}"));
                for chunk in &stream.chunks {
                    let size = format!("{} bytes", chunk.body.len());
                    section = section.field(chunk.tag.to_string(), size);
                }
                report.push(section);
                stream_index += 1;
            }
            HdrlEntry::Other(chunk) => report.push(
                Section::new(format!("hdrl chunk '{}'", chunk.tag))
                    .field("size", chunk.body.len()),
            ),
        }
    }
    Ok(())
}

fn avi_main_section(hdrl: &AviHeaderList) -> Section {
    let main = &hdrl.main;
    Section::new("avi main header")
        .field("microseconds per frame", main.micro_sec_per_frame)
        .field_opt("frame rate", main.frame_rate().map(|r| format!("{r:.3} fps")))
        .field("max bytes per second", main.max_bytes_per_sec)
        .field("padding granularity", main.padding_granularity)
        .field("flags", flag_list(&main.flags.names()))
        .field("total frames", main.total_frames)
        .field("initial frames", main.initial_frames)
        .field("streams", main.streams)
        .field("suggested buffer size", main.suggested_buffer_size)
        .field("dimensions", format!("{}x{}", main.width, main.height))
        .field("duration", format!("{:.3} s", main.total_duration().as_secs_f64()))
}

// ── ID3v2 / MPEG audio ────────────────────────────────────────────────────────

fn id3v2(bytes: &[u8], report: &mut Report) -> Result<()> {
    let (header, _) = Id3v2Header::parse(bytes)
        .into_result()
        .context("invalid ID3v2 header")?;
    let flags: Vec<&str> = [
        (Id3v2Flags::UNSYNCHRONISATION, "unsynchronisation"),
        (Id3v2Flags::EXTENDED_HEADER, "extended-header"),
        (Id3v2Flags::EXPERIMENTAL, "experimental"),
        (Id3v2Flags::FOOTER, "footer"),
    ]
    .into_iter()
    .filter(|(flag, _)| header.flags.contains(*flag))
    .map(|(_, name)| name)
    .collect();
    report.push(
        Section::new("id3v2 header")
            .field("version", format!("2.{}.{}", header.version, header.revision))
            .field("flags", flag_list(&flags))
            .field("size", header.size)
            .field("total size", header.total_size()),
    );

    // The frame walk is best effort: older layouts still get the header.
    match Id3v2Tag::parse(bytes).into_result() {
        Ok((tag, _)) => {
            let mut section = Section::new("id3v2 frames");
            for frame in &tag.frames {
                let value = frame
                    .text()
                    .unwrap_or_else(|| format!("{} bytes", frame.data.len()));
                section = section.field(frame.id().to_string(), value);
            }
            report.push(section.field("padding", tag.padding));
        }
        Err(e) => tracing::warn!(error = %e, "id3v2 frames not decoded"),
    }

    if let Some(Ok(first)) = FrameScanner::new(bytes).next() {
        report.push(mpeg_section(&first.frame.header, first.offset));
    }
    Ok(())
}

fn first_frame(bytes: &[u8], report: &mut Report) -> Result<()> {
    let (header, _) = MpegAudioHeader::parse(bytes)
        .into_result()
        .context("invalid MPEG audio header")?;
    report.push(mpeg_section(&header, 0));
    Ok(())
}

/// Every decoded field of an MPEG audio frame header.
pub fn mpeg_section(header: &MpegAudioHeader, offset: usize) -> Section {
    let bitrate = header
        .bitrate()
        .map_or_else(|| "free format".to_string(), |_| format!("{} kbps", header.bitrate_kbps()));
    let mut section = Section::new(format!("mpeg audio frame @ {offset}"))
        .field("version", header.version())
        .field("layer", header.layer())
        .field("bitrate", bitrate)
        .field("sampling rate", format!("{} Hz", header.sampling_rate()))
        .field("channel mode", header.channel_mode());
    if header.channel_mode() == ChannelMode::JointStereo {
        section = section.field("mode extension", header.channel_mode_extension());
    }
    section
        .field("crc", yes_no(header.is_protected()))
        .field("padding", yes_no(header.is_padded()))
        .field("private", yes_no(header.is_private()))
        .field("copyright", yes_no(header.is_copyrighted()))
        .field("original", yes_no(header.is_original()))
        .field("emphasis", header.emphasis())
        .field_opt("frame length", header.frame_length().map(|n| format!("{n} bytes")))
        .field("samples", header.samples_per_frame())
        .field("duration", millis(header.duration()))
}

// ── PDF ───────────────────────────────────────────────────────────────────────

fn pdf(bytes: &[u8], report: &mut Report) -> Result<()> {
    let (header, len) = PdfHeader::parse(bytes)
        .into_result()
        .context("invalid PDF header")?;
    let ending = match header.line_ending {
        LineEnding::CrLf => "CRLF",
        LineEnding::Lf => "LF",
        LineEnding::Cr => "CR",
    };
    report.push(
        Section::new("pdf header")
            .field("version", &header.version)
            .field("line ending", ending)
            .field("length", len),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_report_lists_fields() {
        let mut bytes = GzipHeader::new()
            .with_os(hdrkit_formats::OperatingSystem::Unix)
            .with_filename("hello.txt")
            .unwrap()
            .encode()
            .unwrap();
        bytes.extend_from_slice(&[0x03, 0x00]);
        GzipTrailer::for_payload(b"").write_to(&mut bytes).unwrap();

        let text = build(&bytes).unwrap().to_text();
        assert!(text.starts_with("Format: gzip\n[gzip member header]\n"));
        assert!(text.contains("filename  hello.txt"));
        assert!(text.contains("[gzip member trailer]"));
    }

    #[test]
    fn mpeg_report_has_frame_section() {
        let report = build(&[0xFF, 0xFB, 0x90, 0x64]).unwrap();
        assert_eq!(report.format, "mpeg audio");
        let fields = &report.sections[0].fields;
        assert!(fields.iter().any(|f| f.name == "bitrate" && f.value == "128 kbps"));
        assert!(fields.iter().any(|f| f.name == "frame length" && f.value == "417 bytes"));
    }

    #[test]
    fn unknown_format_is_an_error() {
        assert!(build(b"hello").is_err());
    }
}
