use std::io::{self, BufRead, Read, Seek, SeekFrom};

use exif::{Field, In, Value};
use proofsub_core::ExtractedMetadata;

use crate::sniff::SNIFF_SAMPLE_LEN;

/// EXIF tags plus file type and pixel dimensions for a recognized image.
pub(super) fn read_image_tags<R: BufRead + Seek>(
    reader: &mut R,
    out: &mut ExtractedMetadata,
) -> io::Result<()> {
    match exif::Reader::new().read_from_container(reader) {
        Ok(parsed) => {
            for field in parsed.fields() {
                let name = tag_name(field);
                out.record_exif(name, describe(field, &parsed));
            }
        }
        Err(exif::Error::Io(e)) if e.kind() != io::ErrorKind::UnexpectedEof => return Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "No readable EXIF data");
        }
    }

    reader.seek(SeekFrom::Start(0))?;
    let mut sample = Vec::with_capacity(SNIFF_SAMPLE_LEN);
    reader
        .by_ref()
        .take(SNIFF_SAMPLE_LEN as u64)
        .read_to_end(&mut sample)?;
    if let Some(kind) = infer::get(&sample) {
        out.record_exif("Detected MIME Type", kind.mime_type());
        out.record_exif("Expected File Name Extension", kind.extension());
    }

    reader.seek(SeekFrom::Start(0))?;
    if let Some((width, height)) = super::document::image_dimensions(reader)? {
        out.record_exif("Image Width", format!("{} pixels", width));
        out.record_exif("Image Height", format!("{} pixels", height));
    }

    Ok(())
}

fn tag_name(field: &Field) -> String {
    if field.ifd_num == In::PRIMARY {
        field.tag.to_string()
    } else {
        format!("Thumbnail {}", field.tag)
    }
}

/// Human-readable value. ASCII values are rendered unquoted.
fn describe(field: &Field, parsed: &exif::Exif) -> String {
    match field.value {
        Value::Ascii(ref parts) => parts
            .iter()
            .map(|part| {
                String::from_utf8_lossy(part)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => field.display_value().with_unit(parsed).to_string(),
    }
}
