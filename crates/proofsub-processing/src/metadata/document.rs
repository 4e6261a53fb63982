//! General metadata pass: content identity, image size, PDF document information,
//! Office Open XML properties and a text encoding guess.

use std::io::{self, BufRead, Cursor, Read, Seek};
use std::sync::LazyLock;

use chrono::NaiveDate;
use lopdf::{Dictionary, Document, Object};
use proofsub_core::ExtractedMetadata;
use regex::Regex;

use crate::sniff::SNIFF_SAMPLE_LEN;

const OOXML_PREFIX: &str = "application/vnd.openxmlformats-officedocument.";

// Leaf XML elements only. Open and close names are compared by the caller since the
// regex engine has no backreferences.
static XML_LEAF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z]+(?::[A-Za-z]+)?)(?:\s[^>]*)?>([^<]*)</([A-Za-z]+(?::[A-Za-z]+)?)>")
        .expect("valid regex")
});

pub(super) fn read_general<R: BufRead + Seek>(
    reader: &mut R,
    content_type: &str,
    size: u64,
    out: &mut ExtractedMetadata,
) -> io::Result<()> {
    out.record_metadata("Content-Type", content_type);
    out.record_metadata("Content-Length", size.to_string());

    if content_type.starts_with("image/") {
        if let Some((width, height)) = image_dimensions(reader)? {
            out.record_metadata("tiff:ImageWidth", width.to_string());
            out.record_metadata("tiff:ImageLength", height.to_string());
        }
    } else if content_type == "application/pdf" {
        let data = read_all(reader)?;
        read_pdf(&data, out);
    } else if content_type.starts_with(OOXML_PREFIX) {
        let data = read_all(reader)?;
        read_ooxml(&data, out);
    } else if content_type.starts_with("text/") {
        let mut sample = Vec::with_capacity(SNIFF_SAMPLE_LEN);
        reader
            .by_ref()
            .take(SNIFF_SAMPLE_LEN as u64)
            .read_to_end(&mut sample)?;
        if !sample.is_empty() {
            out.record_metadata("Content-Encoding", guess_text_encoding(&sample));
        }
    }

    Ok(())
}

/// Pixel dimensions from the image header, without decoding pixels.
pub(super) fn image_dimensions<R: BufRead + Seek>(
    reader: &mut R,
) -> io::Result<Option<(u32, u32)>> {
    let guessed = image::ImageReader::new(reader).with_guessed_format()?;
    if guessed.format().is_none() {
        return Ok(None);
    }
    Ok(guessed.into_dimensions().ok())
}

fn read_all<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(data)
}

fn guess_text_encoding(sample: &[u8]) -> &'static str {
    match std::str::from_utf8(sample) {
        Ok(_) => "UTF-8",
        // Sequence cut off by the sample boundary.
        Err(e) if e.error_len().is_none() => "UTF-8",
        Err(_) => "ISO-8859-1",
    }
}

fn read_pdf(data: &[u8], out: &mut ExtractedMetadata) {
    let doc = match Document::load_mem(data) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable PDF, skipping document information");
            return;
        }
    };

    if let Some(info) = info_dictionary(&doc) {
        for (key, value) in info.iter() {
            let Some(text) = pdf_text(&doc, value) else {
                continue;
            };
            let key = String::from_utf8_lossy(key);
            let value = match key.as_ref() {
                "CreationDate" | "ModDate" => pdf_date_to_iso(&text).unwrap_or(text),
                _ => text,
            };
            out.record_metadata(pdf_info_key(&key), value);
        }
    }

    out.record_metadata("pdf:PDFVersion", doc.version.clone());
    out.record_metadata("xmpTPg:NPages", doc.get_pages().len().to_string());
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn pdf_info_key(key: &str) -> String {
    match key {
        "Title" => "dc:title",
        "Author" => "dc:creator",
        "Subject" => "dc:subject",
        "Keywords" => "meta:keyword",
        "Creator" => "xmp:CreatorTool",
        "Producer" => "pdf:Producer",
        "CreationDate" => "dcterms:created",
        "ModDate" => "dcterms:modified",
        other => other,
    }
    .to_string()
}

fn pdf_text(doc: &Document, value: &Object) -> Option<String> {
    match value {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Integer(n) => Some(n.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Reference(_) => None,
            resolved => pdf_text(doc, resolved),
        },
        _ => None,
    }
}

fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Convert a PDF date (`D:YYYYMMDDHHmmSSOHH'mm'`) into ISO 8601.
fn pdf_date_to_iso(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let s = trimmed.strip_prefix("D:").unwrap_or(trimmed);
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }

    let field = |start: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + 2) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };

    let year: i32 = digits[..4].parse().ok()?;
    let timestamp = NaiveDate::from_ymd_opt(year, field(4, 1)?, field(6, 1)?)?
        .and_hms_opt(field(8, 0)?, field(10, 0)?, field(12, 0)?)?;

    let zone = &s[digits.len()..];
    let suffix = match zone.chars().next() {
        Some('Z') => "Z".to_string(),
        Some(sign @ ('+' | '-')) => {
            let tz: String = zone[1..].chars().filter(|c| c.is_ascii_digit()).take(4).collect();
            let hours = tz.get(..2).unwrap_or("00");
            let minutes = tz.get(2..4).unwrap_or("00");
            format!("{}{}:{}", sign, hours, minutes)
        }
        _ => String::new(),
    };

    Some(format!("{}{}", timestamp.format("%Y-%m-%dT%H:%M:%S"), suffix))
}

fn read_ooxml(data: &[u8], out: &mut ExtractedMetadata) {
    let mut archive = match zip::ZipArchive::new(Cursor::new(data)) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable OOXML container, skipping properties");
            return;
        }
    };

    if let Some(xml) = read_zip_entry(&mut archive, "docProps/core.xml") {
        for (name, value) in xml_leaf_elements(&xml) {
            if name.contains(':') {
                out.record_metadata(name, value);
            }
        }
    }

    if let Some(xml) = read_zip_entry(&mut archive, "docProps/app.xml") {
        for (name, value) in xml_leaf_elements(&xml) {
            // Prefixed leaves in app.xml are vector members, not properties.
            if !name.contains(':') {
                out.record_metadata(format!("extended-properties:{}", name), value);
            }
        }
    }
}

fn read_zip_entry<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).ok()?;
    Some(xml)
}

fn xml_leaf_elements(xml: &str) -> Vec<(String, String)> {
    XML_LEAF_RE
        .captures_iter(xml)
        .filter(|caps| caps[1] == caps[3])
        .map(|caps| (caps[1].to_string(), unescape_xml(caps[2].trim())))
        .collect()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use std::io::Write;

    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Tree Planting Pledge"),
            "Author" => Object::string_literal("Field Team"),
            "Producer" => Object::string_literal(""),
            "CreationDate" => Object::string_literal("D:20240315093000+05'30'"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn sample_docx() -> Vec<u8> {
        use zip::write::{FileOptions, ZipWriter};

        let core = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:title>Audit &amp; Review</dc:title><dc:creator>Ops</dc:creator><cp:lastModifiedBy>Ops</cp:lastModifiedBy>
<dcterms:created xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:created></cp:coreProperties>"#;
        let app = r#"<?xml version="1.0" encoding="UTF-8"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<Application>Microsoft Office Word</Application><Pages>3</Pages>
<TitlesOfParts><vt:vector size="1" baseType="lpstr"><vt:lpstr>Audit</vt:lpstr></vt:vector></TitlesOfParts></Properties>"#;

        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = FileOptions::default();
            zip.start_file("docProps/core.xml", options).unwrap();
            zip.write_all(core.as_bytes()).unwrap();
            zip.start_file("docProps/app.xml", options).unwrap();
            zip.write_all(app.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buffer
    }

    fn general(data: &[u8], content_type: &str) -> ExtractedMetadata {
        let mut out = ExtractedMetadata::new();
        let mut cursor = Cursor::new(data.to_vec());
        read_general(&mut cursor, content_type, data.len() as u64, &mut out).unwrap();
        out
    }

    #[test]
    fn pdf_document_information_is_mapped() {
        let data = sample_pdf();
        let out = general(&data, "application/pdf");

        assert_eq!(out.metadata["dc:title"], "Tree Planting Pledge");
        assert_eq!(out.metadata["dc:creator"], "Field Team");
        assert_eq!(out.metadata["dcterms:created"], "2024-03-15T09:30:00+05:30");
        assert_eq!(out.metadata["pdf:PDFVersion"], "1.5");
        assert_eq!(out.metadata["xmpTPg:NPages"], "1");
        // blank values are dropped
        assert!(!out.metadata.contains_key("pdf:Producer"));
    }

    #[test]
    fn truncated_pdf_only_reports_identity() {
        let out = general(b"%PDF-1.4\n%broken", "application/pdf");
        assert_eq!(out.metadata.len(), 2);
        assert_eq!(out.metadata["Content-Type"], "application/pdf");
    }

    #[test]
    fn ooxml_properties_are_extracted() {
        let data = sample_docx();
        let out = general(
            &data,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        );

        assert_eq!(out.metadata["dc:title"], "Audit & Review");
        assert_eq!(out.metadata["cp:lastModifiedBy"], "Ops");
        assert_eq!(out.metadata["dcterms:created"], "2024-01-02T03:04:05Z");
        assert_eq!(out.metadata["extended-properties:Application"], "Microsoft Office Word");
        assert_eq!(out.metadata["extended-properties:Pages"], "3");
        assert!(!out.metadata.contains_key("extended-properties:lpstr"));
        assert!(!out.metadata.contains_key("vt:lpstr"));
    }

    #[test]
    fn text_encoding_guess() {
        assert_eq!(general("héllo".as_bytes(), "text/plain").metadata["Content-Encoding"], "UTF-8");
        assert_eq!(
            general(&[0x68, 0xE9, 0x6C, 0x6C, 0x6F], "text/plain").metadata["Content-Encoding"],
            "ISO-8859-1"
        );
        assert!(!general(b"", "text/plain").metadata.contains_key("Content-Encoding"));
    }

    #[test]
    fn pdf_dates_convert_to_iso() {
        assert_eq!(pdf_date_to_iso("D:20230101").as_deref(), Some("2023-01-01T00:00:00"));
        assert_eq!(
            pdf_date_to_iso("D:20230704120000Z").as_deref(),
            Some("2023-07-04T12:00:00Z")
        );
        assert_eq!(
            pdf_date_to_iso("D:20231231235959-08'00'").as_deref(),
            Some("2023-12-31T23:59:59-08:00")
        );
        assert_eq!(pdf_date_to_iso("yesterday"), None);
    }

    #[test]
    fn utf16_pdf_strings_are_decoded() {
        let encoded = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_string(&encoded), "Hi");
    }
}
