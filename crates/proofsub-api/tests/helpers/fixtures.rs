//! Test fixtures: minimal JPEG/PNG/PDF blobs.

/// Baseline JPEG carrying a single EXIF `Make` tag in an APP1 segment.
pub fn jpeg_with_make(make: &str) -> Vec<u8> {
    let mut value = make.as_bytes().to_vec();
    value.push(0);

    // Big-endian TIFF header, one IFD entry (Make, ASCII) with its value right after the IFD.
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08");
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x010Fu16.to_be_bytes());
    tiff.extend_from_slice(&2u16.to_be_bytes());
    tiff.extend_from_slice(&(value.len() as u32).to_be_bytes());
    tiff.extend_from_slice(&26u32.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&value);

    let mut app1 = b"Exif\x00\x00".to_vec();
    app1.extend_from_slice(&tiff);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&app1);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// Minimal valid 1x1 PNG bytes.
pub fn create_minimal_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0x89, 0x00, 0x00, 0x00,
        0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

/// Plain text evidence, e.g. a delivery note.
pub fn delivery_note() -> Vec<u8> {
    b"Delivered 5 kg of rice to the community kitchen.\n".to_vec()
}

/// Model reply for pledge verification, wrapped in a markdown fence like the real model does.
pub fn fenced_proof_reply() -> String {
    "```json\n{\n  \"mediaFileAnalysis\": [{\"fileIndex\": 1, \"summary\": \"rice sacks\"}],\n  \"pledgeVerification\": {\"matchesPledge\": true, \"detectedQuantity\": 5}\n}\n```".to_string()
}

/// Model reply for single-file analysis.
pub fn fenced_analysis_reply() -> String {
    "```json\n{\"tampering\": {\"tampering_score\": 2}, \"exif\": {\"camera_make\": \"Canon\"}}\n```"
        .to_string()
}
