use std::io::Cursor;

/// Read the EXIF orientation tag (1-8) from encoded image bytes.
///
/// Missing or unreadable EXIF data, and out-of-range values, yield 1 (upright).
pub fn read_exif_orientation(data: &[u8]) -> u32 {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::debug!(error = %e, "No readable EXIF data, assuming upright orientation");
            return 1;
        }
    };

    match exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
    {
        Some(value @ 1..=8) => value,
        Some(value) => {
            tracing::debug!(orientation = value, "Ignoring out-of-range EXIF orientation");
            1
        }
        None => 1,
    }
}
