//! Native EXIF read/write (§4.D item 3, §4.H): `kamadak-exif` for reads,
//! `little_exif` for JPEG writes. Used ahead of the ExifTool fallback so the
//! common case (JPEG with a recognizable date tag) never pays for a process
//! spawn.

use std::{fs::File, io::BufReader, path::Path};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeZone, Utc};
use exif::{In, Reader, Tag, Value};

use crate::prim::DateAccuracy;

/// Date tags in the order native readers should prefer them, oldest-wins
/// within this list applied by the caller (§4.D item 3).
const DATE_TAGS: &[Tag] = &[
  Tag::DateTimeOriginal,
  Tag::DateTime,
  Tag::DateTimeDigitized,
];

/// Reads the oldest plausible capture date from a file's native EXIF IFD0.
/// Returns `None` (not an error) when the file has no EXIF block or no tag
/// parses to an in-range date; the caller falls through to ExifTool or the
/// filename guess.
pub fn read_native_date(path: &Path) -> Option<DateTime<FixedOffset>> {
  let file = File::open(path).ok()?;
  let exif = Reader::new().read_from_container(&mut BufReader::new(file)).ok()?;

  let mut oldest: Option<DateTime<FixedOffset>> = None;
  for tag in DATE_TAGS {
    let Some(field) = exif.get_field(*tag, In::PRIMARY) else { continue };
    let Value::Ascii(ref vecs) = field.value else { continue };
    let Some(raw) = vecs.first() else { continue };
    let Ok(text) = std::str::from_utf8(raw) else { continue };
    let Some(parsed) = parse_exif_datetime(text) else { continue };
    if !is_plausible(&parsed) {
      continue;
    }
    oldest = Some(match oldest {
      Some(current) if current <= parsed => current,
      _ => parsed,
    });
  }
  oldest
}

/// Parses ExifTool/EXIF's canonical `"YYYY:MM:DD HH:MM:SS"` form as UTC
/// (native EXIF rarely carries a usable offset; callers treat this as a
/// local-time-as-UTC approximation per §4.D's documented limitation).
fn parse_exif_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
  let trimmed = text.trim_end_matches('\0').trim();
  let naive = NaiveDateTime::parse_from_str(trimmed, "%Y:%m:%d %H:%M:%S").ok()?;
  Some(Utc.from_utc_datetime(&naive).fixed_offset())
}

fn is_plausible(date: &DateTime<FixedOffset>) -> bool {
  let year = date.year_ce().1 as i32;
  let current_year = Utc::now().year();
  (1970..=current_year + 1).contains(&year)
}

/// Writes `date` into a JPEG's `DateTimeOriginal`/`DateTime` tags and,
/// if present, GPS coordinates, via `little_exif` (§4.H). Returns `Err` so
/// the caller can fall back to ExifTool (e.g. for HEIC, which `little_exif`
/// does not support writing).
pub fn write_jpeg_date(
  path: &Path,
  date: DateTime<FixedOffset>,
  coordinates: Option<(f64, f64)>,
) -> Result<(), String> {
  use little_exif::{exif_tag::ExifTag, metadata::Metadata};

  let mut metadata = Metadata::new_from_path(path).map_err(|e| format!("ExifWriteFailed: {e}"))?;

  let stamp = date.format("%Y:%m:%d %H:%M:%S").to_string();
  metadata.set_tag(ExifTag::DateTimeOriginal(stamp.clone()));
  metadata.set_tag(ExifTag::DateTime(stamp));

  if let Some((lat, lon)) = coordinates {
    metadata.set_tag(ExifTag::GPSLatitude(vec![lat.abs() as u32, 0, 0]));
    metadata.set_tag(ExifTag::GPSLatitudeRef(if lat >= 0.0 { "N".into() } else { "S".into() }));
    metadata.set_tag(ExifTag::GPSLongitude(vec![lon.abs() as u32, 0, 0]));
    metadata.set_tag(ExifTag::GPSLongitudeRef(if lon >= 0.0 { "E".into() } else { "W".into() }));
  }

  metadata.write_to_file(path).map_err(|e| format!("ExifWriteFailed: {e}"))
}

/// Maps which of the native readers/writers succeeded to the accuracy tier
/// stage 4 should record.
pub fn accuracy_for_native_read() -> DateAccuracy {
  DateAccuracy::NATIVE_EXIF
}

#[cfg(test)]
mod test_parse_exif_datetime {
  use super::*;

  #[test]
  fn test_parses_canonical_exif_stamp() {
    let parsed = parse_exif_datetime("2024:06:20 22:09:00").unwrap();
    assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-06-20 22:09:00");
  }

  #[test]
  fn test_trims_trailing_nul_padding() {
    let parsed = parse_exif_datetime("2024:06:20 22:09:00\0").unwrap();
    assert_eq!(parsed.format("%Y").to_string(), "2024");
  }

  #[test]
  fn test_rejects_malformed_stamp() {
    assert!(parse_exif_datetime("not a date").is_none());
  }
}
