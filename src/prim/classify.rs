//! Path & MIME classifier (§4.A): year/album/special folder recognition and
//! media-type detection from extension and header bytes.

use std::{
  path::Path,
  sync::LazyLock,
};

use regex::RegexSet;

use crate::config::constants::{
  PHOTO_EXTENSIONS, SPECIAL_FOLDER_NAMES, VIDEO_EXTENSIONS, YEAR_FOLDER_PATTERNS,
};

static YEAR_FOLDER_REGEX: LazyLock<RegexSet> =
  LazyLock::new(|| RegexSet::new(YEAR_FOLDER_PATTERNS).unwrap());

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MediaKind {
  Photo,
  Video,
}

/// True if `name` (a directory basename) matches one of the localized
/// `Photos from YYYY` patterns, case-insensitively.
pub fn is_year_folder_name(name: &str) -> bool {
  YEAR_FOLDER_REGEX.is_match(&name.to_lowercase())
}

/// True if `name` is one of the special folders excluded from album
/// processing (`Archive`, `Trash`, `Locked Folder`, localized).
pub fn is_special_folder_name(name: &str) -> bool {
  let lower = name.to_lowercase();
  SPECIAL_FOLDER_NAMES.iter().any(|s| *s == lower)
}

/// Extension-whitelist recognition (§4.A, tier 1). Case-insensitive,
/// ignores the leading dot.
pub fn media_kind_for_extension(extension: &str) -> Option<MediaKind> {
  let lower = extension.to_lowercase();
  if PHOTO_EXTENSIONS.contains(&lower.as_str()) {
    Some(MediaKind::Photo)
  } else if VIDEO_EXTENSIONS.contains(&lower.as_str()) {
    Some(MediaKind::Video)
  } else {
    None
  }
}

pub fn is_media_path(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| media_kind_for_extension(e).is_some())
}

/// Sniffs the true MIME family from the first bytes of a file (§4.A tier 2).
/// Returns `None` when no known signature matches; callers fall back to the
/// extension-based guess in that case.
pub fn sniff_mime(header: &[u8]) -> Option<&'static str> {
  if header.len() < 4 {
    return None;
  }
  if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
    return Some("image/jpeg");
  }
  if header.starts_with(&[0x89, b'P', b'N', b'G']) {
    return Some("image/png");
  }
  if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
    return Some("image/gif");
  }
  if header.len() >= 12 && &header[4..8] == b"ftyp" {
    return Some("image/heif-or-video/mp4");
  }
  if header.starts_with(b"II*\0") || header.starts_with(b"MM\0*") {
    return Some("image/tiff");
  }
  if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
    return Some("image/webp");
  }
  None
}

/// Reads up to 16 bytes from `path` for MIME sniffing.
pub fn sniff_mime_from_file(path: &Path) -> Option<&'static str> {
  use std::io::Read;
  let mut file = std::fs::File::open(path).ok()?;
  let mut buf = [0u8; 16];
  let n = file.read(&mut buf).ok()?;
  sniff_mime(&buf[..n])
}

#[cfg(test)]
mod test_is_year_folder_name {
  use super::*;

  #[test]
  fn test_matches_english_pattern() {
    assert!(is_year_folder_name("Photos from 2022"));
  }

  #[test]
  fn test_matches_case_insensitively() {
    assert!(is_year_folder_name("photos FROM 2022"));
  }

  #[test]
  fn test_matches_spanish_pattern() {
    assert!(is_year_folder_name("Fotos de 2019"));
  }

  #[test]
  fn test_rejects_album_name() {
    assert!(!is_year_folder_name("Vacation"));
  }
}



#[cfg(test)]
mod test_sniff_mime {
  use super::*;

  #[test]
  fn test_detects_jpeg_soi() {
    assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
  }

  #[test]
  fn test_detects_png_signature() {
    assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G']), Some("image/png"));
  }

  #[test]
  fn test_too_short_header_is_none() {
    assert_eq!(sniff_mime(&[0xFF]), None);
  }
}
