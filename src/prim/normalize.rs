//! Filename normalizer (§4.B): extras-suffix stripping and emoji
//! hex-encoding for filesystem-safe intermediate directory names.

use unicode_normalization::UnicodeNormalization;

use crate::config::constants::EXTRAS_SUFFIXES;

/// Returns the extras suffix (e.g. `-edited`) that `stem`'s NFC-normalized,
/// lowercased form ends with, if any (§4.B item 1, testable property 3).
pub fn matching_extras_suffix(stem: &str) -> Option<&'static str> {
  let normalized: String = stem.nfc().collect::<String>().to_lowercase();
  EXTRAS_SUFFIXES.iter().copied().find(|suffix| normalized.ends_with(suffix))
}

/// Detects a *partial* extras suffix: a non-empty prefix of a known suffix,
/// produced when Takeout's 51-char truncation cuts the suffix short. Tries
/// longest known suffix first so `-edi` (a prefix of `-edited`) is found
/// even though it's also a prefix of no other suffix in the table.
pub fn matching_partial_extras_suffix(stem: &str) -> Option<&'static str> {
  let lower = stem.to_lowercase();
  EXTRAS_SUFFIXES
    .iter()
    .copied()
    .filter(|suffix| {
      (1..suffix.len()).rev().any(|len| lower.ends_with(&suffix[..len]))
    })
    .max_by_key(|suffix| suffix.len())
}

/// Deterministic hex encoding used to make directory names containing
/// non-ASCII-Latin code points filesystem-safe during processing (§4.B
/// item 2). Only touches code points outside the BMP-safe ASCII-Latin
/// range; reversible via `decode_emoji`.
pub fn encode_emoji(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  for c in name.chars() {
    if needs_encoding(c) {
      out.push_str(&format!("_0x{:X}_", c as u32));
    } else {
      out.push(c);
    }
  }
  out
}

/// Reverses `encode_emoji`.
pub fn decode_emoji(name: &str) -> String {
  let mut out = String::new();
  let mut rest = name;
  while let Some(start) = rest.find("_0x") {
    out.push_str(&rest[..start]);
    let after = &rest[start + 3..];
    let Some(end) = after.find('_') else {
      out.push_str(&rest[start..]);
      return out;
    };
    let hex = &after[..end];
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
      Some(c) => out.push(c),
      None => out.push_str(&rest[start..start + 3 + end + 1]),
    }
    rest = &after[end + 1..];
  }
  out.push_str(rest);
  out
}

fn needs_encoding(c: char) -> bool {
  !(c.is_ascii() || ('\u{00A0}'..='\u{024F}').contains(&c))
}


#[cfg(test)]
mod test_partial_extras_suffix {
  use super::*;

  #[test]
  fn test_detects_truncated_prefix() {
    assert_eq!(matching_partial_extras_suffix("IMG_1234-edi"), Some("-edited"));
  }

  #[test]
  fn test_full_suffix_also_detected_as_partial() {
    assert_eq!(matching_partial_extras_suffix("IMG_1234-edited"), Some("-edited"));
  }

  #[test]
  fn test_no_match_for_unrelated_stem() {
    assert_eq!(matching_partial_extras_suffix("IMG_1234"), None);
  }
}
