//! Sidecar matcher (§4.C): locates a media file's `.json` sidecar across
//! every known Takeout mangling pattern. Every step is a pure filesystem
//! existence check against the caller-supplied `exists` predicate so the
//! algorithm is deterministic and unit-testable without touching disk.

use std::path::{Path, PathBuf};

use crate::{
  config::constants::{AGGRESSIVE_SUBSTITUTION_EXTENSIONS, SIDECAR_TRUNCATION_LIMIT, SUPPLEMENTAL_METADATA_TOKEN},
  prim::{matching_extras_suffix, matching_partial_extras_suffix},
};

/// Top-level entry point: steps 1 through 7 always run; step 8 (aggressive
/// cross-extension substitution) only runs when `try_hard` is set.
pub fn find_sidecar(media_path: &Path, try_hard: bool, exists: &dyn Fn(&Path) -> bool) -> Option<PathBuf> {
  try_steps_1_to_5(media_path, exists)
    .or_else(|| try_step_6_strip_extras(media_path, exists))
    .or_else(|| try_step_7_strip_partial_extras(media_path, exists))
    .or_else(|| try_hard.then(|| try_step_8_aggressive_extension(media_path, exists)).flatten())
}

fn try_steps_1_to_5(media_path: &Path, exists: &dyn Fn(&Path) -> bool) -> Option<PathBuf> {
  try_steps_1_to_3(media_path, exists).or_else(|| try_step_4_paren_index(media_path, exists)).or_else(|| try_step_5_truncated(media_path, exists))
}

/// Steps 1-3: `{path}.json`, `{path}.supplemental-metadata.json`,
/// `{path}.supplemental-metadata(n).json` for n in 1..=9.
fn try_steps_1_to_3(base: &Path, exists: &dyn Fn(&Path) -> bool) -> Option<PathBuf> {
  let base_str = base.to_string_lossy();

  let plain = PathBuf::from(format!("{base_str}.json"));
  if exists(&plain) {
    return Some(plain);
  }

  let supplemental = PathBuf::from(format!("{base_str}.supplemental-metadata.json"));
  if exists(&supplemental) {
    return Some(supplemental);
  }

  (1..=9)
    .map(|n| PathBuf::from(format!("{base_str}.supplemental-metadata({n}).json")))
    .find(|candidate| exists(candidate))
}

/// Step 4: strip a trailing `(n)` index from the media stem, retry 1-3 on
/// the stripped path, then reinsert `(n)` immediately before `.json` — this
/// is where Takeout actually puts the duplicate-index marker on sidecars.
fn try_step_4_paren_index(media_path: &Path, exists: &dyn Fn(&Path) -> bool) -> Option<PathBuf> {
  let (stripped_base, suffix) = strip_trailing_paren_index(media_path)?;
  let matched = try_steps_1_to_3(&stripped_base, exists)?;
  let reinserted = reinsert_before_json_extension(&matched, &suffix);
  exists(&reinserted).then_some(reinserted)
}

fn strip_trailing_paren_index(path: &Path) -> Option<(PathBuf, String)> {
  let stem = path.file_stem()?.to_string_lossy().to_string();
  if !stem.ends_with(')') {
    return None;
  }
  let open = stem.rfind('(')?;
  let inner = &stem[open + 1..stem.len() - 1];
  if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_digit()) {
    return None;
  }

  let mut new_name = stem[..open].to_string();
  if let Some(ext) = path.extension() {
    new_name.push('.');
    new_name.push_str(&ext.to_string_lossy());
  }
  Some((path.with_file_name(new_name), format!("({inner})")))
}

fn reinsert_before_json_extension(matched: &Path, suffix: &str) -> PathBuf {
  let s = matched.to_string_lossy();
  let without_json = s.strip_suffix(".json").unwrap_or(&s);
  PathBuf::from(format!("{without_json}{suffix}.json"))
}

/// Step 5: for basenames Takeout has truncated, try each prefix of
/// `supplemental-metadata`, longest first, down to a single character.
fn try_step_5_truncated(media_path: &Path, exists: &dyn Fn(&Path) -> bool) -> Option<PathBuf> {
  let base_str = media_path.to_string_lossy();
  let full_candidate_len =
    PathBuf::from(format!("{base_str}.supplemental-metadata.json")).file_name()?.to_string_lossy().len();
  if full_candidate_len <= SIDECAR_TRUNCATION_LIMIT {
    return None;
  }

  (1..=SUPPLEMENTAL_METADATA_TOKEN.len())
    .rev()
    .map(|len| PathBuf::from(format!("{base_str}.{}.json", &SUPPLEMENTAL_METADATA_TOKEN[..len])))
    .find(|candidate| exists(candidate))
}

/// Step 6: strip a known "-edited"-style suffix from the stem, then retry
/// steps 1-5 against the stripped path.
fn try_step_6_strip_extras(media_path: &Path, exists: &dyn Fn(&Path) -> bool) -> Option<PathBuf> {
  let stem = media_path.file_stem()?.to_string_lossy().to_string();
  let suffix = matching_extras_suffix(&stem)?;
  let stripped = strip_stem_suffix(media_path, suffix.len())?;
  try_steps_1_to_5(&stripped, exists)
}

/// Step 7: same idea as step 6, but for a *partial* extras suffix produced
/// by truncation.
fn try_step_7_strip_partial_extras(media_path: &Path, exists: &dyn Fn(&Path) -> bool) -> Option<PathBuf> {
  let stem = media_path.file_stem()?.to_string_lossy().to_string();
  let partial = matching_partial_extras_suffix(&stem)?;
  let matched_len = (1..partial.len()).rev().find(|&len| stem.to_lowercase().ends_with(&partial[..len]))?;
  let stripped = strip_stem_suffix(media_path, matched_len)?;
  try_steps_1_to_5(&stripped, exists)
}

fn strip_stem_suffix(path: &Path, suffix_byte_len: usize) -> Option<PathBuf> {
  let stem = path.file_stem()?.to_string_lossy().to_string();
  if suffix_byte_len > stem.len() {
    return None;
  }
  let mut new_name = stem[..stem.len() - suffix_byte_len].to_string();
  if let Some(ext) = path.extension() {
    new_name.push('.');
    new_name.push_str(&ext.to_string_lossy());
  }
  Some(path.with_file_name(new_name))
}

/// Step 8: substitute every common photo/video extension for the file's
/// actual one and retry steps 1-5 against each, e.g. matching a `.mp4`
/// against a `.HEIC.supplemental-metadata.json` sidecar Google produced
/// when it re-encoded the original (only tried under `try_hard`).
fn try_step_8_aggressive_extension(media_path: &Path, exists: &dyn Fn(&Path) -> bool) -> Option<PathBuf> {
  let current_ext = media_path.extension().map(|e| e.to_string_lossy().to_lowercase());
  for candidate_ext in AGGRESSIVE_SUBSTITUTION_EXTENSIONS {
    if Some(candidate_ext.to_string()) == current_ext {
      continue;
    }
    let substituted = media_path.with_extension(candidate_ext);
    if let Some(found) = try_steps_1_to_5(&substituted, exists) {
      return Some(found);
    }
  }
  None
}

#[cfg(test)]
mod test_find_sidecar {
  use std::collections::HashSet;

  use super::*;

  fn fs(paths: &[&str]) -> HashSet<PathBuf> {
    paths.iter().map(PathBuf::from).collect()
  }

  #[test]
  fn test_step_1_plain_json() {
    let files = fs(&["/in/a.jpg.json"]);
    let found = find_sidecar(Path::new("/in/a.jpg"), false, &|p| files.contains(p));
    assert_eq!(found, Some(PathBuf::from("/in/a.jpg.json")));
  }

  #[test]
  fn test_step_2_supplemental_metadata() {
    let files = fs(&["/in/a.jpg.supplemental-metadata.json"]);
    let found = find_sidecar(Path::new("/in/a.jpg"), false, &|p| files.contains(p));
    assert_eq!(found, Some(PathBuf::from("/in/a.jpg.supplemental-metadata.json")));
  }

  #[test]
  fn test_step_4_paren_index_is_reinserted_before_json() {
    let files = fs(&["/in/a.jpg(1).json"]);
    let found = find_sidecar(Path::new("/in/a(1).jpg"), false, &|p| files.contains(p));
    assert_eq!(found, Some(PathBuf::from("/in/a.jpg(1).json")));
  }

  #[test]
  fn test_step_5_truncated_supplemental_prefix() {
    let long_stem = "a".repeat(40);
    let media = PathBuf::from(format!("/in/{long_stem}.jpg"));
    let sidecar = PathBuf::from(format!("/in/{long_stem}.jpg.supplemental-meta.json"));
    let files: HashSet<PathBuf> = [sidecar.clone()].into_iter().collect();
    let found = find_sidecar(&media, false, &|p| files.contains(p));
    assert_eq!(found, Some(sidecar));
  }

  #[test]
  fn test_step_6_strips_extras_suffix() {
    let files = fs(&["/in/a.jpg.json"]);
    let found = find_sidecar(Path::new("/in/a-edited.jpg"), false, &|p| files.contains(p));
    assert_eq!(found, Some(PathBuf::from("/in/a.jpg.json")));
  }

  #[test]
  fn test_step_8_aggressive_extension_substitution_requires_try_hard() {
    let files = fs(&["/in/IMG_2367.HEIC.supplemental-metadata.json"]);
    let media = Path::new("/in/IMG_2367.MP4");

    assert_eq!(find_sidecar(media, false, &|p| files.contains(p)), None);
    assert_eq!(
      find_sidecar(media, true, &|p| files.contains(p)),
      Some(PathBuf::from("/in/IMG_2367.HEIC.supplemental-metadata.json"))
    );
  }

  #[test]
  fn test_no_match_returns_none() {
    let found = find_sidecar(Path::new("/in/missing.jpg"), true, &|_| false);
    assert_eq!(found, None);
  }

  #[test]
  fn test_is_deterministic_across_repeated_calls() {
    let files = fs(&["/in/a.jpg.json"]);
    let first = find_sidecar(Path::new("/in/a.jpg"), false, &|p| files.contains(p));
    let second = find_sidecar(Path::new("/in/a.jpg"), false, &|p| files.contains(p));
    assert_eq!(first, second);
  }
}
