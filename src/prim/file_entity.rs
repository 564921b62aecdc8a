//! `FileEntity`: one concrete file on disk as it moves through the pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// How trustworthy a derived date is. Lower is better; 0 means the date came
/// straight out of the JSON sidecar.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateAccuracy(pub u8);

impl DateAccuracy {
  pub const JSON: DateAccuracy = DateAccuracy(0);
  pub const NATIVE_EXIF: DateAccuracy = DateAccuracy(1);
  pub const EXIFTOOL_EXIF: DateAccuracy = DateAccuracy(2);
  pub const FILENAME_GUESS: DateAccuracy = DateAccuracy(3);
  pub const FOLDER_YEAR: DateAccuracy = DateAccuracy(4);
  pub const JSON_AGGRESSIVE: DateAccuracy = DateAccuracy(5);
  pub const EXTERNAL_DICTIONARY: DateAccuracy = DateAccuracy(0);
}

/// Which resolver produced `MediaEntity::date_taken` (§4.D).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DateExtractionMethod {
  ExternalDictionary,
  Json,
  NativeExif,
  ExiftoolExif,
  FilenameGuess,
  FolderYear,
  JsonAggressive,
  None,
}

impl DateExtractionMethod {
  pub fn accuracy(self) -> DateAccuracy {
    match self {
      DateExtractionMethod::ExternalDictionary => DateAccuracy::EXTERNAL_DICTIONARY,
      DateExtractionMethod::Json => DateAccuracy::JSON,
      DateExtractionMethod::NativeExif => DateAccuracy::NATIVE_EXIF,
      DateExtractionMethod::ExiftoolExif => DateAccuracy::EXIFTOOL_EXIF,
      DateExtractionMethod::FilenameGuess => DateAccuracy::FILENAME_GUESS,
      DateExtractionMethod::FolderYear => DateAccuracy::FOLDER_YEAR,
      DateExtractionMethod::JsonAggressive => DateAccuracy::JSON_AGGRESSIVE,
      DateExtractionMethod::None => DateAccuracy(u8::MAX),
    }
  }
}

/// One concrete file on disk. `FileEntity`s are owned by a `MediaEntity` as
/// `primary_file`, an element of `secondary_files`, or an element of
/// `duplicates_files`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEntity {
  pub source_path: PathBuf,
  pub target_path: Option<PathBuf>,

  pub size: u64,

  pub is_shortcut:       bool,
  pub is_moved:          bool,
  pub is_deleted:        bool,
  pub is_duplicate_copy: bool,

  /// True if this file's `source_path` lived directly under a year folder
  /// (as opposed to an album-only folder). Combined with the other flags
  /// this derives `is_canonical`.
  pub from_year_folder: bool,

  /// Tiebreak computed during stage 3 merge: (canonical-weight,
  /// -len(basename), -len(path)). Smaller wins; see `ranking_key`.
  pub ranking: RankingKey,

  pub date_accuracy: Option<DateAccuracy>,
}

/// Sort key used to pick a MediaEntity's primary file (§4.F). Smaller is
/// better. `canonical_weight` is 0 for year-folder files, 1 otherwise, so
/// year-folder files always sort first; `neg_basename_len`/`neg_path_len`
/// prefer shorter names via negation (shorter ⇒ larger negative ⇒ sorts
/// first is wrong, so these store the *negative* length and we sort
/// ascending — see `ranking_key`'s doc for the derivation).
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RankingKey {
  pub canonical_weight:  u8,
  pub neg_basename_len:  i32,
  pub neg_path_len:      i32,
}

impl FileEntity {
  pub fn new(source_path: impl Into<PathBuf>, size: u64, from_year_folder: bool) -> Self {
    let source_path = source_path.into();
    let ranking = ranking_key(&source_path, from_year_folder);
    Self {
      source_path,
      target_path: None,
      size,
      is_shortcut: false,
      is_moved: false,
      is_deleted: false,
      is_duplicate_copy: false,
      from_year_folder,
      ranking,
      date_accuracy: None,
    }
  }

  /// `is_canonical` = not shortcut ∧ not duplicate ∧ lived in a year folder.
  pub fn is_canonical(&self) -> bool {
    !self.is_shortcut && !self.is_duplicate_copy && self.from_year_folder
  }

  pub fn parent_dir(&self) -> &Path {
    self.source_path.parent().unwrap_or(Path::new(""))
  }
}

/// Computes the ranking key described in §3/§4.F: year-folder files beat
/// album-only files; among equals, shorter basenames and shorter full paths
/// win; remaining ties are broken lexicographically by the caller.
pub fn ranking_key(path: &Path, from_year_folder: bool) -> RankingKey {
  let basename_len = path.file_name().map_or(0, |n| n.to_string_lossy().len()) as i32;
  let path_len = path.to_string_lossy().len() as i32;
  RankingKey {
    canonical_weight: u8::from(!from_year_folder),
    neg_basename_len: -basename_len,
    neg_path_len:     -path_len,
  }
}

/// Stable comparator implementing §4.F's (a)-(d) ordering, including the
/// final lexicographic-path tiebreak that `RankingKey` alone can't express
/// (two paths of equal length still need a deterministic order).
pub fn compare_for_primary(a: &FileEntity, b: &FileEntity) -> std::cmp::Ordering {
  a.ranking
    .cmp(&b.ranking)
    .then_with(|| a.source_path.cmp(&b.source_path))
}

/// A resolved capture timestamp, with its timezone offset if known.
pub type ResolvedDateTime = DateTime<FixedOffset>;

#[cfg(test)]
mod test_ranking {
  use super::*;

  #[test]
  fn test_year_folder_file_outranks_album_file() {
    let year = FileEntity::new("/in/Photos from 2022/IMG_0001.jpg", 10, true);
    let album = FileEntity::new("/in/Vacation/IMG_0001.jpg", 10, false);

    assert_eq!(compare_for_primary(&year, &album), std::cmp::Ordering::Less);
  }

  #[test]
  fn test_shorter_basename_wins_among_equals() {
    let short = FileEntity::new("/in/Vacation/IMG_1234.jpg", 10, false);
    let edited = FileEntity::new("/in/Vacation/IMG_1234-edited.jpg", 10, false);

    assert_eq!(compare_for_primary(&short, &edited), std::cmp::Ordering::Less);
  }

  #[test]
  fn test_shorter_path_wins_when_basenames_equal() {
    let short = FileEntity::new("/in/a/IMG_1234.jpg", 10, false);
    let long = FileEntity::new("/in/a/nested/IMG_1234.jpg", 10, false);

    assert_eq!(compare_for_primary(&short, &long), std::cmp::Ordering::Less);
  }

  #[test]
  fn test_lexicographic_tiebreak_is_deterministic() {
    let a = FileEntity::new("/in/a/aaa.jpg", 10, false);
    let b = FileEntity::new("/in/a/bbb.jpg", 10, false);

    assert_eq!(compare_for_primary(&a, &b), std::cmp::Ordering::Less);
    assert_eq!(compare_for_primary(&b, &a), std::cmp::Ordering::Greater);
  }

  #[test]
  fn test_is_canonical_requires_year_folder_and_no_flags() {
    let mut f = FileEntity::new("/in/Photos from 2022/a.jpg", 1, true);
    assert!(f.is_canonical());

    f.is_shortcut = true;
    assert!(!f.is_canonical());
  }
}
