//! `MediaEntity`: the central aggregate produced by stage 3's merge and
//! enriched by every stage thereafter.

use std::{
  collections::{HashMap, HashSet},
  path::PathBuf,
};

use serde::{Deserialize, Serialize};

use super::{DateAccuracy, DateExtractionMethod, FileEntity, ResolvedDateTime};

/// An album a `MediaEntity` belongs to. `source_directories` records every
/// on-disk directory (emoji-encoded form) any file of the entity was
/// observed in under that album name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AlbumEntity {
  pub name:              String,
  pub source_directories: HashSet<String>,
}

impl AlbumEntity {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), source_directories: HashSet::new() }
  }
}

/// The merged view of one piece of content: a primary physical file, any
/// secondaries found elsewhere, in-folder duplicates, and the albums it
/// belongs to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaEntity {
  pub primary_file:     FileEntity,
  pub secondary_files:  Vec<FileEntity>,
  pub duplicates_files: Vec<FileEntity>,
  pub albums_map:       HashMap<String, AlbumEntity>,

  /// Independent physical copies stage 7 places in `Albums/*` under
  /// `AlbumBehavior::DuplicateCopy` (§4.I). These are distinct files from
  /// `primary_file`, not shortcuts, so stage 5 must write EXIF to each one
  /// too rather than assume the primary's write covers them transitively.
  pub album_copy_paths: Vec<PathBuf>,

  pub date_taken:                 Option<ResolvedDateTime>,
  pub date_accuracy:              Option<DateAccuracy>,
  pub date_time_extraction_method: DateExtractionMethod,

  pub partner_shared: bool,

  /// Content digest shared by every file in the entity (invariant 1).
  pub content_digest: String,
}

impl MediaEntity {
  pub fn new(primary_file: FileEntity, content_digest: String) -> Self {
    Self {
      primary_file,
      secondary_files: Vec::new(),
      duplicates_files: Vec::new(),
      albums_map: HashMap::new(),
      album_copy_paths: Vec::new(),
      date_taken: None,
      date_accuracy: None,
      date_time_extraction_method: DateExtractionMethod::None,
      partner_shared: false,
      content_digest,
    }
  }

  /// All non-deleted files this entity currently owns: primary, secondary,
  /// and duplicates. Used by invariant checks and by stages that need to
  /// walk every physical file regardless of role.
  pub fn all_files(&self) -> impl Iterator<Item = &FileEntity> {
    std::iter::once(&self.primary_file)
      .chain(self.secondary_files.iter())
      .chain(self.duplicates_files.iter())
  }

  pub fn all_files_mut(&mut self) -> impl Iterator<Item = &mut FileEntity> {
    std::iter::once(&mut self.primary_file)
      .chain(self.secondary_files.iter_mut())
      .chain(self.duplicates_files.iter_mut())
  }

  /// Applies a newly resolved date, honoring invariant 5: a less-accurate
  /// resolver must never overwrite a more-accurate one. Returns whether the
  /// date was actually applied.
  pub fn apply_resolved_date(
    &mut self,
    date: ResolvedDateTime,
    method: DateExtractionMethod,
  ) -> bool {
    let accuracy = method.accuracy();
    if self.date_accuracy.is_some_and(|existing| existing <= accuracy) {
      return false;
    }
    self.date_taken = Some(date);
    self.date_accuracy = Some(accuracy);
    self.date_time_extraction_method = method;
    true
  }

  /// Records album membership for one file of this entity (§4.G). Never
  /// called for year-folder or special-folder files.
  pub fn record_album(&mut self, album_name: &str, source_directory: &str) {
    self
      .albums_map
      .entry(album_name.to_string())
      .or_insert_with(|| AlbumEntity::new(album_name))
      .source_directories
      .insert(source_directory.to_string());
  }

  /// Invariant 2/3 checker used by tests: no two files among primary+
  /// secondary share a parent directory.
  pub fn primary_secondary_parents_are_unique(&self) -> bool {
    let mut seen = HashSet::new();
    std::iter::once(&self.primary_file)
      .chain(self.secondary_files.iter())
      .all(|f| seen.insert(f.parent_dir().to_path_buf()))
  }
}


#[cfg(test)]
mod test_albums_map {
  use super::*;

  #[test]
  fn test_record_album_accumulates_source_directories() {
    let mut entity = MediaEntity::new(
      crate::prim::FileEntity::new("/in/Vacation/a.jpg", 1, false),
      "digest".into(),
    );
    entity.record_album("Vacation", "/in/Vacation");
    entity.record_album("Vacation", "/in/Vacation (1)");

    let album = &entity.albums_map["Vacation"];
    assert_eq!(album.source_directories.len(), 2);
  }
}

#[cfg(test)]
mod test_invariants {
  use super::*;

  #[test]
  fn test_unique_parents_detects_collision() {
    let mut entity = MediaEntity::new(
      crate::prim::FileEntity::new("/in/a/x.jpg", 1, false),
      "digest".into(),
    );
    entity.secondary_files.push(crate::prim::FileEntity::new("/in/a/y.jpg", 1, false));

    assert!(!entity.primary_secondary_parents_are_unique());
  }
}
