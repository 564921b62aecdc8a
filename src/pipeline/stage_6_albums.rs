//! Stage 6 — album engine (§4.G). Walks every file of every `MediaEntity`
//! and, for files that came from an album directory, records album
//! membership regardless of whether that file ended up primary, secondary,
//! or a duplicate.

use std::{collections::HashMap, path::PathBuf, time::Instant};

use crate::{config::constants::UNTITLED_ALBUM_PREFIX, prim::MediaEntity};

pub struct AlbumReport {
  pub duration: std::time::Duration,
}

/// `album_index` maps a file's original source path to the album directory
/// name it was discovered in (built in stage 2; absent for year/special
/// folder files). Untitled albums (`Untitled(n)`) collapse to one shared
/// `Untitled Albums` bucket.
pub fn run(entities: &mut [MediaEntity], album_index: &HashMap<PathBuf, String>) -> AlbumReport {
  let started = Instant::now();

  for entity in entities.iter_mut() {
    let memberships: Vec<(String, String)> = entity
      .all_files()
      .filter_map(|file| {
        album_index.get(&file.source_path).map(|album| {
          let canonical = canonicalize_album_name(album);
          (canonical, file.parent_dir().to_string_lossy().into_owned())
        })
      })
      .collect();

    for (album, source_directory) in memberships {
      entity.record_album(&album, &source_directory);
    }
  }

  AlbumReport { duration: started.elapsed() }
}

fn canonicalize_album_name(name: &str) -> String {
  if name.to_lowercase().starts_with(UNTITLED_ALBUM_PREFIX) {
    "Untitled Albums".to_string()
  } else {
    name.to_string()
  }
}

#[cfg(test)]
mod test_run {
  use super::*;
  use crate::prim::FileEntity;

  #[test]
  fn test_records_album_membership_for_secondary_file() {
    let mut entity = MediaEntity::new(FileEntity::new("/in/Photos from 2022/a.jpg", 1, true), "digest".into());
    entity.secondary_files.push(FileEntity::new("/in/Vacation/a.jpg", 1, false));

    let mut index = HashMap::new();
    index.insert(PathBuf::from("/in/Vacation/a.jpg"), "Vacation".to_string());

    let mut entities = [entity];
    run(&mut entities, &index);

    assert!(entities[0].albums_map.contains_key("Vacation"));
  }

  #[test]
  fn test_untitled_albums_collapse_to_shared_bucket() {
    assert_eq!(canonicalize_album_name("Untitled(3)"), "Untitled Albums");
    assert_eq!(canonicalize_album_name("Vacation"), "Vacation");
  }

  #[test]
  fn test_year_folder_file_contributes_no_album() {
    let entity = MediaEntity::new(FileEntity::new("/in/Photos from 2022/a.jpg", 1, true), "digest".into());
    let mut entities = [entity];
    run(&mut entities, &HashMap::new());
    assert!(entities[0].albums_map.is_empty());
  }
}
