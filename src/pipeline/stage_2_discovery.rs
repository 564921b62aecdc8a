//! Stage 2 — media discovery & classification (§4.A, §4.C). Walks the
//! dataset root, classifies each directory as year/album/special, and pairs
//! every recognized media file with its sidecar JSON (if any).

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  time::Instant,
};

use walkdir::WalkDir;

use crate::{
  config::GlobalConfig,
  pipeline::sidecar_matcher::find_sidecar,
  prim::{is_media_path, is_special_folder_name, is_year_folder_name, FileEntity},
};

/// One media file found on disk, with the discovery-time context stage 3
/// onward needs but that doesn't belong on `FileEntity` itself.
pub struct DiscoveredFile {
  pub file:             FileEntity,
  pub sidecar_path:     Option<PathBuf>,
  pub album_name:       Option<String>,
  pub is_special_folder: bool,
}

pub struct DiscoveryResult {
  pub files:    Vec<DiscoveredFile>,
  pub duration: std::time::Duration,
}

/// Walks `root` (already resolved to the Google Photos media subtree) and
/// returns one `DiscoveredFile` per recognized media file. Directories are
/// classified by basename only, matching §4.A's rule that album-ness is a
/// property of the parent directory, not of any per-file metadata.
pub fn run(root: &Path, config: &GlobalConfig) -> Result<DiscoveryResult, String> {
  let started = Instant::now();
  let mut files = Vec::new();

  for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    if !is_media_path(path) {
      continue;
    }

    let parent = path.parent().unwrap_or(root);
    let parent_name = parent.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

    let from_year_folder = is_year_folder_name(&parent_name);
    let is_special = is_special_folder_name(&parent_name);
    let album_name = (!from_year_folder && !is_special).then(|| parent_name.clone());

    let size = entry.metadata().map_err(|e| e.to_string())?.len();
    let sidecar_path = find_sidecar(path, config.try_hard, &|p| p.exists());

    let mut file = FileEntity::new(path.to_path_buf(), size, from_year_folder);
    if is_special {
      file.from_year_folder = false;
    }

    files.push(DiscoveredFile { file, sidecar_path, album_name, is_special_folder: is_special });
  }

  if files.is_empty() {
    return Err("NoMediaFound: no recognizable media files under the input root".to_string());
  }

  Ok(DiscoveryResult { files, duration: started.elapsed() })
}

/// Builds a `source_path -> sidecar_path` lookup for stage 4's json
/// resolver, keyed by the forward-slash form used throughout the pipeline.
pub fn sidecar_index(files: &[DiscoveredFile]) -> HashMap<PathBuf, PathBuf> {
  files
    .iter()
    .filter_map(|f| f.sidecar_path.as_ref().map(|s| (f.file.source_path.clone(), s.clone())))
    .collect()
}

/// Builds a `source_path -> album name` lookup for stage 6's album engine.
/// Absent entries mean the file came from a year or special folder.
pub fn album_index(files: &[DiscoveredFile]) -> HashMap<PathBuf, String> {
  files
    .iter()
    .filter_map(|f| f.album_name.as_ref().map(|a| (f.file.source_path.clone(), a.clone())))
    .collect()
}
