//! Progress persistence (§4.L): `progress.json` at the output root, written
//! atomically after each stage succeeds so a killed run can resume without
//! redoing completed work.

use std::{
  collections::HashMap,
  fs,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::prim::MediaEntity;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepDuration {
  pub iso8601: String,
  pub seconds: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepRecord {
  pub duration: StepDuration,
  pub result:   String,
  pub message:  String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressFile {
  #[serde(rename = "Completed steps")]
  pub completed_steps: Vec<String>,
  pub steps:           HashMap<String, StepRecord>,
  pub dataset_root:    String,
  pub output_root:     String,
  /// Forward-slash-normalized, serialized `MediaEntity` snapshot.
  pub media_entity_collection_object: Vec<MediaEntity>,
  pub updated_at: String,
}

impl ProgressFile {
  pub fn new(dataset_root: &Path, output_root: &Path) -> Self {
    Self {
      completed_steps: Vec::new(),
      steps: HashMap::new(),
      dataset_root: normalize_forward_slash(dataset_root),
      output_root: normalize_forward_slash(output_root),
      media_entity_collection_object: Vec::new(),
      updated_at: String::new(),
    }
  }

  pub fn mark_stage(&mut self, stage_id: &str, record: StepRecord) {
    if !self.completed_steps.contains(&stage_id.to_string()) {
      self.completed_steps.push(stage_id.to_string());
    }
    self.steps.insert(stage_id.to_string(), record);
  }

  pub fn is_complete(&self, stage_id: &str) -> bool {
    self.completed_steps.iter().any(|s| s == stage_id)
  }

  /// Writes `self` to `<output_root>/progress.json`, via a temp file +
  /// rename so a crash mid-write never leaves a truncated file behind.
  pub fn save(&self, output_root: &Path) -> Result<(), String> {
    let final_path = output_root.join("progress.json");
    let tmp_path = output_root.join("progress.json.tmp");
    let body = serde_json::to_vec_pretty(self)
      .map_err(|e| format!("CorruptProgressFile: failed to serialize: {e}"))?;
    fs::write(&tmp_path, body).map_err(|e| e.to_string())?;
    fs::rename(&tmp_path, &final_path).map_err(|e| e.to_string())
  }

  pub fn load(output_root: &Path) -> Result<Option<Self>, String> {
    let path = output_root.join("progress.json");
    if !path.exists() {
      return Ok(None);
    }
    let body = fs::read(&path).map_err(|e| e.to_string())?;
    let parsed = serde_json::from_slice(&body)
      .map_err(|e| format!("CorruptProgressFile: {} is unreadable: {e}", path.display()))?;
    Ok(Some(parsed))
  }

  /// Rebases every stored path from the progress file's original
  /// `dataset_root`/`output_root` onto the roots a resumed run is actually
  /// using, rewriting path separators to the current OS's and, on
  /// Windows, comparing case-insensitively (§4.L).
  pub fn rebase(&mut self, new_dataset_root: &Path, new_output_root: &Path) {
    let old_dataset_root = std::mem::replace(
      &mut self.dataset_root,
      normalize_forward_slash(new_dataset_root),
    );
    let old_output_root =
      std::mem::replace(&mut self.output_root, normalize_forward_slash(new_output_root));

    for entity in &mut self.media_entity_collection_object {
      for file in entity.all_files_mut() {
        file.source_path = rebase_path(&file.source_path, &old_dataset_root, new_dataset_root);
        if let Some(target) = &file.target_path {
          file.target_path =
            Some(rebase_path(target, &old_output_root, new_output_root));
        }
      }
    }
  }
}

fn rebase_path(path: &Path, old_root: &str, new_root: &Path) -> PathBuf {
  let normalized = normalize_forward_slash(path);
  match normalized.strip_prefix(old_root) {
    Some(rest) => new_root.join(rest.trim_start_matches('/')),
    None => path.to_path_buf(),
  }
}

fn normalize_forward_slash(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod test_progress_round_trip {
  use super::*;

  #[test]
  fn test_save_and_load_round_trips_completed_steps() {
    let dir = tempfile::tempdir().unwrap();
    let mut progress = ProgressFile::new(Path::new("/in"), dir.path());
    progress.mark_stage(
      "extensions",
      StepRecord {
        duration: StepDuration { iso8601: "PT1S".into(), seconds: 1.0 },
        result:   "ok".into(),
        message:  "repaired 3 files".into(),
      },
    );
    progress.save(dir.path()).unwrap();

    let loaded = ProgressFile::load(dir.path()).unwrap().unwrap();
    assert!(loaded.is_complete("extensions"));
    assert_eq!(loaded.steps["extensions"].message, "repaired 3 files");
  }

  #[test]
  fn test_load_returns_none_when_absent() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ProgressFile::load(dir.path()).unwrap().is_none());
  }

  #[test]
  fn test_load_reports_corrupt_progress_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("progress.json"), b"not json").unwrap();
    let result = ProgressFile::load(dir.path());
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("CorruptProgressFile"));
  }
}
