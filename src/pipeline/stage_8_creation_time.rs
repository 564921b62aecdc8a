//! Stage 8 — filesystem creation-time reconciliation (§4.J). Runs last, once
//! every file sits at its final `target_path`, and best-effort aligns each
//! physical file's OS creation time to its own last-modified time. Shortcuts
//! are skipped: their creation time is not independently settable on the
//! platforms this crate targets, and touching them would touch the file
//! they point at twice.

use std::time::Instant;

use crate::{io, prim::MediaEntity};

pub struct CreationTimeReport {
  pub updated:  u64,
  pub skipped:  u64,
  pub failures: u64,
  pub duration: std::time::Duration,
}

pub fn run(entities: &[MediaEntity], update_creation_time: bool) -> CreationTimeReport {
  let started = Instant::now();
  let mut updated = 0u64;
  let mut skipped = 0u64;
  let mut failures = 0u64;

  if !update_creation_time {
    return CreationTimeReport { updated, skipped, failures, duration: started.elapsed() };
  }

  for entity in entities {
    for file in entity.all_files() {
      if file.is_shortcut || file.is_deleted {
        skipped += 1;
        continue;
      }
      let Some(target) = &file.target_path else {
        skipped += 1;
        continue;
      };
      match io::align_creation_time(target) {
        Ok(()) => updated += 1,
        Err(_) => failures += 1,
      }
    }
  }

  CreationTimeReport { updated, skipped, failures, duration: started.elapsed() }
}

#[cfg(test)]
mod test_run {
  use super::*;
  use crate::prim::FileEntity;

  #[test]
  fn test_no_op_when_disabled() {
    let mut entity = MediaEntity::new(FileEntity::new("/in/a.jpg", 1, true), "digest".into());
    entity.primary_file.target_path = Some("/out/a.jpg".into());

    let report = run(&[entity], false);
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 0);
  }

  #[test]
  fn test_updates_file_at_its_target_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.jpg");
    std::fs::write(&path, b"x").unwrap();

    let mut entity = MediaEntity::new(FileEntity::new("/in/a.jpg", 1, true), "digest".into());
    entity.primary_file.target_path = Some(path);

    let report = run(&[entity], true);
    assert_eq!(report.updated, 1);
    assert_eq!(report.failures, 0);
  }

  #[test]
  fn test_skips_files_without_target_path() {
    let entity = MediaEntity::new(FileEntity::new("/in/a.jpg", 1, true), "digest".into());
    let report = run(&[entity], true);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.updated, 0);
  }
}
