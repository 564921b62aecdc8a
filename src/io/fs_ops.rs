//! Filesystem primitives for stage 7: atomic move with cross-device
//! fallback, idempotent collision-suffix generation, and shortcut creation.

use std::{
  fs,
  path::{Path, PathBuf},
};

/// Moves `src` to `dst`, renaming when both share a device and falling back
/// to copy+fsync+verify+delete across devices (§4.I "Atomicity").
pub fn move_file(src: &Path, dst: &Path) -> Result<(), String> {
  if let Some(parent) = dst.parent() {
    fs::create_dir_all(parent).map_err(|e| e.to_string())?;
  }

  match fs::rename(src, dst) {
    Ok(()) => Ok(()),
    Err(_) => copy_verify_delete(src, dst),
  }
}

fn copy_verify_delete(src: &Path, dst: &Path) -> Result<(), String> {
  let src_len = fs::metadata(src).map_err(|e| e.to_string())?.len();
  fs::copy(src, dst).map_err(|e| e.to_string())?;

  let dst_file = fs::File::open(dst).map_err(|e| e.to_string())?;
  dst_file.sync_all().map_err(|e| e.to_string())?;
  let dst_len = dst_file.metadata().map_err(|e| e.to_string())?.len();

  if dst_len != src_len {
    return Err(format!(
      "CrossDeviceMove: size mismatch after copy ({src_len} != {dst_len}) for {}",
      src.display()
    ));
  }

  fs::remove_file(src).map_err(|e| e.to_string())
}

/// Generates a non-colliding path in the same style as `foo.jpg` →
/// `foo(1).jpg` → `foo(2).jpg`, detecting an existing `(n)` suffix so that
/// re-applying it to an already-suffixed name never produces `(1)(1)`
/// (testable property 6).
pub fn unique_path(candidate: &Path, exists: impl Fn(&Path) -> bool) -> PathBuf {
  if !exists(candidate) {
    return candidate.to_path_buf();
  }

  let (base, start_n) = strip_existing_suffix(candidate);
  let extension = candidate.extension().map(|e| e.to_string_lossy().to_string());

  let mut n = start_n.max(1);
  loop {
    let mut name = format!("{base}({n})");
    if let Some(ext) = &extension {
      name.push('.');
      name.push_str(ext);
    }
    let attempt = candidate.with_file_name(name);
    if !exists(&attempt) {
      return attempt;
    }
    n += 1;
  }
}

/// Splits `name(n).ext` into `(name, n)`, or `(stem, 0)` if no parenthetical
/// suffix is present.
fn strip_existing_suffix(path: &Path) -> (String, u32) {
  let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();

  if let Some(open) = stem.rfind('(') {
    if stem.ends_with(')') {
      if let Ok(n) = stem[open + 1..stem.len() - 1].parse::<u32>() {
        return (stem[..open].to_string(), n + 1);
      }
    }
  }
  (stem, 1)
}

/// Creates a platform shortcut at `link` pointing at `target` (§4.I
/// "shortcut"/"reverse-shortcut"): a symlink on Unix, falling back to a
/// hardlink if symlinking is unavailable (e.g. restricted Windows
/// permissions, per §4.A's "platform shortcut" note).
pub fn create_shortcut(target: &Path, link: &Path) -> Result<(), String> {
  if let Some(parent) = link.parent() {
    fs::create_dir_all(parent).map_err(|e| e.to_string())?;
  }
  symlink::symlink_file(target, link)
    .or_else(|_| fs::hard_link(target, link))
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod test_move_file {
  use super::*;

  #[test]
  fn test_moves_file_within_same_device() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src.jpg");
    let dst = dir.path().join("nested/dst.jpg");
    std::fs::write(&src, b"content").unwrap();

    move_file(&src, &dst).unwrap();

    assert!(!src.exists());
    assert_eq!(std::fs::read(&dst).unwrap(), b"content");
  }
}
