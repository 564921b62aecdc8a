//! Stage 1 — extension repair (§4.A, §6 `--fix-extensions`). Sniffs the
//! true MIME family from header bytes and renames files whose extension
//! disagrees, pairing the rename with the file's sidecar so no JSON is
//! orphaned.

use std::{path::Path, time::Instant};

use walkdir::WalkDir;

use crate::config::ExtensionFixing;

pub struct ExtensionFixReport {
  pub fixed:    u64,
  pub duration: std::time::Duration,
}

/// Extensions treated as interchangeable and therefore never "fixed" under
/// `conservative` mode, since renaming between them has no practical value.
const EQUIVALENT_GROUPS: &[&[&str]] = &[&["jpg", "jpeg"], &["tif", "tiff"], &["mpg", "mpeg"]];

fn mime_to_canonical_extension(mime: &str) -> Option<&'static str> {
  match mime {
    "image/jpeg" => Some("jpg"),
    "image/png" => Some("png"),
    "image/gif" => Some("gif"),
    "image/tiff" => Some("tiff"),
    "image/webp" => Some("webp"),
    _ => None,
  }
}

fn same_equivalent_group(a: &str, b: &str) -> bool {
  EQUIVALENT_GROUPS.iter().any(|group| group.contains(&a) && group.contains(&b))
}

pub fn run(root: &Path, mode: ExtensionFixing) -> Result<ExtensionFixReport, String> {
  let started = Instant::now();
  if mode == ExtensionFixing::None {
    return Ok(ExtensionFixReport { fixed: 0, duration: started.elapsed() });
  }

  let mut fixed = 0u64;
  for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    let Some(current_ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
      continue;
    };

    let Some(sniffed) = crate::prim::sniff_mime_from_file(path) else { continue };
    let Some(correct_ext) = mime_to_canonical_extension(sniffed) else { continue };

    if current_ext == correct_ext {
      continue;
    }
    if mode == ExtensionFixing::Conservative && same_equivalent_group(&current_ext, correct_ext) {
      continue;
    }

    let new_path = path.with_extension(correct_ext);
    if new_path.exists() {
      continue;
    }
    std::fs::rename(path, &new_path).map_err(|e| e.to_string())?;
    fixed += 1;

    if mode != ExtensionFixing::Solo {
      rename_matching_sidecar(path, &new_path);
    }
  }

  Ok(ExtensionFixReport { fixed, duration: started.elapsed() })
}

/// `solo` mode renames only the media file; every other mode keeps the
/// sidecar's basename in sync so the sidecar matcher still finds it.
fn rename_matching_sidecar(old_media: &Path, new_media: &Path) {
  let old_sidecar = old_media.with_file_name(format!("{}.json", old_media.file_name().unwrap().to_string_lossy()));
  if old_sidecar.exists() {
    let new_sidecar =
      new_media.with_file_name(format!("{}.json", new_media.file_name().unwrap().to_string_lossy()));
    let _ = std::fs::rename(old_sidecar, new_sidecar);
  }
}
