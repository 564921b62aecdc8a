//! Stage 7 — moving strategies (§4.I). Materializes the final `MediaEntity`
//! set into `ALL_PHOTOS/`, `Albums/`, `PARTNER_SHARED/`, and `_Duplicates/`
//! according to the configured album strategy and date-division level. Every
//! media move or delete is paired with its sidecar's move or delete
//! (`relocate_sidecar`), so the input tree never keeps an orphaned `.json`.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Mutex,
  time::Instant,
};

use chrono::Datelike;

use crate::{
  config::{AlbumBehavior, DateDivision, GlobalConfig},
  io::{create_shortcut, move_file, unique_path},
  prim::MediaEntity,
};

pub struct MoveReport {
  pub moved:    u64,
  pub deleted:  u64,
  pub failures: u64,
  pub duration: std::time::Duration,
}

/// Per-directory placement lock: §5 requires filename-collision detection
/// to serialize per target directory so two workers never assign the same
/// `(n)` suffix. A single global lock is sufficient here since stage 7 runs
/// its placement loop on the orchestrator thread (see `pool::PoolSet`'s
/// `file_io` pool for the actual move/copy I/O).
static PLACEMENT_LOCK: Mutex<()> = Mutex::new(());

pub fn run(
  entities: &mut [MediaEntity],
  output_root: &Path,
  config: &GlobalConfig,
  sidecar_index: &mut HashMap<PathBuf, PathBuf>,
) -> Result<MoveReport, String> {
  let started = Instant::now();
  let mut moved = 0u64;
  let mut deleted = 0u64;
  let mut failures = 0u64;

  std::fs::create_dir_all(output_root).map_err(|e| format!("CollisionUnresolvable: {e}"))?;

  for entity in entities.iter_mut() {
    match place_entity(entity, output_root, config, sidecar_index) {
      Ok((m, d)) => {
        moved += m;
        deleted += d;
      }
      Err(_) => failures += 1,
    }
  }

  if config.album_behavior == AlbumBehavior::Json {
    write_albums_info(entities, output_root)?;
  }

  Ok(MoveReport { moved, deleted, failures, duration: started.elapsed() })
}

/// Strategy=json (§4.I, §6): emits `albums-info.json` at the output root
/// instead of materializing album shortcuts/copies.
fn write_albums_info(entities: &[MediaEntity], output_root: &Path) -> Result<(), String> {
  #[derive(serde::Serialize)]
  struct Entry<'a> {
    primary_path:  Option<&'a str>,
    albums:        Vec<&'a str>,
    #[serde(rename = "dateTaken", skip_serializing_if = "Option::is_none")]
    date_taken:    Option<String>,
    #[serde(rename = "partnerShared")]
    partner_shared: bool,
  }

  let entries: Vec<Entry> = entities
    .iter()
    .map(|e| Entry {
      primary_path:   e.primary_file.target_path.as_ref().and_then(|p| p.to_str()),
      albums:         e.albums_map.keys().map(String::as_str).collect(),
      date_taken:     e.date_taken.map(|d| d.to_rfc3339()),
      partner_shared: e.partner_shared,
    })
    .collect();

  let body = serde_json::to_vec_pretty(&entries).map_err(|e| e.to_string())?;
  std::fs::write(output_root.join("albums-info.json"), body).map_err(|e| e.to_string())
}

fn place_entity(
  entity: &mut MediaEntity,
  output_root: &Path,
  config: &GlobalConfig,
  sidecar_index: &mut HashMap<PathBuf, PathBuf>,
) -> Result<(u64, u64), String> {
  let mut moved = 0u64;
  let mut deleted = 0u64;

  let primary_base = if config.divide_partner_shared && entity.partner_shared {
    output_root.join("PARTNER_SHARED")
  } else {
    output_root.join("ALL_PHOTOS")
  };
  let primary_dir = date_division_subdir(&primary_base, entity, config.date_division);

  let mut album_names: Vec<String> = entity.albums_map.keys().cloned().collect();
  album_names.sort();

  match config.album_behavior {
    AlbumBehavior::Ignore if album_names.is_empty() && !entity.primary_file.from_year_folder => {
      // Album-only file under `ignore`: dropped entirely, not an error.
      return Ok((0, 0));
    }
    _ => {}
  }

  if config.album_behavior == AlbumBehavior::ReverseShortcut && !album_names.is_empty() {
    // §4.I reverse-shortcut: the bytes live under `Albums/<first album>/`;
    // `ALL_PHOTOS` and every other album get a shortcut pointing back at it.
    let home_album = &album_names[0];
    let home_dir = output_root.join("Albums").join(sanitize_album_dir(home_album));
    let primary_target = place_primary(entity, &home_dir, config, sidecar_index)?;
    moved += 1;

    create_all_photos_shortcut(&primary_dir, &primary_target)?;
    for album in &album_names[1..] {
      create_album_shortcut(output_root, album, &primary_target)?;
    }

    deleted += discard_secondaries_and_duplicates(entity, output_root, config, sidecar_index)?;
    return Ok((moved, deleted));
  }

  let primary_target = place_primary(entity, &primary_dir, config, sidecar_index)?;
  moved += 1;

  match config.album_behavior {
    AlbumBehavior::Shortcut => {
      for album in &album_names {
        create_album_shortcut(output_root, album, &primary_target)?;
      }
    }
    AlbumBehavior::DuplicateCopy => {
      for album in &album_names {
        let dest = copy_into_album(output_root, album, &primary_target)?;
        entity.album_copy_paths.push(dest);
      }
    }
    AlbumBehavior::ReverseShortcut | AlbumBehavior::Json | AlbumBehavior::Nothing | AlbumBehavior::Ignore => {}
  }

  deleted += discard_secondaries_and_duplicates(entity, output_root, config, sidecar_index)?;

  Ok((moved, deleted))
}

fn place_primary(
  entity: &mut MediaEntity,
  target_dir: &Path,
  config: &GlobalConfig,
  sidecar_index: &mut HashMap<PathBuf, PathBuf>,
) -> Result<PathBuf, String> {
  let source = entity.primary_file.source_path.clone();
  let file_name = final_file_name(&source, config.transform_pixel_mp);

  let target = {
    let _guard = PLACEMENT_LOCK.lock().unwrap();
    let candidate = target_dir.join(&file_name);
    unique_path(&candidate, |p| p.exists())
  };

  move_file(&source, &target)?;
  entity.primary_file.target_path = Some(target.clone());
  entity.primary_file.is_moved = true;

  relocate_sidecar(sidecar_index, &source, Some(&target))?;
  Ok(target)
}

/// Pairs a media move/delete with its sidecar (spec §4.I: "paired sidecar
/// move/delete", so the input tree never keeps an orphaned `.json`).
/// `sidecar_index` is keyed by each file's *original* source path, so a
/// relocated sidecar's new path is written back under that same key —
/// stage 5's EXIF writer looks sidecars up by original primary source path
/// and runs after this stage, so it must still resolve correctly.
fn relocate_sidecar(
  sidecar_index: &mut HashMap<PathBuf, PathBuf>,
  source: &Path,
  new_media_target: Option<&Path>,
) -> Result<(), String> {
  let Some(sidecar_path) = sidecar_index.get(source).cloned() else { return Ok(()) };
  if !sidecar_path.exists() {
    return Ok(());
  }

  match new_media_target {
    Some(target) => {
      let sidecar_target = {
        let mut name = target.file_name().ok_or("PathResolution: target has no file name")?.to_os_string();
        name.push(".json");
        target.with_file_name(name)
      };
      move_file(&sidecar_path, &sidecar_target)?;
      sidecar_index.insert(source.to_path_buf(), sidecar_target);
    }
    None => {
      std::fs::remove_file(&sidecar_path).map_err(|e| e.to_string())?;
      sidecar_index.remove(source);
    }
  }
  Ok(())
}

fn final_file_name(source: &Path, transform_pixel_mp: bool) -> String {
  let name = source.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
  if !transform_pixel_mp {
    return name;
  }
  match source.extension().map(|e| e.to_string_lossy().to_lowercase()) {
    Some(ext) if ext == "mp" || ext == "mv" => {
      format!("{}.mp4", source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default())
    }
    _ => name,
  }
}

fn create_all_photos_shortcut(primary_dir: &Path, target: &Path) -> Result<(), String> {
  let link_name = target.file_name().ok_or("PathResolution: target has no file name")?;
  let link = {
    let _guard = PLACEMENT_LOCK.lock().unwrap();
    unique_path(&primary_dir.join(link_name), |p| p.exists())
  };
  create_shortcut(target, &link)
}

fn create_album_shortcut(output_root: &Path, album: &str, target: &Path) -> Result<(), String> {
  let album_dir = output_root.join("Albums").join(sanitize_album_dir(album));
  let link_name = target.file_name().ok_or("PathResolution: target has no file name")?;
  let link = {
    let _guard = PLACEMENT_LOCK.lock().unwrap();
    unique_path(&album_dir.join(link_name), |p| p.exists())
  };
  create_shortcut(target, &link)
}

fn copy_into_album(output_root: &Path, album: &str, target: &Path) -> Result<PathBuf, String> {
  let album_dir = output_root.join("Albums").join(sanitize_album_dir(album));
  let link_name = target.file_name().ok_or("PathResolution: target has no file name")?;
  let dest = {
    let _guard = PLACEMENT_LOCK.lock().unwrap();
    unique_path(&album_dir.join(link_name), |p| p.exists())
  };
  std::fs::create_dir_all(&album_dir).map_err(|e| e.to_string())?;
  std::fs::copy(target, &dest).map_err(|e| e.to_string())?;
  Ok(dest)
}

fn sanitize_album_dir(name: &str) -> String {
  crate::prim::encode_emoji(name)
}

/// Secondaries are never materialized as bytes (they already contributed
/// their album membership and sidecar data in earlier stages); duplicates
/// are deleted from the input, or moved to `_Duplicates/` when
/// `keep_duplicates` is set.
fn discard_secondaries_and_duplicates(
  entity: &mut MediaEntity,
  output_root: &Path,
  config: &GlobalConfig,
  sidecar_index: &mut HashMap<PathBuf, PathBuf>,
) -> Result<u64, String> {
  let mut count = 0u64;

  for secondary in &mut entity.secondary_files {
    if secondary.source_path.exists() {
      std::fs::remove_file(&secondary.source_path).map_err(|e| e.to_string())?;
    }
    relocate_sidecar(sidecar_index, &secondary.source_path, None)?;
    secondary.is_deleted = true;
  }

  for duplicate in &mut entity.duplicates_files {
    if config.keep_duplicates {
      let dest_dir = output_root.join("_Duplicates");
      let file_name = duplicate.source_path.file_name().ok_or("PathResolution: no file name")?;
      let dest = {
        let _guard = PLACEMENT_LOCK.lock().unwrap();
        unique_path(&dest_dir.join(file_name), |p| p.exists())
      };
      move_file(&duplicate.source_path, &dest)?;
      relocate_sidecar(sidecar_index, &duplicate.source_path, Some(&dest))?;
      duplicate.target_path = Some(dest);
      duplicate.is_moved = true;
    } else {
      std::fs::remove_file(&duplicate.source_path).map_err(|e| e.to_string())?;
      relocate_sidecar(sidecar_index, &duplicate.source_path, None)?;
      duplicate.is_deleted = true;
    }
    count += 1;
  }

  Ok(count)
}

/// Date-division applies only inside `ALL_PHOTOS/`/`PARTNER_SHARED/`;
/// `Albums/*` always stays flat (§4.I). Undated entities fall under
/// `date-unknown/`.
fn date_division_subdir(base: &Path, entity: &MediaEntity, division: DateDivision) -> PathBuf {
  let Some(date) = entity.date_taken else {
    return base.join("date-unknown");
  };

  match division {
    DateDivision::None => base.to_path_buf(),
    DateDivision::Year => base.join(format!("{:04}", date.year())),
    DateDivision::YearMonth => base.join(format!("{:04}", date.year())).join(format!("{:02}", date.month())),
    DateDivision::YearMonthDay => base
      .join(format!("{:04}", date.year()))
      .join(format!("{:02}", date.month()))
      .join(format!("{:02}", date.day())),
  }
}

#[cfg(test)]
mod test_date_division_subdir {
  use chrono::TimeZone;

  use super::*;
  use crate::prim::FileEntity;

  fn entity_with_date(year: i32) -> MediaEntity {
    let mut entity = MediaEntity::new(FileEntity::new("/in/a.jpg", 1, true), "digest".into());
    entity.date_taken = Some(chrono::Utc.with_ymd_and_hms(year, 6, 15, 0, 0, 0).unwrap().fixed_offset());
    entity
  }

  #[test]
  fn test_year_division() {
    let entity = entity_with_date(2022);
    let path = date_division_subdir(Path::new("/out/ALL_PHOTOS"), &entity, DateDivision::Year);
    assert_eq!(path, PathBuf::from("/out/ALL_PHOTOS/2022"));
  }

  #[test]
  fn test_year_month_day_division() {
    let entity = entity_with_date(2022);
    let path = date_division_subdir(Path::new("/out/ALL_PHOTOS"), &entity, DateDivision::YearMonthDay);
    assert_eq!(path, PathBuf::from("/out/ALL_PHOTOS/2022/06/15"));
  }

  #[test]
  fn test_undated_entity_falls_under_date_unknown() {
    let entity = MediaEntity::new(FileEntity::new("/in/a.jpg", 1, true), "digest".into());
    let path = date_division_subdir(Path::new("/out/ALL_PHOTOS"), &entity, DateDivision::Year);
    assert_eq!(path, PathBuf::from("/out/ALL_PHOTOS/date-unknown"));
  }
}

#[cfg(test)]
mod test_reverse_shortcut {
  use super::*;
  use crate::prim::FileEntity;

  #[test]
  fn test_primary_lives_under_first_album_with_shortcuts_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in/PXL_001.jpg");
    std::fs::create_dir_all(input.parent().unwrap()).unwrap();
    std::fs::write(&input, b"bytes").unwrap();

    let mut entity = MediaEntity::new(FileEntity::new(&input, 5, true), "digest".into());
    entity.albums_map.insert("Banana Album".into(), crate::prim::AlbumEntity::new("Banana Album"));
    entity.albums_map.insert("Summer".into(), crate::prim::AlbumEntity::new("Summer"));

    let output_root = dir.path().join("out");
    let config = GlobalConfig { album_behavior: AlbumBehavior::ReverseShortcut, ..GlobalConfig::default() };
    let mut sidecar_index = HashMap::new();

    let (moved, _deleted) = place_entity(&mut entity, &output_root, &config, &mut sidecar_index).unwrap();
    assert_eq!(moved, 1);

    let home = output_root.join("Albums").join("Banana Album").join("PXL_001.jpg");
    assert!(home.is_file(), "expected bytes at {home:?}");

    let all_photos_link = output_root.join("ALL_PHOTOS").join("date-unknown").join("PXL_001.jpg");
    assert!(all_photos_link.exists(), "expected ALL_PHOTOS shortcut at {all_photos_link:?}");

    let other_album_link = output_root.join("Albums").join("Summer").join("PXL_001.jpg");
    assert!(other_album_link.exists(), "expected second-album shortcut at {other_album_link:?}");
  }
}

#[cfg(test)]
mod test_relocate_sidecar {
  use super::*;
  use crate::prim::FileEntity;

  #[test]
  fn test_primary_move_carries_its_sidecar_and_updates_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in/PXL_001.jpg");
    let sidecar = dir.path().join("in/PXL_001.jpg.json");
    std::fs::create_dir_all(input.parent().unwrap()).unwrap();
    std::fs::write(&input, b"bytes").unwrap();
    std::fs::write(&sidecar, b"{}").unwrap();

    let mut entity = MediaEntity::new(FileEntity::new(&input, 5, true), "digest".into());
    let output_root = dir.path().join("out");
    let config = GlobalConfig::default();
    let mut sidecar_index = HashMap::from([(input.clone(), sidecar.clone())]);

    place_entity(&mut entity, &output_root, &config, &mut sidecar_index).unwrap();

    assert!(!sidecar.exists(), "original sidecar should have moved out of the input tree");
    let relocated = sidecar_index.get(&input).expect("index should still resolve by original source path");
    assert!(relocated.is_file(), "relocated sidecar should exist at {relocated:?}");
    assert_eq!(relocated.file_name().unwrap(), "PXL_001.jpg.json");
  }

  #[test]
  fn test_deleted_secondary_drops_its_sidecar_too() {
    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("in/a/PXL_001.jpg");
    let secondary = dir.path().join("in/b/PXL_001.jpg");
    let secondary_sidecar = dir.path().join("in/b/PXL_001.jpg.json");
    std::fs::create_dir_all(primary.parent().unwrap()).unwrap();
    std::fs::create_dir_all(secondary.parent().unwrap()).unwrap();
    std::fs::write(&primary, b"bytes").unwrap();
    std::fs::write(&secondary, b"bytes").unwrap();
    std::fs::write(&secondary_sidecar, b"{}").unwrap();

    let mut entity = MediaEntity::new(FileEntity::new(&primary, 5, true), "digest".into());
    entity.secondary_files.push(FileEntity::new(&secondary, 5, false));

    let output_root = dir.path().join("out");
    let config = GlobalConfig::default();
    let mut sidecar_index = HashMap::from([(secondary.clone(), secondary_sidecar.clone())]);

    place_entity(&mut entity, &output_root, &config, &mut sidecar_index).unwrap();

    assert!(!secondary_sidecar.exists(), "secondary's sidecar must not be left orphaned");
    assert!(!sidecar_index.contains_key(&secondary));
  }
}

#[cfg(test)]
mod test_final_file_name {
  use super::*;

  #[test]
  fn test_renames_pixel_motion_photo_extension() {
    assert_eq!(final_file_name(Path::new("/in/PXL_001.MP"), true), "PXL_001.mp4");
  }

  #[test]
  fn test_leaves_name_unchanged_when_flag_off() {
    assert_eq!(final_file_name(Path::new("/in/PXL_001.MP"), false), "PXL_001.MP");
  }
}
