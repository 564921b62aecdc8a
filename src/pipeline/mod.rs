//! Pipeline orchestrator (§4.K). Sequences the eight stages in their
//! dependency order — 1 (extensions) → 2 (discovery) → 3 (dedup) → 4
//! (dates) → 6 (albums) → 7 (move) → 5 (exif write) → 8 (creation time) —
//! persisting `ProgressFile` after each one so a killed run can resume.

mod sidecar_matcher;
mod stage_1_extensions;
mod stage_2_discovery;
mod stage_3_dedup;
mod stage_4_dates;
mod stage_5_exif_write;
mod stage_6_albums;
mod stage_7_move;
mod stage_8_creation_time;

use std::{
  collections::HashMap,
  path::Path,
  sync::atomic::{AtomicBool, Ordering},
  time::Instant,
};

use chrono::Utc;

use crate::{
  config::GlobalConfig,
  error::ErrorKind,
  pool::PoolSet,
  progress::{ProgressFile, StepDuration, StepRecord},
};

/// The eight stages in the order they appear in the spec's module list.
/// `ORDER` below carries the actual execution order, which differs (EXIF
/// write is deferred until after move).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
  Extensions,
  Discovery,
  Dedup,
  Dates,
  Albums,
  Move,
  ExifWrite,
  CreationTime,
}

impl Stage {
  pub fn id(&self) -> &'static str {
    match self {
      Stage::Extensions => "extensions",
      Stage::Discovery => "discovery",
      Stage::Dedup => "dedup",
      Stage::Dates => "dates",
      Stage::Albums => "albums",
      Stage::Move => "move",
      Stage::ExifWrite => "exif_write",
      Stage::CreationTime => "creation_time",
    }
  }

  /// Critical stages abort the whole run on failure (§7); the rest degrade
  /// to a logged, skippable failure so a run still produces useful output.
  pub fn is_critical(&self) -> bool {
    matches!(self, Stage::Discovery | Stage::Move)
  }
}

/// Execution order, distinct from declaration order: EXIF writing runs
/// after placement so it only ever touches a file once, at its final path.
pub const ORDER: [Stage; 8] = [
  Stage::Extensions,
  Stage::Discovery,
  Stage::Dedup,
  Stage::Dates,
  Stage::Albums,
  Stage::Move,
  Stage::ExifWrite,
  Stage::CreationTime,
];

#[derive(Debug)]
pub struct StageReport {
  pub stage:    Stage,
  pub success:  bool,
  pub duration: std::time::Duration,
  pub stats:    HashMap<String, u64>,
  pub message:  String,
  pub error:    Option<String>,
}

#[derive(Debug, Default)]
pub struct PipelineReport {
  pub media_processed:               u64,
  pub duplicates_removed:            u64,
  pub extras_skipped:                u64,
  pub extensions_fixed:              u64,
  pub coordinates_written:           u64,
  pub datetimes_written:             u64,
  pub creation_times_updated:        u64,
  pub extraction_method_histogram:   HashMap<String, u64>,
  pub stages:                        Vec<StageReport>,
}

pub struct Organizer {
  pub config: GlobalConfig,
  pub pools:  PoolSet,
}

impl Organizer {
  pub fn new(config: GlobalConfig) -> Self {
    let pools = PoolSet::detect();
    Self { config, pools }
  }

  /// Runs every stage in `ORDER`, persisting progress after each success
  /// and bailing out on a critical-stage failure (§7). `cancel` is polled
  /// between stages so a caller can request a clean stop.
  pub fn run(&self, cancel: &AtomicBool) -> Result<PipelineReport, String> {
    let input = self.config.input.clone().ok_or_else(|| format!("{}: no input root configured", ErrorKind::InputMissing))?;
    let output = self.config.output.clone().ok_or_else(|| format!("{}: no output root configured", ErrorKind::InputMissing))?;

    let mut progress = match ProgressFile::load(&output)? {
      Some(mut loaded) => {
        loaded.rebase(&input, &output);
        loaded
      }
      None => ProgressFile::new(&input, &output),
    };

    let mut report = PipelineReport::default();

    let mut discovered = Vec::new();
    let mut sidecar_index = HashMap::new();
    let mut album_index = HashMap::new();
    let mut entities: Vec<crate::prim::MediaEntity> = std::mem::take(&mut progress.media_entity_collection_object);

    for stage in ORDER {
      if cancel.load(Ordering::SeqCst) {
        return Err(format!("{}: cancelled before stage {}", ErrorKind::Cancelled, stage.id()));
      }
      if progress.is_complete(stage.id()) && stage != Stage::Discovery {
        continue;
      }

      let started = Instant::now();
      let outcome = self.run_stage(stage, &input, &output, &mut discovered, &mut sidecar_index, &mut album_index, &mut entities, &mut report);

      let duration = started.elapsed();
      let success = outcome.is_ok();
      let message = match &outcome {
        Ok(msg) => msg.clone(),
        Err(e) => e.clone(),
      };

      progress.mark_stage(
        stage.id(),
        StepRecord {
          duration: StepDuration { iso8601: format!("PT{}S", duration.as_secs_f64()), seconds: duration.as_secs_f64() },
          result:   if success { "ok".to_string() } else { "failed".to_string() },
          message:  message.clone(),
        },
      );
      progress.media_entity_collection_object = entities.clone();
      progress.updated_at = now_iso8601();
      progress.save(&output)?;

      report.stages.push(StageReport {
        stage,
        success,
        duration,
        stats: HashMap::new(),
        message,
        error: outcome.err(),
      });

      if !success && stage.is_critical() {
        return Err(format!("pipeline aborted: critical stage {} failed", stage.id()));
      }
    }

    report.media_processed = entities.len() as u64;
    Ok(report)
  }

  #[allow(clippy::too_many_arguments)]
  fn run_stage(
    &self,
    stage: Stage,
    input: &Path,
    output: &Path,
    discovered: &mut Vec<stage_2_discovery::DiscoveredFile>,
    sidecar_index: &mut HashMap<std::path::PathBuf, std::path::PathBuf>,
    album_index: &mut HashMap<std::path::PathBuf, String>,
    entities: &mut Vec<crate::prim::MediaEntity>,
    report: &mut PipelineReport,
  ) -> Result<String, String> {
    match stage {
      Stage::Extensions => {
        let r = stage_1_extensions::run(input, self.config.extension_fixing)?;
        report.extensions_fixed += r.fixed;
        Ok(format!("fixed {} extensions", r.fixed))
      }
      Stage::Discovery => {
        let r = stage_2_discovery::run(input, &self.config)?;
        *sidecar_index = stage_2_discovery::sidecar_index(&r.files);
        *album_index = stage_2_discovery::album_index(&r.files);
        *discovered = r.files;
        Ok(format!("discovered {} files", discovered.len()))
      }
      Stage::Dedup => {
        let r = stage_3_dedup::run(std::mem::take(discovered), self.config.skip_extras, &self.pools.hash);
        report.duplicates_removed += r.duplicates_removed;
        report.extras_skipped += r.extras_skipped;
        *entities = r.entities;
        Ok(format!("merged into {} entities, removed {} duplicates", entities.len(), r.duplicates_removed))
      }
      Stage::Dates => {
        let r = stage_4_dates::run(entities.as_mut_slice(), &*sidecar_index, &self.config);
        for (method, count) in r.extraction_method_histogram {
          *report.extraction_method_histogram.entry(method).or_insert(0) += count;
        }
        Ok("resolved dates".to_string())
      }
      Stage::Albums => {
        stage_6_albums::run(entities.as_mut_slice(), &*album_index);
        Ok("recorded album membership".to_string())
      }
      Stage::Move => {
        let r = stage_7_move::run(entities.as_mut_slice(), output, &self.config, sidecar_index)?;
        Ok(format!("moved {}, deleted {}, failed {}", r.moved, r.deleted, r.failures))
      }
      Stage::ExifWrite => {
        let r = stage_5_exif_write::run(entities.as_mut_slice(), &*sidecar_index, &self.config)?;
        report.coordinates_written += r.coordinates_written;
        report.datetimes_written += r.datetimes_written;
        Ok(format!("wrote {} datetimes, {} coordinates", r.datetimes_written, r.coordinates_written))
      }
      Stage::CreationTime => {
        let r = stage_8_creation_time::run(entities.as_slice(), self.config.update_creation_time);
        report.creation_times_updated += r.updated;
        Ok(format!("updated {} creation times", r.updated))
      }
    }
  }
}

pub fn now_iso8601() -> String {
  Utc::now().to_rfc3339()
}

/// `--fix <path>` support: a flat walk with no year/album classification,
/// used only to re-date files in place (§6).
pub fn fix_mode_discover(root: &Path, _config: &GlobalConfig) -> Result<Vec<crate::prim::MediaEntity>, String> {
  let mut entities = Vec::new();
  for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    if !crate::prim::is_media_path(path) {
      continue;
    }
    let size = entry.metadata().map_err(|e| e.to_string())?.len();
    let mut file = crate::prim::FileEntity::new(path.to_path_buf(), size, false);
    file.target_path = Some(path.to_path_buf());
    entities.push(crate::prim::MediaEntity::new(file, "fix-mode".to_string()));
  }

  if entities.is_empty() {
    return Err("NoMediaFound: no recognizable media files under the fix root".to_string());
  }
  Ok(entities)
}

pub fn fix_mode_redate(mut entities: Vec<crate::prim::MediaEntity>, config: &GlobalConfig) -> Result<u64, String> {
  let sidecar_index: HashMap<std::path::PathBuf, std::path::PathBuf> = entities
    .iter()
    .filter_map(|e| {
      sidecar_matcher::find_sidecar(&e.primary_file.source_path, config.try_hard, &|p| p.exists())
        .map(|s| (e.primary_file.source_path.clone(), s))
    })
    .collect();

  stage_4_dates::run(entities.as_mut_slice(), &sidecar_index, config);
  let report = stage_5_exif_write::run(entities.as_mut_slice(), &sidecar_index, config)?;
  Ok(report.datetimes_written)
}

#[cfg(test)]
mod test_stage_order {
  use super::*;

  #[test]
  fn test_exif_write_runs_after_move() {
    let move_pos = ORDER.iter().position(|s| *s == Stage::Move).unwrap();
    let exif_pos = ORDER.iter().position(|s| *s == Stage::ExifWrite).unwrap();
    assert!(exif_pos > move_pos);
  }

  #[test]
  fn test_critical_stages() {
    assert!(Stage::Discovery.is_critical());
    assert!(Stage::Move.is_critical());
    assert!(!Stage::Dates.is_critical());
  }
}
