//! Stage 5 — EXIF writer (§4.H), run after stage 7 so writes land on final
//! output paths. Shortcut targets are covered transitively, since a shortcut
//! points at the same bytes as its primary; `AlbumBehavior::DuplicateCopy`
//! placements are independent physical files, so each one gets its own
//! write too (`entity.album_copy_paths`). JPEGs go through the native writer
//! first; everything else, and any JPEG the native writer rejects, batches
//! through ExifTool.

use std::{
  path::{Path, PathBuf},
  time::Instant,
};

use crate::{
  config::{constants::EXIF_SIZE_LIMIT_BYTES, GlobalConfig},
  io::{self, ExifToolProcess, ExifWriteJob},
  prim::{MediaEntity, SidecarJson},
};

pub struct ExifWriteReport {
  pub coordinates_written: u64,
  pub datetimes_written:   u64,
  pub batches_attempted:   u64,
  pub batches_split:       u64,
  pub per_file_retries:    u64,
  pub duration:            std::time::Duration,
}

pub fn run(
  entities: &mut [MediaEntity],
  sidecar_index: &std::collections::HashMap<std::path::PathBuf, std::path::PathBuf>,
  config: &GlobalConfig,
) -> Result<ExifWriteReport, String> {
  let started = Instant::now();
  let mut report = ExifWriteReport {
    coordinates_written: 0,
    datetimes_written:   0,
    batches_attempted:   0,
    batches_split:       0,
    per_file_retries:    0,
    duration:            std::time::Duration::default(),
  };

  if !config.write_exif {
    return Ok(report);
  }

  let mut exiftool_jobs = Vec::new();

  for entity in entities.iter_mut() {
    let Some(target) = entity.primary_file.target_path.clone() else { continue };
    if entity.primary_file.is_shortcut || entity.primary_file.is_duplicate_copy {
      continue;
    }
    if config.limit_file_size && entity.primary_file.size > EXIF_SIZE_LIMIT_BYTES {
      continue;
    }
    let Some(date) = entity.date_taken else { continue };

    let coordinates = sidecar_index
      .get(&entity.primary_file.source_path)
      .and_then(|s| std::fs::read(s).ok())
      .and_then(|bytes| SidecarJson::parse(&bytes).ok())
      .and_then(|s| s.coordinates())
      .map(|(lat, lon, _)| (lat, lon));

    write_one(&target, date, coordinates, &mut exiftool_jobs, &mut report);

    // `DuplicateCopy` album placements are independent physical files, not
    // shortcuts pointing at `target` — each one needs its own write (§4.H).
    for copy in &entity.album_copy_paths {
      write_one(copy, date, coordinates, &mut exiftool_jobs, &mut report);
    }
  }

  if !exiftool_jobs.is_empty() {
    run_exiftool_batches(exiftool_jobs, config, &mut report)?;
  }

  report.duration = started.elapsed();
  Ok(report)
}

/// Writes `date`/`coordinates` to one physical file, natively for a JPEG
/// (falling back to an ExifTool job on native failure) and via ExifTool for
/// every other format. Shared by the primary target and every
/// `DuplicateCopy` album copy, since both are independent bytes on disk.
fn write_one(
  target: &Path,
  date: chrono::DateTime<chrono::FixedOffset>,
  coordinates: Option<(f64, f64)>,
  exiftool_jobs: &mut Vec<ExifWriteJob>,
  report: &mut ExifWriteReport,
) {
  if is_jpeg(target) {
    match io::write_jpeg_date(target, date, coordinates) {
      Ok(()) => {
        report.datetimes_written += 1;
        if coordinates.is_some() {
          report.coordinates_written += 1;
        }
      }
      Err(_) => exiftool_jobs.push(build_job(target.to_path_buf(), date, coordinates)),
    }
  } else {
    exiftool_jobs.push(build_job(target.to_path_buf(), date, coordinates));
  }
}

fn is_jpeg(path: &Path) -> bool {
  matches!(path.extension().map(|e| e.to_string_lossy().to_lowercase()).as_deref(), Some("jpg" | "jpeg"))
}

fn build_job(path: PathBuf, date: chrono::DateTime<chrono::FixedOffset>, coordinates: Option<(f64, f64)>) -> ExifWriteJob {
  let stamp = date.format("%Y:%m:%d %H:%M:%S").to_string();
  let mut job = ExifWriteJob::new(path)
    .with_tag("DateTimeOriginal", &stamp)
    .with_tag("CreateDate", &stamp)
    .with_tag("ModifyDate", &stamp)
    .with_tag("TrackCreateDate", &stamp)
    .with_tag("MediaCreateDate", &stamp);

  if let Some((lat, lon)) = coordinates {
    job = job
      .with_tag("GPSLatitude", lat.abs().to_string())
      .with_tag("GPSLatitudeRef", if lat >= 0.0 { "N" } else { "S" })
      .with_tag("GPSLongitude", lon.abs().to_string())
      .with_tag("GPSLongitudeRef", if lon >= 0.0 { "E" } else { "W" });
  }
  job
}

/// Batches jobs through one `ExifToolProcess`, splitting a failing batch in
/// half (offenders named in stderr retried per-file) per §4.H.
fn run_exiftool_batches(jobs: Vec<ExifWriteJob>, config: &GlobalConfig, report: &mut ExifWriteReport) -> Result<(), String> {
  let mut process = ExifToolProcess::spawn()?;
  let per_file = std::time::Duration::from_secs(config.exiftool_timeout_per_file_secs);
  let per_batch = std::time::Duration::from_secs(config.exiftool_timeout_per_batch_secs);

  let batch_size = config.exiftool_image_batch_size.max(1);
  for chunk in jobs.chunks(batch_size) {
    report.batches_attempted += 1;
    execute_with_retry(&mut process, chunk.to_vec(), per_file, per_batch, report)?;
  }

  process.shutdown();
  Ok(())
}

fn execute_with_retry(
  process: &mut ExifToolProcess,
  jobs: Vec<ExifWriteJob>,
  per_file: std::time::Duration,
  per_batch: std::time::Duration,
  report: &mut ExifWriteReport,
) -> Result<(), String> {
  if jobs.is_empty() {
    return Ok(());
  }

  match process.execute_batch(&jobs, per_file, per_batch) {
    Ok(outcome) => {
      if outcome.stderr.is_empty() {
        report.datetimes_written += jobs.len() as u64;
      } else {
        let (offenders, remainder) = io::partition_offenders(&jobs, &outcome.stderr);
        report.datetimes_written += remainder.len() as u64;
        report.per_file_retries += offenders.len() as u64;
        for offender in offenders {
          let _ = process.execute_batch(std::slice::from_ref(offender), per_file, per_file);
        }
      }
      Ok(())
    }
    Err(_) if jobs.len() > 1 => {
      report.batches_split += 1;
      let mid = jobs.len() / 2;
      let (left, right) = jobs.split_at(mid);
      execute_with_retry(process, left.to_vec(), per_file, per_batch, report)?;
      execute_with_retry(process, right.to_vec(), per_file, per_batch, report)
    }
    Err(_) => {
      report.per_file_retries += 1;
      Ok(())
    }
  }
}

#[cfg(test)]
mod test_is_jpeg {
  use super::*;

  #[test]
  fn test_recognizes_jpg_and_jpeg() {
    assert!(is_jpeg(Path::new("/out/a.jpg")));
    assert!(is_jpeg(Path::new("/out/a.JPEG")));
  }

  #[test]
  fn test_rejects_other_formats() {
    assert!(!is_jpeg(Path::new("/out/a.heic")));
  }
}

#[cfg(test)]
mod test_build_job {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn test_includes_gps_tags_when_coordinates_present() {
    let date = chrono::Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap().fixed_offset();
    let job = build_job(PathBuf::from("/out/a.jpg"), date, Some((47.6, -122.3)));

    assert!(job.tags.iter().any(|(tag, value)| tag == "GPSLatitudeRef" && value == "N"));
    assert!(job.tags.iter().any(|(tag, value)| tag == "GPSLongitudeRef" && value == "W"));
  }
}
