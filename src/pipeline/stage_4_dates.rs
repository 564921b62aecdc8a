//! Stage 4 — date resolvers (§4.D). Runs each resolver, most-accurate
//! first; `MediaEntity::apply_resolved_date` enforces that a less-accurate
//! resolver never overwrites a result an earlier one already produced, so
//! resolvers can be tried unconditionally in priority order.

use std::{collections::HashMap, path::PathBuf, sync::LazyLock, time::Instant};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::{
  config::GlobalConfig,
  io,
  prim::{is_year_folder_name, DateExtractionMethod, MediaEntity, SidecarJson},
};

pub struct DateResolutionReport {
  pub extraction_method_histogram: HashMap<String, u64>,
  pub duration:                    std::time::Duration,
}

pub fn run(
  entities: &mut [MediaEntity],
  sidecar_index: &HashMap<PathBuf, PathBuf>,
  config: &GlobalConfig,
) -> DateResolutionReport {
  let started = Instant::now();
  let mut histogram: HashMap<String, u64> = HashMap::new();

  for entity in entities.iter_mut() {
    resolve_one(entity, sidecar_index, config);
    let method = format!("{:?}", entity.date_time_extraction_method);
    *histogram.entry(method).or_insert(0) += 1;
  }

  DateResolutionReport { extraction_method_histogram: histogram, duration: started.elapsed() }
}

fn resolve_one(entity: &mut MediaEntity, sidecar_index: &HashMap<PathBuf, PathBuf>, config: &GlobalConfig) {
  let path = entity.primary_file.source_path.clone();

  if let Some(dict) = &config.file_dates_dictionary {
    if let Some(date) = dict
      .get(&path.to_string_lossy().replace('\\', "/"))
      .and_then(|entry| parse_oldest_date(&entry.oldest_date))
    {
      entity.apply_resolved_date(date, DateExtractionMethod::ExternalDictionary);
    }
  }

  if let Some(sidecar) = sidecar_index.get(&path) {
    if let Some(date) = read_sidecar_date(sidecar) {
      entity.partner_shared = entity.partner_shared || is_partner_shared(sidecar);
      entity.apply_resolved_date(date, DateExtractionMethod::Json);
    }
  }

  if let Some(date) = io::read_native_date(&path) {
    entity.apply_resolved_date(date, DateExtractionMethod::NativeExif);
  } else if config.fallback_to_exiftool_on_native_miss {
    if let Some(date) = read_exiftool_date(&path) {
      entity.apply_resolved_date(date, DateExtractionMethod::ExiftoolExif);
    }
  }

  if config.guess_from_name {
    if let Some(date) = guess_date_from_filename(&path) {
      entity.apply_resolved_date(date, DateExtractionMethod::FilenameGuess);
    }
  }

  if let Some(date) = folder_year_date(&path) {
    entity.apply_resolved_date(date, DateExtractionMethod::FolderYear);
  }

  if let Some(aggressive_sidecar) =
    crate::pipeline::sidecar_matcher::find_sidecar(&path, true, &|p| p.exists())
  {
    if let Some(date) = read_sidecar_date(&aggressive_sidecar) {
      entity.apply_resolved_date(date, DateExtractionMethod::JsonAggressive);
    }
  }
}

fn read_sidecar_date(sidecar: &std::path::Path) -> Option<DateTime<FixedOffset>> {
  let bytes = std::fs::read(sidecar).ok()?;
  let parsed = SidecarJson::parse(&bytes).ok()?;
  parsed.photo_taken_at().map(|d| d.fixed_offset())
}

fn is_partner_shared(sidecar: &std::path::Path) -> bool {
  std::fs::read(sidecar)
    .ok()
    .and_then(|bytes| SidecarJson::parse(&bytes).ok())
    .map(|s| s.is_partner_shared())
    .unwrap_or(false)
}

fn read_exiftool_date(path: &std::path::Path) -> Option<DateTime<FixedOffset>> {
  let tags = io::read_date_tags(path).ok()?;
  let object = tags.as_object()?;
  let mut oldest: Option<DateTime<FixedOffset>> = None;
  for key in [
    "DateTimeOriginal",
    "DateTime",
    "CreateDate",
    "DateCreated",
    "CreationDate",
    "MediaCreateDate",
    "TrackCreateDate",
    "EncodedDate",
    "MetadataDate",
    "ModifyDate",
  ] {
    let Some(text) = object.get(key).and_then(|v| v.as_str()) else { continue };
    let Some(parsed) = parse_exiftool_stamp(text) else { continue };
    oldest = Some(match oldest {
      Some(current) if current <= parsed => current,
      _ => parsed,
    });
  }
  oldest
}

fn parse_exiftool_stamp(text: &str) -> Option<DateTime<FixedOffset>> {
  let trimmed = text.split('+').next().unwrap_or(text).trim();
  let naive = NaiveDateTime::parse_from_str(trimmed, "%Y:%m:%d %H:%M:%S").ok()?;
  Some(Utc.from_utc_datetime(&naive).fixed_offset())
}

fn parse_oldest_date(text: &str) -> Option<DateTime<FixedOffset>> {
  if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
    return Some(parsed);
  }
  NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
    .ok()
    .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

struct FilenamePattern {
  regex:  Regex,
  format: &'static str,
}

static FILENAME_PATTERNS: LazyLock<Vec<FilenamePattern>> = LazyLock::new(|| {
  vec![
    FilenamePattern {
      regex:  Regex::new(r"Screenshot_(\d{8})-(\d{6})").unwrap(),
      format: "%Y%m%d %H%M%S",
    },
    FilenamePattern { regex: Regex::new(r"IMG_(\d{8})_(\d{6})").unwrap(), format: "%Y%m%d %H%M%S" },
    FilenamePattern { regex: Regex::new(r"VID_(\d{8})_(\d{6})").unwrap(), format: "%Y%m%d %H%M%S" },
    FilenamePattern { regex: Regex::new(r"BURST(?:_COVER)?_(\d{8})_(\d{6})").unwrap(), format: "%Y%m%d %H%M%S" },
    FilenamePattern { regex: Regex::new(r"IMG-(\d{8})-WA\d+").unwrap(), format: "%Y%m%d" },
    FilenamePattern { regex: Regex::new(r"(\d{8})_(\d{6})").unwrap(), format: "%Y%m%d %H%M%S" },
    FilenamePattern {
      regex:  Regex::new(r"(\d{4}-\d{2}-\d{2}) (\d{2})\.(\d{2})\.(\d{2})").unwrap(),
      format: "%Y-%m-%d %H.%M.%S",
    },
  ]
});

/// Parses dates out of a curated list of filename patterns (§4.D item 4).
/// Accepts years in `[1800, now+1]`.
fn guess_date_from_filename(path: &std::path::Path) -> Option<DateTime<FixedOffset>> {
  let stem = path.file_stem()?.to_string_lossy().into_owned();

  for pattern in FILENAME_PATTERNS.iter() {
    let Some(captures) = pattern.regex.captures(&stem) else { continue };
    let joined = captures
      .iter()
      .skip(1)
      .filter_map(|m| m.map(|m| m.as_str()))
      .collect::<Vec<_>>()
      .join(" ");

    let parsed = if pattern.format.contains("%H") {
      NaiveDateTime::parse_from_str(&joined, pattern.format).ok()
    } else {
      NaiveDate::parse_from_str(&joined, pattern.format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    };

    if let Some(naive) = parsed {
      let year = naive.format("%Y").to_string().parse::<i32>().unwrap_or(0);
      if (1800..=Utc::now().year() + 1).contains(&year) {
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
      }
    }
  }
  None
}

static YEAR_IN_FOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})").unwrap());

fn folder_year_date(path: &std::path::Path) -> Option<DateTime<FixedOffset>> {
  let parent_name = path.parent()?.file_name()?.to_string_lossy().to_string();
  if !is_year_folder_name(&parent_name) {
    return None;
  }
  let year: i32 = YEAR_IN_FOLDER.captures(&parent_name)?.get(1)?.as_str().parse().ok()?;
  let date = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
  Some(Utc.from_utc_datetime(&date).fixed_offset())
}
