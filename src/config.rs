//! `GlobalConfig`: the single immutable configuration value built once at
//! startup from CLI flags and read by every stage thereafter.

use std::{collections::HashMap, path::PathBuf};

pub mod constants;

/// How album membership is represented on disk (stage 7).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum AlbumBehavior {
  Shortcut,
  DuplicateCopy,
  ReverseShortcut,
  Json,
  Nothing,
  Ignore,
}

/// Date-division depth under `ALL_PHOTOS/` (and `PARTNER_SHARED/`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DateDivision {
  None,
  Year,
  YearMonth,
  YearMonthDay,
}

impl DateDivision {
  pub fn from_level(level: u8) -> Self {
    match level {
      0 => DateDivision::None,
      1 => DateDivision::Year,
      2 => DateDivision::YearMonth,
      _ => DateDivision::YearMonthDay,
    }
  }
}

/// Stage-1 extension-repair mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum ExtensionFixing {
  None,
  Standard,
  Conservative,
  Solo,
}

/// A single externally-supplied date hint, keyed by source path in
/// `file_dates_dictionary`.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct OldestDateEntry {
  #[serde(rename = "OldestDate")]
  pub oldest_date: String,
}

/// Process-wide, read-only configuration. Constructed once in `main` and
/// passed by reference into every stage; no setters after construction.
pub struct GlobalConfig {
  pub input:  Option<PathBuf>,
  pub output: Option<PathBuf>,

  pub album_behavior:         AlbumBehavior,
  pub date_division:          DateDivision,
  pub extension_fixing:       ExtensionFixing,
  pub write_exif:             bool,
  pub transform_pixel_mp:     bool,
  pub update_creation_time:   bool,
  pub limit_file_size:        bool,
  pub divide_partner_shared:  bool,
  pub skip_extras:            bool,
  pub guess_from_name:        bool,
  pub keep_duplicates:        bool,
  pub keep_input:             bool,
  pub fix_mode_path:          Option<PathBuf>,
  pub file_dates_dictionary:  Option<HashMap<String, OldestDateEntry>>,

  pub verbosity:                             u8,
  pub try_hard:                              bool,
  pub fallback_to_exiftool_on_native_miss:   bool,
  pub exiftool_image_batch_size:             usize,
  pub exiftool_video_batch_size:             usize,
  pub exiftool_timeout_per_file_secs:        u64,
  pub exiftool_timeout_per_batch_secs:       u64,
  pub force_process_unsupported_formats:     bool,
  pub silence_unsupported_warnings:          bool,
}

impl Default for GlobalConfig {
  fn default() -> Self {
    Self {
      input:  None,
      output: None,

      album_behavior:        AlbumBehavior::Shortcut,
      date_division:         DateDivision::None,
      extension_fixing:      ExtensionFixing::Standard,
      write_exif:            true,
      transform_pixel_mp:    false,
      update_creation_time:  false,
      limit_file_size:       false,
      divide_partner_shared: false,
      skip_extras:           false,
      guess_from_name:       true,
      keep_duplicates:       false,
      keep_input:            false,
      fix_mode_path:         None,
      file_dates_dictionary: None,

      verbosity:                           0,
      try_hard:                            false,
      fallback_to_exiftool_on_native_miss: true,
      exiftool_image_batch_size:           750,
      exiftool_video_batch_size:           24,
      exiftool_timeout_per_file_secs:      60,
      exiftool_timeout_per_batch_secs:     600,
      force_process_unsupported_formats:  false,
      silence_unsupported_warnings:       false,
    }
  }
}

impl GlobalConfig {
  /// Builds config from parsed CLI args. Validation of path existence
  /// happens later in stage 2 / the `fix` entrypoint, not here: this is a
  /// pure flag merge, no I/O.
  pub fn from_args(args: &crate::Args) -> Self {
    let mut config = GlobalConfig {
      input:                 args.input.clone(),
      output:                args.output.clone(),
      album_behavior:        args.albums,
      date_division:         DateDivision::from_level(args.divide_to_dates),
      extension_fixing:      args.fix_extensions,
      write_exif:            !args.no_write_exif,
      transform_pixel_mp:    args.transform_pixel_mp,
      update_creation_time:  args.update_creation_time,
      limit_file_size:       args.limit_filesize,
      divide_partner_shared: args.divide_partner_shared,
      skip_extras:           args.skip_extras,
      keep_duplicates:       args.keep_duplicates,
      keep_input:            args.keep_input,
      fix_mode_path:         args.fix.clone(),
      verbosity:             args.verbose,
      try_hard:              args.try_hard,
      ..GlobalConfig::default()
    };

    if let Some(path) = &args.file_dates {
      match load_file_dates_dictionary(path) {
        Ok(dict) => config.file_dates_dictionary = Some(dict),
        Err(e) => log::warn!("Failed to load --file-dates {}: {e}", path.display()),
      }
    }

    config
  }
}

fn load_file_dates_dictionary(
  path: &std::path::Path,
) -> Result<HashMap<String, OldestDateEntry>, String> {
  let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
  serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}
