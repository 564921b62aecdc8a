use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;
use std::sync::atomic::AtomicBool;

mod config;
mod error;
mod io;
mod pipeline;
mod pool;
mod prim;
mod progress;
#[cfg(test)]
mod testing;

use config::{AlbumBehavior, ExtensionFixing, GlobalConfig};
use error::ExitCode;

#[derive(Parser)]
#[command(version, about = "Organizes a Google Photos Takeout export into a deduplicated, dated library.")]
pub struct Args {
  /// Source directory (the extracted Takeout export root). Required unless `--fix` is set.
  #[arg(long)]
  input: Option<PathBuf>,

  /// Destination root for the organized library.
  #[arg(long)]
  output: Option<PathBuf>,

  /// Album strategy.
  #[arg(long, value_enum, default_value = "shortcut")]
  albums: AlbumBehavior,

  /// Date-division level under `ALL_PHOTOS/` (0=none, 1=year, 2=year/month, 3=year/month/day).
  #[arg(long, default_value_t = 0)]
  divide_to_dates: u8,

  /// Stage-1 extension repair mode.
  #[arg(long, value_enum, default_value = "standard")]
  fix_extensions: ExtensionFixing,

  /// Disable EXIF writing.
  #[arg(long)]
  no_write_exif: bool,

  /// Rename Pixel motion-photo `.MP`/`.MV` extensions to `.mp4`.
  #[arg(long)]
  transform_pixel_mp: bool,

  /// Align each output file's filesystem creation time to its resolved date.
  #[arg(long)]
  update_creation_time: bool,

  /// Skip EXIF writes for files larger than the size limit.
  #[arg(long)]
  limit_filesize: bool,

  /// Separate partner-shared media into its own `PARTNER_SHARED/` tree.
  #[arg(long)]
  divide_partner_shared: bool,

  /// Drop "-edited" style extra variants.
  #[arg(long)]
  skip_extras: bool,

  /// Route duplicates into `_Duplicates/` instead of deleting them.
  #[arg(long)]
  keep_duplicates: bool,

  /// Operate on a sibling copy of the input instead of the input itself.
  #[arg(long)]
  keep_input: bool,

  /// External date dictionary (JSON, keyed by source path).
  #[arg(long = "fileDates")]
  file_dates: Option<PathBuf>,

  /// Special mode: only re-date files in place, skipping discovery/move/albums.
  #[arg(long)]
  fix: Option<PathBuf>,

  /// Increase logging verbosity; repeat for more detail.
  #[arg(long, short, action = clap::ArgAction::Count)]
  verbose: u8,

  /// Exhaust every fallback sidecar-matching heuristic (aggressive extension
  /// substitution, truncated supplemental-metadata prefixes).
  #[arg(long)]
  try_hard: bool,
}

fn enable_logging(verbose: u8) {
  let level = match verbose {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };

  Builder::new()
    .filter_level(level)
    .format(|buf, record| {
      writeln!(buf, "{} {}", buf.default_level_style(record.level()).value(record.level()), record.args())
    })
    .init();
}

fn main() -> ProcessExitCode {
  let args = Args::parse();
  enable_logging(args.verbose);

  if args.input.is_none() && args.fix.is_none() {
    log::error!("{}: --input is required unless --fix is set", error::ErrorKind::InputMissing);
    return exit_code(ExitCode::InputMissing);
  }
  if args.output.is_none() && args.fix.is_none() {
    log::error!("{}: --output is required", error::ErrorKind::PathResolution);
    return exit_code(ExitCode::MissingRequiredPath);
  }

  let config = GlobalConfig::from_args(&args);

  if let Some(fix_root) = config.fix_mode_path.clone() {
    return match run_fix_mode(&fix_root, &config) {
      Ok(count) => {
        log::info!("re-dated {count} files in place");
        exit_code(ExitCode::Success)
      }
      Err(e) => {
        log::error!("{e}");
        exit_code(ExitCode::ProcessingError)
      }
    };
  }

  let organizer = pipeline::Organizer::new(config);
  let cancel = AtomicBool::new(false);

  match organizer.run(&cancel) {
    Ok(report) => {
      log::info!(
        "processed {} media items, removed {} duplicates, wrote {} datetimes",
        report.media_processed,
        report.duplicates_removed,
        report.datetimes_written
      );
      exit_code(ExitCode::Success)
    }
    Err(e) => {
      log::error!("{e}");
      exit_code(classify_failure(&e))
    }
  }
}

/// `--fix <path>`: walks `path` and re-resolves/re-writes dates in place,
/// without discovery, dedup, albums, or moving (§6).
fn run_fix_mode(root: &PathBuf, config: &GlobalConfig) -> Result<u64, String> {
  let entities = pipeline::fix_mode_discover(root, config)?;
  pipeline::fix_mode_redate(entities, config)
}

fn classify_failure(message: &str) -> ExitCode {
  if message.contains("InputMissing") {
    ExitCode::InputMissing
  } else if message.contains("NoMediaFound") {
    ExitCode::NoMediaFound
  } else if message.contains("PathResolution") {
    ExitCode::PathResolution
  } else {
    ExitCode::ProcessingError
  }
}

fn exit_code(code: ExitCode) -> ProcessExitCode {
  ProcessExitCode::from(code as u8)
}
