//! Error kinds shared across pipeline stages.

use std::fmt;

/// Named failure categories a stage can attribute a per-file or per-stage
/// failure to. Stages mostly propagate `Result<_, String>` for brevity, but
/// attach one of these where the distinction matters for reporting or retry
/// logic (see `pipeline::StageReport`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
  InputMissing,
  PathResolution,
  PermissionDenied,
  UnsupportedFormat,
  SidecarMissing,
  ExifReadFailed,
  ExifWriteFailed,
  CrossDeviceMove,
  CollisionUnresolvable,
  ExternalToolTimeout,
  ExternalToolFailed,
  Cancelled,
  CorruptProgressFile,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ErrorKind::InputMissing => "InputMissing",
      ErrorKind::PathResolution => "PathResolution",
      ErrorKind::PermissionDenied => "PermissionDenied",
      ErrorKind::UnsupportedFormat => "UnsupportedFormat",
      ErrorKind::SidecarMissing => "SidecarMissing",
      ErrorKind::ExifReadFailed => "ExifReadFailed",
      ErrorKind::ExifWriteFailed => "ExifWriteFailed",
      ErrorKind::CrossDeviceMove => "CrossDeviceMove",
      ErrorKind::CollisionUnresolvable => "CollisionUnresolvable",
      ErrorKind::ExternalToolTimeout => "ExternalToolTimeout",
      ErrorKind::ExternalToolFailed => "ExternalToolFailed",
      ErrorKind::Cancelled => "Cancelled",
      ErrorKind::CorruptProgressFile => "CorruptProgressFile",
    };
    f.write_str(s)
  }
}

/// A tagged error: a named kind plus a human-readable message. Used where a
/// caller needs to branch on the failure category (e.g. deciding whether to
/// quarantine a file or abort the stage).
#[derive(Clone, Debug)]
pub struct TaggedError {
  pub kind:    ErrorKind,
  pub message: String,
}

impl TaggedError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self { kind, message: message.into() }
  }
}

impl fmt::Display for TaggedError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.kind, self.message)
  }
}

/// Process-level exit codes, per the CLI's external interface.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(i32)]
pub enum ExitCode {
  Success             = 0,
  ProcessingError     = 1,
  ArgumentError       = 2,
  MissingRequiredPath = 10,
  InputMissing        = 11,
  PathResolution      = 12,
  NoMediaFound        = 13,
}
