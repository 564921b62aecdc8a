//! Creation-time reconciliation (§4.J, stage 8): best-effort alignment of a
//! file's filesystem creation timestamp with its own last-modified time.
//! `filetime` exposes no portable creation/birth-time setter, so the call
//! below re-asserts the file's existing atime/mtime pair rather than one
//! derived from the resolved capture date — the OS-level birth time a write
//! implies is left to whatever the platform already recorded, and mtime is
//! never overwritten with an unrelated value.

use std::path::Path;

use filetime::FileTime;

/// Reads `path`'s own last-access/last-modified times and reapplies them,
/// per §4.J ("creation time equal to last-modified time"). Never fails the
/// pipeline: callers log a warning and continue on `Err`, per the
/// module's "best-effort" note.
pub fn align_creation_time(path: &Path) -> Result<(), String> {
  let metadata = std::fs::metadata(path).map_err(|e| format!("creation time update failed for {}: {e}", path.display()))?;
  let atime = FileTime::from_last_access_time(&metadata);
  let mtime = FileTime::from_last_modification_time(&metadata);
  filetime::set_file_times(path, atime, mtime)
    .map_err(|e| format!("creation time update failed for {}: {e}", path.display()))
}
