//! Test-only utilities.

mod asserts;
mod dates;
mod test_dir;

use std::path::Path;

pub use dates::*;
pub use test_dir::*;

pub use crate::{assert_dir, assert_err, assert_tag, assert_trash, test_dir, test_path};

/// Reads a date/GPS tag out of `path`'s EXIF via the one-shot ExifTool
/// invocation, collapsing exiftool's group-qualified JSON keys to a bare
/// tag name lookup.
pub fn read_tag(path: impl AsRef<Path>, tag: &str) -> Option<String> {
  let json = crate::io::read_date_tags(path.as_ref()).ok()?;
  json.as_object()?.get(tag)?.as_str().map(str::to_string)
}

pub fn type_of<T>(_: T) -> &'static str {
  std::any::type_name::<T>()
}
