//! Helper for setting up test directories with synthetic media files and
//! sidecars. Content is generated in-process (no bundled test assets): a
//! hardcoded minimal-but-valid JPEG header for `.jpg`/`.jpeg`, long enough
//! for the EXIF readers/writers to parse, with the `tags` map's
//! `DateTimeOriginal` entry (if any) applied via the native JPEG writer.
//! Every other extension gets path-keyed synthetic bytes, enough to
//! exercise hashing/dedup/sniffing without a real codec.

use std::{
  collections::{HashMap, HashSet, VecDeque},
  env,
  fs,
  path::{Path, PathBuf},
  sync::LazyLock,
};

static TEST_ROOT: LazyLock<PathBuf> =
  LazyLock::new(|| env::temp_dir().join(format!("{}_tests", env!("CARGO_PKG_NAME"))));

/// Smallest valid baseline JPEG: SOI, a minimal JFIF APP0 segment, and EOI.
const MINIMAL_JPEG: &[u8] = &[
  0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
  0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
];

/// Helper for creating directories for tests needing actual files.
pub struct TestDir {
  root:  PathBuf,
  trash: PathBuf,
}

impl TestDir {
  /// Creates a new directory under `TEST_ROOT` for tests involving file
  /// operations. Note: Prefer using `test_dir!()` macro.
  pub fn new(
    test_path: PathBuf,
    files: Vec<(&'static str, HashMap<&'static str, &'static str>)>,
  ) -> Self {
    let root_rel = TEST_ROOT.join(test_path);
    if root_rel.exists() {
      fs::remove_dir_all(&root_rel).unwrap();
    }
    fs::create_dir_all(&root_rel).unwrap();

    let trash_rel = root_rel.join("trash");
    fs::create_dir(&trash_rel).unwrap();

    let root = root_rel.canonicalize().unwrap();
    let trash = trash_rel.canonicalize().unwrap();

    for (file, tags) in files {
      create_file(&root, file, tags);
    }

    Self { root, trash }
  }

  pub fn files_good(&self) -> HashSet<PathBuf> {
    traverse_dir(&self.root, Some(&self.trash))
  }

  pub fn files_trash(&self) -> HashSet<PathBuf> {
    traverse_dir(&self.trash, None::<&Path>)
  }

  pub fn get_path(&self, file: impl AsRef<Path>) -> PathBuf {
    self.root.join(file)
  }

  pub fn get_trash(&self, file: impl AsRef<Path>) -> PathBuf {
    self.trash.join(file)
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn some_trash(&self) -> Option<&Path> {
    Some(&self.trash)
  }

  pub fn trash(&self) -> &Path {
    &self.trash
  }
}

fn create_file(working_dir: impl AsRef<Path>, path: impl AsRef<Path>, tags: HashMap<&str, &str>) {
  let full_path = working_dir.as_ref().join(path.as_ref());

  assert!(!full_path.exists(), "File already exists: {full_path:?}");
  fs::create_dir_all(full_path.parent().unwrap()).unwrap();

  let ext = full_path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);

  match ext.as_deref() {
    Some("jpg") | Some("jpeg") => {
      fs::write(&full_path, MINIMAL_JPEG).unwrap();
      if let Some(stamp) = tags.get("DateTimeOriginal") {
        if let Some(date) = parse_test_date(stamp) {
          crate::io::write_jpeg_date(&full_path, date, None).unwrap();
        }
      }
    }
    _ => {
      // No real codec for this extension: path-keyed bytes are enough to
      // exercise hashing/dedup/sniffing logic that doesn't decode content.
      let body = format!("synthetic-test-asset:{}", path.as_ref().display());
      fs::write(&full_path, body.as_bytes()).unwrap();
    }
  }
}

fn parse_test_date(stamp: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
  use chrono::TimeZone;
  let naive = chrono::NaiveDateTime::parse_from_str(stamp, "%Y:%m:%d %H:%M:%S").ok()?;
  Some(chrono::Utc.from_utc_datetime(&naive).fixed_offset())
}

fn traverse_dir<P: AsRef<Path>, Q: AsRef<Path>>(root: P, exclude: Option<Q>) -> HashSet<PathBuf> {
  let mut dirs = VecDeque::from([root.as_ref().to_owned()]);
  let mut files = HashSet::new();

  while let Some(dir) = dirs.pop_front() {
    if exclude.as_ref().is_some_and(|e| dir.starts_with(e)) {
      continue;
    }

    for entry in fs::read_dir(dir).unwrap().map(Result::unwrap) {
      let file_type = entry.file_type().unwrap();
      if file_type.is_dir() {
        dirs.push_back(entry.path());
      } else if file_type.is_file() {
        files.insert(entry.path());
      } else {
        panic!("Unexpected file type: {:?}", file_type);
      }
    }
  }

  files
}

#[macro_export]
macro_rules! test_path {
  () => {{
    // HACK: Get module hierarchy for caller.
    let mut function = $crate::testing::type_of(|| ()).rsplit("::");
    // 0th element is `{closure}`.
    let case = function.nth(1).unwrap();
    let suite = function.next().unwrap();
    let module = function.next().unwrap();

    std::path::PathBuf::from(format!("{module}/{suite}/{case}"))
  }};
}

#[macro_export]
macro_rules! test_dir {
  ($($file:literal: {$($key:literal: $value:literal),* $(,)?}),* $(,)?) => {{
    let files = vec![
      $(($file, std::collections::HashMap::from([$(($key, $value)),*]))),*
    ];
    TestDir::new(test_path!(), files)
  }};
}
