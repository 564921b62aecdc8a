//! Static tables: media extensions, localized folder-name patterns, and
//! localized "extras" suffixes. Pure data, consulted by `prim::classify` and
//! `prim::normalize`.

/// Recognized photo extensions (lowercase, without the leading dot).
pub const PHOTO_EXTENSIONS: &[&str] = &[
  "jpg", "jpeg", "heic", "heif", "png", "gif", "webp", "tiff", "tif", "avif", "jxl", "arw", "cr2",
  "cr3", "crw", "dng", "nef", "nrw", "raf",
];

/// Recognized video extensions (lowercase, without the leading dot). `mp`
/// and `mv` are Pixel Motion Photo containers, renamed to `.mp4` when
/// `transform_pixel_mp` is on (see `pipeline::stage_7_move`).
pub const VIDEO_EXTENSIONS: &[&str] =
  &["mp4", "mov", "mts", "avi", "mkv", "webm", "mpg", "mpeg", "3gp", "mp", "mv"];

/// Extensions eligible for cross-substitution under the `try_hard` /
/// `json_aggressive` resolver path (§4.C step 8, §4.D item 7).
pub const AGGRESSIVE_SUBSTITUTION_EXTENSIONS: &[&str] =
  &["jpg", "jpeg", "heic", "heif", "png", "mp4", "mov"];

/// Localized year-folder name patterns. Matched case-insensitively against
/// the full directory basename.
pub const YEAR_FOLDER_PATTERNS: &[&str] = &[
  r"^photos from (\d{4})$",
  r"^fotos (?:de|del|desde) (\d{4})$",
  r"^fotos von (\d{4})$",
  r"^foto's van (\d{4})$",
  r"^photos de (\d{4})$",
  r"^zdjęcia z roku (\d{4})$",
  r"^(\d{4}) 年の写真$",
  r"^(\d{4})年照片$",
  r"^foto del (\d{4})$",
];

/// Special folders excluded from album-strategy processing; contents route
/// straight to the output root (§4.A, §4.G). Matched case-insensitively.
pub const SPECIAL_FOLDER_NAMES: &[&str] =
  &["archive", "trash", "locked folder", "papelera", "corbeille", "papierkorb", "cestino"];

/// Localized "-edited" suffixes (§4.B item 1). Matched against the
/// NFC-normalized, lowercased filename stem.
pub const EXTRAS_SUFFIXES: &[&str] = &[
  "-edited",
  "-edytowane",
  "-bewerkt",
  "-bearbeitet",
  "-編集済み",
  "-修改后",
  "-modificato",
  "-modifié",
  "-editado",
  "-editada",
];

/// "Untitled album" folder name prefix Google emits for named-but-no-title
/// albums (§4.G); collapsed into a single `Untitled Albums` output folder.
pub const UNTITLED_ALBUM_PREFIX: &str = "untitled";

/// Files bigger than this are skipped by EXIF-writing paths when
/// `limit_file_size` is set (§4.H).
pub const EXIF_SIZE_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

/// Byte length beyond which the `{path}.json` sidecar name is considered
/// truncated by Takeout's filename limit (§4.C step 5). This is the limit on
/// the *sidecar's* basename, not the media file's.
pub const SIDECAR_TRUNCATION_LIMIT: usize = 51;

/// The literal string whose prefixes are tried, longest first, when
/// resolving a truncated `supplemental-metadata` sidecar name.
pub const SUPPLEMENTAL_METADATA_TOKEN: &str = "supplemental-metadata";
