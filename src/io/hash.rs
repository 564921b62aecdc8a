//! Hash service (§4.E): streaming, cached content digests for stage 3's
//! dedup/merge engine.

use std::{
  collections::HashMap,
  fs::File,
  io::Read,
  path::Path,
  sync::Mutex,
  time::UNIX_EPOCH,
};

use sha2::{Digest, Sha256};

const STREAM_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct CacheKey {
  path:     std::path::PathBuf,
  size:     u64,
  mtime_ns: i128,
}

/// Caches `(path, size, mtime_ns) -> digest` so stages 3 and 6 never
/// recompute a hash for an unmodified file. Internally locked so multiple
/// hash-pool workers can share one instance.
#[derive(Default)]
pub struct HashService {
  cache: Mutex<HashMap<CacheKey, String>>,
}

impl HashService {
  pub fn new() -> Self {
    Self::default()
  }

  /// Computes `(size, digest)` for `path`, reading in bounded chunks so
  /// memory use stays well under 1 MB regardless of file size.
  pub fn hash(&self, path: &Path) -> Result<(u64, String), String> {
    let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
    let size = metadata.len();
    let mtime_ns = metadata
      .modified()
      .map_err(|e| e.to_string())?
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_nanos() as i128)
      .unwrap_or(0);

    let key = CacheKey { path: path.to_path_buf(), size, mtime_ns };
    if let Some(digest) = self.cache.lock().unwrap().get(&key) {
      return Ok((size, digest.clone()));
    }

    let digest = hash_file_streaming(path)?;
    self.cache.lock().unwrap().insert(key, digest.clone());
    Ok((size, digest))
  }
}

fn hash_file_streaming(path: &Path) -> Result<String, String> {
  let mut file = File::open(path).map_err(|e| e.to_string())?;
  let mut hasher = Sha256::new();
  let mut buf = vec![0u8; STREAM_CHUNK_BYTES];
  loop {
    let n = file.read(&mut buf).map_err(|e| e.to_string())?;
    if n == 0 {
      break;
    }
    hasher.update(&buf[..n]);
  }
  Ok(format!("{:x}", hasher.finalize()))
}
