//! Worker pools (§5): one bounded `threadpool::ThreadPool` per operation
//! family, sized off the available core count so unrelated stages never
//! starve each other of threads.

use std::thread;

use threadpool::ThreadPool;

/// All pools a pipeline run needs, built once and shared across stages.
pub struct PoolSet {
  pub hash:                ThreadPool,
  pub native_exif_read:    ThreadPool,
  pub exif_write:          ThreadPool,
  pub duplicate_detection: ThreadPool,
  pub network_like:        ThreadPool,
  pub file_io:             ThreadPool,
}

impl PoolSet {
  /// Builds every pool from `cores` (typically
  /// `std::thread::available_parallelism()`), applying the per-operation
  /// multipliers from §5's resource table.
  pub fn with_cores(cores: usize) -> Self {
    let cores = cores.max(1);
    Self {
      hash:                ThreadPool::new(cores * 4),
      native_exif_read:    ThreadPool::new(cores * 6),
      exif_write:          ThreadPool::new(cores * 6),
      duplicate_detection: ThreadPool::new(cores * 6),
      network_like:        ThreadPool::new(cores * 16),
      file_io:             ThreadPool::new(cores * 4),
    }
  }

  pub fn detect() -> Self {
    let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    Self::with_cores(cores)
  }
}
