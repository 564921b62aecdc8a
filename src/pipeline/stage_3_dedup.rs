//! Stage 3 — dedup/merge engine (§4.F). Two-phase grouping (size bucket,
//! then streaming digest) builds the final `MediaEntity` set, picks a
//! primary per entity by the ranking rule, and reclassifies same-folder
//! collisions as duplicates.

use std::{collections::HashMap, sync::Arc, sync::mpsc, time::Instant};

use threadpool::ThreadPool;

use crate::{
  io::HashService,
  pipeline::stage_2_discovery::DiscoveredFile,
  prim::{compare_for_primary, matching_extras_suffix, FileEntity, MediaEntity},
};

pub struct DedupReport {
  pub entities:           Vec<MediaEntity>,
  pub duplicates_removed: u64,
  pub extras_skipped:     u64,
  pub entities_merged:    u64,
  pub hash_failures:      u64,
  pub duration:           std::time::Duration,
}

pub fn run(discovered: Vec<DiscoveredFile>, skip_extras: bool, hash_pool: &ThreadPool) -> DedupReport {
  let started = Instant::now();

  let mut extras_skipped = 0u64;
  let mut universe = Vec::with_capacity(discovered.len());
  for d in discovered {
    if skip_extras && is_extra(&d.file) {
      extras_skipped += 1;
      continue;
    }
    universe.push(d);
  }

  let mut size_buckets: HashMap<u64, Vec<DiscoveredFile>> = HashMap::new();
  for d in universe {
    size_buckets.entry(d.file.size).or_default().push(d);
  }

  // Only buckets with more than one file of the same size can possibly
  // collide, so only those need a content digest (§4.F phase 2). Singletons
  // skip hashing entirely and every collision candidate is hashed on
  // `hash_pool` so the bottleneck stage actually uses its worker pool (§5).
  let (singletons, collidable): (Vec<_>, Vec<_>) = size_buckets.into_values().partition(|b| b.len() == 1);

  let mut entities = Vec::with_capacity(singletons.len());
  for mut bucket in singletons {
    entities.push(single_file_entity(bucket.pop().unwrap(), "unhashed".to_string()));
  }

  let hashes = hash_buckets(&collidable, hash_pool);

  let mut entities_merged = 0u64;
  let mut duplicates_removed = 0u64;
  let mut hash_failures = 0u64;

  for (bucket_idx, bucket) in collidable.into_iter().enumerate() {
    let mut digest_groups: HashMap<String, Vec<DiscoveredFile>> = HashMap::new();
    for (file_idx, d) in bucket.into_iter().enumerate() {
      match &hashes[&(bucket_idx, file_idx)] {
        Ok(digest) => digest_groups.entry(digest.clone()).or_default().push(d),
        Err(_) => {
          hash_failures += 1;
          entities.push(single_file_entity(d, "quarantine".to_string()));
        }
      }
    }

    for (digest, group) in digest_groups {
      if group.len() > 1 {
        entities_merged += 1;
      }
      let (entity, removed) = merge_group(group, digest);
      duplicates_removed += removed;
      entities.push(entity);
    }
  }

  DedupReport {
    entities,
    duplicates_removed,
    extras_skipped,
    entities_merged,
    hash_failures,
    duration: started.elapsed(),
  }
}

/// Dispatches one hash job per file across every collidable bucket onto
/// `hash_pool`, keyed by `(bucket index, file index within bucket)` so the
/// results can be rejoined to their bucket after every job completes.
fn hash_buckets(buckets: &[Vec<DiscoveredFile>], hash_pool: &ThreadPool) -> HashMap<(usize, usize), Result<String, String>> {
  let hash_service = Arc::new(HashService::new());
  let (tx, rx) = mpsc::channel();
  let mut job_count = 0usize;

  for (bucket_idx, bucket) in buckets.iter().enumerate() {
    for (file_idx, d) in bucket.iter().enumerate() {
      let path = d.file.source_path.clone();
      let service = Arc::clone(&hash_service);
      let tx = tx.clone();
      job_count += 1;
      hash_pool.execute(move || {
        let result = service.hash(&path).map(|(_, digest)| digest);
        let _ = tx.send(((bucket_idx, file_idx), result));
      });
    }
  }
  drop(tx);

  let mut results = HashMap::with_capacity(job_count);
  for _ in 0..job_count {
    let (key, result) = rx.recv().expect("hash_pool worker dropped its sender before finishing");
    results.insert(key, result);
  }
  results
}

fn is_extra(file: &FileEntity) -> bool {
  file
    .source_path
    .file_stem()
    .and_then(|s| s.to_str())
    .is_some_and(|stem| matching_extras_suffix(stem).is_some())
}

fn single_file_entity(d: DiscoveredFile, digest: String) -> MediaEntity {
  MediaEntity::new(d.file, digest)
}

/// Applies the ranking rule to pick `primary`, demotes every other file to
/// `secondary`, then reclassifies any secondary sharing a parent directory
/// with a better-ranked file of the same entity as a duplicate (§4.F).
/// Album membership itself is discovered later, in stage 6.
fn merge_group(mut group: Vec<DiscoveredFile>, digest: String) -> (MediaEntity, u64) {
  group.sort_by(|a, b| compare_for_primary(&a.file, &b.file));

  let mut iter = group.into_iter();
  let primary_discovered = iter.next().unwrap();
  let mut entity = MediaEntity::new(primary_discovered.file, digest);

  let mut seen_parents = std::collections::HashSet::new();
  seen_parents.insert(entity.primary_file.parent_dir().to_path_buf());

  let mut duplicates_removed = 0u64;
  for d in iter {
    let parent = d.file.parent_dir().to_path_buf();

    if seen_parents.contains(&parent) {
      let mut file = d.file;
      file.is_duplicate_copy = true;
      entity.duplicates_files.push(file);
      duplicates_removed += 1;
    } else {
      seen_parents.insert(parent);
      entity.secondary_files.push(d.file);
    }
  }

  (entity, duplicates_removed)
}

#[cfg(test)]
mod test_merge_group {
  use super::*;
  use crate::prim::FileEntity;

  fn discovered(path: &str, from_year_folder: bool, album: Option<&str>) -> DiscoveredFile {
    DiscoveredFile {
      file:             FileEntity::new(path, 10, from_year_folder),
      sidecar_path:     None,
      album_name:       album.map(str::to_string),
      is_special_folder: false,
    }
  }

  #[test]
  fn test_year_folder_file_becomes_primary() {
    let group = vec![
      discovered("/in/Vacation/IMG_0001.jpg", false, Some("Vacation")),
      discovered("/in/Photos from 2022/IMG_0001.jpg", true, None),
    ];
    let (entity, duplicates_removed) = merge_group(group, "digest".into());

    assert_eq!(entity.primary_file.source_path, std::path::PathBuf::from("/in/Photos from 2022/IMG_0001.jpg"));
    assert_eq!(entity.secondary_files.len(), 1);
    assert_eq!(duplicates_removed, 0);
  }

  #[test]
  fn test_same_folder_collision_becomes_duplicate() {
    let group = vec![
      discovered("/in/Photos from 2020/a.jpg", true, None),
      discovered("/in/Photos from 2020/a(1).jpg", true, None),
    ];
    let (entity, duplicates_removed) = merge_group(group, "digest".into());

    assert_eq!(duplicates_removed, 1);
    assert_eq!(entity.duplicates_files.len(), 1);
    assert!(entity.duplicates_files[0].is_duplicate_copy);
  }
}
