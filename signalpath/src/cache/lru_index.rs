//! In-memory LRU index over the terrain tile directory.
//!
//! Tracks every engine tile file with its size and last access time so the
//! byte-ceiling eviction pass can pick victims without scanning the
//! filesystem. The index is ephemeral: it is rebuilt from disk at startup
//! (using file mtime as the initial access time) and kept in sync by
//! `record()`, `touch()` and `remove()` during operation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use dashmap::DashMap;

/// Size and recency metadata for one tile file.
///
/// Paths are computed from keys, not stored.
#[derive(Debug, Clone)]
pub struct TileEntry {
    /// Size of the tile file in bytes.
    pub size_bytes: u64,
    /// Last access time, updated on every resolve.
    pub last_accessed: Instant,
}

/// Statistics from populating the index from disk.
#[derive(Debug, Default)]
pub struct PopulateStats {
    /// Number of tile files indexed.
    pub files_indexed: u64,
    /// Number of directory entries skipped (not engine tile files).
    pub skipped: u64,
    /// Total size in bytes.
    pub total_bytes: u64,
}

/// A tile selected for eviction.
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    /// Tile file name within the tile directory.
    pub key: String,
    /// Entry metadata at selection time.
    pub entry: TileEntry,
}

/// Thread-safe LRU index keyed by engine tile file name.
///
/// Uses `DashMap` for concurrent access and `AtomicU64` for size tracking.
pub struct LruIndex {
    entries: DashMap<String, TileEntry>,
    total_size: AtomicU64,
    entry_count: AtomicU64,
    tile_dir: PathBuf,
}

impl LruIndex {
    /// Creates an empty index over `tile_dir`.
    pub fn new(tile_dir: PathBuf) -> Self {
        Self {
            entries: DashMap::new(),
            total_size: AtomicU64::new(0),
            entry_count: AtomicU64::new(0),
            tile_dir,
        }
    }

    /// Records a new tile file or updates an existing one.
    pub fn record(&self, key: &str, size: u64) {
        let entry = TileEntry {
            size_bytes: size,
            last_accessed: Instant::now(),
        };

        if let Some(old) = self.entries.insert(key.to_string(), entry) {
            if size > old.size_bytes {
                self.total_size
                    .fetch_add(size - old.size_bytes, Ordering::Relaxed);
            } else {
                self.total_size
                    .fetch_sub(old.size_bytes - size, Ordering::Relaxed);
            }
        } else {
            self.total_size.fetch_add(size, Ordering::Relaxed);
            self.entry_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Marks an existing tile as just accessed. No-op for unknown keys.
    pub fn touch(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.last_accessed = Instant::now();
        }
    }

    /// Removes a tile from the index, returning its metadata if present.
    pub fn remove(&self, key: &str) -> Option<TileEntry> {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.total_size
                .fetch_sub(entry.size_bytes, Ordering::Relaxed);
            self.entry_count.fetch_sub(1, Ordering::Relaxed);
            Some(entry)
        } else {
            None
        }
    }

    /// Whether the tile is currently indexed.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns up to `limit` tiles sorted least-recently-accessed first.
    pub fn eviction_candidates(&self, limit: usize) -> Vec<EvictionCandidate> {
        let mut candidates: Vec<_> = self
            .entries
            .iter()
            .map(|entry| EvictionCandidate {
                key: entry.key().clone(),
                entry: entry.value().clone(),
            })
            .collect();

        candidates.sort_by_key(|c| c.entry.last_accessed);
        candidates.truncate(limit);
        candidates
    }

    /// Full path to a tile file.
    pub fn key_to_path(&self, key: &str) -> PathBuf {
        self.tile_dir.join(key)
    }

    /// Total bytes of all indexed tiles.
    pub fn total_size(&self) -> u64 {
        self.total_size.load(Ordering::Relaxed)
    }

    /// Number of indexed tiles.
    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }

    /// Populates the index from tile files already on disk.
    ///
    /// Only `.sdf` files are indexed; anything else in the directory is
    /// counted as skipped. File mtime approximates the initial access time
    /// so tiles from a previous run age correctly.
    pub async fn populate_from_disk(&self) -> std::io::Result<PopulateStats> {
        let mut stats = PopulateStats::default();

        if !self.tile_dir.exists() {
            return Ok(stats);
        }

        let mut dir = tokio::fs::read_dir(&self.tile_dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();

            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            let key = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) if name.ends_with(".sdf") => name.to_string(),
                _ => {
                    stats.skipped += 1;
                    continue;
                }
            };

            let last_accessed = metadata
                .modified()
                .ok()
                .and_then(system_time_to_instant)
                .unwrap_or_else(Instant::now);

            let size = metadata.len();
            self.entries.insert(
                key,
                TileEntry {
                    size_bytes: size,
                    last_accessed,
                },
            );
            self.total_size.fetch_add(size, Ordering::Relaxed);
            self.entry_count.fetch_add(1, Ordering::Relaxed);
            stats.files_indexed += 1;
            stats.total_bytes += size;

            // Yield periodically so a large directory does not block the
            // runtime during startup.
            if stats.files_indexed % 100 == 0 {
                tokio::task::yield_now().await;
            }
        }

        tracing::debug!(
            files = stats.files_indexed,
            skipped = stats.skipped,
            total_size_mb = stats.total_bytes / 1_000_000,
            "tile index populated from disk"
        );

        Ok(stats)
    }
}

/// Maps a `SystemTime` onto the `Instant` timeline.
///
/// Future mtimes (clock skew) collapse to now.
fn system_time_to_instant(t: SystemTime) -> Option<Instant> {
    let now_sys = SystemTime::now();
    let now_inst = Instant::now();
    match now_sys.duration_since(t) {
        Ok(age) => now_inst.checked_sub(age),
        Err(_) => Some(now_inst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn record_updates_totals() {
        let temp_dir = TempDir::new().unwrap();
        let index = LruIndex::new(temp_dir.path().to_path_buf());

        assert_eq!(index.total_size(), 0);
        assert_eq!(index.entry_count(), 0);

        index.record("45:46:346:347.sdf", 1000);
        index.record("45:46:345:346.sdf", 2000);

        assert_eq!(index.total_size(), 3000);
        assert_eq!(index.entry_count(), 2);
    }

    #[test]
    fn record_existing_key_adjusts_size_delta() {
        let temp_dir = TempDir::new().unwrap();
        let index = LruIndex::new(temp_dir.path().to_path_buf());

        index.record("45:46:346:347.sdf", 1000);
        index.record("45:46:346:347.sdf", 1500);
        assert_eq!(index.total_size(), 1500);
        assert_eq!(index.entry_count(), 1);

        index.record("45:46:346:347.sdf", 500);
        assert_eq!(index.total_size(), 500);
        assert_eq!(index.entry_count(), 1);
    }

    #[test]
    fn touch_updates_last_accessed() {
        let temp_dir = TempDir::new().unwrap();
        let index = LruIndex::new(temp_dir.path().to_path_buf());

        index.record("45:46:346:347.sdf", 1000);
        let before = index.entries.get("45:46:346:347.sdf").unwrap().last_accessed;

        std::thread::sleep(Duration::from_millis(10));
        index.touch("45:46:346:347.sdf");

        let after = index.entries.get("45:46:346:347.sdf").unwrap().last_accessed;
        assert!(after > before);
    }

    #[test]
    fn touch_unknown_key_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let index = LruIndex::new(temp_dir.path().to_path_buf());
        index.touch("51:52:2:3.sdf");
        assert_eq!(index.entry_count(), 0);
    }

    #[test]
    fn remove_decrements_totals() {
        let temp_dir = TempDir::new().unwrap();
        let index = LruIndex::new(temp_dir.path().to_path_buf());

        index.record("45:46:346:347.sdf", 1000);
        index.record("45:46:345:346.sdf", 2000);

        let removed = index.remove("45:46:346:347.sdf");
        assert_eq!(removed.unwrap().size_bytes, 1000);
        assert_eq!(index.total_size(), 2000);
        assert_eq!(index.entry_count(), 1);

        assert!(index.remove("nope.sdf").is_none());
    }

    #[test]
    fn eviction_candidates_oldest_first() {
        let temp_dir = TempDir::new().unwrap();
        let index = LruIndex::new(temp_dir.path().to_path_buf());

        index.record("old.sdf", 100);
        std::thread::sleep(Duration::from_millis(10));
        index.record("medium.sdf", 200);
        std::thread::sleep(Duration::from_millis(10));
        index.record("new.sdf", 300);

        // Touching the oldest entry moves it to the back of the queue.
        index.touch("old.sdf");

        let candidates = index.eviction_candidates(10);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].key, "medium.sdf");
        assert_eq!(candidates[1].key, "new.sdf");
        assert_eq!(candidates[2].key, "old.sdf");
    }

    #[test]
    fn eviction_candidates_respects_limit() {
        let temp_dir = TempDir::new().unwrap();
        let index = LruIndex::new(temp_dir.path().to_path_buf());

        for i in 0..10 {
            index.record(&format!("{}:{}:10:11.sdf", i, i + 1), 100);
        }

        assert_eq!(index.eviction_candidates(3).len(), 3);
    }

    #[test]
    fn key_to_path_joins_tile_dir() {
        let temp_dir = TempDir::new().unwrap();
        let index = LruIndex::new(temp_dir.path().to_path_buf());

        let path = index.key_to_path("45:46:346:347.sdf");
        assert_eq!(path.parent().unwrap(), temp_dir.path());
    }

    #[tokio::test]
    async fn populate_from_disk_indexes_tile_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("45:46:346:347.sdf"), vec![0u8; 1000]).unwrap();
        std::fs::write(temp_dir.path().join("51:52:2:3-hd.sdf"), vec![0u8; 2000]).unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();

        let index = LruIndex::new(temp_dir.path().to_path_buf());
        let stats = index.populate_from_disk().await.unwrap();

        assert_eq!(stats.files_indexed, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.total_bytes, 3000);
        assert!(index.contains("45:46:346:347.sdf"));
        assert!(index.contains("51:52:2:3-hd.sdf"));
        assert!(!index.contains("notes.txt"));
    }

    #[tokio::test]
    async fn populate_from_disk_handles_missing_directory() {
        let index = LruIndex::new(PathBuf::from("/nonexistent/tile/dir"));
        let stats = index.populate_from_disk().await.unwrap();
        assert_eq!(stats.files_indexed, 0);
    }
}
