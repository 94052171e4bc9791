//! Downloading terrain store with byte-ceiling LRU eviction.
//!
//! Resolves tiles by fetching gzipped source elevation data over HTTP,
//! decompressing it, converting it to the engine format with the external
//! converter, and installing the result into the tile directory with an
//! atomic rename. Finished tiles count against a configurable byte ceiling;
//! when the ceiling is exceeded the least-recently-accessed tiles are
//! deleted first.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use flate2::read::GzDecoder;
use tokio::sync::Mutex;

use crate::cache::lru_index::LruIndex;
use crate::cache::traits::{BoxFuture, TileStore, TileStoreError};
use crate::engine::{self, EngineBinaries};
use crate::tiles::TerrainTile;

/// One-arcsecond source tile edge length in samples.
const SRTM1_EDGE: usize = 3601;
/// Three-arcsecond tile edge length in samples.
const SRTM3_EDGE: usize = 1201;

const SRTM1_BYTES: usize = SRTM1_EDGE * SRTM1_EDGE * 2;
const SRTM3_BYTES: usize = SRTM3_EDGE * SRTM3_EDGE * 2;

/// Configuration for the downloading store.
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// Base URL of the elevation tile bucket.
    pub base_url: String,
    /// Directory that holds finished engine tiles.
    pub tile_dir: PathBuf,
    /// Byte ceiling for finished tiles; LRU eviction keeps usage below it.
    pub max_bytes: u64,
}

/// Terrain store that downloads and converts tiles on demand.
pub struct RemoteTileStore {
    client: reqwest::Client,
    config: RemoteStoreConfig,
    index: LruIndex,
    binaries: EngineBinaries,
    /// Per-tile locks so concurrent resolves of the same cell download once.
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl RemoteTileStore {
    /// Creates the store, its tile directory, and the index of any tiles
    /// left over from a previous run.
    pub async fn new(
        client: reqwest::Client,
        config: RemoteStoreConfig,
        binaries: EngineBinaries,
    ) -> Result<Self, TileStoreError> {
        tokio::fs::create_dir_all(&config.tile_dir).await?;

        let index = LruIndex::new(config.tile_dir.clone());
        let stats = index.populate_from_disk().await?;
        tracing::info!(
            tiles = stats.files_indexed,
            total_bytes = stats.total_bytes,
            dir = %config.tile_dir.display(),
            "terrain tile store ready"
        );

        Ok(Self {
            client,
            config,
            index,
            binaries,
            inflight: DashMap::new(),
        })
    }

    /// Download URLs for a source tile: the bucket's layout first, then the
    /// legacy flat layout kept for buckets populated by older deployments.
    fn download_urls(&self, tile: TerrainTile) -> (String, String) {
        let base = self.config.base_url.trim_end_matches('/');
        let name = tile.hgt_name();
        (format!("{base}/srtm/{name}"), format!("{base}/{name}"))
    }

    async fn fetch_source_tile(&self, tile: TerrainTile) -> Result<Vec<u8>, TileStoreError> {
        let (primary, legacy) = self.download_urls(tile);

        for (attempt, url) in [&primary, &legacy].into_iter().enumerate() {
            let response = self
                .client
                .get(url.as_str())
                .send()
                .await
                .map_err(|e| TileStoreError::Download {
                    tile: tile.hgt_name(),
                    reason: e.to_string(),
                })?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                if attempt == 0 {
                    tracing::debug!(url = %url, "source tile not at primary key, trying legacy layout");
                    continue;
                }
                // Absent from both layouts: the bucket does not carry it.
                return Err(TileStoreError::MissingTile(tile.hgt_name()));
            }

            if !response.status().is_success() {
                return Err(TileStoreError::Download {
                    tile: tile.hgt_name(),
                    reason: format!("{} returned {}", url, response.status()),
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| TileStoreError::Download {
                    tile: tile.hgt_name(),
                    reason: e.to_string(),
                })?;
            return Ok(bytes.to_vec());
        }

        Err(TileStoreError::MissingTile(tile.hgt_name()))
    }

    /// Downloads, decompresses, converts, and installs one tile.
    ///
    /// The caller holds the per-tile lock. All intermediate files live in a
    /// scratch directory inside the tile directory, so the final rename is
    /// atomic on the same filesystem and a crash never leaves a partial
    /// tile visible to the engine.
    async fn produce_tile(
        &self,
        tile: TerrainTile,
        high_resolution: bool,
    ) -> Result<(), TileStoreError> {
        let compressed = self.fetch_source_tile(tile).await?;

        let mut elevation = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut elevation)
            .map_err(|e| TileStoreError::Download {
                tile: tile.hgt_name(),
                reason: format!("gunzip failed: {e}"),
            })?;

        let elevation = if high_resolution {
            elevation
        } else {
            prepare_standard_resolution(&elevation).ok_or_else(|| TileStoreError::Conversion {
                tile: tile.hgt_name(),
                reason: format!("unexpected elevation data size {}", elevation.len()),
            })?
        };

        let scratch = tempfile::tempdir_in(&self.config.tile_dir)?;
        let hgt_path = scratch.path().join(tile.hgt_file_name());
        tokio::fs::write(&hgt_path, &elevation).await?;

        let converter = self.binaries.converter_binary(high_resolution);
        engine::run(scratch.path(), converter, &[tile.hgt_file_name()])
            .await
            .map_err(|e| TileStoreError::Conversion {
                tile: tile.hgt_name(),
                reason: e.to_string(),
            })?;

        let sdf_name = tile.sdf_name(high_resolution);
        let produced = scratch.path().join(&sdf_name);
        let size = tokio::fs::metadata(&produced)
            .await
            .map_err(|_| TileStoreError::Conversion {
                tile: tile.hgt_name(),
                reason: format!("converter did not produce {sdf_name}"),
            })?
            .len();

        tokio::fs::rename(&produced, self.index.key_to_path(&sdf_name)).await?;
        self.index.record(&sdf_name, size);
        tracing::info!(tile = %sdf_name, size_bytes = size, "terrain tile installed");

        evict_to_ceiling(&self.index, self.config.max_bytes).await?;
        Ok(())
    }

    async fn resolve_inner(
        &self,
        tile: TerrainTile,
        high_resolution: bool,
    ) -> Result<(), TileStoreError> {
        let sdf_name = tile.sdf_name(high_resolution);

        if self.index.contains(&sdf_name) {
            self.index.touch(&sdf_name);
            return Ok(());
        }

        let lock = self
            .inflight
            .entry(sdf_name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another resolve may have produced the tile while we waited.
        if self.index.contains(&sdf_name) {
            self.index.touch(&sdf_name);
            return Ok(());
        }

        let result = self.produce_tile(tile, high_resolution).await;
        self.inflight.remove(&sdf_name);
        result
    }
}

impl TileStore for RemoteTileStore {
    fn resolve(
        &self,
        tile: TerrainTile,
        high_resolution: bool,
    ) -> BoxFuture<'_, Result<(), TileStoreError>> {
        Box::pin(self.resolve_inner(tile, high_resolution))
    }

    fn tile_dir(&self) -> &Path {
        &self.config.tile_dir
    }
}

/// Reduces source elevation data to the three-arcsecond grid the standard
/// converter expects, taking every third sample on each axis.
///
/// One-arcsecond and three-arcsecond inputs are both accepted; anything
/// else returns `None`.
pub fn prepare_standard_resolution(data: &[u8]) -> Option<Vec<u8>> {
    match data.len() {
        SRTM3_BYTES => Some(data.to_vec()),
        SRTM1_BYTES => {
            let mut out = Vec::with_capacity(SRTM3_BYTES);
            for row in 0..SRTM3_EDGE {
                let src_row = row * 3;
                for col in 0..SRTM3_EDGE {
                    let i = (src_row * SRTM1_EDGE + col * 3) * 2;
                    out.extend_from_slice(&data[i..i + 2]);
                }
            }
            Some(out)
        }
        _ => None,
    }
}

/// Deletes least-recently-accessed tiles until usage fits the ceiling.
///
/// Returns the number of bytes freed. Files already gone from disk are
/// dropped from the index without error.
pub(crate) async fn evict_to_ceiling(index: &LruIndex, max_bytes: u64) -> std::io::Result<u64> {
    let mut freed = 0u64;

    while index.total_size() > max_bytes {
        let candidates = index.eviction_candidates(16);
        if candidates.is_empty() {
            break;
        }

        for candidate in candidates {
            if index.total_size() <= max_bytes {
                break;
            }
            let path = index.key_to_path(&candidate.key);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            index.remove(&candidate.key);
            freed += candidate.entry.size_bytes;
            tracing::debug!(
                tile = %candidate.key,
                size_bytes = candidate.entry.size_bytes,
                "evicted terrain tile"
            );
        }
    }

    Ok(freed)
}
