//! Read-only terrain store over a pre-populated directory.
//!
//! For deployments that ship their terrain tiles with the host (or mount
//! them from shared storage). Never downloads, converts, or evicts; a tile
//! that is not already present is simply missing.

use std::path::{Path, PathBuf};

use crate::cache::traits::{BoxFuture, TileStore, TileStoreError};
use crate::tiles::TerrainTile;

/// Terrain store that serves an existing directory as-is.
pub struct LocalTileStore {
    tile_dir: PathBuf,
}

impl LocalTileStore {
    pub fn new(tile_dir: PathBuf) -> Self {
        Self { tile_dir }
    }

    async fn resolve_inner(
        &self,
        tile: TerrainTile,
        high_resolution: bool,
    ) -> Result<(), TileStoreError> {
        let sdf_name = tile.sdf_name(high_resolution);
        let path = self.tile_dir.join(&sdf_name);

        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => Ok(()),
            Ok(_) => Err(TileStoreError::MissingTile(sdf_name)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(tile = %sdf_name, dir = %self.tile_dir.display(), "terrain tile missing");
                Err(TileStoreError::MissingTile(sdf_name))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl TileStore for LocalTileStore {
    fn resolve(
        &self,
        tile: TerrainTile,
        high_resolution: bool,
    ) -> BoxFuture<'_, Result<(), TileStoreError>> {
        Box::pin(self.resolve_inner(tile, high_resolution))
    }

    fn tile_dir(&self) -> &Path {
        &self.tile_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn resolve_hit_for_present_tile() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("45:46:346:347.sdf"), b"data").unwrap();

        let store = LocalTileStore::new(temp_dir.path().to_path_buf());
        let tile = TerrainTile { lat: 45, lon: 13 };
        assert!(store.resolve(tile, false).await.is_ok());
    }

    #[tokio::test]
    async fn resolve_miss_for_absent_tile() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalTileStore::new(temp_dir.path().to_path_buf());

        let tile = TerrainTile { lat: 45, lon: 13 };
        let err = store.resolve(tile, false).await.unwrap_err();
        assert!(matches!(err, TileStoreError::MissingTile(name) if name == "45:46:346:347.sdf"));
    }

    #[tokio::test]
    async fn resolution_variants_are_distinct_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("45:46:346:347.sdf"), b"sd").unwrap();

        let store = LocalTileStore::new(temp_dir.path().to_path_buf());
        let tile = TerrainTile { lat: 45, lon: 13 };
        assert!(store.resolve(tile, false).await.is_ok());
        assert!(store.resolve(tile, true).await.is_err());
    }
}
