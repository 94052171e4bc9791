//! Terrain store interface.
//!
//! A `TileStore` guarantees that, after a successful `resolve`, the engine
//! tile file for the requested cell exists inside `tile_dir()`. The engine
//! only ever reads from that single directory, so implementations differ
//! only in how files get there: the remote store downloads and converts
//! source elevation data on demand, the local store serves a pre-populated
//! directory as-is.
//!
//! # Dyn Compatibility
//!
//! Async methods use `Pin<Box<dyn Future>>` so callers can hold an
//! `Arc<dyn TileStore>` and swap implementations through configuration.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use thiserror::Error;

use crate::tiles::TerrainTile;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur while resolving terrain tiles.
#[derive(Debug, Error)]
pub enum TileStoreError {
    /// I/O error while touching the tile directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tile is not available and this store cannot produce it.
    #[error("terrain tile {0} not available")]
    MissingTile(String),

    /// Fetching the source elevation data failed.
    #[error("download failed for {tile}: {reason}")]
    Download { tile: String, reason: String },

    /// Converting elevation data to the engine format failed.
    #[error("conversion failed for {tile}: {reason}")]
    Conversion { tile: String, reason: String },
}

/// Provider of engine-format terrain tiles.
///
/// Implementations must be `Send + Sync`; a single store is shared across
/// all in-flight predictions.
pub trait TileStore: Send + Sync {
    /// Ensures the engine tile file for `tile` exists in [`tile_dir`].
    ///
    /// Resolving a tile that is already present must be cheap and must
    /// count as an access for eviction purposes.
    ///
    /// [`tile_dir`]: TileStore::tile_dir
    fn resolve(
        &self,
        tile: TerrainTile,
        high_resolution: bool,
    ) -> BoxFuture<'_, Result<(), TileStoreError>>;

    /// The directory the engine should be pointed at for terrain data.
    fn tile_dir(&self) -> &Path;
}
