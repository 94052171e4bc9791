//! Terrain tile storage.
//!
//! Predictions hand the engine a directory of terrain tiles; the stores in
//! this module are the two ways that directory gets filled. See
//! [`traits::TileStore`] for the contract.

mod local;
mod lru_index;
mod remote;
mod traits;

pub use local::LocalTileStore;
pub use lru_index::LruIndex;
pub use remote::{prepare_standard_resolution, RemoteStoreConfig, RemoteTileStore};
pub use traits::{BoxFuture, TileStore, TileStoreError};
