//! Service configuration from the environment.
//!
//! All knobs live in `SIGNALPATH_*` variables and are read once at
//! startup. Unset variables fall back to defaults suitable for a
//! single-host deployment; set-but-unparseable variables are an error so
//! typos fail loudly instead of silently running with a default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// A configuration variable that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Directory holding engine-format terrain tiles.
    pub tile_dir: PathBuf,
    /// Base URL for downloading source elevation tiles. Unset means the
    /// tile directory is pre-populated and read-only.
    pub tile_source_url: Option<String>,
    /// Byte ceiling for the downloading tile store.
    pub cache_max_bytes: u64,
    /// How long jobs remain pollable after their last lifecycle event.
    pub job_ttl: Duration,
    /// Directory of measured antenna radiation pattern pairs. Unset means
    /// predictions run without pattern diagrams.
    pub antenna_pattern_dir: Option<PathBuf>,
    /// Treat antenna gains as dBi and convert to the engine's dBd.
    pub dipole_offset: bool,
}

fn parsed<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError {
                var,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            listen_addr: parsed("SIGNALPATH_LISTEN")?
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000))),
            tile_dir: std::env::var("SIGNALPATH_TILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/var/cache/signalpath/tiles")),
            tile_source_url: std::env::var("SIGNALPATH_TILE_SOURCE").ok(),
            cache_max_bytes: parsed("SIGNALPATH_CACHE_MAX_BYTES")?
                .unwrap_or(2 * 1024 * 1024 * 1024),
            job_ttl: Duration::from_secs(parsed("SIGNALPATH_JOB_TTL_SECS")?.unwrap_or(3600)),
            antenna_pattern_dir: std::env::var("SIGNALPATH_ANTENNA_PATTERNS")
                .ok()
                .map(PathBuf::from),
            dipole_offset: parsed("SIGNALPATH_DIPOLE_OFFSET")?.unwrap_or(false),
        };
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }
}
