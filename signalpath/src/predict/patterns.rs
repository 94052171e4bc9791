//! Antenna radiation pattern provisioning.
//!
//! The engine picks up per-site radiation diagrams when `<site>.az` and
//! `<site>.el` sit next to the site's qth file. A pattern library is a
//! directory of measured pattern pairs, one subdirectory per antenna,
//! named `<antenna>_<gain>dbi` (for example `alfa_868_5dbi` or
//! `mikrotik_868_6.5dbi`) and holding `<dirname>.az` + `<dirname>.el`.

use std::path::{Path, PathBuf};

/// Gains within this distance of a library entry count as that antenna.
const GAIN_MATCH_TOLERANCE_DB: f64 = 0.01;

/// Optional library of measured antenna radiation patterns.
#[derive(Debug, Clone)]
pub struct AntennaPatternLibrary {
    root: PathBuf,
}

impl AntennaPatternLibrary {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Copies the pattern pair matching `gain_db` into `dir` as
    /// `<prefix>.az` / `<prefix>.el`.
    ///
    /// No matching antenna, an unreadable library, or a half-complete pair
    /// is a logged no-op: the prediction still runs, just without the
    /// measured diagram. Only the copies themselves can fail the job.
    pub async fn install(
        &self,
        gain_db: f64,
        dir: &Path,
        prefix: &str,
    ) -> Result<(), std::io::Error> {
        let Some(antenna) = self.matching_antenna(gain_db).await else {
            tracing::debug!(gain_db, "no antenna pattern for gain");
            return Ok(());
        };

        let az = self.root.join(&antenna).join(format!("{antenna}.az"));
        let el = self.root.join(&antenna).join(format!("{antenna}.el"));
        if !az.is_file() || !el.is_file() {
            tracing::warn!(%antenna, "antenna pattern pair incomplete, skipping");
            return Ok(());
        }

        tokio::fs::copy(&az, dir.join(format!("{prefix}.az"))).await?;
        tokio::fs::copy(&el, dir.join(format!("{prefix}.el"))).await?;
        tracing::debug!(%antenna, prefix, "installed antenna pattern");
        Ok(())
    }

    /// Finds the library subdirectory whose encoded gain matches `gain_db`.
    async fn matching_antenna(&self, gain_db: f64) -> Option<String> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "antenna pattern library unreadable");
                return None;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(dir_gain) = gain_from_dir_name(name) {
                if (dir_gain - gain_db).abs() <= GAIN_MATCH_TOLERANCE_DB {
                    return Some(name.to_string());
                }
            }
        }
        None
    }
}

/// Parses the gain out of a `<antenna>_<gain>dbi` directory name.
fn gain_from_dir_name(name: &str) -> Option<f64> {
    let stem = name.strip_suffix("dbi")?;
    let (_, gain) = stem.rsplit_once('_')?;
    gain.parse().ok()
}
