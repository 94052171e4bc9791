//! Propagation engine subprocess control.
//!
//! The terrain-diffraction engine and its terrain converter are external
//! executables. This module discovers them at startup, builds their
//! command lines, and runs them with a controlled working directory,
//! capturing both output streams for diagnostics.

use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;

/// Errors from engine discovery and execution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A required engine executable was not found on `PATH`.
    #[error("engine binary '{0}' not found on PATH")]
    MissingBinary(String),

    /// The engine process could not be spawned.
    #[error("failed to spawn '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but exited unsuccessfully.
    #[error("'{binary}' exited with {status}: {stderr}")]
    Failed {
        binary: String,
        status: std::process::ExitStatus,
        stdout: String,
        stderr: String,
    },
}

/// Resolved paths to the four engine executables.
///
/// Discovery happens once at startup so a misconfigured host fails
/// immediately instead of on the first prediction.
#[derive(Debug, Clone)]
pub struct EngineBinaries {
    prediction: PathBuf,
    prediction_hd: PathBuf,
    converter: PathBuf,
    converter_hd: PathBuf,
}

impl EngineBinaries {
    /// Locates all engine executables on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingBinary`] naming the first executable
    /// that could not be found.
    pub fn discover() -> Result<Self, EngineError> {
        let binaries = Self {
            prediction: find_executable("splat")?,
            prediction_hd: find_executable("splat-hd")?,
            converter: find_executable("srtm2sdf")?,
            converter_hd: find_executable("srtm2sdf-hd")?,
        };
        tracing::info!(
            prediction = %binaries.prediction.display(),
            converter = %binaries.converter.display(),
            "engine binaries discovered"
        );
        Ok(binaries)
    }

    /// Builds the set from explicit paths, bypassing `PATH` discovery.
    pub fn from_paths(
        prediction: PathBuf,
        prediction_hd: PathBuf,
        converter: PathBuf,
        converter_hd: PathBuf,
    ) -> Self {
        Self {
            prediction,
            prediction_hd,
            converter,
            converter_hd,
        }
    }

    /// The prediction executable for the requested resolution.
    pub fn prediction_binary(&self, high_resolution: bool) -> &Path {
        if high_resolution {
            &self.prediction_hd
        } else {
            &self.prediction
        }
    }

    /// The terrain converter for the requested resolution.
    pub fn converter_binary(&self, high_resolution: bool) -> &Path {
        if high_resolution {
            &self.converter_hd
        } else {
            &self.converter
        }
    }
}

/// Searches `PATH` for an executable file with the given name.
fn find_executable(name: &str) -> Result<PathBuf, EngineError> {
    let path_var =
        std::env::var_os("PATH").ok_or_else(|| EngineError::MissingBinary(name.to_string()))?;

    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Ok(candidate);
        }
    }
    Err(EngineError::MissingBinary(name.to_string()))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Runs an engine executable in `work_dir` and captures its output.
///
/// A non-zero exit status is an error carrying both captured streams, so
/// the engine's own diagnostics survive into logs and job failures.
pub async fn run(work_dir: &Path, binary: &Path, args: &[String]) -> Result<Output, EngineError> {
    let name = binary.display().to_string();
    tracing::debug!(binary = %name, ?args, work_dir = %work_dir.display(), "running engine");

    let output = Command::new(binary)
        .args(args)
        .current_dir(work_dir)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| EngineError::Spawn {
            binary: name.clone(),
            source,
        })?;

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::error!(
            binary = %name,
            status = %output.status,
            stderr = %stderr,
            "engine run failed"
        );
        return Err(EngineError::Failed {
            binary: name,
            status: output.status,
            stdout,
            stderr,
        });
    }

    Ok(output)
}

/// Command-line arguments for a point-to-point analysis.
///
/// The engine emits its text report and graph data files into the working
/// directory; the `-d` flag points it at the terrain tile directory.
pub fn los_args(
    terrain_dir: &Path,
    frequency_mhz: f64,
    clutter_height_m: f64,
    use_legacy_model: bool,
) -> Vec<String> {
    let mut args = vec![
        "-t".into(),
        "tx.qth".into(),
        "-r".into(),
        "rx.qth".into(),
        "-gc".into(),
        format!("{}", clutter_height_m),
        "-d".into(),
        terrain_dir.display().to_string(),
        "-f".into(),
        format!("{}M", frequency_mhz),
        "-H".into(),
        "normalized_terrain_height_graph.png".into(),
        "-gpsav".into(),
        "-metric".into(),
    ];
    if use_legacy_model {
        args.push("-olditm".into());
    }
    args
}

/// Command-line arguments for an area coverage analysis.
pub fn coverage_args(
    terrain_dir: &Path,
    rx_height_m: f64,
    radius_km: f64,
    clutter_height_m: f64,
    min_dbm: f64,
    use_legacy_model: bool,
) -> Vec<String> {
    let mut args = vec![
        "-t".into(),
        "tx.qth".into(),
        "-L".into(),
        format!("{}", rx_height_m),
        "-d".into(),
        terrain_dir.display().to_string(),
        "-metric".into(),
        "-R".into(),
        format!("{}", radius_km),
        "-sc".into(),
        "-gc".into(),
        format!("{}", clutter_height_m),
        "-ngs".into(),
        "-N".into(),
        "-o".into(),
        "output.ppm".into(),
        "-dbm".into(),
        "-db".into(),
        format!("{}", min_dbm),
        "-kml".into(),
    ];
    if use_legacy_model {
        args.push("-olditm".into());
    }
    args
}
