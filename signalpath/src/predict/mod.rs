//! Prediction orchestration.
//!
//! Ties the other modules together: resolves the terrain tiles a request
//! needs, lays out a scratch working directory with the engine's input
//! files, runs the engine, and turns its outputs into result types. Each
//! prediction gets its own scratch directory that is removed when the
//! prediction finishes, successfully or not.

mod patterns;
mod types;

pub use patterns::AntennaPatternLibrary;
pub use types::{
    CoverageArtifacts, CoverageResult, FresnelAnalysis, LosPredictionResult, PathAnalysis,
};

use std::path::Path;
use std::sync::Arc;

use crate::cache::{TileStore, TileStoreError};
use crate::colormap::Colormap;
use crate::engine::{self, EngineBinaries, EngineError};
use crate::params::ParamBuilder;
use crate::raster::{self, RasterError};
use crate::report;
use crate::request::{CoverageRequest, LosRequest};
use crate::tiles::{self, TerrainTile, MAX_COVERAGE_RADIUS_M};

/// Per-kilometer signal adjustment applied to obstructed paths, in dB.
const OBSTRUCTION_PENALTY_DB_PER_KM: f64 = 1.651;

/// Errors from running a prediction end to end.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error(transparent)]
    Tile(#[from] TileStoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine exited cleanly but did not write an expected file.
    #[error("engine did not produce '{0}'")]
    MissingOutput(String),
}

/// Runs predictions against a terrain store and the engine binaries.
///
/// Cheap to clone behind `Arc`; one instance serves all jobs.
pub struct PredictionService {
    binaries: EngineBinaries,
    tiles: Arc<dyn TileStore>,
    params: ParamBuilder,
    patterns: Option<AntennaPatternLibrary>,
}

impl PredictionService {
    pub fn new(binaries: EngineBinaries, tiles: Arc<dyn TileStore>, params: ParamBuilder) -> Self {
        Self {
            binaries,
            tiles,
            params,
            patterns: None,
        }
    }

    /// Attaches a measured radiation pattern library; sites whose gain
    /// matches a library antenna get its diagram installed per prediction.
    pub fn with_patterns(mut self, patterns: AntennaPatternLibrary) -> Self {
        self.patterns = Some(patterns);
        self
    }

    async fn resolve_tiles(
        &self,
        needed: &[TerrainTile],
        high_resolution: bool,
    ) -> Result<(), TileStoreError> {
        for tile in needed {
            self.tiles.resolve(*tile, high_resolution).await?;
        }
        Ok(())
    }

    /// Runs a point-to-point prediction.
    pub async fn predict_los(&self, req: &LosRequest) -> Result<LosPredictionResult, PredictError> {
        let needed = tiles::tiles_for_link(req.tx_lat, req.tx_lon, req.rx_lat, req.rx_lon);
        tracing::info!(tiles = needed.len(), "starting point-to-point prediction");
        self.resolve_tiles(&needed, req.high_resolution).await?;

        let scratch = tempfile::tempdir()?;
        let dir = scratch.path();

        tokio::fs::write(
            dir.join("tx.qth"),
            self.params
                .qth_file("tx", req.tx_lat, req.tx_lon, req.tx_height),
        )
        .await?;
        tokio::fs::write(
            dir.join("rx.qth"),
            self.params
                .qth_file("rx", req.rx_lat, req.rx_lon, req.rx_height),
        )
        .await?;
        tokio::fs::write(
            dir.join("splat.lrp"),
            self.params.lrp_file(&req.model_parameters()),
        )
        .await?;

        if let Some(patterns) = &self.patterns {
            patterns.install(req.tx_gain, dir, "tx").await?;
            patterns.install(req.rx_gain, dir, "rx").await?;
        }

        let args = engine::los_args(
            self.tiles.tile_dir(),
            req.frequency_mhz,
            req.clutter_height,
            req.itm_model,
        );
        engine::run(dir, self.binaries.prediction_binary(req.high_resolution), &args).await?;

        let profile = read_output(dir, "profile.gp").await?;
        let curvature = read_output(dir, "curvature.gp").await?;
        let fresnel = read_output(dir, "fresnel.gp").await?;
        let fresnel_pt_6 = read_output(dir, "fresnel_pt_6.gp").await?;
        let reference = read_output(dir, "reference.gp").await?;
        let report_text = read_output(dir, "tx-to-rx.txt").await?;

        let profile = report::parse_series(&profile, "profile.gp");
        let curvature = report::parse_series(&curvature, "curvature.gp");
        let fresnel = report::parse_series(&fresnel, "fresnel.gp");
        let fresnel_pt_6 = report::parse_series(&fresnel_pt_6, "fresnel_pt_6.gp");
        let reference = report::parse_series(&reference, "reference.gp");
        let link = report::parse_link_report(&report_text);

        let rx_signal_power = link
            .rx_signal_power_dbm
            .map(|dbm| dbm + req.rx_gain - req.rx_loss);
        let rx_signal_power_optimized = rx_signal_power.map(|power| {
            if link.path_obstructed {
                power + OBSTRUCTION_PENALTY_DB_PER_KM * link.distance_km.unwrap_or(0.0)
            } else {
                power
            }
        });
        let budget = |loss: f64| {
            req.tx_power + req.tx_gain - req.tx_loss - loss + req.rx_gain - req.rx_loss
        };
        let path_loss_rssi = link.free_space_path_loss_db.map(budget);
        let model_loss_rssi = link.model_loss_db.map(budget);

        Ok(LosPredictionResult {
            distance: profile.x,
            length: link.distance_km,
            profile: profile.y,
            curvature: curvature.y,
            fresnel: fresnel.y,
            fresnel_pt_6: fresnel_pt_6.y,
            reference: reference.y,
            path: PathAnalysis {
                obstructed: link.path_obstructed,
                message: link.path_message,
                obstructions: link.obstructions,
            },
            first_fresnel: FresnelAnalysis {
                obstructed: link.first_fresnel_obstructed,
                message: link.first_fresnel_message,
            },
            fresnel_60: FresnelAnalysis {
                obstructed: link.fresnel_60_obstructed,
                message: link.fresnel_60_message,
            },
            rx_signal_power,
            rx_signal_power_optimized,
            path_loss: link.free_space_path_loss_db,
            path_loss_rssi,
            model_loss_label: link.model_loss_label,
            model_loss: link.model_loss_db,
            model_loss_rssi,
        })
    }

    /// Runs an area coverage prediction.
    pub async fn predict_coverage(
        &self,
        req: &CoverageRequest,
    ) -> Result<CoverageResult, PredictError> {
        let radius_km = (req.radius * 1000.0).min(MAX_COVERAGE_RADIUS_M) / 1000.0;

        let needed = tiles::tiles_for_area(req.lat, req.lon, radius_km * 1000.0);
        tracing::info!(
            tiles = needed.len(),
            radius_km,
            "starting coverage prediction"
        );
        self.resolve_tiles(&needed, req.high_resolution).await?;

        // Validated upstream; a bad name here is a programming error, so
        // fall back to the default ramp rather than failing the job.
        let colormap = req.colormap.parse::<Colormap>().unwrap_or(Colormap::CmrMap);

        let scratch = tempfile::tempdir()?;
        let dir = scratch.path();

        tokio::fs::write(
            dir.join("tx.qth"),
            self.params.qth_file("tx", req.lat, req.lon, req.tx_height),
        )
        .await?;
        tokio::fs::write(
            dir.join("splat.lrp"),
            self.params.lrp_file(&req.model_parameters()),
        )
        .await?;
        tokio::fs::write(
            dir.join("splat.dcf"),
            self.params.dcf_file(colormap, req.min_dbm, req.max_dbm),
        )
        .await?;

        let args = engine::coverage_args(
            self.tiles.tile_dir(),
            req.rx_height,
            radius_km,
            req.clutter_height,
            req.min_dbm,
            req.itm_model,
        );
        engine::run(dir, self.binaries.prediction_binary(req.high_resolution), &args).await?;

        let ppm = read_output_bytes(dir, "output.ppm").await?;
        let kml = read_output(dir, "output.kml").await?;
        let key_ppm = read_output_bytes(dir, "output-ck.ppm").await?;

        let geotiff = raster::synthesize_geotiff(&ppm, &kml, colormap, req.min_dbm, req.max_dbm)?;
        let legend_png = raster::legend_png(&key_ppm)?;

        tracing::info!(
            geotiff_bytes = geotiff.len(),
            legend_bytes = legend_png.len(),
            "coverage prediction complete"
        );
        Ok(CoverageResult {
            geotiff,
            legend_png,
        })
    }
}

async fn read_output(dir: &Path, name: &str) -> Result<String, PredictError> {
    tokio::fs::read_to_string(dir.join(name))
        .await
        .map_err(|_| PredictError::MissingOutput(name.to_string()))
}

async fn read_output_bytes(dir: &Path, name: &str) -> Result<Vec<u8>, PredictError> {
    tokio::fs::read(dir.join(name))
        .await
        .map_err(|_| PredictError::MissingOutput(name.to_string()))
}
