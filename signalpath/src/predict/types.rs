//! Prediction result types.

use serde::Serialize;

use crate::report::Obstruction;

/// Terrain obstruction summary for the direct path.
#[derive(Debug, Clone, Serialize)]
pub struct PathAnalysis {
    pub obstructed: bool,
    pub message: String,
    pub obstructions: Vec<Obstruction>,
}

/// Fresnel zone clearance summary.
#[derive(Debug, Clone, Serialize)]
pub struct FresnelAnalysis {
    pub obstructed: bool,
    pub message: String,
}

/// Full point-to-point prediction result.
///
/// The vector fields are aligned: `distance[i]` is the position along the
/// path for `profile[i]`, `curvature[i]`, and the Fresnel/reference
/// envelopes. Scalar quantities are `None` when the engine report did not
/// contain them.
#[derive(Debug, Clone, Serialize)]
pub struct LosPredictionResult {
    /// Distance axis for the graph series, in kilometers.
    pub distance: Vec<f64>,
    /// Total path length in kilometers, from the text report.
    pub length: Option<f64>,
    /// Terrain elevation profile.
    pub profile: Vec<f64>,
    /// Earth curvature contour.
    pub curvature: Vec<f64>,
    /// First Fresnel zone envelope.
    pub fresnel: Vec<f64>,
    /// 60% Fresnel zone envelope.
    pub fresnel_pt_6: Vec<f64>,
    /// Line-of-sight reference line.
    pub reference: Vec<f64>,

    pub path: PathAnalysis,
    pub first_fresnel: FresnelAnalysis,
    pub fresnel_60: FresnelAnalysis,

    /// Received power after receiver gain and loss, in dBm.
    pub rx_signal_power: Option<f64>,
    /// Received power with the obstruction distance penalty applied.
    pub rx_signal_power_optimized: Option<f64>,
    /// Free-space path loss in dB.
    pub path_loss: Option<f64>,
    /// Link budget under free-space loss, in dBm.
    pub path_loss_rssi: Option<f64>,
    /// Which terrain model produced `model_loss`.
    pub model_loss_label: String,
    /// Terrain model path loss in dB.
    pub model_loss: Option<f64>,
    /// Link budget under the terrain model loss, in dBm.
    pub model_loss_rssi: Option<f64>,
}

/// Raw rasters produced by a coverage prediction.
#[derive(Debug, Clone)]
pub struct CoverageResult {
    /// Palettized, georeferenced TIFF.
    pub geotiff: Vec<u8>,
    /// Color-key legend as PNG.
    pub legend_png: Vec<u8>,
}

/// Serializable reference to stored coverage rasters.
///
/// Job status responses carry sizes, not the raster bytes; clients fetch
/// the artifacts through dedicated endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageArtifacts {
    pub geotiff_bytes: u64,
    pub legend_bytes: u64,
}

impl CoverageArtifacts {
    pub fn describing(result: &CoverageResult) -> Self {
        Self {
            geotiff_bytes: result.geotiff.len() as u64,
            legend_bytes: result.legend_png.len() as u64,
        }
    }
}
