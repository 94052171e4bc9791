//! Prediction request types and validation.
//!
//! Requests deserialize from JSON with the documented defaults, then run
//! through `validate()` before any work is scheduled. Validation failures
//! carry the offending field name so API clients get actionable errors.

use serde::Deserialize;

use crate::params::{ModelParameters, Polarization, RadioClimate};

/// A request field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for '{field}': {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        reason: reason.into(),
    }
}

fn check_lat(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} outside [-90, 90]")))
    }
}

fn check_lon(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} outside [-180, 180]")))
    }
}

fn check_min(field: &'static str, value: f64, min: f64) -> Result<(), ValidationError> {
    if value >= min {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} below minimum {min}")))
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value > 1.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} outside (1, 100]")))
    }
}

fn default_height() -> f64 {
    1.0
}
fn default_gain() -> f64 {
    1.0
}
fn default_frequency() -> f64 {
    868.5
}
fn default_dielectric() -> f64 {
    15.0
}
fn default_conductivity() -> f64 {
    0.005
}
fn default_bending() -> f64 {
    301.0
}
fn default_climate() -> RadioClimate {
    RadioClimate::ContinentalTemperate
}
fn default_polarization() -> Polarization {
    Polarization::Vertical
}
fn default_situation_fraction() -> f64 {
    50.0
}
fn default_time_fraction() -> f64 {
    90.0
}
fn default_true() -> bool {
    true
}
fn default_min_dbm() -> f64 {
    -130.0
}
fn default_max_dbm() -> f64 {
    -80.0
}
fn default_colormap() -> String {
    "CMRmap".to_string()
}

/// Point-to-point prediction request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LosRequest {
    pub tx_lat: f64,
    pub tx_lon: f64,
    #[serde(default = "default_height")]
    pub tx_height: f64,
    /// Transmitter power in dBm.
    pub tx_power: f64,
    #[serde(default = "default_gain")]
    pub tx_gain: f64,
    #[serde(default)]
    pub tx_loss: f64,
    #[serde(default = "default_frequency")]
    pub frequency_mhz: f64,

    pub rx_lat: f64,
    pub rx_lon: f64,
    #[serde(default = "default_height")]
    pub rx_height: f64,
    #[serde(default = "default_gain")]
    pub rx_gain: f64,
    #[serde(default)]
    pub rx_loss: f64,

    #[serde(default = "default_dielectric")]
    pub ground_dielectric: f64,
    #[serde(default = "default_conductivity")]
    pub ground_conductivity: f64,
    #[serde(default = "default_bending")]
    pub atmosphere_bending: f64,
    #[serde(default = "default_climate")]
    pub radio_climate: RadioClimate,
    #[serde(default = "default_polarization")]
    pub polarization: Polarization,
    #[serde(default)]
    pub clutter_height: f64,

    #[serde(default = "default_situation_fraction")]
    pub situation_fraction: f64,
    #[serde(default = "default_time_fraction")]
    pub time_fraction: f64,
    #[serde(default)]
    pub high_resolution: bool,
    /// Use the classic terrain model instead of its successor, which has
    /// produced unrealistic results on some paths.
    #[serde(default = "default_true")]
    pub itm_model: bool,
}

impl LosRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_lat("tx_lat", self.tx_lat)?;
        check_lon("tx_lon", self.tx_lon)?;
        check_lat("rx_lat", self.rx_lat)?;
        check_lon("rx_lon", self.rx_lon)?;
        check_min("tx_height", self.tx_height, 1.0)?;
        check_min("rx_height", self.rx_height, 1.0)?;
        if self.tx_power <= 0.0 {
            return Err(invalid("tx_power", "must be positive"));
        }
        check_min("tx_gain", self.tx_gain, 0.0)?;
        check_min("tx_loss", self.tx_loss, 0.0)?;
        check_min("rx_gain", self.rx_gain, 0.0)?;
        check_min("rx_loss", self.rx_loss, 0.0)?;
        if !(20.0..=30_000.0).contains(&self.frequency_mhz) {
            return Err(invalid(
                "frequency_mhz",
                format!("{} outside [20, 30000]", self.frequency_mhz),
            ));
        }
        check_min("ground_dielectric", self.ground_dielectric, 1.0)?;
        check_min("ground_conductivity", self.ground_conductivity, 0.0)?;
        check_min("atmosphere_bending", self.atmosphere_bending, 0.0)?;
        check_min("clutter_height", self.clutter_height, 0.0)?;
        check_fraction("situation_fraction", self.situation_fraction)?;
        check_fraction("time_fraction", self.time_fraction)?;
        Ok(())
    }

    /// The model parameter set this request describes.
    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters {
            ground_dielectric: self.ground_dielectric,
            ground_conductivity: self.ground_conductivity,
            atmosphere_bending: self.atmosphere_bending,
            frequency_mhz: self.frequency_mhz,
            radio_climate: self.radio_climate,
            polarization: self.polarization,
            situation_fraction: self.situation_fraction,
            time_fraction: self.time_fraction,
            tx_power_dbm: self.tx_power,
            tx_gain_db: self.tx_gain,
            tx_loss_db: self.tx_loss,
        }
    }
}

/// Area coverage prediction request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoverageRequest {
    pub lat: f64,
    pub lon: f64,
    /// Coverage radius in kilometers; clamped to the platform maximum.
    pub radius: f64,
    #[serde(default = "default_height")]
    pub tx_height: f64,
    pub tx_power: f64,
    #[serde(default = "default_gain")]
    pub tx_gain: f64,
    #[serde(default)]
    pub tx_loss: f64,
    #[serde(default = "default_frequency")]
    pub frequency_mhz: f64,

    /// Receiver height above ground applied across the whole area.
    #[serde(default = "default_height")]
    pub rx_height: f64,

    #[serde(default = "default_dielectric")]
    pub ground_dielectric: f64,
    #[serde(default = "default_conductivity")]
    pub ground_conductivity: f64,
    #[serde(default = "default_bending")]
    pub atmosphere_bending: f64,
    #[serde(default = "default_climate")]
    pub radio_climate: RadioClimate,
    #[serde(default = "default_polarization")]
    pub polarization: Polarization,
    #[serde(default)]
    pub clutter_height: f64,

    #[serde(default = "default_situation_fraction")]
    pub situation_fraction: f64,
    #[serde(default = "default_time_fraction")]
    pub time_fraction: f64,

    #[serde(default = "default_min_dbm")]
    pub min_dbm: f64,
    #[serde(default = "default_max_dbm")]
    pub max_dbm: f64,
    #[serde(default = "default_colormap")]
    pub colormap: String,

    #[serde(default)]
    pub high_resolution: bool,
    #[serde(default = "default_true")]
    pub itm_model: bool,
}

impl CoverageRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_lat("lat", self.lat)?;
        check_lon("lon", self.lon)?;
        if self.radius <= 0.0 {
            return Err(invalid("radius", "must be positive"));
        }
        check_min("tx_height", self.tx_height, 1.0)?;
        check_min("rx_height", self.rx_height, 1.0)?;
        if self.tx_power <= 0.0 {
            return Err(invalid("tx_power", "must be positive"));
        }
        check_min("tx_gain", self.tx_gain, 0.0)?;
        check_min("tx_loss", self.tx_loss, 0.0)?;
        if !(20.0..=30_000.0).contains(&self.frequency_mhz) {
            return Err(invalid(
                "frequency_mhz",
                format!("{} outside [20, 30000]", self.frequency_mhz),
            ));
        }
        check_min("ground_dielectric", self.ground_dielectric, 1.0)?;
        check_min("ground_conductivity", self.ground_conductivity, 0.0)?;
        check_min("atmosphere_bending", self.atmosphere_bending, 0.0)?;
        check_min("clutter_height", self.clutter_height, 0.0)?;
        check_fraction("situation_fraction", self.situation_fraction)?;
        check_fraction("time_fraction", self.time_fraction)?;
        if self.min_dbm >= self.max_dbm {
            return Err(invalid("min_dbm", "must be below max_dbm"));
        }
        self.colormap
            .parse::<crate::colormap::Colormap>()
            .map_err(|e| invalid("colormap", e.to_string()))?;
        Ok(())
    }

    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters {
            ground_dielectric: self.ground_dielectric,
            ground_conductivity: self.ground_conductivity,
            atmosphere_bending: self.atmosphere_bending,
            frequency_mhz: self.frequency_mhz,
            radio_climate: self.radio_climate,
            polarization: self.polarization,
            situation_fraction: self.situation_fraction,
            time_fraction: self.time_fraction,
            tx_power_dbm: self.tx_power,
            tx_gain_db: self.tx_gain,
            tx_loss_db: self.tx_loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_los() -> LosRequest {
        serde_json::from_value(serde_json::json!({
            "tx_lat": 45.84356,
            "tx_lon": 13.73427,
            "tx_power": 30.0,
            "rx_lat": 45.85474,
            "rx_lon": 13.72615,
        }))
        .unwrap()
    }

    fn minimal_coverage() -> CoverageRequest {
        serde_json::from_value(serde_json::json!({
            "lat": 45.84356,
            "lon": 13.73427,
            "radius": 25.0,
            "tx_power": 30.0,
        }))
        .unwrap()
    }

    #[test]
    fn los_defaults_applied() {
        let req = minimal_los();
        assert_eq!(req.frequency_mhz, 868.5);
        assert_eq!(req.tx_height, 1.0);
        assert_eq!(req.radio_climate, RadioClimate::ContinentalTemperate);
        assert_eq!(req.polarization, Polarization::Vertical);
        assert_eq!(req.situation_fraction, 50.0);
        assert_eq!(req.time_fraction, 90.0);
        assert!(!req.high_resolution);
        assert!(req.itm_model);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn coverage_defaults_applied() {
        let req = minimal_coverage();
        assert_eq!(req.min_dbm, -130.0);
        assert_eq!(req.max_dbm, -80.0);
        assert_eq!(req.colormap, "CMRmap");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn latitude_bounds_enforced() {
        let mut req = minimal_los();
        req.tx_lat = 91.0;
        let err = req.validate().unwrap_err();
        assert_eq!(err.field, "tx_lat");
    }

    #[test]
    fn longitude_bounds_enforced() {
        let mut req = minimal_los();
        req.rx_lon = -180.5;
        assert_eq!(req.validate().unwrap_err().field, "rx_lon");
    }

    #[test]
    fn heights_must_be_at_least_one_meter() {
        let mut req = minimal_los();
        req.rx_height = 0.5;
        assert_eq!(req.validate().unwrap_err().field, "rx_height");
    }

    #[test]
    fn tx_power_must_be_positive() {
        let mut req = minimal_los();
        req.tx_power = 0.0;
        assert_eq!(req.validate().unwrap_err().field, "tx_power");
    }

    #[test]
    fn frequency_range_enforced() {
        let mut req = minimal_los();
        req.frequency_mhz = 10.0;
        assert_eq!(req.validate().unwrap_err().field, "frequency_mhz");
        req.frequency_mhz = 40_000.0;
        assert_eq!(req.validate().unwrap_err().field, "frequency_mhz");
    }

    #[test]
    fn fractions_must_be_in_open_closed_range() {
        let mut req = minimal_los();
        req.time_fraction = 1.0;
        assert_eq!(req.validate().unwrap_err().field, "time_fraction");
        req.time_fraction = 101.0;
        assert_eq!(req.validate().unwrap_err().field, "time_fraction");
    }

    #[test]
    fn coverage_rejects_inverted_dbm_range() {
        let mut req = minimal_coverage();
        req.min_dbm = -70.0;
        assert_eq!(req.validate().unwrap_err().field, "min_dbm");
    }

    #[test]
    fn coverage_rejects_unknown_colormap() {
        let mut req = minimal_coverage();
        req.colormap = "sunset".to_string();
        assert_eq!(req.validate().unwrap_err().field, "colormap");
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<LosRequest, _> = serde_json::from_value(serde_json::json!({
            "tx_lat": 0.0, "tx_lon": 0.0, "tx_power": 30.0,
            "rx_lat": 0.0, "rx_lon": 0.0,
            "bogus": true,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn climate_deserializes_from_snake_case() {
        let req: LosRequest = serde_json::from_value(serde_json::json!({
            "tx_lat": 0.0, "tx_lon": 0.0, "tx_power": 30.0,
            "rx_lat": 0.0, "rx_lon": 0.0,
            "radio_climate": "maritime_temperate_sea",
            "polarization": "horizontal",
        }))
        .unwrap();
        assert_eq!(req.radio_climate, RadioClimate::MaritimeTemperateSea);
        assert_eq!(req.polarization, Polarization::Horizontal);
    }
}
