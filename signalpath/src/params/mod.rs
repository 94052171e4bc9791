//! Engine input file generation.
//!
//! The propagation engine reads three fixed-format text files from its
//! working directory: a site file per endpoint (`.qth`), a model parameter
//! file (`.lrp`) and a signal-level color definition (`.dcf`). Field order
//! and the inline comments are part of the format — the engine parses by
//! position, so every renderer here preserves them exactly.

use serde::{Deserialize, Serialize};

use crate::colormap::Colormap;

/// Radio climate classes with the engine's enumeration codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioClimate {
    Equatorial,
    ContinentalSubtropical,
    MaritimeSubtropical,
    Desert,
    ContinentalTemperate,
    MaritimeTemperateLand,
    MaritimeTemperateSea,
}

impl RadioClimate {
    /// The engine's integer code for this climate class.
    pub fn code(&self) -> u8 {
        match self {
            RadioClimate::Equatorial => 1,
            RadioClimate::ContinentalSubtropical => 2,
            RadioClimate::MaritimeSubtropical => 3,
            RadioClimate::Desert => 4,
            RadioClimate::ContinentalTemperate => 5,
            RadioClimate::MaritimeTemperateLand => 6,
            RadioClimate::MaritimeTemperateSea => 7,
        }
    }
}

/// Antenna polarization with the engine's integer encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarization {
    Horizontal,
    Vertical,
}

impl Polarization {
    pub fn code(&self) -> u8 {
        match self {
            Polarization::Horizontal => 0,
            Polarization::Vertical => 1,
        }
    }
}

/// Model parameters rendered into the `.lrp` file.
#[derive(Debug, Clone)]
pub struct ModelParameters {
    pub ground_dielectric: f64,
    pub ground_conductivity: f64,
    pub atmosphere_bending: f64,
    pub frequency_mhz: f64,
    pub radio_climate: RadioClimate,
    pub polarization: Polarization,
    /// Situation-fraction reliability percentile, 1–100.
    pub situation_fraction: f64,
    /// Time-fraction reliability percentile, 1–100.
    pub time_fraction: f64,
    pub tx_power_dbm: f64,
    pub tx_gain_db: f64,
    pub tx_loss_db: f64,
}

/// Effective radiated power in watts from dBm-domain inputs.
///
/// `10^((power + gain − loss − 30) / 10)`; 30 dBm of combined budget is
/// exactly one watt.
pub fn erp_watts(tx_power_dbm: f64, tx_gain_db: f64, tx_loss_db: f64) -> f64 {
    let erp_dbm = tx_power_dbm + tx_gain_db - tx_loss_db;
    10f64.powf((erp_dbm - 30.0) / 10.0)
}

/// Renders the three engine input files from validated request data.
#[derive(Debug, Clone, Default)]
pub struct ParamBuilder {
    /// Subtract the 2.15 dB dipole reference from nonzero antenna gains.
    ///
    /// Deployment-dependent: some installations quote gains in dBi while
    /// the engine expects dBd.
    pub dipole_offset: bool,
}

impl ParamBuilder {
    pub fn new(dipole_offset: bool) -> Self {
        Self { dipole_offset }
    }

    /// Antenna gain after the optional dBi→dBd correction.
    ///
    /// A zero gain stays zero: the offset models a real antenna, not the
    /// absence of one.
    pub fn effective_gain(&self, gain_db: f64) -> f64 {
        if self.dipole_offset && gain_db != 0.0 {
            gain_db - 2.15
        } else {
            gain_db
        }
    }

    /// Site file: name, latitude, west-positive longitude, height.
    pub fn qth_file(&self, name: &str, lat: f64, lon: f64, height_m: f64) -> String {
        // The engine expects west longitude as a positive number.
        let engine_lon = if lon < 0.0 { -lon } else { 360.0 - lon };
        format!("{}\n{:.6}\n{:.6}\n{:.2}m\n", name, lat, engine_lon, height_m)
    }

    /// Model parameter file, nine lines with trailing inline comments.
    pub fn lrp_file(&self, p: &ModelParameters) -> String {
        let erp = erp_watts(
            p.tx_power_dbm,
            self.effective_gain(p.tx_gain_db),
            p.tx_loss_db,
        );
        tracing::debug!(erp_watts = erp, "rendering model parameter file");

        format!(
            "{:.3}  ; Earth Dielectric Constant\n\
             {:.6}  ; Earth Conductivity\n\
             {:.3}  ; Atmospheric Bending Constant\n\
             {:.3}  ; Frequency in MHz\n\
             {}  ; Radio Climate\n\
             {}  ; Polarization\n\
             {:.2} ; Fraction of situations\n\
             {:.2}  ; Fraction of time\n\
             {:.2}  ; ERP in Watts\n",
            p.ground_dielectric,
            p.ground_conductivity,
            p.atmosphere_bending,
            p.frequency_mhz,
            p.radio_climate.code(),
            p.polarization.code(),
            p.situation_fraction / 100.0,
            p.time_fraction / 100.0,
            erp,
        )
    }

    /// Color definition file: 2-line banner plus 32 threshold rows sampled
    /// evenly from `max_dbm` down to `min_dbm`.
    pub fn dcf_file(&self, colormap: Colormap, min_dbm: f64, max_dbm: f64) -> String {
        let mut contents = String::from(
            "; SignalPath auto-generated dBm signal level color definition\n\
             ; Format: dBm: red, green, blue\n",
        );

        const LEVELS: usize = 32;
        for i in 0..LEVELS {
            let t = i as f64 / (LEVELS - 1) as f64;
            let value = max_dbm + t * (min_dbm - max_dbm);
            let [r, g, b] = colormap.sample_range(value, min_dbm, max_dbm);
            contents.push_str(&format!(
                "{:+4}: {:>3}, {:>3}, {:>3}\n",
                value as i32, r, g, b
            ));
        }
        contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn climate_codes_match_engine_enumeration() {
        assert_eq!(RadioClimate::Equatorial.code(), 1);
        assert_eq!(RadioClimate::ContinentalTemperate.code(), 5);
        assert_eq!(RadioClimate::MaritimeTemperateSea.code(), 7);
    }

    #[test]
    fn polarization_codes() {
        assert_eq!(Polarization::Horizontal.code(), 0);
        assert_eq!(Polarization::Vertical.code(), 1);
    }

    #[test]
    fn erp_reference_point() {
        // 30 dBm with no gain or loss is exactly one watt.
        assert!((erp_watts(30.0, 0.0, 0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn erp_monotonicity() {
        let base = erp_watts(27.0, 2.0, 1.0);
        assert!(erp_watts(28.0, 2.0, 1.0) > base);
        assert!(erp_watts(27.0, 3.0, 1.0) > base);
        assert!(erp_watts(27.0, 2.0, 2.0) < base);
    }

    #[test]
    fn qth_west_longitude_stays_positive() {
        let b = ParamBuilder::default();
        let qth = b.qth_file("tx", 51.44, -0.89, 10.0);
        assert_eq!(qth, "tx\n51.440000\n0.890000\n10.00m\n");
    }

    #[test]
    fn qth_east_longitude_wraps_from_360() {
        let b = ParamBuilder::default();
        let qth = b.qth_file("rx", 45.84356, 13.73427, 2.0);
        let lines: Vec<&str> = qth.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "rx");
        assert_eq!(lines[2], "346.265730");
        assert_eq!(lines[3], "2.00m");
    }

    #[test]
    fn lrp_has_nine_commented_lines_in_order() {
        let b = ParamBuilder::default();
        let lrp = b.lrp_file(&ModelParameters {
            ground_dielectric: 15.0,
            ground_conductivity: 0.005,
            atmosphere_bending: 301.0,
            frequency_mhz: 868.5,
            radio_climate: RadioClimate::ContinentalTemperate,
            polarization: Polarization::Vertical,
            situation_fraction: 95.0,
            time_fraction: 90.0,
            tx_power_dbm: 30.0,
            tx_gain_db: 0.0,
            tx_loss_db: 0.0,
        });

        let lines: Vec<&str> = lrp.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "15.000  ; Earth Dielectric Constant");
        assert_eq!(lines[1], "0.005000  ; Earth Conductivity");
        assert_eq!(lines[2], "301.000  ; Atmospheric Bending Constant");
        assert_eq!(lines[3], "868.500  ; Frequency in MHz");
        assert_eq!(lines[4], "5  ; Radio Climate");
        assert_eq!(lines[5], "1  ; Polarization");
        assert_eq!(lines[6], "0.95 ; Fraction of situations");
        assert_eq!(lines[7], "0.90  ; Fraction of time");
        assert_eq!(lines[8], "1.00  ; ERP in Watts");
    }

    #[test]
    fn dipole_offset_applies_only_to_nonzero_gain() {
        let b = ParamBuilder::new(true);
        assert!((b.effective_gain(5.0) - 2.85).abs() < 1e-9);
        assert_eq!(b.effective_gain(0.0), 0.0);

        let plain = ParamBuilder::new(false);
        assert_eq!(plain.effective_gain(5.0), 5.0);
    }

    #[test]
    fn dcf_emits_banner_and_32_levels() {
        let b = ParamBuilder::default();
        let dcf = b.dcf_file(Colormap::CmrMap, -130.0, -80.0);
        let lines: Vec<&str> = dcf.lines().collect();

        assert_eq!(lines.len(), 34);
        assert!(lines[0].starts_with(';'));
        assert!(lines[1].starts_with(';'));
        // First level is the maximum, last is the minimum.
        assert!(lines[2].starts_with(" -80:"));
        assert!(lines[33].starts_with("-130:"));
    }

    #[test]
    fn dcf_rows_are_parseable_thresholds() {
        let b = ParamBuilder::default();
        let dcf = b.dcf_file(Colormap::Viridis, -120.0, -60.0);
        for line in dcf.lines().skip(2) {
            let (level, rgb) = line.split_once(':').unwrap();
            let level: i32 = level.trim().parse().unwrap();
            assert!((-120..=-60).contains(&level));
            let channels: Vec<u8> = rgb
                .split(',')
                .map(|c| c.trim().parse().unwrap())
                .collect();
            assert_eq!(channels.len(), 3);
        }
    }
}
