//! Terrain tile identity and naming.
//!
//! A terrain tile is a 1°×1° cell of digital elevation data, identified by
//! the integer coordinates of its southwest corner. Two naming conventions
//! apply to the same cell:
//!
//! - the elevation source convention, `{N|S}DD{E|W}DDD.hgt.gz`
//! - the propagation engine's convention,
//!   `{latStart}:{latEnd}:{lonStart}:{lonEnd}[-hd].sdf`, where west
//!   longitude is a positive value increasing eastward from the antimeridian

/// A 1°×1° terrain cell, identified by its southwest corner.
///
/// Immutable; every name the system needs is derived purely from the
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerrainTile {
    /// Latitude of the southwest corner in whole degrees.
    pub lat: i32,
    /// Longitude of the southwest corner in whole degrees.
    pub lon: i32,
}

impl TerrainTile {
    /// Returns the tile containing the given geodetic coordinate.
    pub fn containing(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.floor() as i32,
            lon: lon.floor() as i32,
        }
    }

    /// Source elevation tile name, e.g. `N45E013.hgt.gz`.
    pub fn hgt_name(&self) -> String {
        format!("{}.hgt.gz", self.base_name())
    }

    /// Decompressed elevation file name, e.g. `N45E013.hgt`.
    pub fn hgt_file_name(&self) -> String {
        format!("{}.hgt", self.base_name())
    }

    /// Hemisphere-prefixed cell name without extension, e.g. `N45E013`.
    pub fn base_name(&self) -> String {
        let ns = if self.lat >= 0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0 { 'E' } else { 'W' };
        format!("{}{:02}{}{:03}", ns, self.lat.abs(), ew, self.lon.abs())
    }

    /// Engine tile name for this cell, e.g. `45:46:346:347.sdf` or
    /// `45:46:346:347-hd.sdf` for high-resolution terrain.
    pub fn sdf_name(&self, high_resolution: bool) -> String {
        let (min_lon, max_lon) = sdf_lon_band(self.lon);
        let suffix = if high_resolution { "-hd.sdf" } else { ".sdf" };
        format!(
            "{}:{}:{}:{}{}",
            self.lat,
            self.lat + 1,
            min_lon,
            max_lon,
            suffix
        )
    }
}

/// Converts a cell longitude to the engine's west-positive longitude band.
///
/// The engine counts longitude as a positive number of degrees west of the
/// meridian, so band boundaries straddle 0/360 asymmetrically: the eastern
/// hemisphere needs an off-by-one correction, and the band adjacent to the
/// meridian wraps (`max = 0` when `min == 359`).
///
/// Accepts cell longitudes in `[-180, 179]` and returns `(min, max)` band
/// edges. Inverse of [`lon_from_band`].
pub fn sdf_lon_band(lon: i32) -> (i32, i32) {
    let min = if lon >= 0 {
        // Eastern hemisphere: cell [lon, lon+1] spans [359-lon, 360-lon] west-positive.
        359 - lon
    } else {
        -lon - 1
    };
    let max = if min == 359 { 0 } else { min + 1 };
    (min, max)
}

/// Recovers the signed cell longitude from a west-positive band minimum.
///
/// Inverse of [`sdf_lon_band`] over the whole 360-band domain.
pub fn lon_from_band(min_lon: i32) -> i32 {
    if min_lon >= 180 {
        359 - min_lon
    } else {
        -(min_lon + 1)
    }
}
