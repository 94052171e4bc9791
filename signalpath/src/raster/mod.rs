//! Coverage raster synthesis.
//!
//! The engine emits its coverage map as an indexed PPM plus a KML wrapper
//! carrying the geographic bounding box. This module folds the two into a
//! single palettized GeoTIFF in EPSG:4326, with index 255 reserved as the
//! transparent no-data value, and converts the engine's color-key image
//! into a PNG legend.

use std::io::Cursor;

use image::ImageFormat;
use regex::Regex;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use crate::colormap::Colormap;

/// Palette index reserved for no-data pixels.
const NODATA_INDEX: u8 = 255;

/// GeoTIFF private tags (GeoTIFF 1.1 / GDAL conventions).
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

/// Errors from raster synthesis.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("image decode/encode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("GeoTIFF encoding failed: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("KML is missing a complete LatLonBox bounding box")]
    MissingBoundingBox,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Geographic extent of a coverage raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Extracts the `LatLonBox` bounds from the engine's KML wrapper.
pub fn bounding_box_from_kml(kml: &str) -> Result<BoundingBox, RasterError> {
    let edge = |name: &str| -> Option<f64> {
        // The wrapper is machine-generated with plain element names, so a
        // targeted pattern beats pulling in an XML parser.
        let re = Regex::new(&format!(r"<{name}>\s*([-+0-9.eE]+)\s*</{name}>")).ok()?;
        re.captures(kml)?.get(1)?.as_str().parse().ok()
    };

    match (edge("north"), edge("south"), edge("east"), edge("west")) {
        (Some(north), Some(south), Some(east), Some(west)) => Ok(BoundingBox {
            north,
            south,
            east,
            west,
        }),
        _ => Err(RasterError::MissingBoundingBox),
    }
}

/// Builds the 256-entry palette: indices 0..=254 sweep the colormap from
/// `min_dbm` to `max_dbm`, index 255 is the no-data entry.
fn build_palette(colormap: Colormap, min_dbm: f64, max_dbm: f64) -> Vec<[u8; 3]> {
    let mut palette = Vec::with_capacity(256);
    for i in 0..255u16 {
        let value = min_dbm + (max_dbm - min_dbm) * (f64::from(i) / 254.0);
        palette.push(colormap.sample_range(value, min_dbm, max_dbm));
    }
    palette.push([0, 0, 0]);
    palette
}

/// Folds the engine's PPM coverage map and KML bounds into a palettized,
/// georeferenced TIFF.
///
/// The raster is written as a single 8-bit band with an attached RGB
/// palette; viewers that honor the GDAL no-data tag render index 255
/// transparent.
pub fn synthesize_geotiff(
    ppm: &[u8],
    kml: &str,
    colormap: Colormap,
    min_dbm: f64,
    max_dbm: f64,
) -> Result<Vec<u8>, RasterError> {
    let bounds = bounding_box_from_kml(kml)?;
    let gray = image::load_from_memory(ppm)?.to_luma8();
    let (width, height) = gray.dimensions();

    tracing::debug!(
        width,
        height,
        ?bounds,
        %colormap,
        "synthesizing coverage GeoTIFF"
    );

    let palette = build_palette(colormap, min_dbm, max_dbm);
    let mut color_table = Vec::with_capacity(3 * 256);
    for channel in 0..3 {
        for entry in &palette {
            // TIFF color tables are 16-bit per channel.
            color_table.push(u16::from(entry[channel]) * 257);
        }
    }

    let pixel_scale = [
        (bounds.east - bounds.west) / f64::from(width),
        (bounds.north - bounds.south) / f64::from(height),
        0.0,
    ];
    let tiepoint = [0.0, 0.0, 0.0, bounds.west, bounds.north, 0.0];
    // GeoTIFF 1.1 key directory: geographic model, pixel-is-area, EPSG:4326.
    let geo_keys: [u16; 16] = [
        1, 1, 0, 3, //
        1024, 0, 1, 2, //
        1025, 0, 1, 1, //
        2048, 0, 1, 4326,
    ];

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer)?;
        let mut img = encoder.new_image::<colortype::Gray8>(width, height)?;
        img.encoder()
            .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &pixel_scale[..])?;
        img.encoder()
            .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tiepoint[..])?;
        img.encoder()
            .write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), &geo_keys[..])?;
        img.encoder()
            .write_tag(Tag::Unknown(TAG_GDAL_NODATA), "255")?;
        img.encoder().write_tag(Tag::ColorMap, &color_table[..])?;
        // Overrides the Gray8 default so viewers use the palette.
        img.encoder()
            .write_tag(Tag::PhotometricInterpretation, 3u16)?;
        img.write_data(gray.as_raw())?;
    }

    Ok(buffer.into_inner())
}

/// Converts the engine's color-key image into a PNG legend.
pub fn legend_png(key_ppm: &[u8]) -> Result<Vec<u8>, RasterError> {
    let img = image::load_from_memory(key_ppm)?;
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
