//! RF propagation prediction around an external terrain-diffraction engine.
//!
//! The engine itself is a pair of external executables; this crate supplies
//! everything around them: terrain tile resolution and caching, parameter
//! file generation, subprocess control, report parsing, asynchronous job
//! tracking, and coverage raster synthesis.
//!
//! # Architecture
//!
//! - [`tiles`] — which 1°×1° terrain cells a prediction needs
//! - [`cache`] — getting those cells onto disk in the engine's format
//! - [`params`] — the engine's fixed-format input files
//! - [`engine`] — binary discovery and subprocess execution
//! - [`report`] — anchor-based parsing of the engine's text output
//! - [`raster`] — coverage PPM + KML into a palettized GeoTIFF
//! - [`predict`] — orchestration of a full prediction
//! - [`jobs`] — task ids and poll-until-done state tracking

pub mod cache;
pub mod colormap;
pub mod engine;
pub mod jobs;
pub mod params;
pub mod predict;
pub mod raster;
pub mod report;
pub mod request;
pub mod tiles;
