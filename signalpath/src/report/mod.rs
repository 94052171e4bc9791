//! Engine output parsing.
//!
//! The engine reports results as human-readable text and gnuplot-style
//! graph data. Parsing is anchor-based: each quantity is located by a
//! literal phrase the engine has emitted verbatim across releases, then
//! extracted from a fixed token position with a scan-from-the-end fallback
//! for layout drift. Absence of an anchor is not an error; missing values
//! stay `None` and obstruction flags keep their pessimistic defaults.

use serde::Serialize;

const NO_LOS: &str = "No obstructions to LOS path due to terrain were detected by SPLAT!";
const FIRST_FRESNEL_CLEAR: &str = "The first Fresnel zone is clear.";
const FRESNEL_60_CLEAR: &str = "60% of the first Fresnel zone is clear.";
const OBSTRUCTION_HEADER: &str = "Between rx and tx, SPLAT! detected obstructions at:";
const CLEAR_ALL: &str = "to clear all obstructions detected by SPLAT!";
const CLEAR_FIRST_FRESNEL: &str = "to clear the first Fresnel zone.";
const CLEAR_FRESNEL_60: &str = "to clear 60% of the first Fresnel zone.";

const SIGNAL_POWER: (&str, usize) = ("Signal power level at rx:", 5);
const FREE_SPACE_LOSS: (&str, usize) = ("Free space path loss:", 4);
const LONGLEY_RICE_LOSS: (&str, usize) = ("Longley-Rice path loss:", 3);
const ITWOM_LOSS: (&str, usize) = ("ITWOM Version 3.0 path loss:", 5);
const DISTANCE: (&str, usize) = ("Distance to rx:", 3);

/// A parsed gnuplot-style data series: distance along the path and the
/// plotted quantity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// One terrain obstruction along the path, in geodetic coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obstruction {
    pub lat: f64,
    pub lon: f64,
    /// Distance from the transmitter in kilometers, when reported.
    pub distance_km: Option<f64>,
    /// Obstruction height above ground level in meters, when reported.
    pub height_m: Option<f64>,
}

/// Everything extracted from the point-to-point text report.
///
/// Obstruction flags default to `true`: a report that never mentions a
/// clear path is treated as obstructed.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub path_obstructed: bool,
    pub path_message: String,
    pub obstructions: Vec<Obstruction>,
    pub first_fresnel_obstructed: bool,
    pub first_fresnel_message: String,
    pub fresnel_60_obstructed: bool,
    pub fresnel_60_message: String,
    pub rx_signal_power_dbm: Option<f64>,
    pub free_space_path_loss_db: Option<f64>,
    /// Which propagation model produced `model_loss_db`.
    pub model_loss_label: String,
    pub model_loss_db: Option<f64>,
    pub distance_km: Option<f64>,
}

impl Default for LinkReport {
    fn default() -> Self {
        Self {
            path_obstructed: true,
            path_message: String::new(),
            obstructions: Vec::new(),
            first_fresnel_obstructed: true,
            first_fresnel_message: String::new(),
            fresnel_60_obstructed: true,
            fresnel_60_message: String::new(),
            rx_signal_power_dbm: None,
            free_space_path_loss_db: None,
            model_loss_label: String::new(),
            model_loss_db: None,
            distance_km: None,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Parses a whitespace-delimited float at a fixed token index.
fn extract_at(line: &str, idx: usize) -> Option<f64> {
    let token = line.split_whitespace().nth(idx)?;
    token.parse::<f64>().ok().map(round2)
}

/// Fallback: the last parseable float on the line.
fn extract_last(line: &str) -> Option<f64> {
    line.split_whitespace()
        .rev()
        .find_map(|token| token.parse::<f64>().ok())
        .map(round2)
}

fn extract_anchored(line: &str, anchor: (&str, usize)) -> Option<f64> {
    extract_at(line, anchor.1).or_else(|| extract_last(line))
}

/// The engine counts longitude positive-west; reports carry that raw value.
fn correct_longitude(west_positive: f64) -> f64 {
    if west_positive > 180.0 {
        round2(360.0 - west_positive)
    } else {
        -west_positive
    }
}

/// Parses tab-separated graph data lines into a [`Series`].
///
/// Malformed lines are logged and skipped; the engine occasionally writes
/// stray header or blank lines into its graph files.
pub fn parse_series(data: &str, label: &str) -> Series {
    let mut series = Series::default();
    for line in data.lines() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let parsed = match (fields.next(), fields.next()) {
            (Some(x), Some(y)) => x.trim().parse::<f64>().ok().zip(y.trim().parse::<f64>().ok()),
            _ => None,
        };
        match parsed {
            Some((x, y)) => {
                series.x.push(x);
                series.y.push(y);
            }
            None => tracing::warn!(label, line, "skipping invalid graph data line"),
        }
    }
    series
}

/// Parses an obstruction row: comma-separated fields, each leading with a
/// numeric value (`45.843558 N, 346.265730 W, 0.47 kilometers, ...`).
fn parse_obstruction_row(line: &str) -> Option<Obstruction> {
    let values: Vec<f64> = line
        .split(", ")
        .filter_map(|field| field.trim().split(' ').next())
        .filter_map(|token| token.parse::<f64>().ok())
        .map(round2)
        .collect();

    if values.len() < 2 {
        return None;
    }
    Some(Obstruction {
        lat: values[0],
        lon: correct_longitude(values[1]),
        distance_km: values.get(2).copied(),
        height_m: values.get(3).copied(),
    })
}

/// Parses the full point-to-point text report.
pub fn parse_link_report(report: &str) -> LinkReport {
    let lines: Vec<&str> = report.lines().collect();
    let mut out = LinkReport::default();

    // Antenna-raise advice wraps onto the line before its anchor phrase.
    let joined_message = |i: usize| -> String {
        if i > 0 {
            format!("{} {}", lines[i - 1].trim(), lines[i].trim())
        } else {
            lines[i].trim().to_string()
        }
    };

    for (i, line) in lines.iter().enumerate() {
        if line.contains(NO_LOS) {
            out.path_obstructed = false;
        } else if line.contains(FIRST_FRESNEL_CLEAR) {
            out.first_fresnel_obstructed = false;
        } else if line.contains(FRESNEL_60_CLEAR) {
            out.fresnel_60_obstructed = false;
        }

        if line.contains(OBSTRUCTION_HEADER) {
            // Header, blank line, then one obstruction per line.
            let mut j = i + 2;
            while j < lines.len() && !lines[j].trim().is_empty() {
                if let Some(obstruction) = parse_obstruction_row(lines[j].trim()) {
                    out.obstructions.push(obstruction);
                }
                j += 1;
            }
        }

        if line.contains(CLEAR_ALL) {
            out.path_message = joined_message(i);
        } else if line.contains(CLEAR_FIRST_FRESNEL) {
            out.first_fresnel_message = joined_message(i);
        } else if line.contains(CLEAR_FRESNEL_60) {
            out.fresnel_60_message = joined_message(i);
        }

        if line.contains(SIGNAL_POWER.0) {
            out.rx_signal_power_dbm = extract_anchored(line, SIGNAL_POWER);
        }
        if line.contains(FREE_SPACE_LOSS.0) {
            out.free_space_path_loss_db = extract_anchored(line, FREE_SPACE_LOSS);
        }
        if line.contains(LONGLEY_RICE_LOSS.0) {
            if let Some(v) = extract_at(line, LONGLEY_RICE_LOSS.1) {
                out.model_loss_label = "Longley-Rice path loss".to_string();
                out.model_loss_db = Some(v);
            }
        }
        if line.contains(ITWOM_LOSS.0) {
            if let Some(v) = extract_at(line, ITWOM_LOSS.1) {
                out.model_loss_label = "ITWOM Version 3.0 path loss".to_string();
                out.model_loss_db = Some(v);
            }
        }
        if line.contains(DISTANCE.0) {
            if let Some(v) = extract_at(line, DISTANCE.1) {
                out.distance_km = Some(v);
            }
        }
    }

    out
}
