//! Built-in signal-level colormaps.
//!
//! Each colormap is a table of evenly spaced RGB anchors sampled with
//! linear interpolation. The anchor tables match the ramps the coverage
//! tooling has always used, so legends rendered from the same name stay
//! consistent across the color file, the raster palette, and the frontend.

use std::fmt;
use std::str::FromStr;

/// A named colormap sampled over `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    CmrMap,
    Viridis,
    Plasma,
    Jet,
}

/// Error for unknown colormap names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown colormap '{0}'")]
pub struct UnknownColormap(pub String);

/// Evenly spaced RGB anchors, 0.0–1.0 per channel.
type Anchors = &'static [[f64; 3]];

const CMRMAP: Anchors = &[
    [0.00, 0.00, 0.00],
    [0.15, 0.15, 0.50],
    [0.30, 0.15, 0.75],
    [0.60, 0.20, 0.50],
    [1.00, 0.25, 0.15],
    [0.90, 0.50, 0.00],
    [0.90, 0.75, 0.10],
    [0.90, 0.90, 0.50],
    [1.00, 1.00, 1.00],
];

const VIRIDIS: Anchors = &[
    [0.267, 0.005, 0.329],
    [0.283, 0.131, 0.449],
    [0.262, 0.242, 0.521],
    [0.220, 0.343, 0.549],
    [0.177, 0.438, 0.558],
    [0.143, 0.523, 0.556],
    [0.120, 0.607, 0.540],
    [0.166, 0.690, 0.496],
    [0.320, 0.771, 0.411],
    [0.526, 0.833, 0.288],
    [0.762, 0.876, 0.137],
    [0.993, 0.906, 0.144],
];

const PLASMA: Anchors = &[
    [0.050, 0.030, 0.528],
    [0.255, 0.014, 0.615],
    [0.417, 0.001, 0.658],
    [0.562, 0.052, 0.641],
    [0.693, 0.165, 0.564],
    [0.798, 0.280, 0.470],
    [0.881, 0.392, 0.383],
    [0.949, 0.517, 0.295],
    [0.988, 0.652, 0.211],
    [0.988, 0.809, 0.145],
    [0.940, 0.975, 0.131],
];

const JET: Anchors = &[
    [0.000, 0.000, 0.500],
    [0.000, 0.000, 1.000],
    [0.000, 0.500, 1.000],
    [0.000, 1.000, 1.000],
    [0.500, 1.000, 0.500],
    [1.000, 1.000, 0.000],
    [1.000, 0.500, 0.000],
    [1.000, 0.000, 0.000],
    [0.500, 0.000, 0.000],
];

impl Colormap {
    fn anchors(&self) -> Anchors {
        match self {
            Colormap::CmrMap => CMRMAP,
            Colormap::Viridis => VIRIDIS,
            Colormap::Plasma => PLASMA,
            Colormap::Jet => JET,
        }
    }

    /// Samples the colormap at `t` (clamped to `[0.0, 1.0]`).
    pub fn sample(&self, t: f64) -> [u8; 3] {
        let anchors = self.anchors();
        let t = t.clamp(0.0, 1.0);
        let pos = t * (anchors.len() - 1) as f64;
        let idx = (pos.floor() as usize).min(anchors.len() - 2);
        let frac = pos - idx as f64;

        let lo = anchors[idx];
        let hi = anchors[idx + 1];
        let mut rgb = [0u8; 3];
        for (c, channel) in rgb.iter_mut().enumerate() {
            let v = lo[c] + (hi[c] - lo[c]) * frac;
            *channel = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        rgb
    }

    /// Samples the colormap for a physical value within `[min, max]`.
    pub fn sample_range(&self, value: f64, min: f64, max: f64) -> [u8; 3] {
        let t = if (max - min).abs() < f64::EPSILON {
            0.0
        } else {
            (value - min) / (max - min)
        };
        self.sample(t)
    }
}

impl FromStr for Colormap {
    type Err = UnknownColormap;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "cmrmap" => Ok(Colormap::CmrMap),
            "viridis" => Ok(Colormap::Viridis),
            "plasma" => Ok(Colormap::Plasma),
            "jet" => Ok(Colormap::Jet),
            _ => Err(UnknownColormap(name.to_string())),
        }
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Colormap::CmrMap => "CMRmap",
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
            Colormap::Jet => "jet",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names_case_insensitively() {
        assert_eq!("CMRmap".parse::<Colormap>().unwrap(), Colormap::CmrMap);
        assert_eq!("viridis".parse::<Colormap>().unwrap(), Colormap::Viridis);
        assert_eq!("JET".parse::<Colormap>().unwrap(), Colormap::Jet);
    }

    #[test]
    fn rejects_unknown_name() {
        let err = "sunset".parse::<Colormap>().unwrap_err();
        assert_eq!(err, UnknownColormap("sunset".to_string()));
    }

    #[test]
    fn cmrmap_endpoints() {
        assert_eq!(Colormap::CmrMap.sample(0.0), [0, 0, 0]);
        assert_eq!(Colormap::CmrMap.sample(1.0), [255, 255, 255]);
    }

    #[test]
    fn sample_clamps_out_of_range_inputs() {
        let map = Colormap::Viridis;
        assert_eq!(map.sample(-2.0), map.sample(0.0));
        assert_eq!(map.sample(3.0), map.sample(1.0));
    }

    #[test]
    fn sample_interpolates_between_anchors() {
        // Halfway between jet's first two anchors: (0,0,0.5) and (0,0,1).
        let n = JET.len() - 1;
        let t = 0.5 / n as f64;
        let [r, g, b] = Colormap::Jet.sample(t);
        assert_eq!((r, g), (0, 0));
        assert!((b as i32 - 191).abs() <= 1, "expected ~191, got {}", b);
    }

    #[test]
    fn sample_range_maps_min_and_max() {
        let map = Colormap::CmrMap;
        assert_eq!(map.sample_range(-130.0, -130.0, -80.0), map.sample(0.0));
        assert_eq!(map.sample_range(-80.0, -130.0, -80.0), map.sample(1.0));
    }

    #[test]
    fn sample_range_degenerate_span_is_stable() {
        let map = Colormap::Plasma;
        assert_eq!(map.sample_range(-100.0, -100.0, -100.0), map.sample(0.0));
    }
}
