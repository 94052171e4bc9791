//! Terrain tile resolution
//!
//! Pure geometry: computes the minimal set of 1°×1° terrain tiles a
//! prediction needs, either along a point-to-point path or across a
//! coverage radius, and the filename encodings for each tile.

mod types;

pub use types::{lon_from_band, sdf_lon_band, TerrainTile};

use std::f64::consts::PI;

/// Spherical-earth radius used for the radius→degrees conversion, in meters.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Hard platform cap on the coverage radius, in meters.
pub const MAX_COVERAGE_RADIUS_M: f64 = 300_000.0;

/// Computes the tiles a straight transmitter→receiver path crosses.
///
/// Longitude is the x-axis and latitude is the y-axis. The traversal is a
/// grid DDA (the voxel ray-casting walk): step along whichever axis reaches
/// its next integer boundary first, with ties falling through to the
/// latitude step. This yields the minimal contiguous set of unit cells the
/// line crosses, in path order.
///
/// Swap-invariant as a set: `tiles_for_link(a, b)` and `tiles_for_link(b, a)`
/// cover the same cells.
pub fn tiles_for_link(tx_lat: f64, tx_lon: f64, rx_lat: f64, rx_lon: f64) -> Vec<TerrainTile> {
    let (x0, y0) = (tx_lon, tx_lat);
    let (x1, y1) = (rx_lon, rx_lat);

    let dx = x1 - x0;
    let dy = y1 - y0;

    let mut current_x = x0.floor() as i32;
    let mut current_y = y0.floor() as i32;
    let dest_x = x1.floor() as i32;
    let dest_y = y1.floor() as i32;

    let mut cells = vec![TerrainTile {
        lat: current_y,
        lon: current_x,
    }];

    // Parametric time to cross one cell on each axis; degenerate axes never
    // win the comparison below.
    let t_delta_x = if dx != 0.0 { (1.0 / dx).abs() } else { f64::INFINITY };
    let t_delta_y = if dy != 0.0 { (1.0 / dy).abs() } else { f64::INFINITY };

    let (step_x, mut t_max_x) = if dx > 0.0 {
        (1, ((current_x + 1) as f64 - x0) / dx)
    } else if dx < 0.0 {
        (-1, (x0 - current_x as f64) / -dx)
    } else {
        (0, f64::INFINITY)
    };

    let (step_y, mut t_max_y) = if dy > 0.0 {
        (1, ((current_y + 1) as f64 - y0) / dy)
    } else if dy < 0.0 {
        (-1, (y0 - current_y as f64) / -dy)
    } else {
        (0, f64::INFINITY)
    };

    while (current_x, current_y) != (dest_x, dest_y) {
        if t_max_x < t_max_y {
            current_x += step_x;
            t_max_x += t_delta_x;
        } else {
            current_y += step_y;
            t_max_y += t_delta_y;
        }
        cells.push(TerrainTile {
            lat: current_y,
            lon: current_x,
        });
    }

    tracing::debug!(count = cells.len(), "resolved terrain tiles for link path");
    cells
}

/// Computes the tiles covering a circle of `radius_m` meters around a point.
///
/// The radius is converted to an angular delta on a spherical earth, the
/// longitude delta is widened by `1/cos(latitude)`, and every 1° cell in the
/// resulting bounding box is enumerated. Radii beyond
/// [`MAX_COVERAGE_RADIUS_M`] are clamped, never rejected.
pub fn tiles_for_area(lat: f64, lon: f64, radius_m: f64) -> Vec<TerrainTile> {
    let radius_m = if radius_m > MAX_COVERAGE_RADIUS_M {
        tracing::warn!(
            requested_m = radius_m,
            clamped_m = MAX_COVERAGE_RADIUS_M,
            "coverage radius exceeds platform maximum, clamping"
        );
        MAX_COVERAGE_RADIUS_M
    } else {
        radius_m
    };

    let delta_deg = (radius_m / EARTH_RADIUS_M) * (180.0 / PI);

    let lat_min = lat - delta_deg;
    let lat_max = lat + delta_deg;
    // Near the poles 1/cos(lat) blows up; past 180° of longitude the circle
    // has wrapped the whole band, so the correction is capped there.
    let lon_delta = (delta_deg / lat.to_radians().cos()).abs().min(180.0);
    let lon_min = lon - lon_delta;
    let lon_max = lon + lon_delta;

    // Enumerated cells stay within the valid 1° grid: lat cells S90..N89,
    // lon cells W180..E179.
    let lat_min_tile = lat_min.floor().max(-90.0) as i32;
    let lat_max_tile = lat_max.floor().min(89.0) as i32;
    let lon_min_tile = lon_min.floor().max(-180.0) as i32;
    let lon_max_tile = lon_max.floor().min(179.0) as i32;

    let mut tiles = Vec::new();
    for lat_tile in lat_min_tile..=lat_max_tile {
        for lon_tile in lon_min_tile..=lon_max_tile {
            tiles.push(TerrainTile {
                lat: lat_tile,
                lon: lon_tile,
            });
        }
    }

    tracing::debug!(count = tiles.len(), "resolved terrain tiles for coverage area");
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn single_cell_link() {
        // Both endpoints inside N45E013.
        let tiles = tiles_for_link(45.84356, 13.73427, 45.85474, 13.72615);
        assert_eq!(tiles, vec![TerrainTile { lat: 45, lon: 13 }]);
    }

    #[test]
    fn link_crossing_one_lon_boundary() {
        let tiles = tiles_for_link(45.5, 13.9, 45.5, 14.1);
        assert_eq!(
            tiles,
            vec![
                TerrainTile { lat: 45, lon: 13 },
                TerrainTile { lat: 45, lon: 14 },
            ]
        );
    }

    #[test]
    fn vertical_link_does_not_divide_by_zero() {
        // dx == 0: the DDA must use an infinite step threshold on x.
        let tiles = tiles_for_link(45.5, 13.5, 48.5, 13.5);
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|t| t.lon == 13));
    }

    #[test]
    fn horizontal_link_does_not_divide_by_zero() {
        let tiles = tiles_for_link(45.5, 10.5, 45.5, 13.5);
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|t| t.lat == 45));
    }

    #[test]
    fn diagonal_link_is_contiguous() {
        let tiles = tiles_for_link(45.2, 13.2, 47.8, 15.8);
        for pair in tiles.windows(2) {
            let dlat = (pair[1].lat - pair[0].lat).abs();
            let dlon = (pair[1].lon - pair[0].lon).abs();
            assert_eq!(dlat + dlon, 1, "non-adjacent step {:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn link_is_swap_invariant_as_set() {
        let forward: BTreeSet<_> = tiles_for_link(45.2, 13.2, 47.8, 15.8).into_iter().collect();
        let reverse: BTreeSet<_> = tiles_for_link(47.8, 15.8, 45.2, 13.2).into_iter().collect();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn link_across_prime_meridian() {
        let tiles = tiles_for_link(51.5, -0.5, 51.5, 0.5);
        assert_eq!(
            tiles,
            vec![
                TerrainTile { lat: 51, lon: -1 },
                TerrainTile { lat: 51, lon: 0 },
            ]
        );
    }

    #[test]
    fn area_single_tile_for_small_radius() {
        let tiles = tiles_for_area(45.5, 13.5, 1_000.0);
        assert_eq!(tiles, vec![TerrainTile { lat: 45, lon: 13 }]);
    }

    #[test]
    fn area_expands_with_radius() {
        // 60 km around a cell center reaches all eight neighbours.
        let tiles = tiles_for_area(45.5, 13.5, 60_000.0);
        assert_eq!(tiles.len(), 9);
        let set: BTreeSet<_> = tiles.into_iter().collect();
        for lat in 44..=46 {
            for lon in 12..=14 {
                assert!(set.contains(&TerrainTile { lat, lon }));
            }
        }
    }

    #[test]
    fn area_clamps_oversized_radius() {
        let clamped = tiles_for_area(45.5, 13.5, 10_000_000.0);
        let at_cap = tiles_for_area(45.5, 13.5, MAX_COVERAGE_RADIUS_M);
        assert_eq!(clamped, at_cap);
    }

    #[test]
    fn area_at_north_pole_is_bounded() {
        // At lat 90 the 1/cos(lat) widening is astronomically large; the
        // enumeration must cap at one full longitude band instead of
        // walking billions of cells.
        let tiles = tiles_for_area(90.0, 0.0, 1_000.0);
        assert_eq!(tiles.len(), 360);
        assert!(tiles.iter().all(|t| t.lat == 89));
        assert!(tiles.iter().all(|t| (-180..=179).contains(&t.lon)));
    }

    #[test]
    fn area_at_south_pole_is_bounded() {
        let tiles = tiles_for_area(-90.0, 0.0, 1_000.0);
        assert!(tiles.len() <= 720);
        assert!(tiles.iter().all(|t| t.lat >= -90));
        assert!(tiles.iter().all(|t| (-180..=179).contains(&t.lon)));
    }

    #[test]
    fn area_near_pole_with_max_radius_stays_in_grid() {
        let tiles = tiles_for_area(89.5, 179.5, MAX_COVERAGE_RADIUS_M);
        assert!(!tiles.is_empty());
        assert!(tiles.len() <= 4 * 360);
        assert!(tiles.iter().all(|t| t.lat <= 89 && (-180..=179).contains(&t.lon)));
    }

    #[test]
    fn area_widens_longitude_at_high_latitude() {
        // The 1/cos(lat) correction must cover more longitude bands near the
        // poles than at the equator for the same radius.
        let equator = tiles_for_area(0.5, 13.5, 120_000.0);
        let arctic = tiles_for_area(69.5, 13.5, 120_000.0);

        let lon_span = |tiles: &[TerrainTile]| {
            let min = tiles.iter().map(|t| t.lon).min().unwrap();
            let max = tiles.iter().map(|t| t.lon).max().unwrap();
            max - min
        };
        assert!(lon_span(&arctic) > lon_span(&equator));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn link_swap_invariant(
                lat_a in -59.0..59.0_f64,
                lon_a in -179.0..179.0_f64,
                dlat in -3.0..3.0_f64,
                dlon in -3.0..3.0_f64,
            ) {
                let lat_b = lat_a + dlat;
                let lon_b = lon_a + dlon;

                let forward: std::collections::BTreeSet<_> =
                    tiles_for_link(lat_a, lon_a, lat_b, lon_b).into_iter().collect();
                let reverse: std::collections::BTreeSet<_> =
                    tiles_for_link(lat_b, lon_b, lat_a, lon_a).into_iter().collect();

                prop_assert_eq!(forward, reverse);
            }

            #[test]
            fn link_has_no_duplicate_cells(
                lat_a in -59.0..59.0_f64,
                lon_a in -179.0..179.0_f64,
                dlat in -3.0..3.0_f64,
                dlon in -3.0..3.0_f64,
            ) {
                let tiles = tiles_for_link(lat_a, lon_a, lat_a + dlat, lon_a + dlon);
                let unique: std::collections::BTreeSet<_> = tiles.iter().copied().collect();
                prop_assert_eq!(unique.len(), tiles.len());
            }

            #[test]
            fn link_contains_both_endpoints(
                lat_a in -59.0..59.0_f64,
                lon_a in -179.0..179.0_f64,
                dlat in -3.0..3.0_f64,
                dlon in -3.0..3.0_f64,
            ) {
                let lat_b = lat_a + dlat;
                let lon_b = lon_a + dlon;
                let tiles = tiles_for_link(lat_a, lon_a, lat_b, lon_b);

                prop_assert!(tiles.contains(&TerrainTile::containing(lat_a, lon_a)));
                prop_assert!(tiles.contains(&TerrainTile::containing(lat_b, lon_b)));
            }

            #[test]
            fn link_steps_are_adjacent(
                lat_a in -59.0..59.0_f64,
                lon_a in -179.0..179.0_f64,
                dlat in -3.0..3.0_f64,
                dlon in -3.0..3.0_f64,
            ) {
                let tiles = tiles_for_link(lat_a, lon_a, lat_a + dlat, lon_a + dlon);
                for pair in tiles.windows(2) {
                    let dlat = (pair[1].lat - pair[0].lat).abs();
                    let dlon = (pair[1].lon - pair[0].lon).abs();
                    prop_assert_eq!(dlat + dlon, 1);
                }
            }

            #[test]
            fn area_always_contains_center(
                lat in -59.0..59.0_f64,
                lon in -179.0..179.0_f64,
                radius in 1.0..400_000.0_f64,
            ) {
                let tiles = tiles_for_area(lat, lon, radius);
                prop_assert!(tiles.contains(&TerrainTile::containing(lat, lon)));
            }
        }
    }
}
