// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::f64::consts::PI;

/// Zoom level of tiles requested while searching.
pub const DEFAULT_ZOOM: u8 = 15;

/// Identifier of a [slippy map tile](https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames)
/// in the Web Mercator projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    /// Returns the tile at the given zoom level which contains the provided position.
    /// Positions outside of the projection's bounds are clamped to the edge tiles.
    pub fn containing(lat: f32, lon: f32, zoom: u8) -> Self {
        let n = tiles_for_zoom(zoom);
        let lat = (lat as f64).to_radians();

        let x = (lon as f64 + 180.0) / 360.0;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;

        Self {
            zoom,
            x: to_index(x * n, n),
            y: to_index(y * n, n),
        }
    }

    /// Returns the boundary of this tile as `[left, bottom, right, top]`
    /// (min lon, min lat, max lon, max lat).
    pub fn bbox(&self) -> [f32; 4] {
        let n = tiles_for_zoom(self.zoom);
        let left = self.x as f64 * 360.0 / n - 180.0;
        let right = left + 360.0 / n;
        let top = mercator_to_lat(PI * (1.0 - 2.0 * self.y as f64 / n));
        let bottom = mercator_to_lat(PI * (1.0 - 2.0 * (self.y as f64 + 1.0) / n));
        [left as f32, bottom as f32, right as f32, top as f32]
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{},{}", self.zoom, self.x, self.y)
    }
}

#[inline]
fn tiles_for_zoom(zoom: u8) -> f64 {
    2.0_f64.powi(zoom as i32)
}

#[inline]
fn to_index(v: f64, n: f64) -> u32 {
    if v.is_nan() {
        0
    } else {
        v.clamp(0.0, n - 1.0) as u32
    }
}

#[inline]
fn mercator_to_lat(v: f64) -> f64 {
    v.sinh().atan().to_degrees()
}
