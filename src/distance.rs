// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Mean radius of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6371.0088;

/// Calculates the great-circle distance between two lat-lon positions
/// using the [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
/// Returns the result in kilometers.
///
/// Edge costs are this distance divided by the edge weight, and the search
/// heuristic is this distance to the goal.
pub fn earth_distance(lat1: f32, lon1: f32, lat2: f32, lon2: f32) -> f32 {
    let (lat1, lon1) = ((lat1 as f64).to_radians(), (lon1 as f64).to_radians());
    let (lat2, lon2) = ((lat2 as f64).to_radians(), (lon2 as f64).to_radians());

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();
    let h = sin_dlat_half.powi(2) + lat1.cos() * lat2.cos() * sin_dlon_half.powi(2);

    (2.0 * EARTH_RADIUS * h.sqrt().min(1.0).asin()) as f32
}

#[cfg(test)]
mod tests {
    use super::earth_distance;

    #[test]
    fn zero_distance() {
        assert_eq!(earth_distance(52.23, 21.01, 52.23, 21.01), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = earth_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.195).abs() < 0.01, "{d}");
    }

    #[test]
    fn symmetric() {
        let a = earth_distance(53.7926, 21.5732, 53.7991, 21.5726);
        let b = earth_distance(53.7991, 21.5726, 53.7926, 21.5732);
        assert_eq!(a, b);
    }
}
