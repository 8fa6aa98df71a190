//! Geometry measurement: human-formatted area and length.
//!
//! Pure functions over [`Feature`] geometry. Area uses the geodesic
//! formula on the WGS84 ellipsoid; length uses Haversine great-circle
//! distance.
//!
//! Unit rules: areas of at least 1 000 000 m² format as km², at least
//! 10 000 m² as hectares, smaller values as whole m². Distances of at
//! least 1000 m format as km, smaller values as whole meters.

use geo::{Distance, GeodesicArea, Haversine, HaversineLength};
use serde::{Deserialize, Serialize};

use crate::feature::{Feature, Geometry, LngLat};

/// Square meters per square kilometer.
const SQ_M_PER_SQ_KM: f64 = 1_000_000.0;
/// Square meters per hectare.
const SQ_M_PER_HECTARE: f64 = 10_000.0;
/// Meters per kilometer.
const M_PER_KM: f64 = 1000.0;

/// Derived, read-only measurement of a feature. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Formatted area for areal geometry, `None` otherwise.
    pub area: Option<String>,
    /// Formatted length for line geometry, `None` otherwise.
    pub distance: Option<String>,
}

impl Measurement {
    /// The empty measurement shown when nothing (or more than one thing)
    /// is selected.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether both fields are unset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.area.is_none() && self.distance.is_none()
    }
}

/// Compute the measurement for a single feature.
#[must_use]
pub fn measure(feature: &Feature) -> Measurement {
    let area = match &feature.geometry {
        Geometry::Polygon(rings) => Some(format_area(polygon_area(rings))),
        Geometry::MultiPolygon(polygons) => {
            Some(format_area(polygons.iter().map(|p| polygon_area(p)).sum()))
        }
        _ => None,
    };

    let distance = match &feature.geometry {
        Geometry::LineString(coords) => Some(format_distance(line_length(coords))),
        Geometry::MultiLineString(lines) => {
            Some(format_distance(lines.iter().map(|l| line_length(l)).sum()))
        }
        _ => None,
    };

    Measurement { area, distance }
}

/// Geodesic area of a polygon given as rings of lng/lat positions, in m².
///
/// Interior rings subtract from the exterior ring's area.
fn polygon_area(rings: &[Vec<LngLat>]) -> f64 {
    let Some((exterior, interiors)) = rings.split_first() else {
        return 0.0;
    };
    let polygon = geo::Polygon::new(
        to_line_string(exterior),
        interiors.iter().map(|ring| to_line_string(ring)).collect(),
    );
    polygon.geodesic_area_unsigned()
}

/// Haversine length of a run of lng/lat positions, in meters.
fn line_length(coords: &[LngLat]) -> f64 {
    to_line_string(coords).haversine_length()
}

fn to_line_string(coords: &[LngLat]) -> geo::LineString<f64> {
    coords
        .iter()
        .map(|&[lng, lat]| geo::Coord { x: lng, y: lat })
        .collect()
}

/// Format an area in m² per the documented unit rule.
#[must_use]
pub fn format_area(square_meters: f64) -> String {
    if square_meters >= SQ_M_PER_SQ_KM {
        format!("{:.2} km²", square_meters / SQ_M_PER_SQ_KM)
    } else if square_meters >= SQ_M_PER_HECTARE {
        format!("{:.2} ha", square_meters / SQ_M_PER_HECTARE)
    } else {
        format!("{} m²", square_meters.round() as i64)
    }
}

/// Format a distance in meters per the documented unit rule.
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters >= M_PER_KM {
        format!("{:.2} km", meters / M_PER_KM)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

/// Elevation profile along a line: per-vertex elevation and cumulative
/// distance from the start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationProfile {
    /// Rounded elevation in meters at each vertex; 0 where the terrain
    /// source had no answer.
    pub elevations: Vec<i32>,
    /// Cumulative distance from the start in kilometers, two decimals.
    pub distances: Vec<f64>,
}

/// Sample an elevation profile along a `LineString` feature.
///
/// `query_elevation` is the terrain lookup (lng/lat to meters); it returns
/// `None` where no terrain data is attached. Non-line features yield an
/// empty profile.
pub fn elevation_profile<F>(feature: &Feature, query_elevation: F) -> ElevationProfile
where
    F: Fn(LngLat) -> Option<f64>,
{
    let Geometry::LineString(coords) = &feature.geometry else {
        return ElevationProfile::default();
    };

    let mut profile = ElevationProfile::default();
    let mut cumulative_km = 0.0_f64;

    for (i, &coord) in coords.iter().enumerate() {
        if i > 0 {
            let prev = coords[i - 1];
            let meters = Haversine::distance(
                geo::Point::new(prev[0], prev[1]),
                geo::Point::new(coord[0], coord[1]),
            );
            cumulative_km += meters / M_PER_KM;
        }
        profile
            .elevations
            .push(query_elevation(coord).map_or(0, |e| e.round() as i32));
        profile.distances.push((cumulative_km * 100.0).round() / 100.0);
    }

    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;

    /// Side length in degrees of a square roughly `side_m` meters on each
    /// side near the equator.
    fn deg(side_m: f64) -> f64 {
        side_m / 111_319.49
    }

    fn square(side_m: f64) -> Feature {
        let d = deg(side_m);
        Feature::new(Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [d, 0.0],
            [d, d],
            [0.0, d],
            [0.0, 0.0],
        ]]))
    }

    fn line(length_m: f64) -> Feature {
        Feature::new(Geometry::LineString(vec![[0.0, 0.0], [deg(length_m), 0.0]]))
    }

    #[test]
    fn test_area_format_thresholds() {
        assert_eq!(format_area(5_000.0), "5000 m²");
        assert_eq!(format_area(9_999.0), "9999 m²");
        assert_eq!(format_area(12_000.0), "1.20 ha");
        assert_eq!(format_area(999_999.0), "100.00 ha");
        assert_eq!(format_area(2_500_000.0), "2.50 km²");
    }

    #[test]
    fn test_distance_format_thresholds() {
        assert_eq!(format_distance(500.0), "500 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1_500.0), "1.50 km");
    }

    #[test]
    fn test_small_polygon_reports_square_meters() {
        let measurement = measure(&square(70.0));
        let area = measurement.area.expect("polygon has area");
        assert!(area.ends_with(" m²"), "got {area}");
        assert!(measurement.distance.is_none());
    }

    #[test]
    fn test_hectare_polygon() {
        // ~110 m square encloses roughly 12 000 m².
        let measurement = measure(&square(109.5));
        let area = measurement.area.expect("polygon has area");
        assert!(area.ends_with(" ha"), "got {area}");
    }

    #[test]
    fn test_large_polygon_reports_square_kilometers() {
        let measurement = measure(&square(1_600.0));
        let area = measurement.area.expect("polygon has area");
        assert!(area.ends_with(" km²"), "got {area}");
    }

    #[test]
    fn test_short_line_reports_meters() {
        let measurement = measure(&line(500.0));
        let distance = measurement.distance.expect("line has length");
        assert!(distance.ends_with(" m"), "got {distance}");
        assert!(!distance.ends_with(" km"), "got {distance}");
        assert!(measurement.area.is_none());
    }

    #[test]
    fn test_long_line_reports_kilometers() {
        let measurement = measure(&line(1_500.0));
        let distance = measurement.distance.expect("line has length");
        assert!(distance.ends_with(" km"), "got {distance}");
    }

    #[test]
    fn test_point_measures_nothing() {
        let feature = Feature::new(Geometry::Point([0.0, 0.0]));
        assert!(measure(&feature).is_empty());
    }

    #[test]
    fn test_elevation_profile_samples_vertices() {
        let feature = Feature::new(Geometry::LineString(vec![
            [0.0, 0.0],
            [deg(1000.0), 0.0],
            [deg(2000.0), 0.0],
        ]));

        let profile = elevation_profile(&feature, |coord| Some(coord[0] * 1000.0 + 10.4));
        assert_eq!(profile.elevations.len(), 3);
        assert_eq!(profile.distances.len(), 3);
        assert!((profile.distances[0]).abs() < f64::EPSILON);
        assert!(profile.distances[2] > profile.distances[1]);
        assert_eq!(profile.elevations[0], 10);
    }

    #[test]
    fn test_elevation_profile_without_terrain() {
        let feature = Feature::new(Geometry::LineString(vec![[0.0, 0.0], [1.0, 0.0]]));
        let profile = elevation_profile(&feature, |_| None);
        assert_eq!(profile.elevations, vec![0, 0]);
    }

    #[test]
    fn test_elevation_profile_ignores_polygons() {
        let profile = elevation_profile(&square(100.0), |_| Some(5.0));
        assert!(profile.elevations.is_empty());
    }
}
