//! File import: KML, GPX and GeoJSON into one feature collection.
//!
//! Whatever the source format, the result is the editor's
//! [`FeatureCollection`]; feature IDs are always freshly assigned. A parse
//! failure aborts the whole import — no partial feature insertion.

use geojson::GeoJson;
use mapfy_core::{Feature, FeatureCollection, Geometry, LngLat};

use crate::error::{FormatError, FormatResult};

/// Source formats accepted by the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// GeoJSON (`.json` / `.geojson`).
    GeoJson,
    /// Keyhole Markup Language (`.kml`).
    Kml,
    /// GPS Exchange (`.gpx`).
    Gpx,
}

impl ImportFormat {
    /// Determine the format from a file name's extension.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Unsupported`] for anything but
    /// `.kml`, `.gpx`, `.json`, `.geojson`.
    pub fn from_file_name(file_name: &str) -> FormatResult<Self> {
        let extension = file_name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != file_name)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" | "geojson" => Ok(Self::GeoJson),
            "kml" => Ok(Self::Kml),
            "gpx" => Ok(Self::Gpx),
            other => Err(FormatError::Unsupported(other.to_string())),
        }
    }
}

/// Parse an imported file into a feature collection, dispatching on the
/// file extension.
///
/// # Errors
///
/// Returns [`FormatError::Unsupported`] for unknown extensions and
/// [`FormatError::Parse`]/[`FormatError::Invalid`] for malformed content.
pub fn import(file_name: &str, content: &str) -> FormatResult<FeatureCollection> {
    match ImportFormat::from_file_name(file_name)? {
        ImportFormat::GeoJson => import_geojson(content),
        ImportFormat::Kml => import_kml(content),
        ImportFormat::Gpx => import_gpx(content),
    }
}

/// Parse GeoJSON text. The top level must be a `Feature` or a
/// `FeatureCollection`.
///
/// # Errors
///
/// Returns [`FormatError::Parse`] for malformed JSON and
/// [`FormatError::Invalid`] for other GeoJSON top-level types.
pub fn import_geojson(content: &str) -> FormatResult<FeatureCollection> {
    let parsed: GeoJson = content
        .parse()
        .map_err(|e| FormatError::Parse(format!("{e}")))?;

    let features = match parsed {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(FormatError::Invalid {
                format: "GeoJSON",
                message: "expected a Feature or FeatureCollection".into(),
            })
        }
    };

    let mut collection = FeatureCollection::new();
    for feature in features {
        let Some(geometry) = feature.geometry else {
            tracing::warn!("skipping GeoJSON feature without geometry");
            continue;
        };
        let properties = feature.properties.clone().unwrap_or_default();
        for geometry in geometries_from_geojson(&geometry.value)? {
            let mut imported = Feature::new(geometry);
            imported.properties = properties.clone();
            collection.insert(imported);
        }
    }
    Ok(collection)
}

/// Convert a GeoJSON geometry value, flattening geometry collections.
fn geometries_from_geojson(value: &geojson::Value) -> FormatResult<Vec<Geometry>> {
    use geojson::Value;

    let geometry = match value {
        Value::Point(p) => Geometry::Point(position(p)?),
        Value::MultiPoint(points) => Geometry::MultiPoint(positions(points)?),
        Value::LineString(points) => Geometry::LineString(positions(points)?),
        Value::MultiLineString(lines) => Geometry::MultiLineString(
            lines.iter().map(|l| positions(l)).collect::<FormatResult<_>>()?,
        ),
        Value::Polygon(rings) => Geometry::Polygon(
            rings.iter().map(|r| positions(r)).collect::<FormatResult<_>>()?,
        ),
        Value::MultiPolygon(polygons) => Geometry::MultiPolygon(
            polygons
                .iter()
                .map(|rings| rings.iter().map(|r| positions(r)).collect::<FormatResult<_>>())
                .collect::<FormatResult<_>>()?,
        ),
        Value::GeometryCollection(members) => {
            let mut flattened = Vec::new();
            for member in members {
                flattened.extend(geometries_from_geojson(&member.value)?);
            }
            return Ok(flattened);
        }
    };
    Ok(vec![geometry])
}

fn position(p: &[f64]) -> FormatResult<LngLat> {
    match p {
        [lng, lat, ..] => Ok([*lng, *lat]),
        _ => Err(FormatError::Invalid {
            format: "GeoJSON",
            message: "position needs longitude and latitude".into(),
        }),
    }
}

fn positions(points: &[Vec<f64>]) -> FormatResult<Vec<LngLat>> {
    points.iter().map(|p| position(p)).collect()
}

/// Parse KML text into a feature collection.
///
/// # Errors
///
/// Returns [`FormatError::Parse`] when the XML or its geometry cannot be
/// read.
pub fn import_kml(content: &str) -> FormatResult<FeatureCollection> {
    let parsed: kml::Kml = content
        .parse()
        .map_err(|e: kml::Error| FormatError::Parse(e.to_string()))?;
    let geometries: geo::GeometryCollection<f64> =
        kml::quick_collection(parsed).map_err(|e| FormatError::Parse(e.to_string()))?;

    let mut collection = FeatureCollection::new();
    for geometry in geometries {
        for converted in geometries_from_geo(geometry) {
            collection.insert(Feature::new(converted));
        }
    }
    Ok(collection)
}

/// Convert a geo-types geometry, flattening nested collections.
fn geometries_from_geo(geometry: geo::Geometry<f64>) -> Vec<Geometry> {
    match geometry {
        geo::Geometry::Point(p) => vec![Geometry::Point([p.x(), p.y()])],
        geo::Geometry::Line(l) => vec![Geometry::LineString(vec![
            [l.start.x, l.start.y],
            [l.end.x, l.end.y],
        ])],
        geo::Geometry::LineString(l) => vec![Geometry::LineString(line_coords(&l))],
        geo::Geometry::Polygon(p) => vec![Geometry::Polygon(polygon_rings(&p))],
        geo::Geometry::MultiPoint(points) => vec![Geometry::MultiPoint(
            points.iter().map(|p| [p.x(), p.y()]).collect(),
        )],
        geo::Geometry::MultiLineString(lines) => vec![Geometry::MultiLineString(
            lines.iter().map(line_coords).collect(),
        )],
        geo::Geometry::MultiPolygon(polygons) => vec![Geometry::MultiPolygon(
            polygons.iter().map(polygon_rings).collect(),
        )],
        geo::Geometry::GeometryCollection(members) => members
            .into_iter()
            .flat_map(geometries_from_geo)
            .collect(),
        geo::Geometry::Rect(r) => {
            vec![Geometry::Polygon(polygon_rings(&r.to_polygon()))]
        }
        geo::Geometry::Triangle(t) => {
            vec![Geometry::Polygon(polygon_rings(&t.to_polygon()))]
        }
    }
}

fn line_coords(line: &geo::LineString<f64>) -> Vec<LngLat> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

fn polygon_rings(polygon: &geo::Polygon<f64>) -> Vec<Vec<LngLat>> {
    let mut rings = vec![line_coords(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(line_coords));
    rings
}

/// Parse GPX text into a feature collection: waypoints become points,
/// tracks and routes become line strings.
///
/// # Errors
///
/// Returns [`FormatError::Parse`] when the GPX cannot be read.
pub fn import_gpx(content: &str) -> FormatResult<FeatureCollection> {
    let parsed =
        gpx::read(content.as_bytes()).map_err(|e| FormatError::Parse(e.to_string()))?;

    let mut collection = FeatureCollection::new();

    for waypoint in &parsed.waypoints {
        let point = waypoint.point();
        let mut feature = Feature::new(Geometry::Point([point.x(), point.y()]));
        if let Some(name) = &waypoint.name {
            feature = feature.with_property("name", serde_json::json!(name));
        }
        collection.insert(feature);
    }

    for track in &parsed.tracks {
        let coords: Vec<LngLat> = track
            .segments
            .iter()
            .flat_map(|segment| segment.points.iter())
            .map(|waypoint| {
                let point = waypoint.point();
                [point.x(), point.y()]
            })
            .collect();
        if coords.len() < 2 {
            continue;
        }
        let mut feature = Feature::new(Geometry::LineString(coords));
        if let Some(name) = &track.name {
            feature = feature.with_property("name", serde_json::json!(name));
        }
        collection.insert(feature);
    }

    for route in &parsed.routes {
        let coords: Vec<LngLat> = route
            .points
            .iter()
            .map(|waypoint| {
                let point = waypoint.point();
                [point.x(), point.y()]
            })
            .collect();
        if coords.len() < 2 {
            continue;
        }
        let mut feature = Feature::new(Geometry::LineString(coords));
        if let Some(name) = &route.name {
            feature = feature.with_property("name", serde_json::json!(name));
        }
        collection.insert(feature);
    }

    Ok(collection)
}
