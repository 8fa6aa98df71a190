//! Feature export to GeoJSON and KML text.

use std::fmt::Write;

use geojson::{feature::Id, JsonObject};
use mapfy_core::{Feature, FeatureCollection, Geometry, LngLat};

use crate::error::{FormatError, FormatResult};

/// Options for GeoJSON export.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonExportOptions {
    /// Attach the MapFy style metadata block to the collection.
    pub include_style_metadata: bool,
}

/// Serialize a feature collection as pretty-printed GeoJSON.
///
/// # Errors
///
/// Returns [`FormatError::Empty`] for an empty collection.
pub fn export_geojson(
    collection: &FeatureCollection,
    options: &GeoJsonExportOptions,
) -> FormatResult<String> {
    if collection.is_empty() {
        return Err(FormatError::Empty);
    }

    let features: Vec<geojson::Feature> = collection.iter().map(feature_to_geojson).collect();

    let foreign_members = options.include_style_metadata.then(|| {
        let mut members = JsonObject::new();
        members.insert(
            "metadata".to_string(),
            serde_json::json!({
                "mapfy": {
                    "version": mapfy_core::VERSION,
                    "styleInfo": true,
                }
            }),
        );
        members
    });

    let geojson_collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };

    serde_json::to_string_pretty(&geojson_collection)
        .map_err(|e| FormatError::Render(e.to_string()))
}

fn feature_to_geojson(feature: &Feature) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geometry_to_geojson(
            &feature.geometry,
        ))),
        id: Some(Id::String(feature.id.to_string())),
        properties: Some(feature.properties.clone()),
        foreign_members: None,
    }
}

fn geometry_to_geojson(geometry: &Geometry) -> geojson::Value {
    use geojson::Value;

    match geometry {
        Geometry::Point(p) => Value::Point(p.to_vec()),
        Geometry::MultiPoint(points) => Value::MultiPoint(vec_positions(points)),
        Geometry::LineString(points) => Value::LineString(vec_positions(points)),
        Geometry::MultiLineString(lines) => {
            Value::MultiLineString(lines.iter().map(|l| vec_positions(l)).collect())
        }
        Geometry::Polygon(rings) => {
            Value::Polygon(rings.iter().map(|r| vec_positions(r)).collect())
        }
        Geometry::MultiPolygon(polygons) => Value::MultiPolygon(
            polygons
                .iter()
                .map(|rings| rings.iter().map(|r| vec_positions(r)).collect())
                .collect(),
        ),
    }
}

fn vec_positions(points: &[LngLat]) -> Vec<Vec<f64>> {
    points.iter().map(|p| p.to_vec()).collect()
}

/// Serialize a feature collection as a KML document with one placemark per
/// feature.
///
/// # Errors
///
/// Returns [`FormatError::Empty`] for an empty collection.
pub fn export_kml(collection: &FeatureCollection) -> FormatResult<String> {
    if collection.is_empty() {
        return Err(FormatError::Empty);
    }

    let mut kml = String::with_capacity(4096);
    kml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    kml.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n<Document>\n");

    for feature in collection.iter() {
        write_placemark(&mut kml, feature);
    }

    kml.push_str("</Document>\n</kml>\n");
    Ok(kml)
}

fn write_placemark(kml: &mut String, feature: &Feature) {
    kml.push_str("<Placemark>\n");

    if let Some(name) = feature.properties.get("name").and_then(|v| v.as_str()) {
        let _ = writeln!(kml, "<name>{}</name>", escape_xml(name));
    }
    if let Some(description) = feature
        .properties
        .get("description")
        .and_then(|v| v.as_str())
    {
        let _ = writeln!(kml, "<description>{}</description>", escape_xml(description));
    }

    write_geometry(kml, &feature.geometry);
    kml.push_str("</Placemark>\n");
}

fn write_geometry(kml: &mut String, geometry: &Geometry) {
    match geometry {
        Geometry::Point(p) => {
            let _ = writeln!(
                kml,
                "<Point><coordinates>{},{}</coordinates></Point>",
                p[0], p[1]
            );
        }
        Geometry::LineString(points) => {
            let _ = writeln!(
                kml,
                "<LineString><coordinates>{}</coordinates></LineString>",
                coordinate_run(points)
            );
        }
        Geometry::Polygon(rings) => write_polygon(kml, rings),
        Geometry::MultiPoint(points) => {
            kml.push_str("<MultiGeometry>\n");
            for p in points {
                write_geometry(kml, &Geometry::Point(*p));
            }
            kml.push_str("</MultiGeometry>\n");
        }
        Geometry::MultiLineString(lines) => {
            kml.push_str("<MultiGeometry>\n");
            for line in lines {
                write_geometry(kml, &Geometry::LineString(line.clone()));
            }
            kml.push_str("</MultiGeometry>\n");
        }
        Geometry::MultiPolygon(polygons) => {
            kml.push_str("<MultiGeometry>\n");
            for rings in polygons {
                write_polygon(kml, rings);
            }
            kml.push_str("</MultiGeometry>\n");
        }
    }
}

fn write_polygon(kml: &mut String, rings: &[Vec<LngLat>]) {
    kml.push_str("<Polygon>\n");
    for (index, ring) in rings.iter().enumerate() {
        let boundary = if index == 0 {
            "outerBoundaryIs"
        } else {
            "innerBoundaryIs"
        };
        let _ = writeln!(
            kml,
            "<{boundary}><LinearRing><coordinates>{}</coordinates></LinearRing></{boundary}>",
            coordinate_run(ring)
        );
    }
    kml.push_str("</Polygon>\n");
}

fn coordinate_run(points: &[LngLat]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p[0], p[1]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
