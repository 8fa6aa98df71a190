//! Canonical serialized representation of persisted maps, shared by the
//! API client and the server.
//!
//! A persisted map is an independent snapshot of the editor state — never
//! a live reference to the canvas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feature::FeatureCollection;
use crate::viewport::{StyleReference, Viewport};

/// Map center on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl From<Viewport> for Center {
    fn from(viewport: Viewport) -> Self {
        Self {
            lng: viewport.longitude,
            lat: viewport.latitude,
        }
    }
}

/// A persisted map document as stored by the CRUD API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDocument {
    /// Document ID, assigned by the store.
    pub id: String,
    /// Owning user's ID.
    #[serde(rename = "user")]
    pub owner: String,
    /// Map name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Snapshot of the drawn features.
    pub geojson: FeatureCollection,
    /// Basemap style reference.
    pub style: StyleReference,
    /// Saved camera center.
    pub center: Center,
    /// Saved zoom level.
    pub zoom: f64,
    /// Whether this is an autosaved draft rather than an explicit save.
    #[serde(default)]
    pub is_draft: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl MapDocument {
    /// Reconstruct the saved viewport. Bearing and pitch are not
    /// persisted; they fall back to the editor defaults.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::centered(self.center.lng, self.center.lat, self.zoom)
    }
}

/// Listing entry for a persisted map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSummary {
    /// Document ID.
    pub id: String,
    /// Map name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Draft flag.
    #[serde(default)]
    pub is_draft: bool,
    /// Last update time; listings are ordered by this, newest first.
    pub updated_at: DateTime<Utc>,
}

impl From<&MapDocument> for MapSummary {
    fn from(doc: &MapDocument) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            description: doc.description.clone(),
            is_draft: doc.is_draft,
            updated_at: doc.updated_at,
        }
    }
}

/// Create/update request body. Update is partial: absent fields keep their
/// stored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPayload {
    /// Map name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Feature snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geojson: Option<FeatureCollection>,
    /// Basemap style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleReference>,
    /// Camera center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Center>,
    /// Zoom level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    /// Draft flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_draft: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, Geometry};

    #[test]
    fn test_document_wire_shape_is_camel_case() {
        let doc = MapDocument {
            id: "m-1".into(),
            owner: "u-1".into(),
            name: "Harbor".into(),
            description: String::new(),
            geojson: FeatureCollection::from_features(vec![Feature::new(Geometry::Point([
                -70.9, 42.35,
            ]))]),
            style: StyleReference::default(),
            center: Center { lng: -70.9, lat: 42.35 },
            zoom: 9.0,
            is_draft: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&doc).expect("serialize");
        assert!(json.get("isDraft").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("user").is_some());
        assert!(json.get("owner").is_none());
    }

    #[test]
    fn test_payload_skips_absent_fields() {
        let payload = MapPayload {
            name: Some("Harbor".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json.as_object().expect("object").len(), 1);
    }

    #[test]
    fn test_viewport_round_trip_through_center() {
        let viewport = Viewport::centered(2.35, 48.86, 12.5);
        let center = Center::from(viewport);
        let doc = MapDocument {
            id: "m-1".into(),
            owner: "u-1".into(),
            name: "Paris".into(),
            description: String::new(),
            geojson: FeatureCollection::new(),
            style: StyleReference::default(),
            center,
            zoom: viewport.zoom,
            is_draft: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let restored = doc.viewport();
        assert!((restored.longitude - 2.35).abs() < f64::EPSILON);
        assert!((restored.latitude - 48.86).abs() < f64::EPSILON);
        assert!((restored.zoom - 12.5).abs() < f64::EPSILON);
    }
}
