//! Drawn features - the building blocks of a map canvas.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureId(Uuid);

impl FeatureId {
    /// Create a new unique feature ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from a string representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A longitude/latitude pair in degrees (WGS84).
pub type LngLat = [f64; 2];

/// The geometry a feature carries.
///
/// The variant is fixed at creation time; edits replace coordinates but
/// never change the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position.
    Point(LngLat),
    /// An ordered run of positions.
    LineString(Vec<LngLat>),
    /// One exterior ring plus optional interior rings (holes).
    Polygon(Vec<Vec<LngLat>>),
    /// Multiple positions.
    MultiPoint(Vec<LngLat>),
    /// Multiple runs of positions.
    MultiLineString(Vec<Vec<LngLat>>),
    /// Multiple polygons.
    MultiPolygon(Vec<Vec<Vec<LngLat>>>),
}

impl Geometry {
    /// The GeoJSON type name of this geometry.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPoint(_) => "MultiPoint",
            Self::MultiLineString(_) => "MultiLineString",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Whether this geometry encloses an area.
    #[must_use]
    pub fn is_areal(&self) -> bool {
        matches!(self, Self::Polygon(_) | Self::MultiPolygon(_))
    }
}

/// Constant `"type": "Feature"` marker, keeping the wire shape valid
/// GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
enum FeatureTag {
    /// The only legal value.
    #[default]
    Feature,
}

/// A drawn feature: geometry plus free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    tag: FeatureTag,
    /// Unique identifier.
    pub id: FeatureId,
    /// The geometry.
    pub geometry: Geometry,
    /// Free-form key/value properties.
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Feature {
    /// Create a new feature with a fresh ID and empty properties.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            tag: FeatureTag::Feature,
            id: FeatureId::new(),
            geometry,
            properties: serde_json::Map::new(),
        }
    }

    /// Set a property value.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Constant `"type": "FeatureCollection"` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
enum CollectionTag {
    /// The only legal value.
    #[default]
    FeatureCollection,
}

/// The ordered set of all features currently on the canvas.
///
/// Invariant: feature IDs are unique within a collection. Insertion of a
/// duplicate ID replaces the existing feature in place. Serializes as a
/// GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    tag: CollectionTag,
    features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from features, keeping the last feature for any
    /// duplicated ID.
    #[must_use]
    pub fn from_features(features: Vec<Feature>) -> Self {
        let mut collection = Self::new();
        for feature in features {
            collection.insert(feature);
        }
        collection
    }

    /// Insert a feature, replacing any existing feature with the same ID.
    pub fn insert(&mut self, feature: Feature) {
        if let Some(existing) = self.features.iter_mut().find(|f| f.id == feature.id) {
            *existing = feature;
        } else {
            self.features.push(feature);
        }
    }

    /// Remove a feature by ID, returning it if present.
    pub fn remove(&mut self, id: FeatureId) -> Option<Feature> {
        let index = self.features.iter().position(|f| f.id == id)?;
        Some(self.features.remove(index))
    }

    /// Remove several features at once, returning the IDs actually removed.
    pub fn remove_many(&mut self, ids: &[FeatureId]) -> Vec<FeatureId> {
        let wanted: HashSet<FeatureId> = ids.iter().copied().collect();
        let mut removed = Vec::new();
        self.features.retain(|f| {
            if wanted.contains(&f.id) {
                removed.push(f.id);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Get a feature by ID.
    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Get a mutable reference to a feature by ID.
    pub fn get_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        self.features.iter_mut().find(|f| f.id == id)
    }

    /// Iterate over all features in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// The number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.features.clear();
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self::from_features(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lng: f64, lat: f64) -> Feature {
        Feature::new(Geometry::Point([lng, lat]))
    }

    #[test]
    fn test_insert_and_get() {
        let mut collection = FeatureCollection::new();
        assert!(collection.is_empty());

        let feature = point(-70.9, 42.35);
        let id = feature.id;
        collection.insert(feature);

        assert_eq!(collection.len(), 1);
        assert!(collection.get(id).is_some());
    }

    #[test]
    fn test_duplicate_id_replaces() {
        let mut collection = FeatureCollection::new();
        let mut feature = point(-70.9, 42.35);
        let id = feature.id;
        collection.insert(feature.clone());

        feature.geometry = Geometry::Point([0.0, 0.0]);
        collection.insert(feature);

        assert_eq!(collection.len(), 1);
        let stored = collection.get(id).expect("feature present");
        assert_eq!(stored.geometry, Geometry::Point([0.0, 0.0]));
    }

    #[test]
    fn test_remove_many() {
        let mut collection = FeatureCollection::new();
        let a = point(0.0, 0.0);
        let b = point(1.0, 1.0);
        let c = point(2.0, 2.0);
        let (ida, idb) = (a.id, b.id);
        collection.insert(a);
        collection.insert(b);
        collection.insert(c);

        let removed = collection.remove_many(&[ida, idb, FeatureId::new()]);
        assert_eq!(removed.len(), 2);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut collection = FeatureCollection::new();
        let ids: Vec<FeatureId> = (0..4)
            .map(|i| {
                let feature = point(f64::from(i), 0.0);
                let id = feature.id;
                collection.insert(feature);
                id
            })
            .collect();

        let iterated: Vec<FeatureId> = collection.iter().map(|f| f.id).collect();
        assert_eq!(ids, iterated);
    }

    #[test]
    fn test_geometry_type_name_stable() {
        let feature = Feature::new(Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]));
        assert_eq!(feature.geometry.type_name(), "LineString");
        assert!(!feature.geometry.is_areal());
        assert!(Geometry::Polygon(vec![]).is_areal());
    }

    #[test]
    fn test_wire_shape_is_geojson() {
        let mut collection = FeatureCollection::new();
        collection.insert(point(-70.9, 42.35));

        let json = serde_json::to_value(&collection).expect("serialize");
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
        assert_eq!(
            json["features"][0]["geometry"]["coordinates"],
            serde_json::json!([-70.9, 42.35])
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let feature = Feature::new(Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
        ]]))
        .with_property("name", serde_json::json!("field"));

        let json = serde_json::to_string(&feature).expect("serialize");
        let restored: Feature = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(feature, restored);
    }
}
