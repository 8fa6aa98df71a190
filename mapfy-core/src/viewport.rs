//! Camera state and basemap style references.

use serde::{Deserialize, Serialize};

/// The camera position over the map.
///
/// Mutated continuously by user interaction through the map engine; the
/// lifecycle controller holds the last-known value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Longitude of the camera center in degrees.
    pub longitude: f64,
    /// Latitude of the camera center in degrees.
    pub latitude: f64,
    /// Zoom level.
    pub zoom: f64,
    /// Compass bearing in degrees.
    pub bearing: f64,
    /// Camera pitch in degrees.
    pub pitch: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            longitude: -70.9,
            latitude: 42.35,
            zoom: 9.0,
            bearing: 0.0,
            pitch: 45.0,
        }
    }
}

impl Viewport {
    /// Create a viewport centered on the given position.
    #[must_use]
    pub fn centered(longitude: f64, latitude: f64, zoom: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom,
            ..Self::default()
        }
    }
}

/// An opaque identifier for the active visual basemap.
///
/// Changing it triggers an asynchronous reload in the map engine that
/// destroys overlay layers; dependents reattach on the next readiness
/// signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleReference(String);

impl StyleReference {
    /// Wrap a style identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StyleReference {
    fn default() -> Self {
        Self("mapbox://styles/mapbox/streets-v11".to_string())
    }
}

impl std::fmt::Display for StyleReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StyleReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
