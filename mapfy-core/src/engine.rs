//! Seams to the external map and vector-edit engines.
//!
//! The rendering engine and the drawing engine live outside this codebase.
//! They are modeled as trait objects exclusively owned by the two
//! controllers; nothing above the controllers ever touches a raw engine
//! handle. Engines push their asynchronous lifecycle notifications into the
//! controllers through [`EngineEvent`] / [`OverlayEvent`], which the host
//! event loop pumps. Events may arrive duplicated or out of order; the
//! controllers are responsible for presenting a monotonic lifecycle anyway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::feature::{Feature, FeatureCollection, FeatureId, LngLat};
use crate::viewport::{StyleReference, Viewport};

/// A resolved host container the map renders into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Host-side identifier of the mount point.
    pub id: String,
}

/// Resolves container handles in the host UI tree.
///
/// A single probe; the lifecycle controller supplies the bounded retry
/// loop around it.
#[async_trait]
pub trait ContainerHost: Send + Sync {
    /// Look the handle up once, returning the container if it is mounted.
    async fn resolve(&self, handle: &str) -> Option<Container>;
}

/// Lifecycle and interaction notifications emitted by the map engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Initial load finished; the map is renderable.
    Loaded,
    /// A style (re)load finished.
    StyleLoaded,
    /// The camera moved.
    Moved(Viewport),
    /// The engine failed internally.
    Failed(String),
}

/// Handle to one instance of the external map-rendering engine.
///
/// Construction is asynchronous on the engine side: after [`construct`]
/// returns the engine is building its first style and will emit
/// [`EngineEvent::Loaded`] (then [`EngineEvent::StyleLoaded`] after every
/// [`set_style`]) through the host event pump.
///
/// [`construct`]: MapEngine::construct
/// [`set_style`]: MapEngine::set_style
pub trait MapEngine: Send {
    /// Create the underlying engine instance in the given container.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be constructed.
    fn construct(
        &mut self,
        container: &Container,
        viewport: &Viewport,
        style: &StyleReference,
    ) -> Result<(), EngineError>;

    /// Whether [`construct`](MapEngine::construct) has succeeded.
    fn is_constructed(&self) -> bool;

    /// Begin an asynchronous style reload. Completion is signaled by a
    /// later [`EngineEvent::StyleLoaded`].
    ///
    /// # Errors
    ///
    /// Returns an error if the reload could not be started.
    fn set_style(&mut self, style: &StyleReference) -> Result<(), EngineError>;

    /// Whether the current style has finished loading.
    fn is_style_loaded(&self) -> bool;

    /// Re-measure the container. No-op before construction.
    fn resize(&mut self);

    /// The engine's current camera state.
    fn viewport(&self) -> Viewport;

    /// Move the camera.
    fn jump_to(&mut self, viewport: &Viewport);

    /// Attach the elevation (DEM) source for 3D relief and elevation
    /// queries. Idempotent on the engine side.
    ///
    /// # Errors
    ///
    /// Returns an error if the terrain source cannot be added.
    fn attach_terrain(&mut self) -> Result<(), EngineError>;

    /// Whether a terrain source is currently attached.
    fn has_terrain(&self) -> bool;

    /// Query terrain elevation in meters at a position, if terrain is
    /// attached and covers it.
    fn query_elevation(&self, position: LngLat) -> Option<f64>;

    /// Destroy the engine instance and release its resources. Safe to call
    /// repeatedly.
    fn remove(&mut self);
}

/// Marker style for point features, mirroring the editor's style catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    /// Plain circle marker.
    #[default]
    Default,
    /// Flag icon.
    Flag,
    /// Pin icon.
    Pin,
    /// Star icon.
    Star,
}

/// Visual configuration of the draw overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayStyle {
    /// Base color for drawn geometry, as a hex string.
    pub color: String,
    /// Marker style for point features.
    pub marker: MarkerStyle,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: "#3FB1CE".to_string(),
            marker: MarkerStyle::Default,
        }
    }
}

/// Editing mode exposed by the drawing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// Select/move/reshape existing features.
    SimpleSelect,
    /// Place a point on next click.
    DrawPoint,
    /// Append line vertices until finished.
    DrawLineString,
    /// Append polygon vertices until closed.
    DrawPolygon,
}

/// Feature change notifications emitted by the drawing engine.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    /// A feature was drawn.
    Created(FeatureId),
    /// A feature was moved or reshaped.
    Updated(FeatureId),
    /// Features were deleted.
    Deleted(Vec<FeatureId>),
    /// The selection changed.
    SelectionChanged(Vec<FeatureId>),
}

/// Handle to the external vector-edit engine's overlay control.
///
/// Installation is **not** idempotent on the engine side; the draw
/// controller guards against double installs. The overlay does not survive
/// a basemap style reload.
pub trait DrawOverlay: Send {
    /// Install the overlay control onto the map with the given style.
    ///
    /// # Errors
    ///
    /// Returns an error if the control cannot be attached (for example the
    /// map's style is still loading).
    fn install(&mut self, style: &OverlayStyle) -> Result<(), EngineError>;

    /// Remove the overlay control, tolerating it being already gone.
    fn remove(&mut self);

    /// Whether the control is currently installed.
    fn is_installed(&self) -> bool;

    /// Switch the editing mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the mode change.
    fn set_mode(&mut self, mode: OverlayMode) -> Result<(), EngineError>;

    /// Add one feature, returning the ID the engine assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature is rejected.
    fn add(&mut self, feature: Feature) -> Result<FeatureId, EngineError>;

    /// Delete features by ID. Unknown IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error on engine failure.
    fn delete(&mut self, ids: &[FeatureId]) -> Result<(), EngineError>;

    /// Delete whatever is currently selected, returning the removed IDs.
    fn delete_selected(&mut self) -> Vec<FeatureId>;

    /// Replace the whole feature set.
    ///
    /// # Errors
    ///
    /// Returns an error on engine failure.
    fn set_all(&mut self, collection: FeatureCollection) -> Result<(), EngineError>;

    /// Snapshot of the current feature set.
    fn all_features(&self) -> FeatureCollection;

    /// IDs of the currently selected features.
    fn selected(&self) -> Vec<FeatureId>;
}
