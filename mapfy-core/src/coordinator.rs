//! Measurement coordinator.
//!
//! Pure reactive derivation over the draw controller's change stream: no
//! owned state beyond the last-computed measurement. Strictly read-only
//! with respect to the feature set and the draw mode.

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;

use crate::draw::DrawTools;
use crate::engine::OverlayEvent;
use crate::feature::LngLat;
use crate::lifecycle::MapLifecycle;
use crate::measure::{measure, Measurement};

/// What the pointer is currently over.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverReading {
    /// Hovering a feature: its transient measurement.
    Feature(Measurement),
    /// Hovering bare terrain: elevation in meters, rounded to 0.1 m.
    Elevation(f64),
}

/// Derives the selection measurement and transient hover readings.
pub struct MeasurementCoordinator {
    events: Receiver<OverlayEvent>,
    selection: Measurement,
    hover: Option<HoverReading>,
}

impl MeasurementCoordinator {
    /// Subscribe to a draw controller's change stream.
    #[must_use]
    pub fn new(draw: &DrawTools) -> Self {
        Self {
            events: draw.subscribe(),
            selection: Measurement::empty(),
            hover: None,
        }
    }

    /// The measurement of the current selection.
    ///
    /// Set when exactly one feature is selected, empty otherwise.
    #[must_use]
    pub fn selection_measurement(&self) -> &Measurement {
        &self.selection
    }

    /// The latest hover reading, if any.
    #[must_use]
    pub fn hover_reading(&self) -> Option<&HoverReading> {
        self.hover.as_ref()
    }

    /// Drain pending change notifications and recompute the selection
    /// measurement. Called by the host loop right after the mutation that
    /// produced the events, so recomputation never reads stale state.
    ///
    /// Returns whether the measurement was recomputed.
    pub fn poll(&mut self, draw: &DrawTools) -> bool {
        let mut dirty = false;
        loop {
            match self.events.try_recv() {
                Ok(_) => dirty = true,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "measurement events lagged, recomputing");
                    dirty = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if dirty {
            self.recompute(draw);
        }
        dirty
    }

    fn recompute(&mut self, draw: &DrawTools) {
        let selected = draw.selected_features();
        self.selection = match selected.as_slice() {
            [only] => measure(only),
            _ => Measurement::empty(),
        };
    }

    /// Process a pointer hover at `position`.
    ///
    /// When the pointer is over a feature, surfaces that feature's
    /// transient measurement (independent of the selection measurement).
    /// Over bare terrain, surfaces the elevation — but only if the map's
    /// terrain source is attached.
    pub fn hover(
        &mut self,
        map: &MapLifecycle,
        draw: &DrawTools,
        position: LngLat,
        feature_under_pointer: Option<crate::feature::FeatureId>,
    ) -> Option<&HoverReading> {
        self.hover = match feature_under_pointer {
            Some(id) => draw
                .all_features()
                .get(id)
                .map(|feature| HoverReading::Feature(measure(feature))),
            None => {
                if map.has_terrain() {
                    map.query_elevation(position)
                        .map(|meters| HoverReading::Elevation((meters * 10.0).round() / 10.0))
                } else {
                    None
                }
            }
        };
        self.hover.as_ref()
    }

    /// Clear the hover reading (pointer left the map).
    pub fn clear_hover(&mut self) {
        self.hover = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::PoisonError;

    use crate::draw::tests::attached_tools;
    use crate::feature::{Feature, Geometry};
    use crate::lifecycle::tests::{FakeHost, FakeMapEngine};
    use crate::viewport::{StyleReference, Viewport};

    fn polygon() -> Feature {
        // ~110 m square near the equator, around 12 000 m².
        let d = 109.5 / 111_319.49;
        Feature::new(Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [d, 0.0],
            [d, d],
            [0.0, d],
            [0.0, 0.0],
        ]]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_selection_is_measured() {
        let (mut draw, _map, state) = attached_tools().await;
        let mut measurements = MeasurementCoordinator::new(&draw);

        let feature = polygon();
        let id = feature.id;
        draw.add_features([feature]).expect("add");
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .selection = vec![id];
        draw.handle_overlay_event(OverlayEvent::SelectionChanged(vec![id]));

        assert!(measurements.poll(&draw));
        let measurement = measurements.selection_measurement();
        assert!(measurement.area.as_deref().is_some_and(|a| a.ends_with(" ha")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_selection_clears_measurement() {
        let (mut draw, _map, state) = attached_tools().await;
        let mut measurements = MeasurementCoordinator::new(&draw);

        let a = polygon();
        let b = polygon();
        let ids = vec![a.id, b.id];
        draw.add_features([a, b]).expect("add");
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .selection = ids.clone();
        draw.handle_overlay_event(OverlayEvent::SelectionChanged(ids));

        measurements.poll(&draw);
        assert!(measurements.selection_measurement().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_selection_clears_measurement() {
        let (mut draw, _map, state) = attached_tools().await;
        let mut measurements = MeasurementCoordinator::new(&draw);

        let feature = polygon();
        let id = feature.id;
        draw.add_features([feature]).expect("add");
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .selection = vec![id];
        draw.handle_overlay_event(OverlayEvent::SelectionChanged(vec![id]));
        measurements.poll(&draw);
        assert!(!measurements.selection_measurement().is_empty());

        draw.trash().expect("trash");
        measurements.poll(&draw);
        assert!(measurements.selection_measurement().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_without_events_is_quiet() {
        let (draw, _map, _state) = attached_tools().await;
        let mut measurements = MeasurementCoordinator::new(&draw);
        assert!(!measurements.poll(&draw));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_over_feature_measures_it() {
        let (mut draw, map, _state) = attached_tools().await;
        let mut measurements = MeasurementCoordinator::new(&draw);

        let feature = polygon();
        let id = feature.id;
        draw.add_features([feature]).expect("add");

        let reading = measurements
            .hover(&map, &draw, [0.0, 0.0], Some(id))
            .expect("reading");
        assert!(matches!(reading, HoverReading::Feature(m) if m.area.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_elevation_requires_terrain() {
        let engine = FakeMapEngine {
            elevation: Some(123.46),
            ..Default::default()
        };
        let mut map = MapLifecycle::new(Box::new(engine));
        map.initialize(
            &FakeHost::mounted(),
            "map-root",
            Viewport::default(),
            StyleReference::default(),
        )
        .await
        .expect("initialize");
        map.handle_engine_event(crate::engine::EngineEvent::Loaded);

        let (draw, _unused_map, _state) = attached_tools().await;
        let mut measurements = MeasurementCoordinator::new(&draw);

        // No terrain attached: no elevation reading.
        assert!(measurements.hover(&map, &draw, [0.0, 0.0], None).is_none());

        map.ensure_terrain();
        let reading = measurements
            .hover(&map, &draw, [0.0, 0.0], None)
            .expect("reading");
        assert_eq!(*reading, HoverReading::Elevation(123.5));

        measurements.clear_hover();
        assert!(measurements.hover_reading().is_none());
    }
}
