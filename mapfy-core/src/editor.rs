//! Editor session assembly.
//!
//! Wires the map lifecycle, the draw tools and the measurement coordinator
//! together and pumps engine events through them in order: map readiness
//! strictly precedes overlay attachment, and a feature restore strictly
//! follows the readiness signal of the reload that staged it.

use crate::coordinator::MeasurementCoordinator;
use crate::draw::DrawTools;
use crate::engine::{ContainerHost, DrawOverlay, EngineEvent, MapEngine, MarkerStyle, OverlayEvent};
use crate::error::{MapError, MapResult};
use crate::lifecycle::{MapLifecycle, ReadySignal};
use crate::retry::{attach_with_backoff, RetryConfig};
use crate::viewport::{StyleReference, Viewport};

/// One editing session: a map, its draw overlay and the derived
/// measurements.
pub struct EditorSession {
    map: MapLifecycle,
    draw: DrawTools,
    measurements: MeasurementCoordinator,
    retry: RetryConfig,
}

impl EditorSession {
    /// Assemble a session from engine handles.
    #[must_use]
    pub fn new(map_engine: Box<dyn MapEngine>, overlay: Box<dyn DrawOverlay>) -> Self {
        Self::with_retry(map_engine, overlay, RetryConfig::default())
    }

    /// Assemble a session with a custom attach retry policy.
    #[must_use]
    pub fn with_retry(
        map_engine: Box<dyn MapEngine>,
        overlay: Box<dyn DrawOverlay>,
        retry: RetryConfig,
    ) -> Self {
        let map = MapLifecycle::new(map_engine);
        let draw = DrawTools::new(overlay);
        let measurements = MeasurementCoordinator::new(&draw);
        Self {
            map,
            draw,
            measurements,
            retry,
        }
    }

    /// The map lifecycle controller.
    #[must_use]
    pub fn map(&self) -> &MapLifecycle {
        &self.map
    }

    /// The draw tool controller.
    #[must_use]
    pub fn draw(&self) -> &DrawTools {
        &self.draw
    }

    /// Mutable access to the draw tool controller.
    pub fn draw_mut(&mut self) -> &mut DrawTools {
        &mut self.draw
    }

    /// Split borrow for persistence operations that need both controllers.
    pub fn parts_mut(&mut self) -> (&mut MapLifecycle, &mut DrawTools) {
        (&mut self.map, &mut self.draw)
    }

    /// The measurement coordinator.
    #[must_use]
    pub fn measurements(&self) -> &MeasurementCoordinator {
        &self.measurements
    }

    /// Mutable access to the measurement coordinator (hover processing).
    pub fn measurements_mut(&mut self) -> &mut MeasurementCoordinator {
        &mut self.measurements
    }

    /// Initialize the map. See [`MapLifecycle::initialize`].
    ///
    /// # Errors
    ///
    /// Propagates [`MapError::Initialization`].
    pub async fn initialize(
        &mut self,
        host: &dyn ContainerHost,
        container_handle: &str,
        viewport: Viewport,
        style: StyleReference,
    ) -> MapResult<()> {
        self.map
            .initialize(host, container_handle, viewport, style)
            .await
    }

    /// Pump one map engine event through the session.
    ///
    /// Readiness signals trigger terrain attachment, overlay attachment
    /// (with backoff) and any staged feature restore, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] when the overlay could not attach
    /// within the configured retry attempts; the editor stays in
    /// viewing-only mode.
    pub async fn handle_engine_event(&mut self, event: EngineEvent) -> MapResult<()> {
        let Some(signal) = self.map.handle_engine_event(event) else {
            return Ok(());
        };
        self.on_ready(signal).await
    }

    async fn on_ready(&mut self, signal: ReadySignal) -> MapResult<()> {
        self.map.ensure_terrain();

        if signal.epoch == 1 {
            attach_with_backoff(&mut self.draw, &self.map, &self.retry).await?;
        } else {
            self.reattach_with_backoff(signal).await?;
        }

        self.measurements.poll(&self.draw);
        Ok(())
    }

    /// Complete a style reload, retrying the reattach with backoff.
    async fn reattach_with_backoff(&mut self, signal: ReadySignal) -> MapResult<()> {
        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            match self.draw.complete_style_reload(&self.map, signal) {
                Ok(_) => return Ok(()),
                Err(e) => {
                    last_error = Some(e);
                    if attempt + 1 < self.retry.max_attempts {
                        let delay = self.retry.delay_for_attempt(attempt);
                        tracing::debug!(
                            attempt = attempt + 1,
                            delay_ms = delay,
                            "reattach after style reload failed, backing off"
                        );
                        tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    }
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| MapError::Attachment("editor not ready".into())))
    }

    /// Pump one drawing engine event through the session; measurements
    /// recompute immediately after.
    pub fn handle_overlay_event(&mut self, event: OverlayEvent) {
        self.draw.handle_overlay_event(event);
        self.measurements.poll(&self.draw);
    }

    /// Change the basemap style, snapshotting the feature set for restore
    /// after the reload.
    ///
    /// # Errors
    ///
    /// Propagates [`MapError::Validation`] when the map is not loaded.
    pub fn set_style(&mut self, style: StyleReference) -> MapResult<()> {
        if let Some(generation) = self.map.set_style(style)? {
            self.draw.prepare_for_style_change(generation);
        }
        Ok(())
    }

    /// Change the overlay's drawing color.
    ///
    /// # Errors
    ///
    /// Propagates [`MapError::Attachment`].
    pub fn change_color(&mut self, color: impl Into<String>) -> MapResult<()> {
        self.draw.change_color(color)
    }

    /// Change the overlay's marker style.
    ///
    /// # Errors
    ///
    /// Propagates [`MapError::Attachment`].
    pub fn change_marker_style(&mut self, marker: MarkerStyle) -> MapResult<()> {
        self.draw.change_marker_style(marker)
    }

    /// Re-measure the map container.
    pub fn resize(&mut self) {
        self.map.resize();
    }

    /// Tear the session down: overlay first, then the map engine.
    pub fn dispose(&mut self) {
        self.draw.detach();
        self.map.dispose();
    }
}
