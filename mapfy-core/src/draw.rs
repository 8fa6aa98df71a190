//! Draw tool controller.
//!
//! Owns the vector-edit overlay and layers a race-free mode machine on an
//! engine whose readiness is asynchronous and whose control attachment is
//! not idempotent by default.
//!
//! The central correctness property is the store-before-reload /
//! restore-after-reload discipline: the overlay does not survive a basemap
//! style reload, so the feature set is snapshotted when a reload begins and
//! restored after a fresh attach — and only for the most recent requested
//! reload. Stale pending restores are discarded, never applied.

use tokio::sync::broadcast;

use crate::engine::{DrawOverlay, MarkerStyle, OverlayEvent, OverlayMode, OverlayStyle};
use crate::error::{MapError, MapResult};
use crate::feature::{Feature, FeatureCollection, FeatureId};
use crate::lifecycle::{MapLifecycle, ReadySignal};

/// The drawing tool a user can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTool {
    /// Place points.
    Point,
    /// Draw line strings.
    Line,
    /// Draw polygons.
    Polygon,
}

/// The controller's editing mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Overlay not attached; nothing editable.
    #[default]
    Idle,
    /// Attached, selecting/moving existing features.
    Selecting,
    /// Placing a point.
    DrawingPoint,
    /// Drawing a line.
    DrawingLine,
    /// Drawing a polygon.
    DrawingPolygon,
}

impl DrawMode {
    fn for_tool(tool: DrawTool) -> Self {
        match tool {
            DrawTool::Point => Self::DrawingPoint,
            DrawTool::Line => Self::DrawingLine,
            DrawTool::Polygon => Self::DrawingPolygon,
        }
    }

    fn overlay_mode(self) -> OverlayMode {
        match self {
            Self::Idle | Self::Selecting => OverlayMode::SimpleSelect,
            Self::DrawingPoint => OverlayMode::DrawPoint,
            Self::DrawingLine => OverlayMode::DrawLineString,
            Self::DrawingPolygon => OverlayMode::DrawPolygon,
        }
    }
}

/// A feature-set restore waiting for a style reload to complete.
#[derive(Debug, Clone)]
struct PendingRestore {
    /// The style-request generation this restore belongs to.
    generation: u64,
    features: FeatureCollection,
}

/// Owns the draw overlay and the editing mode machine.
pub struct DrawTools {
    overlay: Box<dyn DrawOverlay>,
    attached: bool,
    mode: DrawMode,
    style: OverlayStyle,
    events_tx: broadcast::Sender<OverlayEvent>,
    pending_restore: Option<PendingRestore>,
}

impl DrawTools {
    /// Wrap an overlay handle. The controller starts `Detached`.
    #[must_use]
    pub fn new(overlay: Box<dyn DrawOverlay>) -> Self {
        Self::with_style(overlay, OverlayStyle::default())
    }

    /// Wrap an overlay handle with an initial visual style.
    #[must_use]
    pub fn with_style(overlay: Box<dyn DrawOverlay>, style: OverlayStyle) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            overlay,
            attached: false,
            mode: DrawMode::Idle,
            style,
            events_tx,
            pending_restore: None,
        }
    }

    /// Whether the overlay control is live on the map.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// The current editing mode.
    #[must_use]
    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    /// The current overlay visual style.
    #[must_use]
    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Subscribe to feature change notifications (create, update, delete,
    /// selection change).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.events_tx.subscribe()
    }

    /// Attach the overlay control to the map.
    ///
    /// Preconditions: the map controller is `Loaded` and the engine reports
    /// its style fully loaded. Returns success as a boolean and never
    /// panics across this boundary; callers retry failures with backoff.
    /// Idempotent — if already attached, returns `true` without
    /// reattaching.
    pub fn attach(&mut self, map: &MapLifecycle) -> bool {
        if self.attached {
            tracing::debug!("draw overlay already attached, skipping");
            return true;
        }
        if !map.is_loaded() {
            tracing::debug!(phase = ?map.phase(), "map not loaded, cannot attach draw tools");
            return false;
        }
        if !map.engine_style_loaded() {
            tracing::debug!("map style not fully loaded, cannot attach draw tools");
            return false;
        }

        match self.overlay.install(&self.style) {
            Ok(()) => {
                self.attached = true;
                self.mode = DrawMode::Selecting;
                tracing::info!("draw overlay attached");
                true
            }
            Err(e) => {
                tracing::warn!("draw overlay attach failed: {e}");
                false
            }
        }
    }

    /// Remove the overlay control and listeners. Safe when already
    /// detached.
    pub fn detach(&mut self) {
        if self.attached {
            tracing::debug!("detaching draw overlay");
        }
        self.overlay.remove();
        self.attached = false;
        self.mode = DrawMode::Idle;
    }

    fn require_attached(&self, what: &str) -> MapResult<()> {
        if self.attached {
            Ok(())
        } else {
            tracing::warn!("{what} rejected: draw overlay not attached");
            Err(MapError::Attachment(format!(
                "{what} requires attached draw tools"
            )))
        }
    }

    /// Activate a drawing tool, or toggle back to selection when the tool
    /// is already active.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] while detached; transitions are
    /// rejected, not queued.
    pub fn toggle_tool(&mut self, tool: DrawTool) -> MapResult<DrawMode> {
        self.require_attached("tool change")?;

        let target = if self.mode == DrawMode::for_tool(tool) {
            DrawMode::Selecting
        } else {
            DrawMode::for_tool(tool)
        };

        self.overlay
            .set_mode(target.overlay_mode())
            .map_err(|e| MapError::Attachment(format!("mode change failed: {e}")))?;
        self.mode = target;
        Ok(target)
    }

    /// Delete the selected features and return to selection mode.
    ///
    /// Returns the removed IDs (empty when nothing was selected).
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] while detached.
    pub fn trash(&mut self) -> MapResult<Vec<FeatureId>> {
        self.require_attached("delete")?;

        let removed = self.overlay.delete_selected();
        if !removed.is_empty() {
            let _ = self.events_tx.send(OverlayEvent::Deleted(removed.clone()));
        }
        self.overlay
            .set_mode(OverlayMode::SimpleSelect)
            .map_err(|e| MapError::Attachment(format!("mode change failed: {e}")))?;
        self.mode = DrawMode::Selecting;
        Ok(removed)
    }

    /// Snapshot of the current feature set.
    ///
    /// While detached (for example mid style reload) this returns the held
    /// pending snapshot, so persistence reads stay consistent.
    #[must_use]
    pub fn all_features(&self) -> FeatureCollection {
        if self.attached {
            self.overlay.all_features()
        } else {
            self.pending_restore
                .as_ref()
                .map(|p| p.features.clone())
                .unwrap_or_default()
        }
    }

    /// Bulk-replace the feature set.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] while detached.
    pub fn set_all_features(&mut self, collection: FeatureCollection) -> MapResult<()> {
        self.require_attached("feature replace")?;
        self.overlay
            .set_all(collection)
            .map_err(|e| MapError::Attachment(format!("feature replace failed: {e}")))?;
        // A bulk replace clears the selection.
        let _ = self.events_tx.send(OverlayEvent::SelectionChanged(Vec::new()));
        Ok(())
    }

    /// Merge imported features into the canvas.
    ///
    /// Returns how many features were added.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] while detached.
    pub fn add_features(
        &mut self,
        features: impl IntoIterator<Item = Feature>,
    ) -> MapResult<usize> {
        self.require_attached("import")?;

        let mut added = 0;
        for feature in features {
            let id = self
                .overlay
                .add(feature)
                .map_err(|e| MapError::Attachment(format!("import failed: {e}")))?;
            let _ = self.events_tx.send(OverlayEvent::Created(id));
            added += 1;
        }
        Ok(added)
    }

    /// Remove every feature ("new map").
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] while detached.
    pub fn clear_all(&mut self) -> MapResult<()> {
        self.require_attached("clear")?;

        let ids: Vec<FeatureId> = self.overlay.all_features().iter().map(|f| f.id).collect();
        if ids.is_empty() {
            return Ok(());
        }
        self.overlay
            .delete(&ids)
            .map_err(|e| MapError::Attachment(format!("clear failed: {e}")))?;
        let _ = self.events_tx.send(OverlayEvent::Deleted(ids));
        Ok(())
    }

    /// The currently selected features.
    #[must_use]
    pub fn selected_features(&self) -> Vec<Feature> {
        if !self.attached {
            return Vec::new();
        }
        let collection = self.overlay.all_features();
        self.overlay
            .selected()
            .into_iter()
            .filter_map(|id| collection.get(id).cloned())
            .collect()
    }

    /// Change the overlay's base color, preserving features and mode.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] while detached or if the overlay
    /// cannot be recreated.
    pub fn change_color(&mut self, color: impl Into<String>) -> MapResult<()> {
        let style = OverlayStyle {
            color: color.into(),
            ..self.style.clone()
        };
        self.restyle(style)
    }

    /// Change the marker style, preserving features and mode.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] while detached or if the overlay
    /// cannot be recreated.
    pub fn change_marker_style(&mut self, marker: MarkerStyle) -> MapResult<()> {
        let style = OverlayStyle {
            marker,
            ..self.style.clone()
        };
        self.restyle(style)
    }

    /// Recreate the overlay with a new visual style.
    ///
    /// The drawing engine has no live restyle; the only supported path is
    /// store features and mode, remove the control, install a fresh one
    /// with the new style, restore both.
    fn restyle(&mut self, style: OverlayStyle) -> MapResult<()> {
        self.require_attached("style change")?;

        let features = self.overlay.all_features();
        let mode = self.mode;

        self.overlay.remove();
        self.attached = false;

        if let Err(e) = self.overlay.install(&style) {
            self.mode = DrawMode::Idle;
            tracing::error!("overlay re-creation failed: {e}");
            return Err(MapError::Attachment(format!(
                "overlay re-creation failed: {e}"
            )));
        }
        self.attached = true;
        self.style = style;

        self.overlay
            .set_all(features)
            .map_err(|e| MapError::Attachment(format!("feature restore failed: {e}")))?;
        self.overlay
            .set_mode(mode.overlay_mode())
            .map_err(|e| MapError::Attachment(format!("mode restore failed: {e}")))?;
        self.mode = mode;
        tracing::info!("draw overlay restyled");
        Ok(())
    }

    /// Snapshot the feature set ahead of a style reload and detach.
    ///
    /// `generation` is the style-request generation returned by the map
    /// controller; a later call for a newer generation supersedes the held
    /// snapshot (last writer wins).
    pub fn prepare_for_style_change(&mut self, generation: u64) {
        let features = self.all_features();
        tracing::debug!(
            generation,
            count = features.len(),
            "storing features ahead of style reload"
        );
        self.pending_restore = Some(PendingRestore {
            generation,
            features,
        });
        self.detach();
    }

    /// Stage an explicit feature set (a loaded document) to be applied
    /// once the reload for `generation` completes. Supersedes any held
    /// snapshot.
    pub fn stage_restore(&mut self, generation: u64, features: FeatureCollection) {
        self.pending_restore = Some(PendingRestore {
            generation,
            features,
        });
        self.detach();
    }

    /// Finish a style reload: fresh attach, then restore the pending
    /// feature set if — and only if — it belongs to the reload that just
    /// completed. Stale restores are discarded.
    ///
    /// Returns whether a restore was applied.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Attachment`] if the overlay could not attach;
    /// the pending restore is kept for the caller's retry.
    pub fn complete_style_reload(
        &mut self,
        map: &MapLifecycle,
        signal: ReadySignal,
    ) -> MapResult<bool> {
        // The previous instance did not survive the reload; clear our side
        // tolerating "already gone", then attach fresh.
        self.detach();
        if !self.attach(map) {
            return Err(MapError::Attachment(
                "draw overlay could not reattach after style reload".into(),
            ));
        }

        let Some(pending) = self.pending_restore.take() else {
            return Ok(false);
        };

        if pending.generation != signal.generation {
            tracing::warn!(
                pending = pending.generation,
                completed = signal.generation,
                "discarding stale feature restore"
            );
            return Ok(false);
        }

        self.overlay
            .set_all(pending.features)
            .map_err(|e| MapError::Attachment(format!("feature restore failed: {e}")))?;
        let _ = self.events_tx.send(OverlayEvent::SelectionChanged(Vec::new()));
        tracing::info!(generation = signal.generation, "features restored after style reload");
        Ok(true)
    }

    /// Feed a feature change notification from the drawing engine; it is
    /// re-broadcast to subscribers.
    pub fn handle_overlay_event(&self, event: OverlayEvent) {
        let _ = self.events_tx.send(event);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::OverlayStyle;
    use crate::error::EngineError;
    use crate::feature::Geometry;
    use crate::lifecycle::tests::loaded_controller;

    use std::sync::{Arc, Mutex, PoisonError};

    /// Shared scriptable state behind the fake drawing engine, so tests can
    /// steer selection and failure behavior while the controller owns the
    /// boxed overlay.
    #[derive(Default)]
    pub(crate) struct OverlayState {
        pub installed: bool,
        pub install_count: u32,
        pub fail_install: bool,
        pub fail_installs_remaining: u32,
        pub features: FeatureCollection,
        pub selection: Vec<FeatureId>,
        pub mode: Option<OverlayMode>,
        pub installed_style: Option<OverlayStyle>,
    }

    #[derive(Default, Clone)]
    pub(crate) struct FakeOverlay {
        pub state: Arc<Mutex<OverlayState>>,
    }

    impl FakeOverlay {
        pub(crate) fn with_state() -> (Self, Arc<Mutex<OverlayState>>) {
            let fake = Self::default();
            let state = Arc::clone(&fake.state);
            (fake, state)
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, OverlayState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl DrawOverlay for FakeOverlay {
        fn install(&mut self, style: &OverlayStyle) -> Result<(), EngineError> {
            let mut state = self.lock();
            if state.fail_install {
                return Err(EngineError::new("style still loading"));
            }
            if state.fail_installs_remaining > 0 {
                state.fail_installs_remaining -= 1;
                return Err(EngineError::new("style still loading"));
            }
            assert!(!state.installed, "double install must not happen");
            state.installed = true;
            state.install_count += 1;
            state.installed_style = Some(style.clone());
            Ok(())
        }

        fn remove(&mut self) {
            // Tolerates being already gone; a style reload may have
            // destroyed the control underneath us.
            let mut state = self.lock();
            state.installed = false;
            state.features.clear();
            state.selection.clear();
        }

        fn is_installed(&self) -> bool {
            self.lock().installed
        }

        fn set_mode(&mut self, mode: OverlayMode) -> Result<(), EngineError> {
            self.lock().mode = Some(mode);
            Ok(())
        }

        fn add(&mut self, feature: Feature) -> Result<FeatureId, EngineError> {
            let id = feature.id;
            self.lock().features.insert(feature);
            Ok(id)
        }

        fn delete(&mut self, ids: &[FeatureId]) -> Result<(), EngineError> {
            self.lock().features.remove_many(ids);
            Ok(())
        }

        fn delete_selected(&mut self) -> Vec<FeatureId> {
            let mut state = self.lock();
            let ids = std::mem::take(&mut state.selection);
            state.features.remove_many(&ids)
        }

        fn set_all(&mut self, collection: FeatureCollection) -> Result<(), EngineError> {
            let mut state = self.lock();
            state.features = collection;
            state.selection.clear();
            Ok(())
        }

        fn all_features(&self) -> FeatureCollection {
            self.lock().features.clone()
        }

        fn selected(&self) -> Vec<FeatureId> {
            self.lock().selection.clone()
        }
    }

    fn point() -> Feature {
        Feature::new(Geometry::Point([-70.9, 42.35]))
    }

    pub(crate) async fn attached_tools() -> (
        DrawTools,
        crate::lifecycle::MapLifecycle,
        Arc<Mutex<OverlayState>>,
    ) {
        let map = loaded_controller().await;
        let (overlay, state) = FakeOverlay::with_state();
        let mut draw = DrawTools::new(Box::new(overlay));
        assert!(draw.attach(&map));
        (draw, map, state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_requires_loaded_map() {
        let map = crate::lifecycle::MapLifecycle::new(Box::new(
            crate::lifecycle::tests::FakeMapEngine::default(),
        ));
        let mut draw = DrawTools::new(Box::<FakeOverlay>::default());
        assert!(!draw.attach(&map));
        assert!(!draw.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_is_idempotent() {
        let (mut draw, map, state) = attached_tools().await;
        // Second attach succeeds without touching the engine again.
        assert!(draw.attach(&map));
        assert!(draw.attach(&map));
        assert_eq!(draw.mode(), DrawMode::Selecting);
        assert_eq!(
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .install_count,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_failure_returns_false() {
        let map = loaded_controller().await;
        let (overlay, state) = FakeOverlay::with_state();
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_install = true;
        let mut draw = DrawTools::new(Box::new(overlay));
        assert!(!draw.attach(&map));
        assert_eq!(draw.mode(), DrawMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_toggles_back_to_selecting() {
        let (mut draw, _map, state) = attached_tools().await;

        assert_eq!(
            draw.toggle_tool(DrawTool::Polygon).expect("mode change"),
            DrawMode::DrawingPolygon
        );
        assert_eq!(
            draw.toggle_tool(DrawTool::Polygon).expect("toggle back"),
            DrawMode::Selecting
        );
        assert_eq!(
            draw.toggle_tool(DrawTool::Line).expect("switch"),
            DrawMode::DrawingLine
        );
        assert_eq!(
            draw.toggle_tool(DrawTool::Point).expect("switch"),
            DrawMode::DrawingPoint
        );
        // The engine saw the matching mode change.
        assert_eq!(
            state.lock().unwrap_or_else(PoisonError::into_inner).mode,
            Some(OverlayMode::DrawPoint)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_change_rejected_while_detached() {
        let mut draw = DrawTools::new(Box::<FakeOverlay>::default());
        let err = draw.toggle_tool(DrawTool::Point).expect_err("detached");
        assert!(matches!(err, MapError::Attachment(_)));
        // Not queued: still idle after the rejection.
        assert_eq!(draw.mode(), DrawMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trash_deletes_selection_and_notifies() {
        let (mut draw, _map, state) = attached_tools().await;
        let mut events = draw.subscribe();

        let feature = point();
        let id = feature.id;
        draw.add_features([feature]).expect("add");
        let _ = events.try_recv(); // Created

        // Select it at the engine level, then trash.
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .selection = vec![id];

        let removed = draw.trash().expect("trash");
        assert_eq!(removed, vec![id]);
        assert!(draw.all_features().is_empty());
        assert_eq!(draw.mode(), DrawMode::Selecting);
        assert!(matches!(
            events.try_recv().expect("deleted event"),
            OverlayEvent::Deleted(ids) if ids == vec![id]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restyle_preserves_features_and_mode() {
        let (mut draw, _map, state) = attached_tools().await;
        draw.add_features([point(), point()]).expect("add");
        draw.toggle_tool(DrawTool::Polygon).expect("mode");

        draw.change_color("#EF4444").expect("restyle");

        assert_eq!(draw.all_features().len(), 2);
        assert_eq!(draw.mode(), DrawMode::DrawingPolygon);
        assert_eq!(draw.style().color, "#EF4444");

        draw.change_marker_style(MarkerStyle::Pin).expect("restyle");
        assert_eq!(draw.style().marker, MarkerStyle::Pin);
        assert_eq!(draw.style().color, "#EF4444");
        assert_eq!(draw.all_features().len(), 2);

        let installed = state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .installed_style
            .clone()
            .expect("engine holds a style");
        assert_eq!(installed.color, "#EF4444");
        assert_eq!(installed.marker, MarkerStyle::Pin);
    }

    #[tokio::test(start_paused = true)]
    async fn test_style_reload_restores_latest_snapshot() {
        let (mut draw, mut map, _state) = attached_tools().await;
        draw.add_features([point()]).expect("add");

        let generation = map
            .set_style(crate::viewport::StyleReference::new("style-a"))
            .expect("accepted")
            .expect("started");
        draw.prepare_for_style_change(generation);
        assert!(!draw.is_attached());
        // Snapshot reads stay consistent while detached.
        assert_eq!(draw.all_features().len(), 1);

        let signal = map
            .handle_engine_event(crate::engine::EngineEvent::StyleLoaded)
            .expect("ready");
        let restored = draw.complete_style_reload(&map, signal).expect("reattach");
        assert!(restored);
        assert!(draw.is_attached());
        assert_eq!(draw.all_features().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_restore_is_discarded_only_latest_applies() {
        let (mut draw, mut map, _state) = attached_tools().await;
        draw.add_features([point()]).expect("add");

        // First reload request snapshots one feature.
        let gen_a = map
            .set_style(crate::viewport::StyleReference::new("style-a"))
            .expect("ok")
            .expect("started");
        draw.prepare_for_style_change(gen_a);

        // A second request supersedes it before the first completes.
        let gen_b = map
            .set_style(crate::viewport::StyleReference::new("style-b"))
            .expect("ok")
            .expect("started");
        draw.prepare_for_style_change(gen_b);
        assert!(gen_b > gen_a);

        // The first completion produces no readiness; the second does.
        assert!(map
            .handle_engine_event(crate::engine::EngineEvent::StyleLoaded)
            .is_none());
        let signal = map
            .handle_engine_event(crate::engine::EngineEvent::StyleLoaded)
            .expect("ready");
        assert_eq!(signal.generation, gen_b);

        let restored = draw.complete_style_reload(&map, signal).expect("reattach");
        assert!(restored);
        // Exactly one copy of the feature; no ghosts from the stale restore.
        assert_eq!(draw.all_features().len(), 1);
        assert!(draw.pending_restore.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_restore_is_dropped() {
        let (mut draw, mut map, _state) = attached_tools().await;
        draw.add_features([point()]).expect("add");

        let gen_a = map
            .set_style(crate::viewport::StyleReference::new("style-a"))
            .expect("ok")
            .expect("started");
        draw.prepare_for_style_change(gen_a);

        // A newer request was issued elsewhere without re-staging.
        map.set_style(crate::viewport::StyleReference::new("style-b"))
            .expect("ok")
            .expect("started");

        map.handle_engine_event(crate::engine::EngineEvent::StyleLoaded);
        let signal = map
            .handle_engine_event(crate::engine::EngineEvent::StyleLoaded)
            .expect("ready");

        let restored = draw.complete_style_reload(&map, signal).expect("reattach");
        assert!(!restored, "stale restore must be discarded");
        assert!(draw.all_features().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reattach_failure_keeps_pending_restore() {
        let (mut draw, mut map, state) = attached_tools().await;
        draw.add_features([point()]).expect("add");

        let generation = map
            .set_style(crate::viewport::StyleReference::new("style-a"))
            .expect("ok")
            .expect("started");
        draw.prepare_for_style_change(generation);

        // Make the next install fail once.
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_installs_remaining = 1;

        let signal = map
            .handle_engine_event(crate::engine::EngineEvent::StyleLoaded)
            .expect("ready");
        let err = draw
            .complete_style_reload(&map, signal)
            .expect_err("attach fails");
        assert!(matches!(err, MapError::Attachment(_)));

        // Retry succeeds and still restores.
        let restored = draw.complete_style_reload(&map, signal).expect("retry");
        assert!(restored);
        assert_eq!(draw.all_features().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_all_features_notifies_selection_cleared() {
        let (mut draw, _map, _state) = attached_tools().await;
        let mut events = draw.subscribe();

        let collection = FeatureCollection::from_features(vec![point(), point()]);
        draw.set_all_features(collection).expect("replace");

        assert_eq!(draw.all_features().len(), 2);
        assert!(matches!(
            events.try_recv().expect("event"),
            OverlayEvent::SelectionChanged(ids) if ids.is_empty()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_removes_everything() {
        let (mut draw, _map, _state) = attached_tools().await;
        draw.add_features([point(), point(), point()]).expect("add");
        draw.clear_all().expect("clear");
        assert!(draw.all_features().is_empty());
        // Clearing an already-empty canvas is fine.
        draw.clear_all().expect("clear again");
    }
}
