//! Map lifecycle controller.
//!
//! Owns exactly one map-engine instance per editor session and presents a
//! stable, monotonically-advancing lifecycle to dependents despite the
//! engine's asynchronous, sometimes-duplicated event emission.
//!
//! Phases: `Uninitialized → AwaitingContainer → Initializing → Loaded ⇄
//! StyleReloading`, with `Failed` and `Disposed` as terminal states.
//! `Loaded` is the only phase from which dependents may query the viewport
//! or attach controls. Every entry into `Loaded` (the first load and each
//! completed style reload) emits one [`ReadySignal`]; style reloads must
//! re-fire readiness because overlay controls do not survive them.

use tokio::sync::broadcast;
use tokio::time::{sleep, Duration};

use crate::engine::{Container, ContainerHost, EngineEvent, MapEngine};
use crate::error::{MapError, MapResult};
use crate::feature::LngLat;
use crate::viewport::{StyleReference, Viewport};

/// Interval between container probes.
const CONTAINER_PROBE_INTERVAL: Duration = Duration::from_millis(100);
/// Number of probes before giving up on the container (~1 second).
const CONTAINER_PROBE_ATTEMPTS: u32 = 10;

/// Lifecycle phase of the map controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPhase {
    /// Nothing has happened yet.
    Uninitialized,
    /// Waiting for the host container to mount.
    AwaitingContainer,
    /// Engine constructed, first load in progress.
    Initializing,
    /// Fully loaded; dependents may attach.
    Loaded,
    /// A basemap style reload is in flight.
    StyleReloading,
    /// Initialization failed; the session needs a reload affordance.
    Failed,
    /// Torn down.
    Disposed,
}

/// Emitted once per transition into [`MapPhase::Loaded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadySignal {
    /// Monotonic count of entries into `Loaded` (1 on first load).
    pub epoch: u64,
    /// The style request this readiness completes (0 for the initial
    /// style). Consumers use it to discard stale pending restores.
    pub generation: u64,
}

/// Owns the map engine and its lifecycle.
pub struct MapLifecycle {
    engine: Box<dyn MapEngine>,
    phase: MapPhase,
    style: StyleReference,
    viewport: Viewport,
    epoch: u64,
    /// Count of `set_style` requests issued; readiness reports the latest.
    requested_generation: u64,
    /// Style reloads started but not yet completed by the engine.
    pending_reloads: u32,
    ready_tx: broadcast::Sender<ReadySignal>,
    failure: Option<String>,
}

impl MapLifecycle {
    /// Wrap an engine handle. The controller starts `Uninitialized`.
    #[must_use]
    pub fn new(engine: Box<dyn MapEngine>) -> Self {
        let (ready_tx, _) = broadcast::channel(16);
        Self {
            engine,
            phase: MapPhase::Uninitialized,
            style: StyleReference::default(),
            viewport: Viewport::default(),
            epoch: 0,
            requested_generation: 0,
            pending_reloads: 0,
            ready_tx,
            failure: None,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> MapPhase {
        self.phase
    }

    /// Whether the controller is in `Loaded`.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.phase == MapPhase::Loaded
    }

    /// The active basemap style reference.
    #[must_use]
    pub fn style(&self) -> &StyleReference {
        &self.style
    }

    /// Count of entries into `Loaded` so far.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The latest style-request generation.
    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.requested_generation
    }

    /// The failure reason, if initialization failed.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Subscribe to readiness signals. Each subscriber sees every
    /// transition into `Loaded` exactly once.
    #[must_use]
    pub fn on_ready(&self) -> broadcast::Receiver<ReadySignal> {
        self.ready_tx.subscribe()
    }

    /// Initialize the map: wait for the container, construct the engine.
    ///
    /// Idempotent — calling while already past `Uninitialized` is a no-op.
    /// A session that previously `Failed` may be re-initialized (the reload
    /// affordance). The container is probed every 100 ms for up to ~1
    /// second; if it never appears the controller enters `Failed`.
    ///
    /// The first [`ReadySignal`] is produced later, when the engine reports
    /// its initial load through [`handle_engine_event`].
    ///
    /// [`handle_engine_event`]: MapLifecycle::handle_engine_event
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Initialization`] if the container never mounts
    /// or the engine cannot be constructed.
    pub async fn initialize(
        &mut self,
        host: &dyn ContainerHost,
        container_handle: &str,
        initial_viewport: Viewport,
        initial_style: StyleReference,
    ) -> MapResult<()> {
        match self.phase {
            MapPhase::Uninitialized | MapPhase::Failed => {}
            MapPhase::Disposed => {
                tracing::warn!("initialize called on a disposed map controller");
                return Ok(());
            }
            _ => {
                tracing::debug!(phase = ?self.phase, "map already initializing, skipping");
                return Ok(());
            }
        }

        self.failure = None;
        self.phase = MapPhase::AwaitingContainer;

        let container = self.await_container(host, container_handle).await?;

        self.phase = MapPhase::Initializing;
        self.viewport = initial_viewport;
        self.style = initial_style.clone();

        if let Err(e) = self
            .engine
            .construct(&container, &initial_viewport, &initial_style)
        {
            let reason = format!("map engine construction failed: {e}");
            tracing::error!("{reason}");
            self.fail(reason.clone());
            return Err(MapError::Initialization(reason));
        }

        tracing::info!(container = %container.id, "map engine constructed, awaiting first load");
        Ok(())
    }

    async fn await_container(
        &mut self,
        host: &dyn ContainerHost,
        handle: &str,
    ) -> MapResult<Container> {
        for attempt in 0..CONTAINER_PROBE_ATTEMPTS {
            if let Some(container) = host.resolve(handle).await {
                return Ok(container);
            }
            tracing::debug!(attempt, handle, "container not mounted yet");
            sleep(CONTAINER_PROBE_INTERVAL).await;
        }

        let reason = format!(
            "container {handle:?} did not appear within {} probes",
            CONTAINER_PROBE_ATTEMPTS
        );
        tracing::error!("{reason}");
        self.fail(reason.clone());
        Err(MapError::Initialization(reason))
    }

    /// Feed one engine event into the controller.
    ///
    /// Returns the [`ReadySignal`] when the event completed a transition
    /// into `Loaded`. Duplicated `Loaded`/`StyleLoaded` events never
    /// double-fire readiness.
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Option<ReadySignal> {
        if self.phase == MapPhase::Disposed {
            return None;
        }

        match event {
            EngineEvent::Loaded => match self.phase {
                MapPhase::Initializing => Some(self.enter_loaded()),
                _ => {
                    tracing::debug!(phase = ?self.phase, "ignoring duplicate load event");
                    None
                }
            },
            EngineEvent::StyleLoaded => match self.phase {
                MapPhase::StyleReloading => {
                    self.pending_reloads = self.pending_reloads.saturating_sub(1);
                    if self.pending_reloads == 0 {
                        Some(self.enter_loaded())
                    } else {
                        tracing::debug!(
                            pending = self.pending_reloads,
                            "style load superseded by a newer request"
                        );
                        None
                    }
                }
                // The engine also announces the initial style; readiness
                // for the first load comes from `Loaded` alone.
                _ => None,
            },
            EngineEvent::Moved(viewport) => {
                self.viewport = viewport;
                None
            }
            EngineEvent::Failed(reason) => self.handle_engine_failure(&reason),
        }
    }

    fn enter_loaded(&mut self) -> ReadySignal {
        self.phase = MapPhase::Loaded;
        self.epoch += 1;
        let signal = ReadySignal {
            epoch: self.epoch,
            generation: self.requested_generation,
        };
        tracing::info!(epoch = signal.epoch, generation = signal.generation, "map ready");
        let _ = self.ready_tx.send(signal);
        signal
    }

    fn handle_engine_failure(&mut self, reason: &str) -> Option<ReadySignal> {
        match self.phase {
            MapPhase::AwaitingContainer | MapPhase::Initializing => {
                tracing::error!("map engine failed during initialization: {reason}");
                self.fail(reason.to_string());
                None
            }
            MapPhase::StyleReloading => {
                tracing::warn!("style reload abandoned: {reason}");
                self.pending_reloads = 0;
                // Re-enter Loaded; dependents reattach on the signal.
                Some(self.enter_loaded())
            }
            _ => {
                tracing::warn!(phase = ?self.phase, "map engine error: {reason}");
                None
            }
        }
    }

    fn fail(&mut self, reason: String) {
        self.failure = Some(reason);
        self.phase = MapPhase::Failed;
    }

    /// Request a basemap style change.
    ///
    /// Allowed from `Loaded`, and from `StyleReloading` to supersede an
    /// in-flight reload — only the most recent request's completion
    /// produces a readiness signal. Previously attached overlay controls
    /// must not be assumed to survive; dependents reattach on the next
    /// [`ReadySignal`].
    ///
    /// Returns `Ok(Some(generation))` when the reload started, or
    /// `Ok(None)` when the engine rejected it — the change is abandoned
    /// and the controller stays `Loaded`, per contract.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Validation`] when called outside
    /// `Loaded`/`StyleReloading`.
    pub fn set_style(&mut self, style: StyleReference) -> MapResult<Option<u64>> {
        match self.phase {
            MapPhase::Loaded | MapPhase::StyleReloading => {}
            _ => {
                return Err(MapError::Validation(format!(
                    "style change requires a loaded map (currently {:?})",
                    self.phase
                )))
            }
        }

        if let Err(e) = self.engine.set_style(&style) {
            tracing::warn!("style change to {style} abandoned: {e}");
            return Ok(None);
        }

        self.style = style;
        self.requested_generation += 1;
        self.pending_reloads += 1;
        self.phase = MapPhase::StyleReloading;
        tracing::info!(
            generation = self.requested_generation,
            style = %self.style,
            "style reload started"
        );
        Ok(Some(self.requested_generation))
    }

    /// Re-measure the map container. Safe in any non-disposed phase; no-op
    /// before the engine exists.
    pub fn resize(&mut self) {
        if self.phase != MapPhase::Disposed && self.engine.is_constructed() {
            self.engine.resize();
        }
    }

    /// Last-known viewport. Valid from `Initializing` onward (constructor
    /// defaults before the first real camera update).
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Move the camera. No-op unless the engine exists.
    pub fn jump_to(&mut self, viewport: Viewport) {
        if self.phase != MapPhase::Disposed && self.engine.is_constructed() {
            self.engine.jump_to(&viewport);
            self.viewport = viewport;
        }
    }

    /// Whether the engine reports its style fully loaded (the draw
    /// controller's attach precondition).
    #[must_use]
    pub fn engine_style_loaded(&self) -> bool {
        self.engine.is_constructed() && self.engine.is_style_loaded()
    }

    /// Attach the terrain source, tolerating failure with a warning.
    /// Called after every readiness signal since style reloads drop it.
    pub fn ensure_terrain(&mut self) {
        if !self.is_loaded() {
            return;
        }
        if self.engine.has_terrain() {
            return;
        }
        if let Err(e) = self.engine.attach_terrain() {
            tracing::warn!("could not attach terrain: {e}");
        }
    }

    /// Whether a terrain source is attached.
    #[must_use]
    pub fn has_terrain(&self) -> bool {
        self.phase != MapPhase::Disposed && self.engine.has_terrain()
    }

    /// Query terrain elevation at a position.
    #[must_use]
    pub fn query_elevation(&self, position: LngLat) -> Option<f64> {
        if self.phase == MapPhase::Disposed {
            return None;
        }
        self.engine.query_elevation(position)
    }

    /// Release the engine instance and all listeners. Safe to call
    /// multiple times.
    pub fn dispose(&mut self) {
        if self.phase == MapPhase::Disposed {
            return;
        }
        self.engine.remove();
        self.phase = MapPhase::Disposed;
        tracing::info!("map controller disposed");
    }
}
