//! Persistence coordinator.
//!
//! Translates between in-memory editor state and the CRUD API's document
//! shape, with single-flight save semantics per session. The coordinator
//! never mutates the feature set directly — every restore goes through the
//! draw controller's bulk-replace, and a restore that races a style reload
//! is sequenced behind that reload's readiness signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::MapsApi;
use crate::document::{Center, MapDocument, MapPayload, MapSummary};
use crate::draw::DrawTools;
use crate::error::{MapError, MapResult};
use crate::lifecycle::MapLifecycle;
use crate::session::Session;

/// Name given to autosaved drafts that were never explicitly named.
const DEFAULT_DRAFT_NAME: &str = "Untitled map";

/// The map document this editor session is associated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedMapRef {
    /// Server-side document ID.
    pub id: String,
    /// Name used on the last save.
    pub name: String,
    /// Description used on the last save.
    pub description: String,
}

/// Clears the in-flight flag when a save completes, errors included.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates save/load/autosave/delete/list against the CRUD API.
pub struct PersistenceCoordinator {
    api: Arc<dyn MapsApi>,
    session: Mutex<Session>,
    current: Mutex<Option<SavedMapRef>>,
    save_in_flight: AtomicBool,
}

impl PersistenceCoordinator {
    /// Create a coordinator for the given API client and session.
    #[must_use]
    pub fn new(api: Arc<dyn MapsApi>, session: Session) -> Self {
        Self {
            api,
            session: Mutex::new(session),
            current: Mutex::new(None),
            save_in_flight: AtomicBool::new(false),
        }
    }

    /// Replace the session (sign-in or sign-out).
    pub fn set_session(&self, session: Session) {
        *self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn session_snapshot(&self) -> Session {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The map this session is currently associated with, if it has been
    /// saved or loaded.
    #[must_use]
    pub fn current_map(&self) -> Option<SavedMapRef> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a save is currently in flight.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.save_in_flight.load(Ordering::SeqCst)
    }

    fn require_authenticated(&self, session: &Session) -> MapResult<()> {
        if session.is_authenticated() {
            Ok(())
        } else {
            Err(MapError::Unauthorized(
                "sign in to save maps to your account".into(),
            ))
        }
    }

    fn begin_save(&self) -> MapResult<InFlightGuard<'_>> {
        if self.save_in_flight.swap(true, Ordering::SeqCst) {
            return Err(MapError::Busy("save"));
        }
        Ok(InFlightGuard(&self.save_in_flight))
    }

    fn snapshot_payload(
        &self,
        draw: &DrawTools,
        map: &MapLifecycle,
        name: String,
        description: String,
        is_draft: bool,
    ) -> MapPayload {
        let viewport = map.viewport();
        MapPayload {
            name: Some(name),
            description: Some(description),
            geojson: Some(draw.all_features()),
            style: Some(map.style().clone()),
            center: Some(Center::from(viewport)),
            zoom: Some(viewport.zoom),
            is_draft: Some(is_draft),
        }
    }

    async fn put_document(&self, session: &Session, payload: MapPayload) -> MapResult<MapDocument> {
        let existing = self.current_map().map(|m| m.id);
        let document = match existing {
            Some(id) => self.api.update(session, &id, payload).await?,
            None => self.api.create(session, payload).await?,
        };

        *self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(SavedMapRef {
            id: document.id.clone(),
            name: document.name.clone(),
            description: document.description.clone(),
        });
        Ok(document)
    }

    /// Save the current editor state under the given name.
    ///
    /// The first save of a session creates a document; later saves update
    /// it in place. A save already in flight causes an immediate
    /// [`MapError::Busy`] — never a queue, never a silent drop.
    ///
    /// # Errors
    ///
    /// [`MapError::Validation`] for an empty name (no network call),
    /// [`MapError::Unauthorized`] without a signed-in user, or the
    /// translated network failure.
    pub async fn save(
        &self,
        name: &str,
        description: &str,
        draw: &DrawTools,
        map: &MapLifecycle,
    ) -> MapResult<MapDocument> {
        let session = self.session_snapshot();
        self.require_authenticated(&session)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(MapError::Validation(
                "please enter a name for your map".into(),
            ));
        }

        let _guard = self.begin_save()?;
        let payload =
            self.snapshot_payload(draw, map, name.to_string(), description.trim().to_string(), false);

        tracing::info!(name, "saving map");
        let document = self.put_document(&session, payload).await?;
        tracing::info!(id = %document.id, "map saved");
        Ok(document)
    }

    /// Autosave the current editor state as a draft.
    ///
    /// Synthesizes a default name when the session has none, and is a
    /// silent no-op (`Ok(None)`) when the canvas is empty — empty drafts
    /// are never persisted.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`save`](Self::save), minus name validation.
    pub async fn autosave(
        &self,
        draw: &DrawTools,
        map: &MapLifecycle,
    ) -> MapResult<Option<MapDocument>> {
        let session = self.session_snapshot();
        self.require_authenticated(&session)?;

        let features = draw.all_features();
        if features.is_empty() {
            tracing::debug!("autosave skipped: canvas is empty");
            return Ok(None);
        }

        let _guard = self.begin_save()?;
        let (name, description) = match self.current_map() {
            Some(current) => (current.name, current.description),
            None => (DEFAULT_DRAFT_NAME.to_string(), String::new()),
        };
        let payload = self.snapshot_payload(draw, map, name, description, true);

        tracing::debug!("autosaving draft");
        let document = self.put_document(&session, payload).await?;
        Ok(Some(document))
    }

    /// Load a persisted map into the editor.
    ///
    /// Applies the saved viewport immediately and requests the saved
    /// style; the feature restore is staged on the draw controller and
    /// applied only after that reload's readiness signal — restoring
    /// before the overlay reattaches would be a lost write. If the style
    /// change is abandoned by the engine, the features are applied
    /// directly to the still-attached overlay.
    ///
    /// On any fetch failure the in-memory editor state is left untouched.
    ///
    /// # Errors
    ///
    /// [`MapError::Unauthorized`] without a signed-in user, or the
    /// translated network failure (including not-found).
    pub async fn load(
        &self,
        id: &str,
        draw: &mut DrawTools,
        map: &mut MapLifecycle,
    ) -> MapResult<MapDocument> {
        let session = self.session_snapshot();
        self.require_authenticated(&session)?;

        let document = self.api.fetch(&session, id).await?;

        *self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(SavedMapRef {
            id: document.id.clone(),
            name: document.name.clone(),
            description: document.description.clone(),
        });

        match map.set_style(document.style.clone())? {
            Some(generation) => {
                draw.stage_restore(generation, document.geojson.clone());
                tracing::info!(id, generation, "map loaded, restore staged behind style reload");
            }
            None => {
                // Reload abandoned; the overlay is still live.
                draw.set_all_features(document.geojson.clone())?;
                tracing::info!(id, "map loaded onto the current style");
            }
        }
        map.jump_to(document.viewport());

        Ok(document)
    }

    /// Delete a persisted map. If it is the one this session is associated
    /// with, the session reverts to an unsaved state.
    ///
    /// # Errors
    ///
    /// [`MapError::Unauthorized`] without a signed-in user, or the
    /// translated network failure.
    pub async fn delete(&self, id: &str) -> MapResult<()> {
        let session = self.session_snapshot();
        self.require_authenticated(&session)?;

        self.api.delete(&session, id).await?;

        let mut current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|m| m.id == id) {
            *current = None;
            tracing::info!(id, "deleted the session's current map");
        }
        Ok(())
    }

    /// List the current user's maps, most recently updated first.
    ///
    /// # Errors
    ///
    /// [`MapError::Unauthorized`] without a signed-in user, or the
    /// translated network failure.
    pub async fn list(&self) -> MapResult<Vec<MapSummary>> {
        let session = self.session_snapshot();
        self.require_authenticated(&session)?;
        self.api.list(&session).await
    }
}
