//! Map document storage.
//!
//! A thread-safe store of persisted maps shared across route handlers,
//! with optional JSON-file persistence per document. Every query is
//! owner-scoped: a map is only visible to the user that created it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use mapfy_core::{Center, FeatureCollection, MapDocument, MapPayload, MapSummary, StyleReference};
use uuid::Uuid;

/// Fallback camera center for documents saved without one.
const DEFAULT_CENTER: Center = Center {
    lng: -70.9,
    lat: 42.35,
};
/// Fallback zoom for documents saved without one.
const DEFAULT_ZOOM: f64 = 9.0;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested document does not exist (or belongs to someone else).
    #[error("Map not found")]
    NotFound,
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Thread-safe persisted-map storage.
#[derive(Debug, Clone, Default)]
pub struct MapStore {
    documents: Arc<RwLock<HashMap<String, MapDocument>>>,
    /// Optional directory for per-document JSON persistence.
    data_dir: Option<PathBuf>,
}

impl MapStore {
    /// Create an in-memory store (no persistence).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store persisting each document as a JSON file in
    /// `data_dir`, loading whatever is already there. The directory is
    /// created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or
    /// read.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let mut documents = HashMap::new();
        for entry in std::fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|contents| {
                    serde_json::from_str::<MapDocument>(&contents)
                        .map_err(|e| StoreError::Serialization(e.to_string()))
                }) {
                Ok(document) => {
                    documents.insert(document.id.clone(), document);
                }
                Err(e) => {
                    tracing::warn!("skipping unreadable map file {}: {e}", path.display());
                }
            }
        }
        tracing::info!(count = documents.len(), "loaded persisted maps");

        Ok(Self {
            documents: Arc::new(RwLock::new(documents)),
            data_dir: Some(data_dir),
        })
    }

    /// Create a new document for `owner` from the request payload.
    /// Missing optional fields fall back to the editor defaults.
    pub fn create(&self, owner: &str, payload: MapPayload) -> MapDocument {
        let now = Utc::now();
        let document = MapDocument {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            name: payload.name.unwrap_or_default(),
            description: payload.description.unwrap_or_default(),
            geojson: payload.geojson.unwrap_or_else(FeatureCollection::new),
            style: payload.style.unwrap_or_else(StyleReference::default),
            center: payload.center.unwrap_or(DEFAULT_CENTER),
            zoom: payload.zoom.unwrap_or(DEFAULT_ZOOM),
            is_draft: payload.is_draft.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };

        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.id.clone(), document.clone());
        self.persist(&document);
        document
    }

    /// Fetch one of `owner`'s documents.
    #[must_use]
    pub fn get(&self, owner: &str, id: &str) -> Option<MapDocument> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .filter(|d| d.owner == owner)
            .cloned()
    }

    /// Apply a partial update to one of `owner`'s documents. Absent
    /// payload fields keep their stored values; an empty name is ignored
    /// rather than applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the document does not exist
    /// or belongs to another user.
    pub fn update(
        &self,
        owner: &str,
        id: &str,
        payload: MapPayload,
    ) -> Result<MapDocument, StoreError> {
        let updated = {
            let mut documents = self
                .documents
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let document = documents
                .get_mut(id)
                .filter(|d| d.owner == owner)
                .ok_or(StoreError::NotFound)?;

            if let Some(name) = payload.name.filter(|n| !n.trim().is_empty()) {
                document.name = name;
            }
            if let Some(description) = payload.description {
                document.description = description;
            }
            if let Some(geojson) = payload.geojson {
                document.geojson = geojson;
            }
            if let Some(style) = payload.style {
                document.style = style;
            }
            if let Some(center) = payload.center {
                document.center = center;
            }
            if let Some(zoom) = payload.zoom {
                document.zoom = zoom;
            }
            if let Some(is_draft) = payload.is_draft {
                document.is_draft = is_draft;
            }
            document.updated_at = Utc::now();
            document.clone()
        };

        self.persist(&updated);
        Ok(updated)
    }

    /// Delete one of `owner`'s documents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the document does not exist
    /// or belongs to another user.
    pub fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        {
            let mut documents = self
                .documents
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !documents.get(id).is_some_and(|d| d.owner == owner) {
                return Err(StoreError::NotFound);
            }
            documents.remove(id);
        }
        self.delete_file(id);
        Ok(())
    }

    /// List `owner`'s documents, most recently updated first.
    #[must_use]
    pub fn list(&self, owner: &str) -> Vec<MapSummary> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut summaries: Vec<MapSummary> = documents
            .values()
            .filter(|d| d.owner == owner)
            .map(MapSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Total number of stored documents (all owners).
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, document: &MapDocument) {
        let Some(ref data_dir) = self.data_dir else {
            return;
        };
        let json = match serde_json::to_string_pretty(document) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to serialize map {}: {e}", document.id);
                return;
            }
        };
        let path = data_dir.join(format!("{}.json", document.id));
        if let Err(e) = std::fs::write(&path, json) {
            tracing::warn!("failed to persist map {} to {}: {e}", document.id, path.display());
        }
    }

    fn delete_file(&self, id: &str) {
        let Some(ref data_dir) = self.data_dir else {
            return;
        };
        let path = data_dir.join(format!("{id}.json"));
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("failed to delete map file {}: {e}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> MapPayload {
        MapPayload {
            name: Some(name.to_string()),
            geojson: Some(FeatureCollection::new()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_fills_defaults() {
        let store = MapStore::new();
        let document = store.create("u-1", named("Harbor"));

        assert_eq!(document.name, "Harbor");
        assert_eq!(document.owner, "u-1");
        assert!((document.zoom - DEFAULT_ZOOM).abs() < f64::EPSILON);
        assert!((document.center.lng - DEFAULT_CENTER.lng).abs() < f64::EPSILON);
        assert!(!document.is_draft);
        assert_eq!(document.created_at, document.updated_at);
    }

    #[test]
    fn test_get_is_owner_scoped() {
        let store = MapStore::new();
        let document = store.create("u-1", named("Harbor"));

        assert!(store.get("u-1", &document.id).is_some());
        assert!(store.get("u-2", &document.id).is_none());
    }

    #[test]
    fn test_update_is_partial() {
        let store = MapStore::new();
        let document = store.create("u-1", named("Harbor"));

        let updated = store
            .update(
                "u-1",
                &document.id,
                MapPayload {
                    description: Some("the docks".into()),
                    zoom: Some(13.0),
                    ..Default::default()
                },
            )
            .expect("update");

        assert_eq!(updated.name, "Harbor");
        assert_eq!(updated.description, "the docks");
        assert!((updated.zoom - 13.0).abs() < f64::EPSILON);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn test_update_ignores_empty_name() {
        let store = MapStore::new();
        let document = store.create("u-1", named("Harbor"));

        let updated = store
            .update(
                "u-1",
                &document.id,
                MapPayload {
                    name: Some("   ".into()),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.name, "Harbor");
    }

    #[test]
    fn test_update_foreign_map_is_not_found() {
        let store = MapStore::new();
        let document = store.create("u-1", named("Harbor"));

        let result = store.update("u-2", &document.id, named("Stolen"));
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn test_delete_is_owner_scoped() {
        let store = MapStore::new();
        let document = store.create("u-1", named("Harbor"));

        assert!(matches!(
            store.delete("u-2", &document.id),
            Err(StoreError::NotFound)
        ));
        store.delete("u-1", &document.id).expect("delete");
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_orders_by_update_time_desc() {
        let store = MapStore::new();
        let first = store.create("u-1", named("First"));
        let _second = store.create("u-1", named("Second"));
        store.create("u-2", named("Other user"));

        // Touch the first document so it becomes the most recent.
        store
            .update(
                "u-1",
                &first.id,
                MapPayload {
                    description: Some("touched".into()),
                    ..Default::default()
                },
            )
            .expect("update");

        let listed = store.list("u-1");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "First");
        assert!(listed[0].updated_at >= listed[1].updated_at);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = {
            let store = MapStore::with_data_dir(dir.path()).expect("store");
            store.create("u-1", named("Persisted")).id
        };

        let reloaded = MapStore::with_data_dir(dir.path()).expect("reload");
        let document = reloaded.get("u-1", &id).expect("document survived");
        assert_eq!(document.name, "Persisted");
    }

    #[test]
    fn test_persistence_delete_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MapStore::with_data_dir(dir.path()).expect("store");
        let document = store.create("u-1", named("Ephemeral"));

        let path = dir.path().join(format!("{}.json", document.id));
        assert!(path.exists());

        store.delete("u-1", &document.id).expect("delete");
        assert!(!path.exists());
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("garbage.json"), "{not json").expect("write");

        let store = MapStore::with_data_dir(dir.path()).expect("store");
        assert!(store.is_empty());
    }
}
