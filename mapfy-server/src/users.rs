//! User account storage.
//!
//! Accounts live in a thread-safe map keyed by ID, with an email index
//! and optional single-file JSON persistence. Password hashes never leave
//! this module's records unredacted — handlers convert to
//! [`UserIdentity`] before responding.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use mapfy_core::UserIdentity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur during user store operations.
#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    /// The email address is already registered.
    #[error("Email is already in use")]
    EmailTaken,
    /// No account matches.
    #[error("User not found")]
    NotFound,
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A stored user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Server-assigned ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address, stored lowercased.
    pub email: String,
    /// bcrypt password hash.
    pub password_hash: String,
    /// Linked Google account ID, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    /// Avatar URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// The public identity of this account.
    #[must_use]
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Thread-safe user account storage.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
    /// Optional file for JSON persistence.
    data_file: Option<PathBuf>,
}

impl UserStore {
    /// Create an in-memory store (no persistence).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store persisting to a JSON file, loading it if present.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Io`] when the file exists but cannot be
    /// read, or [`UserStoreError::Serialization`] when it cannot be
    /// parsed.
    pub fn with_data_file(data_file: impl Into<PathBuf>) -> Result<Self, UserStoreError> {
        let data_file = data_file.into();
        let users = if data_file.exists() {
            let contents = std::fs::read_to_string(&data_file)?;
            let records: Vec<UserRecord> = serde_json::from_str(&contents)
                .map_err(|e| UserStoreError::Serialization(e.to_string()))?;
            records.into_iter().map(|r| (r.id.clone(), r)).collect()
        } else {
            HashMap::new()
        };
        tracing::info!(count = users.len(), "loaded user accounts");

        Ok(Self {
            users: Arc::new(RwLock::new(users)),
            data_file: Some(data_file),
        })
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::EmailTaken`] when the email is already
    /// registered.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password_hash: String,
    ) -> Result<UserRecord, UserStoreError> {
        let email = email.trim().to_lowercase();
        let record = {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            if users.values().any(|u| u.email == email) {
                return Err(UserStoreError::EmailTaken);
            }
            let record = UserRecord {
                id: Uuid::new_v4().to_string(),
                name: name.trim().to_string(),
                email,
                password_hash,
                google_id: None,
                avatar: None,
                created_at: Utc::now(),
            };
            users.insert(record.id.clone(), record.clone());
            record
        };
        self.persist();
        Ok(record)
    }

    /// Find an account by email (case-insensitive).
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let email = email.trim().to_lowercase();
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Fetch an account by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<UserRecord> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Link or create an account from a Google sign-in: an existing
    /// account (by email) gets the Google ID attached, otherwise a new
    /// account is created with an unusable random password hash.
    pub fn upsert_google(
        &self,
        google_id: &str,
        name: &str,
        email: &str,
        avatar: Option<String>,
        placeholder_hash: String,
    ) -> UserRecord {
        let record = {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            let normalized = email.trim().to_lowercase();

            if let Some(existing) = users.values_mut().find(|u| u.email == normalized) {
                existing.google_id = Some(google_id.to_string());
                if existing.avatar.is_none() {
                    existing.avatar = avatar;
                }
                existing.clone()
            } else {
                let record = UserRecord {
                    id: Uuid::new_v4().to_string(),
                    name: name.trim().to_string(),
                    email: normalized,
                    password_hash: placeholder_hash,
                    google_id: Some(google_id.to_string()),
                    avatar,
                    created_at: Utc::now(),
                };
                users.insert(record.id.clone(), record.clone());
                record
            }
        };
        self.persist();
        record
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no accounts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self) {
        let Some(ref data_file) = self.data_file else {
            return;
        };
        let records: Vec<UserRecord> = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        match serde_json::to_string_pretty(&records) {
            Ok(json) => {
                if let Err(e) = std::fs::write(data_file, json) {
                    tracing::warn!("failed to persist users to {}: {e}", data_file.display());
                }
            }
            Err(e) => tracing::warn!("failed to serialize users: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_find() {
        let store = UserStore::new();
        let record = store
            .register("Ada", "Ada@Example.com", "hash".into())
            .expect("register");

        assert_eq!(record.email, "ada@example.com");
        assert!(store.find_by_email("ADA@example.COM").is_some());
        assert!(store.get(&record.id).is_some());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = UserStore::new();
        store
            .register("Ada", "ada@example.com", "hash".into())
            .expect("register");
        let err = store
            .register("Imposter", "ada@example.com", "hash2".into())
            .expect_err("duplicate");
        assert!(matches!(err, UserStoreError::EmailTaken));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_google_upsert_links_existing_account() {
        let store = UserStore::new();
        let existing = store
            .register("Ada", "ada@example.com", "hash".into())
            .expect("register");

        let linked = store.upsert_google(
            "google-1",
            "Ada L",
            "ada@example.com",
            Some("https://avatar/a.png".into()),
            "placeholder".into(),
        );

        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.google_id.as_deref(), Some("google-1"));
        // The original password hash survives the link.
        assert_eq!(linked.password_hash, "hash");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_google_upsert_creates_new_account() {
        let store = UserStore::new();
        let created = store.upsert_google(
            "google-2",
            "Grace",
            "grace@example.com",
            None,
            "placeholder".into(),
        );
        assert_eq!(created.email, "grace@example.com");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("users.json");
        {
            let store = UserStore::with_data_file(&file).expect("store");
            store
                .register("Ada", "ada@example.com", "hash".into())
                .expect("register");
        }

        let reloaded = UserStore::with_data_file(&file).expect("reload");
        assert!(reloaded.find_by_email("ada@example.com").is_some());
    }

    #[test]
    fn test_identity_has_no_password_material() {
        let store = UserStore::new();
        let record = store
            .register("Ada", "ada@example.com", "secret-hash".into())
            .expect("register");
        let identity = record.identity();
        let json = serde_json::to_string(&identity).expect("serialize");
        assert!(!json.contains("secret-hash"));
    }
}
