//! Explicit session context for authenticated API calls.
//!
//! Passed to the persistence coordinator and the API clients instead of
//! ambient global state; the core only needs "current user id or none"
//! plus the bearer credential to forward.

use serde::{Deserialize, Serialize};

/// The signed-in user as reported by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Server-assigned user ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Authentication state carried through the editor session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<UserIdentity>,
    token: Option<String>,
}

impl Session {
    /// An unauthenticated session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session for a signed-in user holding a bearer token.
    #[must_use]
    pub fn authenticated(user: UserIdentity, token: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            token: Some(token.into()),
        }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    /// The signed-in user's ID, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    /// The bearer token to send with API calls, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Drop the credentials (sign out, or the server rejected the token).
    pub fn clear(&mut self) {
        self.user = None;
        self.token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserIdentity {
        UserIdentity {
            id: "u-1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            avatar: None,
        }
    }

    #[test]
    fn test_anonymous_session() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        assert!(session.user_id().is_none());
        assert!(session.token().is_none());
    }

    #[test]
    fn test_authenticated_session() {
        let mut session = Session::authenticated(user(), "tok-123");
        assert!(session.is_authenticated());
        assert_eq!(session.user_id(), Some("u-1"));
        assert_eq!(session.token(), Some("tok-123"));

        session.clear();
        assert!(!session.is_authenticated());
    }
}
