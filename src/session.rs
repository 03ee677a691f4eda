//! Auth session lifecycle.
//!
//! The session is a plain value created at startup and passed to whatever
//! needs it. `SessionStore` owns persistence; `SessionHandle` is the shared
//! read view the API client consults on every request, so a login or logout
//! takes effect immediately without rebuilding the client.

use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::{SatchelError, SatchelResult};
use crate::storage::{KeyValueStore, THEME_KEY, TOKEN_KEY, USERNAME_KEY};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
}

impl Session {
    /// Token absence implies unauthenticated; protected views check this
    /// before issuing any request.
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn require_token(&self) -> SatchelResult<&str> {
        if self.token.is_empty() {
            return Err(SatchelError::Unauthorized);
        }
        Ok(&self.token)
    }
}

/// Shared read view of the current session.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn current(&self) -> Session {
        self.inner.read().unwrap().clone()
    }

    pub fn token(&self) -> Option<String> {
        let session = self.inner.read().unwrap();
        if session.token.is_empty() {
            None
        } else {
            Some(session.token.clone())
        }
    }

    fn replace(&self, session: Session) {
        *self.inner.write().unwrap() = session;
    }
}

/// Loads the session at startup, persists login/logout, keeps the shared
/// handle in sync.
pub struct SessionStore {
    store: KeyValueStore,
    handle: SessionHandle,
}

impl SessionStore {
    pub fn open(state_dir: &Path) -> Self {
        let store = KeyValueStore::open(state_dir);
        let handle = SessionHandle::default();
        handle.replace(Session {
            token: store.get(TOKEN_KEY),
            username: store.get(USERNAME_KEY),
        });
        Self { store, handle }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn current(&self) -> Session {
        self.handle.current()
    }

    pub fn login(&mut self, token: &str, username: &str) -> SatchelResult<Session> {
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(USERNAME_KEY, username)?;
        let session = Session {
            token: token.to_string(),
            username: username.to_string(),
        };
        self.handle.replace(session.clone());
        Ok(session)
    }

    /// Local-only invalidation; no server round-trip is required for logout
    /// to take effect.
    pub fn logout(&mut self) -> SatchelResult<Session> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USERNAME_KEY)?;
        let session = Session::default();
        self.handle.replace(session.clone());
        Ok(session)
    }

    pub fn theme(&self) -> String {
        self.store.get(THEME_KEY)
    }

    pub fn set_theme(&mut self, theme: &str) -> SatchelResult<()> {
        self.store.set(THEME_KEY, theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_login_then_logout_is_local_only() {
        let dir = tempdir().unwrap();
        let mut store = SessionStore::open(dir.path());
        assert!(!store.current().is_authenticated());

        store.login("tok-1", "admin").unwrap();
        assert!(store.current().is_authenticated());
        assert_eq!(store.current().username, "admin");

        // No network client exists here at all; logout still takes effect.
        store.logout().unwrap();
        assert!(!store.current().is_authenticated());
        assert_eq!(store.current().token, "");
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut store = SessionStore::open(dir.path());
            store.login("tok-2", "casey").unwrap();
        }
        let store = SessionStore::open(dir.path());
        let session = store.current();
        assert_eq!(session.token, "tok-2");
        assert_eq!(session.username, "casey");
    }

    #[test]
    fn test_handle_tracks_store() {
        let dir = tempdir().unwrap();
        let mut store = SessionStore::open(dir.path());
        let handle = store.handle();
        assert_eq!(handle.token(), None);

        store.login("tok-3", "admin").unwrap();
        assert_eq!(handle.token().as_deref(), Some("tok-3"));

        store.logout().unwrap();
        assert_eq!(handle.token(), None);
    }

    #[test]
    fn test_require_token_gates_unauthenticated() {
        let session = Session::default();
        assert!(matches!(
            session.require_token(),
            Err(SatchelError::Unauthorized)
        ));
    }

    #[test]
    fn test_theme_preference_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = SessionStore::open(dir.path());
        assert_eq!(store.theme(), "");
        store.set_theme("light").unwrap();
        assert_eq!(store.theme(), "light");
    }
}
