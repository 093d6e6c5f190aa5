use crate::model::{Session, User};
use crate::storage::KvStore;
use anyhow::{Context as _, Result};

pub const USER_KEY: &str = "tickpay_user";
pub const TOKEN_KEY: &str = "tickpay_token";

/// Persists the signed-in session as two keys that always move together
pub struct SessionStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read back a persisted session.
    ///
    /// `Ok(None)` unless both keys hold a non-empty value. A stored user that no longer
    /// decodes is an error; callers treat it as signed out.
    pub fn restore(&self) -> Result<Option<Session>> {
        let user = self.store.get(USER_KEY)?.filter(|v| !v.is_empty());
        let token = self.store.get(TOKEN_KEY)?.filter(|v| !v.is_empty());

        match (user, token) {
            (Some(user), Some(token)) => {
                let user: User = serde_json::from_str(&user)
                    .with_context(|| format!("stored {} is not a valid user", USER_KEY))?;
                Ok(Some(Session::new(user, token)))
            }
            _ => Ok(None),
        }
    }

    /// Write both halves of the session
    pub fn persist(&mut self, session: &Session) -> Result<()> {
        let user = serde_json::to_string(&session.user)?;

        self.store.set(USER_KEY, &user)?;
        if let Err(e) = self.store.set(TOKEN_KEY, &session.token) {
            let _ = self.store.remove(USER_KEY);
            return Err(e);
        }
        Ok(())
    }

    /// Remove both keys, whichever of them exist
    pub fn clear(&mut self) -> Result<()> {
        let user = self.store.remove(USER_KEY);
        let token = self.store.remove(TOKEN_KEY);
        user.and(token)
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const ANN: &str = r#"{"id":1,"username":"Ann","email":"a@a.com","avatar_id":2}"#;

    fn ann() -> Session {
        Session::new(serde_json::from_str(ANN).unwrap(), "tok")
    }

    #[test]
    fn test_restore_requires_both_keys() {
        let mut only_user = MemoryStore::new();
        only_user.set(USER_KEY, ANN).unwrap();
        assert!(SessionStore::new(only_user).restore().unwrap().is_none());

        let mut only_token = MemoryStore::new();
        only_token.set(TOKEN_KEY, "tok").unwrap();
        assert!(SessionStore::new(only_token).restore().unwrap().is_none());

        assert!(SessionStore::new(MemoryStore::new())
            .restore()
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_restore_treats_empty_values_as_absent() {
        let mut empty_token = MemoryStore::new();
        empty_token.set(USER_KEY, ANN).unwrap();
        empty_token.set(TOKEN_KEY, "").unwrap();
        assert!(SessionStore::new(empty_token).restore().unwrap().is_none());

        let mut empty_user = MemoryStore::new();
        empty_user.set(USER_KEY, "").unwrap();
        empty_user.set(TOKEN_KEY, "tok").unwrap();
        assert!(SessionStore::new(empty_user).restore().unwrap().is_none());
    }

    #[test]
    fn test_restore_full_session() {
        let mut store = MemoryStore::new();
        store.set(USER_KEY, ANN).unwrap();
        store.set(TOKEN_KEY, "tok").unwrap();

        let session = SessionStore::new(store).restore().unwrap().unwrap();
        assert_eq!(session.user.username, "Ann");
        assert_eq!(session.user.avatar_id, 2);
        assert_eq!(session.token, "tok");
    }

    #[test]
    fn test_restore_corrupt_user_is_error() {
        let mut store = MemoryStore::new();
        store.set(USER_KEY, "{broken").unwrap();
        store.set(TOKEN_KEY, "tok").unwrap();
        assert!(SessionStore::new(store).restore().is_err());
    }

    #[test]
    fn test_persist_then_restore() {
        let mut sessions = SessionStore::new(MemoryStore::new());
        sessions.persist(&ann()).unwrap();
        assert!(sessions.inner().contains(USER_KEY));
        assert!(sessions.inner().contains(TOKEN_KEY));
        assert_eq!(sessions.restore().unwrap(), Some(ann()));
    }

    #[test]
    fn test_clear_removes_both_even_if_one_missing() {
        let mut store = MemoryStore::new();
        store.set(TOKEN_KEY, "stale").unwrap();
        let mut sessions = SessionStore::new(store);

        sessions.clear().unwrap();
        assert!(!sessions.inner().contains(USER_KEY));
        assert!(!sessions.inner().contains(TOKEN_KEY));
    }

    /// Store whose writes to one key always fail
    struct FailingKey {
        inner: MemoryStore,
        broken: &'static str,
    }

    impl KvStore for FailingKey {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }
        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if key == self.broken {
                anyhow::bail!("disk full");
            }
            self.inner.set(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_persist_rolls_back_user_when_token_write_fails() {
        let mut sessions = SessionStore::new(FailingKey {
            inner: MemoryStore::new(),
            broken: TOKEN_KEY,
        });

        assert!(sessions.persist(&ann()).is_err());
        assert!(!sessions.inner().inner.contains(USER_KEY));
        assert!(!sessions.inner().inner.contains(TOKEN_KEY));
        assert!(sessions.restore().unwrap().is_none());
    }
}
