//! Namespaced temporary storage for onboarding progress.
//!
//! Steps keep their transient state (done/skipped flags, submitted data) in an
//! [`OnboardingStorage`]. The default implementation, [`SessionStorage`],
//! scopes every key under a per-process namespace inside a
//! [`SessionBackend`], so several onboarding processes can share one session
//! without seeing each other's keys.

use std::sync::Arc;

use serde_json::Value;

use crate::error::StorageError;

pub mod session;

pub use session::{FileSession, MemorySession, Namespace, SessionBackend};

/// Key-value store holding one onboarding process's transient state.
///
/// Methods take `&self` so a single storage handle can be shared by every
/// step of a sequencer; implementations use interior mutability.
pub trait OnboardingStorage: Send + Sync {
    /// Value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Remove `key`, returning the previous value
    fn remove(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// All entries in the namespace
    fn items(&self) -> Result<Vec<(String, Value)>, StorageError>;

    /// Drop every entry in the namespace
    fn clear(&self) -> Result<(), StorageError>;

    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Value under `key`, or `default` when absent
    fn get_or(&self, key: &str, default: Value) -> Result<Value, StorageError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Remove `key`; fails with [`StorageError::KeyNotFound`] when absent
    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.remove(key)? {
            Some(_) => Ok(()),
            None => Err(StorageError::KeyNotFound(key.to_string())),
        }
    }

    /// Remove `key` and return its value, or `default` when absent
    fn pop(&self, key: &str, default: Option<Value>) -> Result<Option<Value>, StorageError> {
        Ok(self.remove(key)?.or(default))
    }

    /// Return the value under `key`, storing `value` first if absent
    fn setdefault(&self, key: &str, value: Value) -> Result<Value, StorageError> {
        if let Some(existing) = self.get(key)? {
            return Ok(existing);
        }
        self.set(key, value.clone())?;
        Ok(value)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items()?.into_iter().map(|(k, _)| k).collect())
    }

    fn values(&self) -> Result<Vec<Value>, StorageError> {
        Ok(self.items()?.into_iter().map(|(_, v)| v).collect())
    }
}

/// Storage scoped to one process id inside a session backend.
///
/// The namespace lives under the session key `onboarding_{process_id}` and
/// is created empty on construction when missing.
pub struct SessionStorage {
    backend: Arc<dyn SessionBackend>,
    session_key: String,
}

impl SessionStorage {
    /// Open (and lazily create) the namespace for `process_id`
    pub fn new(process_id: &str, backend: Arc<dyn SessionBackend>) -> Result<Self, StorageError> {
        let session_key = Self::session_key_for(process_id);
        if backend.load(&session_key)?.is_none() {
            tracing::debug!(session_key = %session_key, "creating onboarding namespace");
            backend.store(&session_key, Namespace::new())?;
        }
        Ok(Self {
            backend,
            session_key,
        })
    }

    /// Session key under which a process's namespace is kept
    pub fn session_key_for(process_id: &str) -> String {
        format!("onboarding_{}", process_id)
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    fn namespace(&self) -> Result<Namespace, StorageError> {
        Ok(self.backend.load(&self.session_key)?.unwrap_or_default())
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Namespace) -> T) -> Result<T, StorageError> {
        let mut namespace = self.namespace()?;
        let out = f(&mut namespace);
        self.backend.store(&self.session_key, namespace)?;
        Ok(out)
    }
}

impl OnboardingStorage for SessionStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.namespace()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.modify(|ns| {
            ns.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.modify(|ns| ns.remove(key))
    }

    fn items(&self) -> Result<Vec<(String, Value)>, StorageError> {
        Ok(self.namespace()?.into_iter().collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.backend.store(&self.session_key, Namespace::new())
    }

    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.namespace()?.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn storage(process_id: &str) -> (MemorySession, SessionStorage) {
        let session = MemorySession::new();
        let storage = SessionStorage::new(process_id, Arc::new(session.clone())).unwrap();
        (session, storage)
    }

    #[test]
    fn test_namespace_created_on_open() {
        let (session, storage) = storage("shop_setup");
        assert_eq!(storage.session_key(), "onboarding_shop_setup");
        assert_eq!(session.raw("onboarding_shop_setup"), Some(Namespace::new()));
    }

    #[test]
    fn test_existing_namespace_is_kept() {
        let session = MemorySession::new();
        let backend: Arc<dyn SessionBackend> = Arc::new(session.clone());

        let first = SessionStorage::new("shop_setup", backend.clone()).unwrap();
        first.set("a", json!(1)).unwrap();

        let second = SessionStorage::new("shop_setup", backend).unwrap();
        assert_eq!(second.get("a").unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_set_get_contains() {
        let (_, storage) = storage("p");
        assert!(!storage.contains("k").unwrap());
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", json!({"v": true})).unwrap();
        assert!(storage.contains("k").unwrap());
        assert_eq!(storage.get("k").unwrap(), Some(json!({"v": true})));
        assert_eq!(storage.get_or("other", json!(0)).unwrap(), json!(0));
    }

    #[test]
    fn test_delete_missing_key_fails() {
        let (_, storage) = storage("p");
        let err = storage.delete("nope").unwrap_err();
        assert!(matches!(err, StorageError::KeyNotFound(k) if k == "nope"));

        storage.set("k", json!(1)).unwrap();
        storage.delete("k").unwrap();
        assert!(!storage.contains("k").unwrap());
    }

    #[test]
    fn test_pop_and_setdefault() {
        let (_, storage) = storage("p");
        assert_eq!(storage.pop("k", Some(json!("d"))).unwrap(), Some(json!("d")));

        assert_eq!(storage.setdefault("k", json!(1)).unwrap(), json!(1));
        assert_eq!(storage.setdefault("k", json!(2)).unwrap(), json!(1));
        assert_eq!(storage.pop("k", None).unwrap(), Some(json!(1)));
        assert!(!storage.contains("k").unwrap());
    }

    #[test]
    fn test_keys_values_items() {
        let (_, storage) = storage("p");
        storage.set("a", json!(1)).unwrap();
        storage.set("b", json!(2)).unwrap();

        let mut keys = storage.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(storage.values().unwrap().len(), 2);
        assert_eq!(storage.items().unwrap().len(), 2);
    }

    #[test]
    fn test_clear_only_touches_own_namespace() {
        let session = MemorySession::new();
        let backend: Arc<dyn SessionBackend> = Arc::new(session.clone());
        let shop = SessionStorage::new("shop_setup", backend.clone()).unwrap();
        let vendor = SessionStorage::new("vendor_setup", backend).unwrap();

        shop.set("k", json!(1)).unwrap();
        vendor.set("k", json!(2)).unwrap();
        shop.clear().unwrap();

        assert!(shop.items().unwrap().is_empty());
        assert_eq!(vendor.get("k").unwrap(), Some(json!(2)));
        assert_eq!(session.raw("onboarding_shop_setup"), Some(Namespace::new()));
    }

    #[test]
    fn test_namespace_recreated_if_dropped_by_backend() {
        let (session, storage) = storage("p");
        session.forget("onboarding_p");
        assert!(!storage.contains("k").unwrap());
        storage.set("k", json!(1)).unwrap();
        assert_eq!(storage.get("k").unwrap(), Some(json!(1)));
    }
}
