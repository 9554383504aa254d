//! # Request Metadata
//!
//! Typed, session-scoped storage that middlewares use to hand data to
//! later middlewares and to the route handler (auth claims, permission
//! flags, tenant ids, ...).
//!
//! A session is handled by exactly one task at a time, so the map is owned
//! by the request context and needs no locking.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Named, type-erased values attached to a request
///
/// # Example
///
/// ```
/// use edgerouter_core::Metadata;
///
/// let mut meta = Metadata::new();
/// meta.set("is_admin", true);
/// assert_eq!(meta.get::<bool>("is_admin"), Some(&true));
/// ```
#[derive(Default)]
pub struct Metadata {
    named: HashMap<String, Box<dyn Any + Send + Sync>>,
    typed: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Metadata {
    /// Create an empty metadata map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under a string key
    ///
    /// Overwrites any existing value with the same key.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.named.insert(key.into(), Box::new(value));
    }

    /// Borrow a value by key
    ///
    /// Returns `None` if key doesn't exist or type doesn't match.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.named.get(key).and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Check if a key exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.named.contains_key(key)
    }

    /// Remove a value by key
    pub fn remove(&mut self, key: &str) -> bool {
        self.named.remove(key).is_some()
    }

    /// Store a value by its type
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.typed.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Borrow a value by its type
    #[must_use]
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.typed
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Number of stored items (named and typed)
    #[must_use]
    pub fn len(&self) -> usize {
        self.named.len() + self.typed.len()
    }

    /// Check if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metadata")
            .field("keys", &self.named.keys().collect::<Vec<_>>())
            .field("extensions", &self.typed.len())
            .finish()
    }
}
