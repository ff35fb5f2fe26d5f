use crate::any_value::{DynKey, DynValue};
use crate::descriptor::TypeDescriptor;
use crate::error::MapError;
use crate::render;
use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

type Table = HashMap<Box<dyn DynKey>, Box<dyn DynValue>>;

/// A thread-safe map whose key and element types are checked at runtime
///
/// `AnyConcurrentMap` is declared over type-erased keys and values. The key
/// and element types are fixed by two [`TypeDescriptor`]s at construction, and
/// every `put` verifies the pair against them before taking the lock. A
/// rejected pair leaves the map untouched.
///
/// Prefer [`ConcurrentMap`](crate::ConcurrentMap) when the types are known at
/// compile time; this type is for callers that only learn them at runtime.
///
/// # Examples
///
/// ```
/// use sovran_concurrent_map::{AnyConcurrentMap, MapError, TypeDescriptor};
///
/// let map = AnyConcurrentMap::new(
///     TypeDescriptor::of::<String>(),
///     TypeDescriptor::of::<i32>(),
/// );
///
/// assert_eq!(map.put("a".to_string(), 1)?, None);
/// assert_eq!(map.put("a".to_string(), 2)?, Some(1));
/// assert_eq!(map.get::<String, i32>(&"a".to_string())?, Some(2));
///
/// // Wrong key type, nothing is stored
/// assert!(matches!(map.put(42, 1), Err(MapError::TypeMismatch { .. })));
/// assert_eq!(map.len()?, 1);
/// # Ok::<(), MapError>(())
/// ```
pub struct AnyConcurrentMap {
    key_type: TypeDescriptor,
    elem_type: TypeDescriptor,
    table: RwLock<Table>,
}

impl AnyConcurrentMap {
    /// Creates an empty map accepting only keys of `key_type` and values of `elem_type`
    pub fn new(key_type: TypeDescriptor, elem_type: TypeDescriptor) -> Self {
        Self {
            key_type,
            elem_type,
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an empty map typed for `K` keys and `V` values
    pub fn of<K: DynKey, V: DynValue>() -> Self {
        Self::new(TypeDescriptor::of::<K>(), TypeDescriptor::of::<V>())
    }

    /// The declared key type
    pub fn key_type(&self) -> TypeDescriptor {
        self.key_type
    }

    /// The declared element type
    pub fn elem_type(&self) -> TypeDescriptor {
        self.elem_type
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table>, MapError> {
        self.table.read().map_err(|_| {
            warn!(key = %self.key_type, elem = %self.elem_type, "any map lock poisoned on read");
            MapError::LockError
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table>, MapError> {
        self.table.write().map_err(|_| {
            warn!(key = %self.key_type, elem = %self.elem_type, "any map lock poisoned on write");
            MapError::LockError
        })
    }

    fn check_pair(&self, key: TypeDescriptor, elem: TypeDescriptor) -> Result<(), MapError> {
        if key != self.key_type {
            debug!(expected = %self.key_type, found = %key, "rejected key");
            return Err(MapError::mismatch(self.key_type, key));
        }
        if elem != self.elem_type {
            debug!(expected = %self.elem_type, found = %elem, "rejected element");
            return Err(MapError::mismatch(self.elem_type, elem));
        }
        Ok(())
    }

    fn check_elem<V: 'static>(&self) -> Result<(), MapError> {
        if self.elem_type.is::<V>() {
            Ok(())
        } else {
            Err(MapError::mismatch(self.elem_type, TypeDescriptor::of::<V>()))
        }
    }

    /// Inserts or overwrites an entry, returning the previous value
    ///
    /// The pair is validated before the lock is taken.
    ///
    /// # Errors
    ///
    /// - Returns `MapError::TypeMismatch` if `K` or `V` differs from the declared types
    /// - Returns `MapError::LockError` if the internal lock is poisoned
    pub fn put<K, V>(&self, key: K, value: V) -> Result<Option<V>, MapError>
    where
        K: DynKey,
        V: DynValue,
    {
        self.check_pair(TypeDescriptor::of::<K>(), TypeDescriptor::of::<V>())?;
        let previous = self.write()?.insert(Box::new(key), Box::new(value));
        // The stored value passed the same check, so the downcast holds
        Ok(previous
            .and_then(|old| old.into_any().downcast::<V>().ok())
            .map(|old| *old))
    }

    /// Inserts or overwrites an entry whose types are only known at runtime
    ///
    /// # Errors
    ///
    /// - Returns `MapError::TypeMismatch` if the key or value has the wrong type
    /// - Returns `MapError::LockError` if the internal lock is poisoned
    pub fn put_boxed(
        &self,
        key: Box<dyn DynKey>,
        value: Box<dyn DynValue>,
    ) -> Result<Option<Box<dyn DynValue>>, MapError> {
        self.check_pair((*key).descriptor(), (*value).descriptor())?;
        Ok(self.write()?.insert(key, value))
    }

    /// Retrieves a clone of the value stored under `key`
    ///
    /// A key whose type differs from the declared key type can never be
    /// present, so it yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - Returns `MapError::TypeMismatch` if `V` is not the declared element type
    /// - Returns `MapError::LockError` if the internal lock is poisoned
    pub fn get<K, V>(&self, key: &K) -> Result<Option<V>, MapError>
    where
        K: DynKey,
        V: DynValue + Clone,
    {
        self.with(key, |value: &V| value.clone())
    }

    /// Runs `f` against the value stored under `key` while holding the read lock
    ///
    /// # Deadlocks
    ///
    /// The closure must not call into the same map at all, not even to read.
    /// Once a writer is waiting, the lock admits no new readers, so a nested
    /// call blocks behind that writer while the writer waits on `f`.
    ///
    /// # Errors
    ///
    /// - Returns `MapError::TypeMismatch` if `V` is not the declared element type
    /// - Returns `MapError::LockError` if the internal lock is poisoned
    pub fn with<K, V, F, R>(&self, key: &K, f: F) -> Result<Option<R>, MapError>
    where
        K: DynKey,
        V: 'static,
        F: FnOnce(&V) -> R,
    {
        self.check_elem::<V>()?;
        let erased: &dyn DynKey = key;
        let table = self.read()?;
        Ok(table
            .get(erased)
            .and_then(|value| (**value).as_any().downcast_ref::<V>())
            .map(f))
    }

    /// Retrieves a boxed clone of the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn get_boxed(&self, key: &dyn DynKey) -> Result<Option<Box<dyn DynValue>>, MapError> {
        Ok(self.read()?.get(key).map(|value| (**value).clone_value()))
    }

    /// Removes `key`, returning what was stored there
    ///
    /// Keys of a foreign type are never present, so removing one is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn remove(&self, key: &dyn DynKey) -> Result<Option<Box<dyn DynValue>>, MapError> {
        Ok(self.write()?.remove(key))
    }

    /// Discards every entry, replacing the table with a fresh one
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn clear(&self) -> Result<(), MapError> {
        // dropped after the guard so element destructors run unlocked
        let discarded = std::mem::take(&mut *self.write()?);
        debug!(entries = discarded.len(), key = %self.key_type, "cleared any map");
        Ok(())
    }

    /// Returns the number of entries in the map
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn len(&self) -> Result<usize, MapError> {
        Ok(self.read()?.len())
    }

    /// Returns true if the map contains no entries
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, MapError> {
        Ok(self.read()?.is_empty())
    }

    /// Returns true if the map contains `key`
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn contains(&self, key: &dyn DynKey) -> Result<bool, MapError> {
        Ok(self.read()?.contains_key(key))
    }

    /// Returns a snapshot of every key, in no particular order
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn keys(&self) -> Result<Vec<Box<dyn DynKey>>, MapError> {
        Ok(self.read()?.keys().map(|key| (**key).clone_key()).collect())
    }

    /// Returns a snapshot of every value, in no particular order
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn elems(&self) -> Result<Vec<Box<dyn DynValue>>, MapError> {
        Ok(self
            .read()?
            .values()
            .map(|value| (**value).clone_value())
            .collect())
    }

    /// Returns a snapshot of every key as the declared key type
    ///
    /// # Errors
    ///
    /// - Returns `MapError::TypeMismatch` if `K` is not the declared key type
    /// - Returns `MapError::LockError` if the internal lock is poisoned
    pub fn keys_as<K: Clone + 'static>(&self) -> Result<Vec<K>, MapError> {
        if !self.key_type.is::<K>() {
            return Err(MapError::mismatch(self.key_type, TypeDescriptor::of::<K>()));
        }
        Ok(self
            .read()?
            .keys()
            .filter_map(|key| (**key).as_any().downcast_ref::<K>().cloned())
            .collect())
    }

    /// Returns a snapshot of every value as the declared element type
    ///
    /// # Errors
    ///
    /// - Returns `MapError::TypeMismatch` if `V` is not the declared element type
    /// - Returns `MapError::LockError` if the internal lock is poisoned
    pub fn elems_as<V: Clone + 'static>(&self) -> Result<Vec<V>, MapError> {
        self.check_elem::<V>()?;
        Ok(self
            .read()?
            .values()
            .filter_map(|value| (**value).as_any().downcast_ref::<V>().cloned())
            .collect())
    }

    /// Returns an independent copy of the whole table
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn to_map(&self) -> Result<HashMap<Box<dyn DynKey>, Box<dyn DynValue>>, MapError> {
        Ok(self
            .read()?
            .iter()
            .map(|(key, value)| ((**key).clone_key(), (**value).clone_value()))
            .collect())
    }
}

impl fmt::Display for AnyConcurrentMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table.read() {
            Ok(table) => render::entries(
                f,
                self.key_type,
                self.elem_type,
                table.iter().map(|(key, value)| (&**key, &**value)),
                render::debug_entry::<dyn DynKey, dyn DynValue>,
            ),
            Err(_) => render::poisoned(f, self.key_type, self.elem_type),
        }
    }
}

impl fmt::Debug for AnyConcurrentMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
