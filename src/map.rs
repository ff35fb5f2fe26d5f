use crate::descriptor::TypeDescriptor;
use crate::error::MapError;
use crate::render;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// A thread-safe map guarded by a single reader/writer lock
///
/// `ConcurrentMap` allows any number of concurrent readers (`get`, `len`,
/// `contains`, `keys`, `elems`, `to_map`, formatting) or exactly one writer
/// (`put`, `remove`, `clear`) at a time. Key and element types are fixed by the
/// generic parameters, so `put` can never be rejected on type grounds.
///
/// Each method is atomic on its own. A sequence of calls such as
/// "`contains` then `put`" is not; another thread may write in between.
///
/// # Examples
///
/// ```
/// use sovran_concurrent_map::{ConcurrentMap, MapError};
///
/// let map = ConcurrentMap::<String, i32>::new();
///
/// assert_eq!(map.put("a".to_string(), 1)?, None);
/// assert_eq!(map.put("a".to_string(), 2)?, Some(1));
/// assert_eq!(map.get("a")?, Some(2));
/// assert_eq!(map.remove("a")?, Some(2));
/// assert_eq!(map.len()?, 0);
/// # Ok::<(), MapError>(())
/// ```
pub struct ConcurrentMap<K, V> {
    table: RwLock<HashMap<K, V>>,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new, empty ConcurrentMap
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an empty ConcurrentMap with room for at least `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<K, V>>, MapError> {
        self.table.read().map_err(|_| {
            warn!("concurrent map lock poisoned on read");
            MapError::LockError
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<K, V>>, MapError> {
        self.table.write().map_err(|_| {
            warn!("concurrent map lock poisoned on write");
            MapError::LockError
        })
    }

    /// Retrieves a clone of the value stored under `key`
    ///
    /// Returns `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        Ok(self.read()?.get(key).cloned())
    }

    /// Runs `f` against the value stored under `key` while holding the read lock
    ///
    /// Unlike [`get`](Self::get) this does not require `V: Clone`.
    ///
    /// # Deadlocks
    ///
    /// The closure must not call into the same map at all, not even to read.
    /// Once a writer is waiting, the lock admits no new readers, so a nested
    /// `get` or `len` blocks behind that writer while the writer waits on `f`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sovran_concurrent_map::{ConcurrentMap, MapError};
    ///
    /// let map = ConcurrentMap::<&str, Vec<i32>>::new();
    /// map.put("numbers", vec![1, 2, 3])?;
    ///
    /// assert_eq!(map.with("numbers", |v| v.len())?, Some(3));
    /// assert_eq!(map.with("missing", |v| v.len())?, None);
    /// # Ok::<(), MapError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn with<Q, F, R>(&self, key: &Q, f: F) -> Result<Option<R>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> R,
    {
        Ok(self.read()?.get(key).map(f))
    }

    /// Inserts or overwrites the value stored under `key`
    ///
    /// Returns the value previously stored there, if any.
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn put(&self, key: K, value: V) -> Result<Option<V>, MapError> {
        Ok(self.write()?.insert(key, value))
    }

    /// Removes `key`, returning what was stored there
    ///
    /// Removing an absent key is a no-op returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn remove<Q>(&self, key: &Q) -> Result<Option<V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
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
        debug!(entries = discarded.len(), "cleared concurrent map");
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
    pub fn contains<Q>(&self, key: &Q) -> Result<bool, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Ok(self.read()?.contains_key(key))
    }

    /// Returns a snapshot of every key, in no particular order
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn keys(&self) -> Result<Vec<K>, MapError>
    where
        K: Clone,
    {
        Ok(self.read()?.keys().cloned().collect())
    }

    /// Returns a snapshot of every value, in no particular order
    ///
    /// Two separate calls to `keys` and `elems` are independent snapshots and
    /// need not line up positionally.
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn elems(&self) -> Result<Vec<V>, MapError>
    where
        V: Clone,
    {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Returns an independent copy of the whole table
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the internal lock is poisoned.
    pub fn to_map(&self) -> Result<HashMap<K, V>, MapError>
    where
        K: Clone,
        V: Clone,
    {
        Ok(self.read()?.clone())
    }
}

impl<K: 'static, V: 'static> ConcurrentMap<K, V> {
    /// The descriptor of the key type
    pub fn key_type(&self) -> TypeDescriptor {
        TypeDescriptor::of::<K>()
    }

    /// The descriptor of the element type
    pub fn elem_type(&self) -> TypeDescriptor {
        TypeDescriptor::of::<V>()
    }
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> From<HashMap<K, V>> for ConcurrentMap<K, V> {
    fn from(table: HashMap<K, V>) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<HashMap<K, V>>())
    }
}

impl<K, V> fmt::Display for ConcurrentMap<K, V>
where
    K: fmt::Display + 'static,
    V: fmt::Display + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, render::display_entry::<K, V>)
    }
}

impl<K, V> Debug for ConcurrentMap<K, V>
where
    K: Debug + 'static,
    V: Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, render::debug_entry::<K, V>)
    }
}

impl<K: 'static, V: 'static> ConcurrentMap<K, V> {
    fn render<W>(&self, f: &mut fmt::Formatter<'_>, write_entry: W) -> fmt::Result
    where
        W: FnMut(&mut fmt::Formatter<'_>, &K, &V) -> fmt::Result,
    {
        match self.table.read() {
            Ok(table) => render::entries(
                f,
                self.key_type(),
                self.elem_type(),
                table.iter(),
                write_entry,
            ),
            Err(_) => render::poisoned(f, self.key_type(), self.elem_type()),
        }
    }
}
