use crate::descriptor::TypeDescriptor;
use crate::error::MapError;
use crate::render;
use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::{BuildHasher, Hash};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};

/// Shard count used by [`ShardedConcurrentMap::new`]
pub const DEFAULT_SHARDS: usize = 16;

type Shard<K, V> = RwLock<HashMap<K, V>>;

/// A concurrent map split into independently locked segments
///
/// Keys are distributed over a power-of-two number of shards by hash. Single
/// key operations lock only the shard owning the key, so writers to different
/// shards do not contend. Whole-map operations (`len`, `keys`, `elems`,
/// `to_map`, `clear` and formatting) lock every shard in ascending order and
/// therefore still observe or modify the map at a single instant.
///
/// The external contract matches [`ConcurrentMap`](crate::ConcurrentMap).
///
/// # Examples
///
/// ```
/// use sovran_concurrent_map::{MapError, ShardedConcurrentMap};
///
/// let map = ShardedConcurrentMap::<u64, String>::with_shards(6);
/// assert_eq!(map.shard_count(), 8);
///
/// map.put(1, "one".to_string())?;
/// assert_eq!(map.get(&1)?, Some("one".to_string()));
/// assert_eq!(map.len()?, 1);
/// # Ok::<(), MapError>(())
/// ```
pub struct ShardedConcurrentMap<K, V, S = RandomState> {
    shards: Box<[Shard<K, V>]>,
    hasher: S,
}

impl<K, V> ShardedConcurrentMap<K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Creates an empty map with [`DEFAULT_SHARDS`] shards
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates an empty map with `shards` rounded up to a power of two
    pub fn with_shards(shards: usize) -> Self {
        Self::with_shards_and_hasher(shards, RandomState::new())
    }
}

impl<K, V, S> ShardedConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Creates an empty map distributing keys with `hasher`
    pub fn with_shards_and_hasher(shards: usize, hasher: S) -> Self {
        let count = shards.max(1).next_power_of_two();
        Self {
            shards: (0..count).map(|_| RwLock::new(HashMap::new())).collect(),
            hasher,
        }
    }

    /// Number of independently locked segments
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for<Q>(&self, key: &Q) -> &Shard<K, V>
    where
        Q: ?Sized + Hash,
    {
        let index = (self.hasher.hash_one(key) as usize) & (self.shards.len() - 1);
        trace!(shard = index, "selected shard");
        &self.shards[index]
    }

    fn read_one<'a>(
        shard: &'a Shard<K, V>,
    ) -> Result<RwLockReadGuard<'a, HashMap<K, V>>, MapError> {
        shard.read().map_err(|_| {
            warn!("sharded map lock poisoned on read");
            MapError::LockError
        })
    }

    fn write_one<'a>(
        shard: &'a Shard<K, V>,
    ) -> Result<RwLockWriteGuard<'a, HashMap<K, V>>, MapError> {
        shard.write().map_err(|_| {
            warn!("sharded map lock poisoned on write");
            MapError::LockError
        })
    }

    // Ascending order; single-key writers only ever hold one shard.
    fn read_all(&self) -> Result<Vec<RwLockReadGuard<'_, HashMap<K, V>>>, MapError> {
        self.shards.iter().map(Self::read_one).collect()
    }

    fn write_all(&self) -> Result<Vec<RwLockWriteGuard<'_, HashMap<K, V>>>, MapError> {
        self.shards.iter().map(Self::write_one).collect()
    }

    /// Retrieves a clone of the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the shard lock is poisoned.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        Ok(Self::read_one(self.shard_for(key))?.get(key).cloned())
    }

    /// Runs `f` against the value stored under `key` while holding its shard's read lock
    ///
    /// # Deadlocks
    ///
    /// The closure must not call into the same map at all. A single-key call
    /// may land on the held shard and queue behind a waiting writer, and
    /// whole-map calls (`len`, `keys`, formatting) always lock that shard again.
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the shard lock is poisoned.
    pub fn with<Q, F, R>(&self, key: &Q, f: F) -> Result<Option<R>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> R,
    {
        Ok(Self::read_one(self.shard_for(key))?.get(key).map(f))
    }

    /// Inserts or overwrites the value stored under `key`, returning the previous one
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the shard lock is poisoned.
    pub fn put(&self, key: K, value: V) -> Result<Option<V>, MapError> {
        let shard = self.shard_for(&key);
        Ok(Self::write_one(shard)?.insert(key, value))
    }

    /// Removes `key`, returning what was stored there
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the shard lock is poisoned.
    pub fn remove<Q>(&self, key: &Q) -> Result<Option<V>, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Ok(Self::write_one(self.shard_for(key))?.remove(key))
    }

    /// Returns true if the map contains `key`
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if the shard lock is poisoned.
    pub fn contains<Q>(&self, key: &Q) -> Result<bool, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Ok(Self::read_one(self.shard_for(key))?.contains_key(key))
    }

    /// Discards every entry in every shard
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if any shard lock is poisoned.
    pub fn clear(&self) -> Result<(), MapError> {
        let discarded: Vec<HashMap<K, V>> = self
            .write_all()?
            .iter_mut()
            .map(|table| std::mem::take(&mut **table))
            .collect();
        // guards are gone; element destructors run unlocked
        let entries: usize = discarded.iter().map(HashMap::len).sum();
        debug!(entries, shards = discarded.len(), "cleared sharded map");
        Ok(())
    }

    /// Returns the number of entries across all shards
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if any shard lock is poisoned.
    pub fn len(&self) -> Result<usize, MapError> {
        Ok(self.read_all()?.iter().map(|table| table.len()).sum())
    }

    /// Returns true if no shard holds an entry
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if any shard lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, MapError> {
        Ok(self.read_all()?.iter().all(|table| table.is_empty()))
    }

    /// Returns a snapshot of every key, in no particular order
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if any shard lock is poisoned.
    pub fn keys(&self) -> Result<Vec<K>, MapError>
    where
        K: Clone,
    {
        let guards = self.read_all()?;
        Ok(guards.iter().flat_map(|table| table.keys().cloned()).collect())
    }

    /// Returns a snapshot of every value, in no particular order
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if any shard lock is poisoned.
    pub fn elems(&self) -> Result<Vec<V>, MapError>
    where
        V: Clone,
    {
        let guards = self.read_all()?;
        Ok(guards.iter().flat_map(|table| table.values().cloned()).collect())
    }

    /// Returns an independent copy of the whole map
    ///
    /// # Errors
    ///
    /// Returns `MapError::LockError` if any shard lock is poisoned.
    pub fn to_map(&self) -> Result<HashMap<K, V>, MapError>
    where
        K: Clone,
        V: Clone,
    {
        let guards = self.read_all()?;
        Ok(guards
            .iter()
            .flat_map(|table| table.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect())
    }
}

impl<K: 'static, V: 'static, S> ShardedConcurrentMap<K, V, S> {
    /// The descriptor of the key type
    pub fn key_type(&self) -> TypeDescriptor {
        TypeDescriptor::of::<K>()
    }

    /// The descriptor of the element type
    pub fn elem_type(&self) -> TypeDescriptor {
        TypeDescriptor::of::<V>()
    }
}

impl<K, V> Default for ShardedConcurrentMap<K, V, RandomState>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ShardedConcurrentMap<K, V, S>
where
    K: Eq + Hash + 'static,
    V: 'static,
    S: BuildHasher,
{
    fn render<W>(&self, f: &mut fmt::Formatter<'_>, write_entry: W) -> fmt::Result
    where
        W: FnMut(&mut fmt::Formatter<'_>, &K, &V) -> fmt::Result,
    {
        match self.read_all() {
            Ok(guards) => render::entries(
                f,
                self.key_type(),
                self.elem_type(),
                guards.iter().flat_map(|table| table.iter()),
                write_entry,
            ),
            Err(_) => render::poisoned(f, self.key_type(), self.elem_type()),
        }
    }
}

impl<K, V, S> fmt::Display for ShardedConcurrentMap<K, V, S>
where
    K: Eq + Hash + fmt::Display + 'static,
    V: fmt::Display + 'static,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, render::display_entry::<K, V>)
    }
}

impl<K, V, S> Debug for ShardedConcurrentMap<K, V, S>
where
    K: Eq + Hash + Debug + 'static,
    V: Debug + 'static,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, render::debug_entry::<K, V>)
    }
}
