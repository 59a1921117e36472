//! The cache engine.
//!
//! A [Store] maps keys to shards, loads shards lazily and keeps everything it has loaded or
//! written in an in-memory overlay, so that repeated reads of a key (or of its shard siblings)
//! do not hit the storage again.

use crate::entry::Entry;
use crate::error::{CacheResult, StorageError};
use crate::shard::loader::ShardLoader;
use crate::shard::{ShardEntries, ShardId, ShardScheme};
use crate::storage::Storage;
use crate::util::clock::{Clock, SystemClock};
use std::collections::BTreeMap;
use std::io;
use std::io::ErrorKind;
use tracing::debug;

/// Name used in errors about the storage as a whole.
const STORAGE_ROOT: &str = "/";

/// The cache engine: shards on a [Storage], plus an overlay of already known entries.
///
/// The storage is authoritative, the overlay is only valid for the lifetime of one store.
/// Separate stores pointed at the same storage do not see each other's writes until
/// [Store::refresh] is called, and concurrent writes to the same shard may lose updates.
///
/// # Examples
///
/// ```rust
/// # use shardcache::error::CacheError;
/// use shardcache::entry::Entry;
/// use shardcache::storage::in_memory::InMemoryStorage;
/// use shardcache::store::Store;
///
/// # fn main() -> Result<(), CacheError> {
/// let mut store = Store::new(InMemoryStorage::new());
/// store.set(Entry::new("KEY", Some(b"VALUE".to_vec()), None))?;
/// assert_eq!(store.get("KEY")?.payload(), Some(b"VALUE".as_slice()));
/// assert!(!store.get("other")?.is_hit());
/// # Ok(())
/// # }
/// ```
pub struct Store<S: Storage, C: Clock = SystemClock> {
    storage: S,
    clock: C,
    scheme: ShardScheme,
    overlay: BTreeMap<String, Entry>,
}

impl<S: Storage> Store<S, SystemClock> {
    /// Creates a store on the given storage, using the system time.
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: Storage, C: Clock> Store<S, C> {
    /// Creates a store on the given storage, evaluating expirations with `clock`.
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self::with_scheme(storage, clock, ShardScheme::default())
    }

    /// Creates a store with a custom shard scheme.
    pub fn with_scheme(storage: S, clock: C, scheme: ShardScheme) -> Self {
        Self {
            storage,
            clock,
            scheme,
            overlay: BTreeMap::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn scheme(&self) -> ShardScheme {
        self.scheme
    }

    /// Returns the entry stored under `key`, or a miss.
    ///
    /// Entries already in the overlay are answered without touching the storage, unless they
    /// expired in the meantime.
    pub fn get(&mut self, key: &str) -> CacheResult<Entry> {
        if let Some(entry) = self.overlay.get(key) {
            if entry.is_live_at(self.clock.now()) {
                return Ok(entry.clone());
            }
            self.overlay.remove(key);
        }

        self.load(self.scheme.shard_of(key))?;
        Ok(self
            .overlay
            .get(key)
            .cloned()
            .unwrap_or_else(|| Entry::miss(key)))
    }

    /// Stores `entry`, replacing any entry with the same key.
    ///
    /// This rewrites the entry's whole shard. A miss is stored as a null value.
    pub fn set(&mut self, entry: Entry) -> CacheResult<()> {
        let entry = entry.into_hit();
        let shard = self.scheme.shard_of(entry.key());
        let mut entries = self.load(shard)?;
        entries.insert(entry.key().to_string(), entry.clone());
        self.loader().persist(shard, &entries)?;
        self.overlay.insert(entry.key().to_string(), entry);
        Ok(())
    }

    /// Removes the entry stored under `key`. Removing an absent key does nothing.
    pub fn remove(&mut self, key: &str) -> CacheResult<()> {
        let shard = self.scheme.shard_of(key);
        let mut entries = self.load(shard)?;
        if entries.remove(key).is_some() {
            self.loader().persist(shard, &entries)?;
        }
        self.overlay.remove(key);
        Ok(())
    }

    /// Forgets the overlay and deletes everything in the storage.
    pub fn remove_all(&mut self) -> CacheResult<()> {
        self.refresh();
        let names = match self.storage.list() {
            Ok(names) => names
                .collect::<io::Result<Vec<_>>>()
                .map_err(|err| StorageError::new(err, STORAGE_ROOT))?,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(StorageError::new(err, STORAGE_ROOT).into()),
        };
        for name in &names {
            match self.storage.delete(name) {
                Err(err) if err.kind() != ErrorKind::NotFound => {
                    return Err(StorageError::new(err, name.as_str()).into());
                }
                _ => {}
            }
        }
        debug!(deleted = names.len(), "removed all shards");
        Ok(())
    }

    /// Forgets the overlay, so that subsequent reads consult the storage again.
    pub fn refresh(&mut self) {
        self.overlay.clear();
    }

    fn loader(&self) -> ShardLoader<'_, S, C> {
        ShardLoader::new(&self.storage, &self.clock)
    }

    /// Loads a shard and merges it into the overlay. Entries already in the overlay win, as they
    /// may be newer than what was read.
    fn load(&mut self, shard: ShardId) -> CacheResult<ShardEntries> {
        let loaded = self.loader().load(shard)?;
        for (key, entry) in &loaded {
            if !self.overlay.contains_key(key) {
                self.overlay.insert(key.clone(), entry.clone());
            }
        }
        Ok(loaded)
    }
}
