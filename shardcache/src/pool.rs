//! The item pool, the high-level interface of the cache.
//!
//! Reads return a `Result` and wrap engine failures in [PoolError::General]. Mutations only
//! report success as a `bool`; the cause of a failure is logged.

mod item;

pub use item::Item;

use crate::config::CacheConfig;
use crate::entry::Entry;
use crate::error::{PoolError, StorageError, WithPath};
use crate::storage::Storage;
use crate::storage::filesystem::FilesystemStorage;
use crate::store::Store;
use crate::util::clock::{Clock, SystemClock};
use std::fs;
use tracing::warn;

/// A pool of cache items backed by a [Store].
///
/// # Examples
///
/// ```rust
/// # use shardcache::error::PoolError;
/// use chrono::TimeDelta;
/// use shardcache::Pool;
/// use shardcache::storage::in_memory::InMemoryStorage;
///
/// # fn main() -> Result<(), PoolError> {
/// let mut pool = Pool::new(InMemoryStorage::new());
/// let mut item = pool.get_item("greeting")?;
/// assert!(!item.is_hit());
///
/// item.set("Hello, world!").expires_after(Some(TimeDelta::hours(1)))?;
/// assert!(pool.save(&item));
/// assert_eq!(pool.get_item("greeting")?.get(), Some(b"Hello, world!".as_slice()));
/// # Ok(())
/// # }
/// ```
pub struct Pool<S: Storage, C: Clock + Clone = SystemClock> {
    store: Store<S, C>,
    deferred: Vec<Entry>,
}

impl<S: Storage> Pool<S, SystemClock> {
    pub fn new(storage: S) -> Self {
        Self::from_store(Store::new(storage))
    }
}

impl Pool<FilesystemStorage, SystemClock> {
    /// Opens the filesystem cache described by `config`, creating its directory if needed.
    pub fn open(config: &CacheConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.path).with_path(config.path.to_string_lossy())?;
        Ok(Self::from_store(Store::with_scheme(
            FilesystemStorage::new(config.path.clone()),
            SystemClock,
            config.scheme(),
        )))
    }
}

impl<S: Storage, C: Clock + Clone> Pool<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self::from_store(Store::with_clock(storage, clock))
    }

    pub fn from_store(store: Store<S, C>) -> Self {
        Self {
            store,
            deferred: Vec::new(),
        }
    }

    pub fn store(&self) -> &Store<S, C> {
        &self.store
    }

    /// Number of items saved with [Pool::save_deferred] and not yet committed.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Returns the item for `key`; a miss if there is none.
    pub fn get_item(&mut self, key: &str) -> Result<Item<C>, PoolError> {
        let entry = self.store.get(key)?;
        Ok(Item::from_entry(entry, self.store.clock().clone()))
    }

    /// Returns the items for all `keys`, in order.
    pub fn get_items<K: AsRef<str>>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Vec<Item<C>>, PoolError> {
        keys.into_iter()
            .map(|key| self.get_item(key.as_ref()))
            .collect()
    }

    pub fn has_item(&mut self, key: &str) -> Result<bool, PoolError> {
        Ok(self.store.get(key)?.is_hit())
    }

    pub fn delete_item(&mut self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(()) => true,
            Err(err) => {
                warn!(key, %err, "failed to delete item");
                false
            }
        }
    }

    /// Deletes all `keys`, continuing past failures. Returns `false` if any deletion failed.
    pub fn delete_items<K: AsRef<str>>(&mut self, keys: impl IntoIterator<Item = K>) -> bool {
        keys.into_iter()
            .fold(true, |success, key| self.delete_item(key.as_ref()) && success)
    }

    pub fn save(&mut self, item: &Item<C>) -> bool {
        match self.store.set(item.to_entry()) {
            Ok(()) => true,
            Err(err) => {
                warn!(key = item.key(), %err, "failed to save item");
                false
            }
        }
    }

    /// Queues `item` to be saved on the next [Pool::commit].
    pub fn save_deferred(&mut self, item: &Item<C>) -> bool {
        self.deferred.push(item.to_entry());
        true
    }

    /// Saves all deferred items in the order they were queued.
    ///
    /// Stops at the first failure. Items saved up to that point stay saved; the failed item and
    /// all items after it remain queued.
    pub fn commit(&mut self) -> bool {
        let mut applied = 0;
        let mut success = true;
        for entry in &self.deferred {
            if let Err(err) = self.store.set(entry.clone()) {
                warn!(
                    key = entry.key(),
                    %err,
                    remaining = self.deferred.len() - applied,
                    "failed to commit deferred items"
                );
                success = false;
                break;
            }
            applied += 1;
        }
        self.deferred.drain(..applied);
        success
    }

    /// Deletes every item of the cache.
    pub fn clear(&mut self) -> bool {
        match self.store.remove_all() {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to clear cache");
                false
            }
        }
    }

    /// Forgets everything remembered from earlier reads and writes, so that subsequent reads see
    /// the current state of the storage.
    pub fn refresh(&mut self) -> &mut Self {
        self.store.refresh();
        self
    }
}
