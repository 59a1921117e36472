//! Loads shards from storage and writes them back.
//!
//! Expired entries are only ever dropped here: whenever a load observes expired entries, the
//! shard is rewritten without them (or deleted, if nothing is left). A load that finds nothing
//! stale never touches the storage.

use super::{ShardEntries, ShardId, codec};
use crate::error::{CacheError, CacheResult, StorageError, WithPath};
use crate::storage::{Storage, read_to_vec, write_all};
use crate::util::clock::Clock;
use std::io::ErrorKind;
use tracing::{debug, trace};

/// Reads and persists whole shards of a storage.
#[derive(Debug)]
pub struct ShardLoader<'a, S: Storage, C: Clock> {
    storage: &'a S,
    clock: &'a C,
}

impl<'a, S: Storage, C: Clock> ShardLoader<'a, S, C> {
    pub fn new(storage: &'a S, clock: &'a C) -> Self {
        Self { storage, clock }
    }

    /// Returns the live entries of `shard`.
    ///
    /// A shard that does not exist is empty. If expired entries are found, the shard is
    /// compacted before returning.
    pub fn load(&self, shard: ShardId) -> CacheResult<ShardEntries> {
        let name = shard.file_name();
        if !self.storage.exists(&name).with_path(&name)? {
            return Ok(ShardEntries::new());
        }
        let bytes = match read_to_vec(self.storage, &name) {
            Ok(bytes) => bytes,
            // Deleted by someone else since the existence check.
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ShardEntries::new()),
            Err(err) => return Err(StorageError::new(err, name).into()),
        };
        let entries = codec::decode(&bytes).map_err(|source| CacheError::Decode { shard, source })?;

        let now = self.clock.now();
        let mut live = ShardEntries::new();
        let mut expired = 0usize;
        for entry in entries {
            if entry.is_live_at(now) {
                live.insert(entry.key().to_string(), entry);
            } else {
                expired += 1;
            }
        }

        if expired > 0 {
            debug!(%shard, expired, remaining = live.len(), "compacting shard");
            self.persist(shard, &live)?;
        }
        Ok(live)
    }

    /// Replaces the persisted content of `shard` with `entries`.
    ///
    /// An empty set of entries deletes the shard.
    pub fn persist(&self, shard: ShardId, entries: &ShardEntries) -> CacheResult<()> {
        let name = shard.file_name();
        if entries.is_empty() {
            if self.storage.exists(&name).with_path(&name)? {
                match self.storage.delete(&name) {
                    Err(err) if err.kind() != ErrorKind::NotFound => {
                        return Err(StorageError::new(err, name).into());
                    }
                    _ => debug!(%shard, "deleted empty shard"),
                }
            }
            return Ok(());
        }

        let bytes =
            codec::encode(entries.values()).map_err(|source| CacheError::Encode { shard, source })?;
        write_all(self.storage, &name, &bytes).with_path(&name)?;
        trace!(%shard, entries = entries.len(), bytes = bytes.len(), "wrote shard");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::error::DecodeError;
    use crate::storage::in_memory::InMemoryStorage;
    use crate::test_util::clock::ControlledClock;
    use crate::test_util::storage::InstrumentedStorage;
    use chrono::TimeDelta;

    const SHARD: ShardId = ShardId(3);

    fn entries_of(entries: impl IntoIterator<Item = Entry>) -> ShardEntries {
        entries
            .into_iter()
            .map(|entry| (entry.key().to_string(), entry))
            .collect()
    }

    fn persisted_entries<S: Storage>(storage: &S) -> Vec<Entry> {
        codec::decode(&read_to_vec(storage, &SHARD.file_name()).unwrap()).unwrap()
    }

    #[test]
    fn test_missing_shard_is_empty() {
        let storage = InstrumentedStorage::new(InMemoryStorage::new());
        let clock = ControlledClock::default();
        let loaded = ShardLoader::new(&storage, &clock).load(SHARD).unwrap();
        assert!(loaded.is_empty());
        assert_eq!((storage.writes(), storage.deletes()), (0, 0));
    }

    #[test]
    fn test_loads_persisted_entries() {
        let storage = InMemoryStorage::new();
        let clock = ControlledClock::default();
        let loader = ShardLoader::new(&storage, &clock);
        let entries = entries_of([
            Entry::new("a", Some(b"1".to_vec()), None),
            Entry::new("b", Some(b"2".to_vec()), Some(clock.now() + TimeDelta::hours(1))),
        ]);
        loader.persist(SHARD, &entries).unwrap();
        assert_eq!(loader.load(SHARD).unwrap(), entries);
    }

    #[test]
    fn test_load_without_expired_entries_does_not_write() {
        let storage = InstrumentedStorage::new(InMemoryStorage::new());
        let clock = ControlledClock::default();
        let loader = ShardLoader::new(&storage, &clock);
        loader
            .persist(
                SHARD,
                &entries_of([Entry::new(
                    "a",
                    Some(b"1".to_vec()),
                    Some(clock.now() + TimeDelta::seconds(1)),
                )]),
            )
            .unwrap();

        assert_eq!(loader.load(SHARD).unwrap().len(), 1);
        assert_eq!((storage.writes(), storage.deletes()), (1, 0));
    }

    #[test]
    fn test_load_rewrites_shard_without_expired_entries() {
        let storage = InstrumentedStorage::new(InMemoryStorage::new());
        let mut clock = ControlledClock::default();
        let expiration = clock.now() + TimeDelta::minutes(5);
        let loader_entries = entries_of([
            Entry::new("expiring", Some(b"1".to_vec()), Some(expiration)),
            Entry::new("staying", Some(b"2".to_vec()), None),
        ]);
        ShardLoader::new(&storage, &clock)
            .persist(SHARD, &loader_entries)
            .unwrap();

        clock.set(expiration);
        let loaded = ShardLoader::new(&storage, &clock).load(SHARD).unwrap();

        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["staying"]);
        assert_eq!(storage.writes(), 2);
        assert_eq!(
            persisted_entries(&storage),
            vec![Entry::new("staying", Some(b"2".to_vec()), None)]
        );
    }

    #[test]
    fn test_load_deletes_shard_with_only_expired_entries() {
        let storage = InstrumentedStorage::new(InMemoryStorage::new());
        let mut clock = ControlledClock::default();
        let expiration = clock.now() + TimeDelta::minutes(5);
        ShardLoader::new(&storage, &clock)
            .persist(
                SHARD,
                &entries_of([Entry::new("expiring", None, Some(expiration))]),
            )
            .unwrap();

        clock.advance_by(TimeDelta::minutes(10));
        let loaded = ShardLoader::new(&storage, &clock).load(SHARD).unwrap();

        assert!(loaded.is_empty());
        assert_eq!(storage.deletes(), 1);
        assert!(!storage.exists(&SHARD.file_name()).unwrap());
    }

    #[test]
    fn test_persisting_no_entries_deletes_shard() {
        let storage = InstrumentedStorage::new(InMemoryStorage::new());
        let clock = ControlledClock::default();
        let loader = ShardLoader::new(&storage, &clock);
        loader.persist(SHARD, &ShardEntries::new()).unwrap();
        assert_eq!(storage.deletes(), 0);

        loader
            .persist(SHARD, &entries_of([Entry::new("a", None, None)]))
            .unwrap();
        loader.persist(SHARD, &ShardEntries::new()).unwrap();
        assert_eq!(storage.deletes(), 1);
        assert_eq!(storage.list().unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_shard_is_an_error() {
        let storage = InMemoryStorage::new();
        let clock = ControlledClock::default();
        write_all(&storage, &SHARD.file_name(), b"definitely not a shard").unwrap();
        let result = ShardLoader::new(&storage, &clock).load(SHARD);
        assert!(matches!(
            result,
            Err(CacheError::Decode {
                shard: SHARD,
                source: DecodeError::Malformed(_)
            })
        ));
    }

    #[test]
    fn test_storage_failure_is_an_error() {
        let storage = InstrumentedStorage::new(InMemoryStorage::new());
        let clock = ControlledClock::default();
        storage.fail_reads(true);
        let err = ShardLoader::new(&storage, &clock).load(SHARD).unwrap_err();
        match err {
            CacheError::Storage(err) => {
                assert_eq!(err.path(), "cache_3.rkyv");
                assert_eq!(err.io_error().kind(), ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
