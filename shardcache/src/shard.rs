//! Maps keys to shards and shards to storage blobs.
//!
//! Many keys share one shard; a shard is persisted as a single blob holding all of its entries
//! (see [codec]) and is loaded lazily, dropping expired entries on the way (see [loader]).

pub mod codec;
pub mod loader;

use crate::entry::Entry;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;

/// File extension of persisted shards.
pub const SHARD_FILE_EXTENSION: &str = "rkyv";

/// The live entries of one shard, keyed by entry key.
///
/// Kept ordered so that encoding the same set of entries twice produces identical bytes.
pub type ShardEntries = BTreeMap<String, Entry>;

/// Identifies a shard by its bucket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardId(u32);

impl ShardId {
    pub fn new(bucket: u32) -> Self {
        Self(bucket)
    }

    pub fn bucket(&self) -> u32 {
        self.0
    }

    /// Name of the storage blob holding this shard.
    pub fn file_name(&self) -> String {
        format!("cache_{}.{}", self.0, SHARD_FILE_EXTENSION)
    }
}

impl Display for ShardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Deterministically assigns keys to a fixed number of shards.
///
/// All caches sharing a storage must use the same number of buckets, otherwise they will look
/// for a key in different shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardScheme {
    buckets: NonZeroU32,
}

impl ShardScheme {
    pub const DEFAULT_BUCKETS: NonZeroU32 = NonZeroU32::new(256).unwrap();

    pub fn new(buckets: NonZeroU32) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> NonZeroU32 {
        self.buckets
    }

    /// Returns the shard that `key` belongs to.
    pub fn shard_of(&self, key: &str) -> ShardId {
        let hash = blake3::hash(key.as_bytes());
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&hash.as_bytes()[..4]);
        ShardId(u32::from_le_bytes(prefix) % self.buckets.get())
    }
}

impl Default for ShardScheme {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUCKETS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shard_file_name() {
        assert_eq!(ShardId::new(42).file_name(), "cache_42.rkyv");
        assert_eq!(ShardId::new(42).to_string(), "cache_42.rkyv");
    }

    #[test]
    fn test_shard_of_is_deterministic() {
        let scheme = ShardScheme::default();
        assert_eq!(scheme.shard_of("KEY"), scheme.shard_of("KEY"));
        assert_eq!(
            scheme.shard_of("KEY"),
            ShardScheme::new(NonZeroU32::new(256).unwrap()).shard_of("KEY")
        );
    }

    #[test]
    fn test_shard_of_stays_within_bucket_count() {
        let scheme = ShardScheme::new(NonZeroU32::new(7).unwrap());
        for i in 0..1000 {
            assert!(scheme.shard_of(&format!("key-{i}")).bucket() < 7);
        }
    }

    #[test]
    fn test_keys_spread_over_buckets() {
        let scheme = ShardScheme::new(NonZeroU32::new(16).unwrap());
        let shards: HashSet<_> = (0..1000)
            .map(|i| scheme.shard_of(&format!("key-{i}")))
            .collect();
        assert_eq!(shards.len(), 16);
    }

    #[test]
    fn test_single_bucket_collects_all_keys() {
        let scheme = ShardScheme::new(NonZeroU32::MIN);
        assert_eq!(scheme.shard_of("a"), scheme.shard_of("b"));
    }
}
