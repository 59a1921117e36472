//! `shardcache` is a persistent key-value cache keeping its entries in sharded files.
//!
//! Keys are distributed over a fixed number of shards, each persisted as a single blob holding
//! all entries of that shard. Shards are loaded lazily and remembered for the lifetime of a
//! cache instance, so that repeated lookups do not hit the storage again.
//!
//! `shardcache` makes use of these main concepts:
//!
//! - **Storage**: A [storage] is a flat namespace of blobs, for example a directory in the local
//!   filesystem.
//! - **Shard**: A [shard] holds all entries whose keys hash to the same bucket. Loading a shard
//!   drops expired entries and writes the compacted shard back.
//! - **Store**: The [store] is the cache engine mapping keys to shards.
//! - **Pool**: The [pool] is the high-level interface handing out mutable [Item]s.

pub mod config;
pub mod entry;
pub mod error;
pub mod pool;
pub mod shard;
pub mod storage;
pub mod store;

pub use pool::{Item, Pool};

pub mod util {
    //! Collects traits, functions, etc. that are not directly related to the main concepts of
    //! `shardcache`.

    pub mod clock;
    pub mod close;
    pub(crate) mod encoding;
}
pub mod test_util {
    //! Utilities for testing `shardcache` code.
    //!
    //! These are not intended to be used in production code.

    pub mod clock;
    pub mod storage;
}
