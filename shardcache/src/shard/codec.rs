//! Binary representation of a shard.
//!
//! A shard is stored as a validated rkyv archive of a versioned document listing every entry's
//! key, payload and expiration. Each write replaces the whole document; there is no append form.

use crate::entry::Entry;
use crate::error::DecodeError;
use chrono::{DateTime, Utc};
use rkyv::rancor;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

const SHARD_FORMAT_VERSION: u16 = 1;

#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Timestamp {
    secs: i64,
    nanos: u32,
}

#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Record {
    key: String,
    payload: Option<Vec<u8>>,
    expiration: Option<Timestamp>,
}

#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
struct ShardV1 {
    version: u16,
    records: Vec<Record>,
}

impl From<&Entry> for Record {
    fn from(entry: &Entry) -> Self {
        Self {
            key: entry.key().to_string(),
            payload: entry.payload().map(<[u8]>::to_vec),
            expiration: entry.expiration().map(|expiration| Timestamp {
                secs: expiration.timestamp(),
                nanos: expiration.timestamp_subsec_nanos(),
            }),
        }
    }
}

impl TryFrom<Record> for Entry {
    type Error = DecodeError;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        let expiration = match record.expiration {
            Some(Timestamp { secs, nanos }) => Some(
                DateTime::<Utc>::from_timestamp(secs, nanos)
                    .ok_or_else(|| DecodeError::InvalidTimestamp(record.key.clone()))?,
            ),
            None => None,
        };
        Ok(Entry::new(record.key, record.payload, expiration))
    }
}

/// Serializes entries into the bytes of one shard, in iteration order.
pub fn encode<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
) -> Result<AlignedVec, rancor::Error> {
    let shard = ShardV1 {
        version: SHARD_FORMAT_VERSION,
        records: entries.into_iter().map(Record::from).collect(),
    };
    rkyv::to_bytes::<rancor::Error>(&shard)
}

/// Parses the bytes of one shard back into entries, all of which are hits.
pub fn decode(bytes: &[u8]) -> Result<Vec<Entry>, DecodeError> {
    let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    let shard =
        rkyv::from_bytes::<ShardV1, rancor::Error>(&aligned).map_err(DecodeError::Malformed)?;
    if shard.version != SHARD_FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(shard.version));
    }
    shard.records.into_iter().map(Entry::try_from).collect()
}
