//! The cache record as seen by the engine.

use chrono::{DateTime, Utc};

/// One cache record: key, payload, optional expiration instant and hit flag.
///
/// Entries are built either as stored values ([Entry::new]) or as synthesized misses
/// ([Entry::miss]). A miss never carries a payload or an expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: String,
    payload: Option<Vec<u8>>,
    expiration: Option<DateTime<Utc>>,
    hit: bool,
}

impl Entry {
    /// Creates an entry representing a stored value.
    ///
    /// A `None` payload is a valid stored value (the null value), distinct from a miss.
    pub fn new(
        key: impl Into<String>,
        payload: Option<Vec<u8>>,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            key: key.into(),
            payload,
            expiration,
            hit: true,
        }
    }

    /// Creates an entry representing the absence of a value for `key`.
    pub fn miss(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            payload: None,
            expiration: None,
            hit: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    pub fn is_hit(&self) -> bool {
        self.hit
    }

    /// Turns the entry into a stored value. A miss becomes a stored null value.
    pub(crate) fn into_hit(self) -> Self {
        Self { hit: true, ..self }
    }

    /// Whether the entry is still alive at `now`.
    ///
    /// An entry expiring exactly at `now` is already dead.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_none_or(|expiration| expiration > now)
    }
}
