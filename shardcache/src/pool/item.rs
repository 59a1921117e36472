use crate::entry::Entry;
use crate::error::PoolError;
use crate::util::clock::{Clock, SystemClock};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A cache item as handed out by a [Pool](super::Pool).
///
/// Items are detached copies: changing the value or the expiration has no effect until the item
/// is passed to [Pool::save](super::Pool::save) or
/// [Pool::save_deferred](super::Pool::save_deferred).
#[derive(Debug, Clone)]
pub struct Item<C: Clock = SystemClock> {
    key: String,
    value: Option<Vec<u8>>,
    expiration: Option<DateTime<Utc>>,
    hit: bool,
    clock: C,
}

impl<C: Clock> Item<C> {
    pub(crate) fn from_entry(entry: Entry, clock: C) -> Self {
        Self {
            key: entry.key().to_string(),
            value: entry.payload().map(<[u8]>::to_vec),
            expiration: entry.expiration(),
            hit: entry.is_hit(),
            clock,
        }
    }

    pub(crate) fn to_entry(&self) -> Entry {
        Entry::new(self.key.as_str(), self.value.clone(), self.expiration)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The item's value. `None` for misses and for stored null values.
    pub fn get(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Whether the item was found in the cache when it was retrieved.
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    pub fn set(&mut self, value: impl Into<Vec<u8>>) -> &mut Self {
        self.value = Some(value.into());
        self
    }

    /// Deserializes the item's value from JSON. `None` if there is no value.
    pub fn get_value<T: DeserializeOwned>(&self) -> Result<Option<T>, PoolError> {
        self.value
            .as_deref()
            .map(serde_json::from_slice)
            .transpose()
            .map_err(PoolError::Value)
    }

    /// Sets the item's value to the JSON serialization of `value`.
    pub fn set_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, PoolError> {
        self.value = Some(serde_json::to_vec(value).map_err(PoolError::Value)?);
        Ok(self)
    }

    /// Sets the absolute expiration instant, or removes the expiration with `None`.
    ///
    /// Fails if `expiration` is not in the future.
    pub fn expires_at(
        &mut self,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<&mut Self, PoolError> {
        if let Some(expiration) = expiration {
            if expiration <= self.clock.now() {
                return Err(PoolError::InvalidArgument(format!(
                    "expiration {expiration} must be in the future"
                )));
            }
        }
        self.expiration = expiration;
        Ok(self)
    }

    /// Sets the expiration relative to now, or removes the expiration with `None`.
    ///
    /// Fails if `duration` is not positive.
    pub fn expires_after(&mut self, duration: Option<TimeDelta>) -> Result<&mut Self, PoolError> {
        self.expiration = match duration {
            None => None,
            Some(duration) if duration <= TimeDelta::zero() => {
                return Err(PoolError::InvalidArgument(format!(
                    "expiration duration {duration} must be positive"
                )));
            }
            Some(duration) => Some(
                self.clock
                    .now()
                    .checked_add_signed(duration)
                    .ok_or_else(|| {
                        PoolError::InvalidArgument(format!(
                            "expiration duration {duration} is out of range"
                        ))
                    })?,
            ),
        };
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::clock::ControlledClock;

    fn miss(clock: &ControlledClock) -> Item<ControlledClock> {
        Item::from_entry(Entry::miss("key"), clock.clone())
    }

    #[test]
    fn test_miss_becomes_stored_value_when_converted() {
        let clock = ControlledClock::default();
        let mut item = miss(&clock);
        assert!(!item.is_hit());
        assert_eq!(item.to_entry(), Entry::new("key", None, None));

        item.set("value");
        assert_eq!(item.get(), Some(b"value".as_slice()));
        assert_eq!(item.to_entry().payload(), Some(b"value".as_slice()));
    }

    #[test]
    fn test_typed_values_are_stored_as_json() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Build {
            id: u32,
            artifacts: Vec<String>,
        }

        let clock = ControlledClock::default();
        let mut item = miss(&clock);
        assert_eq!(item.get_value::<Build>().unwrap(), None);

        let build = Build {
            id: 42,
            artifacts: vec!["app.tar".to_string()],
        };
        item.set_value(&build).unwrap();
        assert_eq!(item.get(), Some(br#"{"id":42,"artifacts":["app.tar"]}"#.as_slice()));
        assert_eq!(item.get_value::<Build>().unwrap(), Some(build));
    }

    #[test]
    fn test_value_of_wrong_type_is_an_error() {
        let clock = ControlledClock::default();
        let mut item = miss(&clock);
        item.set("not json");
        assert!(matches!(item.get_value::<u32>(), Err(PoolError::Value(_))));
    }

    #[test]
    fn test_expires_at_rejects_instants_not_in_the_future() {
        let clock = ControlledClock::default();
        let mut item = miss(&clock);
        for instant in [clock.now(), clock.now() - TimeDelta::seconds(1)] {
            assert!(matches!(
                item.expires_at(Some(instant)),
                Err(PoolError::InvalidArgument(_))
            ));
        }
        assert_eq!(item.expiration(), None);

        let future = clock.now() + TimeDelta::seconds(1);
        item.expires_at(Some(future)).unwrap();
        assert_eq!(item.expiration(), Some(future));
        item.expires_at(None).unwrap();
        assert_eq!(item.expiration(), None);
    }

    #[test]
    fn test_expires_after_is_relative_to_clock() {
        let mut clock = ControlledClock::default();
        let mut item = miss(&clock);
        clock.advance_by(TimeDelta::days(1));
        item.expires_after(Some(TimeDelta::hours(1))).unwrap();
        assert_eq!(item.expiration(), Some(clock.now() + TimeDelta::hours(1)));

        item.expires_after(None).unwrap();
        assert_eq!(item.expiration(), None);
    }

    #[test]
    fn test_expires_after_rejects_non_positive_durations() {
        let clock = ControlledClock::default();
        let mut item = miss(&clock);
        for duration in [TimeDelta::zero(), TimeDelta::seconds(-5)] {
            assert!(matches!(
                item.expires_after(Some(duration)),
                Err(PoolError::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            item.expires_after(Some(TimeDelta::days(400_000_000))),
            Err(PoolError::InvalidArgument(_))
        ));
    }
}
