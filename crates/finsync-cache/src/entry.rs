//! Stored envelope around cached values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ttl::Ttl;

/// Entry as persisted in storage: `{"data": .., "timestamp": ms, "ttl": ms}`.
///
/// `ttl` is `null` for entries that never expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Epoch milliseconds at write time.
    pub timestamp: i64,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, written_at: DateTime<Utc>, ttl: Ttl) -> Self {
        Self {
            data,
            timestamp: written_at.timestamp_millis(),
            ttl: ttl.as_millis(),
        }
    }

    pub fn ttl(&self) -> Ttl {
        Ttl::from_millis(self.ttl)
    }

    /// Valid iff `now - written_at <= ttl`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => {
                let age = now.timestamp_millis().saturating_sub(self.timestamp);
                age <= i64::try_from(ttl).unwrap_or(i64::MAX)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_boundary_is_inclusive() {
        let written = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new((), written, Ttl::SHORT);
        assert!(entry.is_valid_at(written + Duration::seconds(60)));
        assert!(!entry.is_valid_at(written + Duration::milliseconds(60_001)));
    }

    #[test]
    fn test_wire_shape() {
        let written = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let json = serde_json::to_value(CacheEntry::new(vec![1, 2], written, Ttl::Infinite)).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["timestamp"], written.timestamp_millis());
        assert!(json["ttl"].is_null());
    }
}
