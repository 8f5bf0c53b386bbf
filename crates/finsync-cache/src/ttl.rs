//! Expiration policy for cache entries.

use std::time::Duration;

/// How long an entry stays valid after it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// Valid while `now - written_at <= duration`.
    For(Duration),
    /// Never expires; removed only explicitly.
    Infinite,
}

impl Ttl {
    pub const SHORT: Ttl = Ttl::For(Duration::from_secs(60));
    pub const MEDIUM: Ttl = Ttl::For(Duration::from_secs(5 * 60));
    pub const LONG: Ttl = Ttl::For(Duration::from_secs(15 * 60));
    pub const VERY_LONG: Ttl = Ttl::For(Duration::from_secs(60 * 60));

    /// Milliseconds as stored on disk; `None` for infinite.
    pub fn as_millis(&self) -> Option<u64> {
        match self {
            Ttl::For(d) => Some(u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            Ttl::Infinite => None,
        }
    }

    pub fn from_millis(ms: Option<u64>) -> Self {
        match ms {
            Some(ms) => Ttl::For(Duration::from_millis(ms)),
            None => Ttl::Infinite,
        }
    }
}

/// Configurable durations for the named TTL tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlTiers {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
    pub very_long: Duration,
}

impl Default for TtlTiers {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(60),
            medium: Duration::from_secs(5 * 60),
            long: Duration::from_secs(15 * 60),
            very_long: Duration::from_secs(60 * 60),
        }
    }
}

impl TtlTiers {
    pub fn with_short(mut self, d: Duration) -> Self {
        self.short = d;
        self
    }

    pub fn with_medium(mut self, d: Duration) -> Self {
        self.medium = d;
        self
    }

    pub fn with_long(mut self, d: Duration) -> Self {
        self.long = d;
        self
    }

    pub fn with_very_long(mut self, d: Duration) -> Self {
        self.very_long = d;
        self
    }

    pub fn short(&self) -> Ttl {
        Ttl::For(self.short)
    }

    /// Lists and dashboards.
    pub fn medium(&self) -> Ttl {
        Ttl::For(self.medium)
    }

    /// Categories.
    pub fn long(&self) -> Ttl {
        Ttl::For(self.long)
    }

    /// Profiles.
    pub fn very_long(&self) -> Ttl {
        Ttl::For(self.very_long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers_match_constants() {
        let tiers = TtlTiers::default();
        assert_eq!(tiers.short(), Ttl::SHORT);
        assert_eq!(tiers.medium(), Ttl::MEDIUM);
        assert_eq!(tiers.long(), Ttl::LONG);
        assert_eq!(tiers.very_long(), Ttl::VERY_LONG);
    }

    #[test]
    fn test_millis_encoding() {
        assert_eq!(Ttl::MEDIUM.as_millis(), Some(300_000));
        assert_eq!(Ttl::Infinite.as_millis(), None);
        assert_eq!(Ttl::from_millis(None), Ttl::Infinite);
    }
}
