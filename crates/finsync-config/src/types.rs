//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [cache]
//! namespace = "@finsync_cache:"
//! dir = "/var/tmp/finsync-cache"
//!
//! [cache.ttl]
//! short_secs = 60
//! medium_secs = 300
//! long_secs = 900
//! very_long_secs = 3600
//!
//! [session]
//! duration_secs = 86400
//! renewal_interval_secs = 3000
//! keyring_service = "finsync"
//!
//! [stream]
//! search_debounce_ms = 300
//! buffer_size = 64
//!
//! [logging]
//! level = "info"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Every section is optional so partial files (a project-local override, for
/// instance) can be layered with [`FinsyncConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinsyncConfig {
    pub cache: Option<CacheSection>,
    pub session: Option<SessionSection>,
    pub stream: Option<StreamSection>,
    pub logging: Option<LoggingSection>,
}

impl FinsyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole; fields a layer leaves out take their
    /// defaults rather than the lower layer's values.
    pub fn merge(&mut self, other: FinsyncConfig) {
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.stream.is_some() {
            self.stream = other.stream;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Effective `[cache]` section, defaulted when absent.
    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    pub fn session(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    pub fn stream(&self) -> StreamSection {
        self.stream.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Local cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Prefix applied to every storage key.
    pub namespace: String,
    /// Directory for file-backed storage. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub ttl: TtlSection,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            namespace: "@finsync_cache:".to_string(),
            dir: None,
            ttl: TtlSection::default(),
        }
    }
}

/// TTL tier lengths, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlSection {
    pub short_secs: u64,
    pub medium_secs: u64,
    pub long_secs: u64,
    pub very_long_secs: u64,
}

impl Default for TtlSection {
    fn default() -> Self {
        Self {
            short_secs: 60,
            medium_secs: 300,
            long_secs: 900,
            very_long_secs: 3600,
        }
    }
}

impl TtlSection {
    pub fn short(&self) -> Duration {
        Duration::from_secs(self.short_secs)
    }

    pub fn medium(&self) -> Duration {
        Duration::from_secs(self.medium_secs)
    }

    pub fn long(&self) -> Duration {
        Duration::from_secs(self.long_secs)
    }

    pub fn very_long(&self) -> Duration {
        Duration::from_secs(self.very_long_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Session lifetime and credential storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub duration_secs: u64,
    pub renewal_interval_secs: u64,
    /// Keyring service name under which credentials are stored.
    pub keyring_service: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            duration_secs: 86_400,
            renewal_interval_secs: 3_000,
            keyring_service: "finsync".to_string(),
        }
    }
}

impl SessionSection {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn renewal_interval(&self) -> Duration {
        Duration::from_secs(self.renewal_interval_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streams and logging
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    pub search_debounce_ms: u64,
    pub buffer_size: usize,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
            buffer_size: 64,
        }
    }
}

impl StreamSection {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default `EnvFilter` directive, e.g. `"info"` or `"finsync=debug"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FinsyncConfig::from_toml("").unwrap();
        assert_eq!(config, FinsyncConfig::default());
        assert_eq!(config.cache().namespace, "@finsync_cache:");
        assert_eq!(config.cache().ttl.medium(), Duration::from_secs(300));
        assert_eq!(config.session().renewal_interval(), Duration::from_secs(3000));
        assert_eq!(config.stream().search_debounce(), Duration::from_millis(300));
        assert_eq!(config.logging().level, None);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config = FinsyncConfig::from_toml(
            r#"
[cache.ttl]
medium_secs = 120

[session]
keyring_service = "finsync-dev"
"#,
        )
        .unwrap();

        let cache = config.cache();
        assert_eq!(cache.ttl.medium_secs, 120);
        assert_eq!(cache.ttl.long_secs, 900);
        assert_eq!(cache.namespace, "@finsync_cache:");

        let session = config.session();
        assert_eq!(session.keyring_service, "finsync-dev");
        assert_eq!(session.duration_secs, 86_400);
    }

    #[test]
    fn test_merge_replaces_present_sections() {
        let mut base = FinsyncConfig::from_toml(
            r#"
[stream]
buffer_size = 8

[logging]
level = "warn"
"#,
        )
        .unwrap();
        let overlay = FinsyncConfig::from_toml(
            r#"
[logging]
level = "debug"
"#,
        )
        .unwrap();

        base.merge(overlay);
        assert_eq!(base.logging().level.as_deref(), Some("debug"));
        assert_eq!(base.stream().buffer_size, 8);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = FinsyncConfig::new();
        config.cache = Some(CacheSection {
            dir: Some(PathBuf::from("/tmp/finsync")),
            ..Default::default()
        });
        let text = config.to_toml().unwrap();
        assert!(text.contains("[cache.ttl]"));
        assert_eq!(FinsyncConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = FinsyncConfig::from_toml("[cache\nnamespace = 1").unwrap_err();
        assert!(matches!(err, crate::ConfigError::Parse(_)));
    }
}
