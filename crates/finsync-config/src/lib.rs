//! Configuration for finsync.
//!
//! TOML files are discovered in the user config directory and the working
//! directory, then merged section by section. The binary maps the merged
//! sections onto the runtime configs of the cache, session and stream crates.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, LoadedConfig, default_cache_dir, load_config, load_config_file,
    load_config_with_options, save_config, user_config_dir,
};
pub use error::{ConfigError, Result};
pub use types::{
    CacheSection, FinsyncConfig, LoggingSection, SessionSection, StreamSection, TtlSection,
};
