//! Cached repository facades for finsync.
//!
//! Each facade decorates a remote repository trait with read-through caching
//! in a [`finsync_cache::TtlCache`]. Lists and dashboards use the medium TTL
//! tier, categories the long tier, profiles the very-long tier. Writes always
//! invalidate by the acting user's namespace.

mod dashboard;
mod profile;
mod read_through;
mod records;

pub use dashboard::CachedDashboardRepository;
pub use profile::CachedProfileRepository;
pub use records::CachedRecordRepository;
