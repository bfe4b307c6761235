//! Cache Module
//!
//! Records with version and expiration, the per-store wrapper that mirrors
//! them in memory, and the prune pass that evicts outdated or stale records.

pub mod callback;
pub mod expiration;
mod merge;
mod prune;
mod record;
mod stats;
mod wrapper;


// Re-export public types
pub use callback::{node_callback, with_callback, NodeCallback};
pub use expiration::{current_timestamp_ms, duration_ms, expiration_from_now, MaxAge, RawMaxAge, TimeUnit};
pub use merge::deep_merge;
pub use prune::{is_outdated, parse_version, retrieve_and_prune, PruneReport, PruneScan};
pub use record::{ItemValue, Record, Update};
pub use stats::CacheStats;
pub use wrapper::{
    CacheWrapper, GetItemOptions, GetOptions, MergeEntry, RecordUpdate, SetEntry, WrapperSettings,
};
