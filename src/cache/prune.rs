//! Prune Module
//!
//! Scans every stored record of a store and deletes the ones that must not
//! be served: records written under an older schema version, stale records
//! (unless stale records are allowed) and entries that are not records.

use futures::future::try_join_all;
use semver::Version;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::cache::Record;
use crate::error::{CacheError, Result};

// == Prune Report ==
/// Outcome of one prune pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Records kept
    pub retained: usize,
    /// Records removed for an older version
    pub outdated: usize,
    /// Records removed for being stale
    pub stale: usize,
    /// Entries removed because they could not be read as records
    pub invalid: usize,
}

impl PruneReport {
    /// Total number of removed entries.
    pub fn removed(&self) -> usize {
        self.outdated + self.stale + self.invalid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    Outdated,
    Stale,
    Invalid,
}

/// Parses a schema version, rejecting anything that is not semantic versioning.
pub fn parse_version(version: &str) -> Result<Version> {
    Version::parse(version)
        .map_err(|err| CacheError::InvalidValue(format!("invalid version {version}: {err}")))
}

/// True when `record_version` sorts before `current`.
///
/// A record version that cannot be parsed counts as outdated.
pub fn is_outdated(record_version: &str, current: &Version) -> bool {
    match Version::parse(record_version) {
        Ok(version) => version < *current,
        Err(_) => true,
    }
}

fn judge(record: &Record, version: &Version, allow_stale: bool) -> Verdict {
    if is_outdated(&record.version, version) {
        Verdict::Outdated
    } else if !allow_stale && record.is_stale() {
        Verdict::Stale
    } else {
        Verdict::Keep
    }
}

/// Result of a prune scan.
#[derive(Debug, Default)]
pub struct PruneScan {
    /// Records kept, keyed by storage key
    pub survivors: Vec<(String, Record)>,
    /// Keys deleted from the backend
    pub removed: Vec<String>,
    pub report: PruneReport,
}

// == Retrieve And Prune ==
/// Loads all records of a store, deletes the invalid ones from the backend
/// and returns the survivors and the removed keys.
pub async fn retrieve_and_prune(
    backend: &dyn StorageBackend,
    version: &Version,
    allow_stale: bool,
) -> Result<PruneScan> {
    let keys = backend.keys().await?;
    let items = try_join_all(keys.into_iter().map(|key| async move {
        let item = backend.get_item(&key).await?;
        Ok::<_, CacheError>((key, item))
    }))
    .await?;

    let mut report = PruneReport::default();
    let mut survivors = Vec::with_capacity(items.len());
    let mut doomed = Vec::new();

    for (key, item) in items {
        // removed between listing and reading
        let Some(item) = item else { continue };

        let (verdict, record) = match decode(item) {
            Some(record) => (judge(&record, version, allow_stale), Some(record)),
            None => (Verdict::Invalid, None),
        };

        match (verdict, record) {
            (Verdict::Keep, Some(record)) => survivors.push((key, record)),
            (verdict, _) => {
                match verdict {
                    Verdict::Outdated => report.outdated += 1,
                    Verdict::Stale => report.stale += 1,
                    _ => {
                        warn!("Removing unreadable entry {}", key);
                        report.invalid += 1;
                    }
                }
                debug!("Pruning {} ({:?})", key, verdict);
                doomed.push(key);
            }
        }
    }

    try_join_all(doomed.iter().map(|key| backend.remove_item(key))).await?;

    report.retained = survivors.len();
    Ok(PruneScan {
        survivors,
        removed: doomed,
        report,
    })
}

fn decode(item: Value) -> Option<Record> {
    if !item.is_object() {
        return None;
    }
    Record::from_object(item).ok()
}
