//! Cache Statistics Module
//!
//! Tracks where reads were served from and how many records were evicted.

use serde::Serialize;

// == Cache Stats ==
/// Per-store read and eviction counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads answered from the in-memory mirror
    pub mirror_hits: u64,
    /// Reads that went to the backend
    pub backend_reads: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Records removed because they were stale when read
    pub stale_evictions: u64,
    /// Records removed by prune passes
    pub pruned: u64,
    /// Current number of records in the mirror
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of reads answered from the mirror.
    ///
    /// Returns 0.0 if no reads have been made.
    pub fn mirror_hit_rate(&self) -> f64 {
        let total = self.mirror_hits + self.backend_reads;
        if total == 0 {
            0.0
        } else {
            self.mirror_hits as f64 / total as f64
        }
    }

    pub fn record_mirror_hit(&mut self) {
        self.mirror_hits += 1;
    }

    pub fn record_backend_read(&mut self) {
        self.backend_reads += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_stale_eviction(&mut self) {
        self.stale_evictions += 1;
    }

    pub fn record_pruned(&mut self, count: usize) {
        self.pruned += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.mirror_hits, 0);
        assert_eq!(stats.backend_reads, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.pruned, 0);
    }

    #[test]
    fn test_hit_rate_no_reads() {
        assert_eq!(CacheStats::new().mirror_hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_mirror_hit();
        stats.record_mirror_hit();
        stats.record_mirror_hit();
        stats.record_backend_read();
        assert_eq!(stats.mirror_hit_rate(), 0.75);
    }

    #[test]
    fn test_record_evictions() {
        let mut stats = CacheStats::new();
        stats.record_stale_eviction();
        stats.record_pruned(3);
        stats.record_pruned(2);
        assert_eq!(stats.stale_evictions, 1);
        assert_eq!(stats.pruned, 5);
    }
}
