use crate::allocator::{Geometry, PoolCounters};
use std::fmt;

/// Running counters kept under the arena's critical section.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Stats {
    pub minor_collections: u64,
    pub major_collections: u64,
    pub total_create: u64,
    pub total_delete: u64,
    pub total_modify: u64,
    pub total_scanning_work_minor: u64,
    pub total_scanning_work_major: u64,
    pub total_minor_time: u64,
    pub total_major_time: u64,
    pub peak_minor_time: u64,
    pub peak_major_time: u64,
}

impl Stats {
    pub fn record_collection(&mut self, minor: bool) {
        if minor {
            self.minor_collections += 1;
        } else {
            self.major_collections += 1;
        }
    }

    pub fn record_scan(&mut self, minor: bool, work: u64, elapsed_nanos: u64) {
        let (work_total, time_total, peak) = if minor {
            (
                &mut self.total_scanning_work_minor,
                &mut self.total_minor_time,
                &mut self.peak_minor_time,
            )
        } else {
            (
                &mut self.total_scanning_work_major,
                &mut self.total_major_time,
                &mut self.peak_major_time,
            )
        };

        *work_total += work;
        *time_total += elapsed_nanos;
        *peak = (*peak).max(elapsed_nanos);
    }
}

/// A snapshot of the arena's statistics.
///
/// Obtained by calling [`crate::RootArena::metrics`]. Times are in
/// nanoseconds of a monotonic clock; scanning work counts visited slots.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    pub minor_collections: u64,
    /// Major collections, and any other collection that is not minor.
    pub major_collections: u64,
    pub total_create: u64,
    pub total_delete: u64,
    pub total_modify: u64,
    pub total_scanning_work_minor: u64,
    pub total_scanning_work_major: u64,
    pub total_minor_time: u64,
    pub total_major_time: u64,
    pub peak_minor_time: u64,
    pub peak_major_time: u64,
    /// Pools ever obtained from the system allocator.
    pub total_alloced_pools: u64,
    /// Pools returned to the system allocator.
    pub total_freed_pools: u64,
    pub live_pools: u64,
    pub peak_pools: u64,
    /// Pool size in bytes.
    pub pool_size: usize,
    /// Slots per pool.
    pub pool_capacity: usize,
}

impl Metrics {
    pub(crate) fn new(stats: &Stats, pools: PoolCounters, geometry: &Geometry) -> Self {
        Self {
            minor_collections: stats.minor_collections,
            major_collections: stats.major_collections,
            total_create: stats.total_create,
            total_delete: stats.total_delete,
            total_modify: stats.total_modify,
            total_scanning_work_minor: stats.total_scanning_work_minor,
            total_scanning_work_major: stats.total_scanning_work_major,
            total_minor_time: stats.total_minor_time,
            total_major_time: stats.total_major_time,
            peak_minor_time: stats.peak_minor_time,
            peak_major_time: stats.peak_major_time,
            total_alloced_pools: pools.total_alloced,
            total_freed_pools: pools.total_freed,
            live_pools: pools.live,
            peak_pools: pools.peak,
            pool_size: geometry.size(),
            pool_capacity: geometry.capacity,
        }
    }

    pub fn total_scanning_work(&self) -> u64 {
        self.total_scanning_work_minor + self.total_scanning_work_major
    }

    pub fn work_per_minor(&self) -> Option<u64> {
        average(self.total_scanning_work_minor, self.minor_collections)
    }

    pub fn work_per_major(&self) -> Option<u64> {
        average(self.total_scanning_work_major, self.major_collections)
    }

    pub fn avg_minor_time(&self) -> Option<u64> {
        average(self.total_minor_time, self.minor_collections)
    }

    pub fn avg_major_time(&self) -> Option<u64> {
        average(self.total_major_time, self.major_collections)
    }
}

// Rounded to the nearest integer.
fn average(total: u64, count: u64) -> Option<u64> {
    if count == 0 {
        None
    } else {
        Some((total + count / 2) / count)
    }
}

fn mib(pools: u64, pool_size: usize) -> u64 {
    (pools * pool_size as u64) >> 20
}

struct OrNone(Option<u64>);

impl fmt::Display for OrNone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{n}"),
            None => write!(f, "-"),
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "minor collections: {}", self.minor_collections)?;
        writeln!(f, "major collections (and others): {}", self.major_collections)?;
        writeln!(
            f,
            "pool size: {} KiB ({} roots/pool)",
            self.pool_size >> 10,
            self.pool_capacity
        )?;
        writeln!(
            f,
            "total allocated pools: {} ({} MiB)",
            self.total_alloced_pools,
            mib(self.total_alloced_pools, self.pool_size)
        )?;
        writeln!(
            f,
            "peak allocated pools: {} ({} MiB)",
            self.peak_pools,
            mib(self.peak_pools, self.pool_size)
        )?;
        writeln!(
            f,
            "total freed pools: {} ({} MiB)",
            self.total_freed_pools,
            mib(self.total_freed_pools, self.pool_size)
        )?;
        writeln!(f, "work per minor: {}", OrNone(self.work_per_minor()))?;
        writeln!(f, "work per major: {}", OrNone(self.work_per_major()))?;
        writeln!(
            f,
            "total scanning work: {} ({} minor, {} major)",
            self.total_scanning_work(),
            self.total_scanning_work_minor,
            self.total_scanning_work_major
        )?;
        writeln!(f, "average time per minor: {}ns", OrNone(self.avg_minor_time()))?;
        writeln!(f, "average time per major: {}ns", OrNone(self.avg_major_time()))?;
        writeln!(f, "peak time per minor: {}ns", self.peak_minor_time)?;
        writeln!(f, "peak time per major: {}ns", self.peak_major_time)?;
        writeln!(f, "total created: {}", self.total_create)?;
        writeln!(f, "total deleted: {}", self.total_delete)?;
        write!(f, "total modified: {}", self.total_modify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_round_to_nearest() {
        assert_eq!(average(10, 4), Some(3));
        assert_eq!(average(9, 4), Some(2));
        assert_eq!(average(5, 0), None);
    }

    #[test]
    fn scan_records_totals_and_peaks() {
        let mut stats = Stats::default();

        stats.record_collection(true);
        stats.record_scan(true, 10, 300);
        stats.record_collection(true);
        stats.record_scan(true, 20, 100);
        stats.record_collection(false);
        stats.record_scan(false, 5, 50);

        let metrics = Metrics::new(&stats, PoolCounters::default(), &Geometry::new(14));

        assert_eq!(metrics.total_scanning_work(), 35);
        assert_eq!(metrics.work_per_minor(), Some(15));
        assert_eq!(metrics.work_per_major(), Some(5));
        assert_eq!(metrics.peak_minor_time, 300);
        assert_eq!(metrics.avg_minor_time(), Some(200));
        assert_eq!(metrics.pool_size, 16 * 1024);
    }

    #[test]
    fn display_mentions_every_section() {
        let text = Metrics::default().to_string();

        assert!(text.contains("minor collections: 0"));
        assert!(text.contains("work per minor: -"));
        assert!(text.contains("total modified: 0"));
    }
}
