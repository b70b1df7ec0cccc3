use std::fmt;
use std::path::Path;

use crate::cache::{AccessOutcome, Cache};
use crate::trace::Trace;

#[derive(Debug)]
pub enum SimulationError {
    ReadTrace(std::io::Error),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::ReadTrace(e) => {
                f.write_fmt(format_args!("failed to read trace file: {e}"))
            }
        }
    }
}

impl std::error::Error for SimulationError {}

/// Final counters of a simulation run.
///
/// `dirty_bytes` and `dirty_evictions` are measured in bytes (one block per
/// event), the other three count accesses. A dirty eviction moves a block's
/// worth of bytes from `dirty_bytes` (still dirty in the cache) over to
/// `dirty_evictions` (written back), so the two tallies partition the dirty
/// bytes ever created.
///
/// `skipped_lines` counts trace lines that failed to parse; they produced
/// no access and touched no counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    block_size: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub dirty_bytes: u64,
    pub dirty_evictions: u64,
    pub skipped_lines: usize,
}

impl CacheStats {
    pub fn new(block_size: u64) -> Self {
        Self {
            block_size,
            hits: 0,
            misses: 0,
            evictions: 0,
            dirty_bytes: 0,
            dirty_evictions: 0,
            skipped_lines: 0,
        }
    }

    pub fn fold(&mut self, outcome: &AccessOutcome) {
        if outcome.hit {
            self.hits += 1;
        }
        if outcome.miss {
            self.misses += 1;
        }
        if outcome.eviction {
            self.evictions += 1;
        }
        if outcome.dirty_increase {
            self.dirty_bytes += self.block_size;
        }
        if outcome.dirty_eviction {
            self.dirty_evictions += self.block_size;
            // the evicted block contributed to dirty_bytes when it was
            // marked dirty, so the tally cannot underflow here
            debug_assert!(self.dirty_bytes >= self.block_size);
            self.dirty_bytes -= self.block_size;
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "hits:{} misses:{} evictions:{} dirty_bytes:{} dirty_evictions:{}",
            self.hits, self.misses, self.evictions, self.dirty_bytes, self.dirty_evictions
        )
    }
}

#[derive(Debug)]
pub struct Simulation;

impl Simulation {
    pub fn run(cache: &mut Cache, file: impl AsRef<Path>) -> Result<CacheStats, SimulationError> {
        let file_content =
            std::fs::read_to_string(file).map_err(SimulationError::ReadTrace)?;
        Ok(Self::simulate(cache, file_content.as_str()))
    }

    /// Feeds every trace record through the cache, one sequence number per
    /// record starting at 0, and folds the outcomes into the counters.
    pub fn simulate(cache: &mut Cache, trace: &str) -> CacheStats {
        let trace = Trace::parse(trace);
        let skipped_lines = trace.skipped_lines();

        let mut stats = trace.into_iter().enumerate().fold(
            CacheStats::new(cache.block_size()),
            |mut stats, (sequence, record)| {
                let outcome = cache.access(record.address, record.kind, sequence as u64);
                stats.fold(&outcome);
                stats
            },
        );
        stats.skipped_lines = skipped_lines;
        stats
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::CacheConfig;

    fn cache(set_index_bits: u32, associativity: usize, block_offset_bits: u32) -> Cache {
        Cache::new(CacheConfig {
            set_index_bits,
            associativity,
            block_offset_bits,
        })
        .unwrap()
    }

    fn totals(stats: &CacheStats) -> (u64, u64, u64, u64, u64) {
        (
            stats.hits,
            stats.misses,
            stats.evictions,
            stats.dirty_bytes,
            stats.dirty_evictions,
        )
    }

    #[test]
    fn repeated_load_hits_on_second_access() {
        let mut cache = cache(0, 1, 0);
        let stats = Simulation::simulate(&mut cache, "L 0,1\nL 0,1\n");

        assert_eq!(totals(&stats), (1, 1, 0, 0, 0));
    }

    #[test]
    fn conflicting_loads_evict_the_single_line() {
        let mut cache = cache(0, 1, 0);
        let stats = Simulation::simulate(&mut cache, "L 0,1\nL 1,1\n");

        assert_eq!(totals(&stats), (0, 2, 1, 0, 0));
    }

    #[test]
    fn dirty_block_moves_to_dirty_evictions_on_conflict() {
        let mut cache = cache(0, 1, 4);
        let stats = Simulation::simulate(&mut cache, "S 0,1\nL 10,1\n");

        assert_eq!(totals(&stats), (0, 2, 1, 0, 16));
    }

    #[test]
    fn interleaved_loads_within_capacity_do_not_evict() {
        let mut cache = cache(1, 2, 0);
        let stats = Simulation::simulate(&mut cache, "L 0,1\nL 2,1\nL 0,1\n");

        assert_eq!(totals(&stats), (1, 2, 0, 0, 0));
    }

    #[test]
    fn stores_to_distinct_blocks_accumulate_dirty_bytes() {
        let mut cache = cache(0, 2, 3);
        let stats = Simulation::simulate(&mut cache, "S 0,1\nS 8,1\n");

        assert_eq!(totals(&stats), (0, 2, 0, 16, 0));
    }

    #[test]
    fn rewriting_a_dirty_block_does_not_double_count() {
        let mut cache = cache(0, 1, 2);
        let stats = Simulation::simulate(&mut cache, "S 0,1\nS 1,1\nS 2,1\n");

        assert_eq!(totals(&stats), (2, 1, 0, 4, 0));
    }

    #[test]
    fn malformed_lines_do_not_affect_counters() {
        let mut cache = cache(0, 1, 0);
        let stats = Simulation::simulate(&mut cache, "L 0,1\nnot a record\nL 0,1\n");

        assert_eq!(totals(&stats), (1, 1, 0, 0, 0));
        assert_eq!(stats.skipped_lines, 1);
    }

    #[test]
    fn clean_trace_reports_no_skipped_lines() {
        let mut cache = cache(0, 1, 0);
        let stats = Simulation::simulate(&mut cache, "L 0,1\nS 0,1\n");

        assert_eq!(stats.skipped_lines, 0);
    }

    #[test]
    fn empty_trace_yields_zero_totals() {
        let mut cache = cache(4, 2, 4);
        let stats = Simulation::simulate(&mut cache, "");

        assert_eq!(totals(&stats), (0, 0, 0, 0, 0));
    }

    #[test]
    fn missing_trace_file_is_a_fatal_error() {
        let mut cache = cache(0, 1, 0);
        let result = Simulation::run(&mut cache, "/nonexistent/trace.log");

        assert!(matches!(result, Err(SimulationError::ReadTrace(_))));
    }

    #[test]
    fn summary_lists_the_five_totals_in_order() {
        let mut cache = cache(0, 1, 4);
        let stats = Simulation::simulate(&mut cache, "S 0,1\nL 10,1\n");

        assert_eq!(
            stats.format_summary(),
            "hits:0 misses:2 evictions:1 dirty_bytes:0 dirty_evictions:16"
        );
    }
}
