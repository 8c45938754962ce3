// src/harness/mod.rs
//! Exhaustive differential sweep over join-loop shapes.
//!
//! Every combination of level kinds (scan or probe) and probe outcomes is
//! composed, JIT-compiled and run; the tuples recorded by the compiled body
//! are compared against the [`oracle`].

mod bounds;
mod descriptors;
mod error;
pub mod oracle;
mod sweep;

use std::fmt;

pub use bounds::{MAX_LEVELS, MAX_RANDOM_BOUND, format_bounds, parse_bounds, random_bounds};
pub use descriptors::{MATCHED_SLOT, generate_descriptors};
pub use error::{Mismatch, SweepError};
pub use sweep::{SweepConfig, SweepSummary, run_sweep, run_sweep_with};

#[cfg(test)]
pub(crate) mod test_effects;

/// One sweep case: which levels probe, and which probes match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combination {
    /// Bit `i` set: level `i` is a probe, otherwise a scan.
    pub mask: u32,
    /// Bit `k` set: the `k`-th probe level (counting outermost first) finds
    /// its row.
    pub cond_mask: u32,
}

impl Combination {
    pub fn new(mask: u32, cond_mask: u32) -> Self {
        Self { mask, cond_mask }
    }

    pub fn is_probe(&self, level: usize) -> bool {
        self.mask & (1 << level) != 0
    }

    pub fn probe_count(&self) -> u32 {
        self.mask.count_ones()
    }

    /// Whether the probe with the given index among probe levels matches.
    pub fn probe_matches(&self, probe_index: u32) -> bool {
        self.cond_mask & (1 << probe_index) != 0
    }

    /// Every combination for `levels` levels, masks ascending and, within a
    /// mask, condition masks ascending.
    ///
    /// # Panics
    ///
    /// Panics if `levels` exceeds [`MAX_LEVELS`].
    pub fn all(levels: usize) -> impl Iterator<Item = Combination> {
        assert!(
            levels <= MAX_LEVELS,
            "at most {MAX_LEVELS} levels are supported, got {levels}"
        );
        (0..1u32 << levels).flat_map(|mask| {
            (0..1u32 << mask.count_ones()).map(move |cond_mask| Combination::new(mask, cond_mask))
        })
    }

    /// Number of combinations [`Combination::all`] yields: `3^levels`.
    pub fn count(levels: usize) -> usize {
        3usize.pow(levels as u32)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mask={:#b} cond_mask={:#b}", self.mask, self.cond_mask)
    }
}
