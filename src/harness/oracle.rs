// src/harness/oracle.rs
//! Reference tuples for a sweep combination, computed directly in Rust.
//!
//! Nothing here goes through Cranelift: the oracle walks the same nest
//! recursively and is the ground truth the compiled nests are checked
//! against.

use crate::runtime::IteratorTuple;

use super::{Combination, MATCHED_SLOT};

/// The tuples an inner-join nest visits for `combination`, in visiting order.
pub fn reference_tuples(combination: Combination, bounds: &[i64]) -> Vec<IteratorTuple> {
    let mut walk = Walk {
        combination,
        bounds,
        prefix: Vec::with_capacity(bounds.len()),
        tuples: Vec::new(),
    };
    walk.level(0, 0);
    walk.tuples
}

struct Walk<'a> {
    combination: Combination,
    bounds: &'a [i64],
    prefix: IteratorTuple,
    tuples: Vec<IteratorTuple>,
}

impl Walk<'_> {
    fn level(&mut self, level: usize, probe_index: u32) {
        if level == self.bounds.len() {
            self.tuples.push(self.prefix.clone());
            return;
        }

        if self.combination.is_probe(level) {
            if !self.combination.probe_matches(probe_index) {
                return;
            }
            self.prefix.push(MATCHED_SLOT);
            self.level(level + 1, probe_index + 1);
            self.prefix.pop();
        } else {
            for i in 0..self.bounds[level] {
                self.prefix.push(i);
                self.level(level + 1, probe_index);
                self.prefix.pop();
            }
        }
    }
}

/// Number of tuples [`reference_tuples`] yields: the product of scan bounds,
/// or zero when any probe misses.
pub fn expected_count(combination: Combination, bounds: &[i64]) -> usize {
    let mut probe_index = 0;
    let mut count = 1usize;
    for (level, &bound) in bounds.iter().enumerate() {
        if combination.is_probe(level) {
            if !combination.probe_matches(probe_index) {
                return 0;
            }
            probe_index += 1;
        } else {
            count *= bound as usize;
        }
    }
    count
}
