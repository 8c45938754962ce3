// src/harness/descriptors.rs

use crate::codegen::{InstBuilder, JoinLoop, JoinLoopDomain, NO_MATCH, Value, types};

use super::Combination;

/// Row id a matching probe yields.
pub const MATCHED_SLOT: i64 = 99;

/// Build one descriptor per bound for `combination`.
///
/// Scan levels iterate `[0, bound)`; probe levels ignore their bound and
/// yield [`MATCHED_SLOT`] or [`NO_MATCH`] depending on `cond_mask`. Every
/// domain function checks the iterator vector it is handed.
pub fn generate_descriptors(combination: Combination, bounds: &[i64]) -> Vec<JoinLoop> {
    let mut probe_index = 0;
    bounds
        .iter()
        .enumerate()
        .map(|(level, &bound)| {
            let label = format!("i{level}");
            if combination.is_probe(level) {
                let slot = if combination.probe_matches(probe_index) {
                    MATCHED_SLOT
                } else {
                    NO_MATCH
                };
                probe_index += 1;
                JoinLoop::singleton(label, move |builder, iterators| {
                    check_iterators(level, iterators);
                    JoinLoopDomain::SlotLookup(builder.ins().iconst(types::I64, slot))
                })
            } else {
                JoinLoop::upper_bound(label, move |builder, iterators| {
                    check_iterators(level, iterators);
                    JoinLoopDomain::UpperBound(builder.ins().iconst(types::I64, bound))
                })
            }
        })
        .collect()
}

fn check_iterators(level: usize, iterators: &[Option<Value>]) {
    assert_eq!(
        iterators.len(),
        level + 1,
        "level {level} domain saw {} iterator slots",
        iterators.len()
    );
    assert!(iterators[0].is_none(), "sentinel slot must be empty");
}
