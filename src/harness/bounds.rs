// src/harness/bounds.rs
//! Scan bounds: parsing, formatting and seeded random generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deepest nest the sweep enumerates (`3^12` combinations).
pub const MAX_LEVELS: usize = 12;

/// Random bounds are drawn from `0..=MAX_RANDOM_BOUND`, so empty scans occur.
pub const MAX_RANDOM_BOUND: i64 = 6;

/// Parse a comma-separated bound list such as `5,3,9`.
///
/// The empty string is the zero-level nest.
pub fn parse_bounds(s: &str) -> Result<Vec<i64>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }

    let bounds = s
        .split(',')
        .map(|part| {
            let part = part.trim();
            let bound: i64 = part
                .parse()
                .map_err(|_| format!("invalid bound '{part}'"))?;
            if bound < 0 {
                return Err(format!("bound must not be negative, got {bound}"));
            }
            Ok(bound)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if bounds.len() > MAX_LEVELS {
        return Err(format!(
            "at most {MAX_LEVELS} levels are supported, got {}",
            bounds.len()
        ));
    }
    Ok(bounds)
}

pub fn format_bounds(bounds: &[i64]) -> String {
    let parts: Vec<String> = bounds.iter().map(i64::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// `levels` bounds drawn from `0..=MAX_RANDOM_BOUND`, reproducible per seed.
pub fn random_bounds(levels: usize, seed: u64) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..levels)
        .map(|_| rng.gen_range(0..=MAX_RANDOM_BOUND))
        .collect()
}
