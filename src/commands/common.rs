// src/commands/common.rs
//! Shared utilities for CLI commands.

use crate::cli::SelectionArgs;
use crate::harness::{format_bounds, random_bounds};

/// The bounds a selection asks for: `--random-levels` draws them from the
/// seed, otherwise `--bounds` is used as given.
pub fn resolve_bounds(selection: &SelectionArgs) -> Vec<i64> {
    match selection.random_levels {
        Some(levels) => {
            let bounds = random_bounds(levels, selection.seed);
            tracing::info!(
                levels,
                seed = selection.seed,
                bounds = %format_bounds(&bounds),
                "random bounds"
            );
            bounds
        }
        None => selection.bounds.clone(),
    }
}
