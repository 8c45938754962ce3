// src/commands/sweep.rs

use std::process::ExitCode;

use super::common::resolve_bounds;
use crate::cli::SelectionArgs;
use crate::codegen::JitOptions;
use crate::errors::{SweepError, render_to_stderr};
use crate::harness::{Combination, SweepConfig, SweepSummary, format_bounds, run_sweep};

/// Flags of `joinloop sweep` beyond the selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOptions {
    pub emit: bool,
    pub dump_ir: bool,
    pub disasm: bool,
    pub release: bool,
}

/// Run the sweep and report its outcome.
pub fn sweep(selection: &SelectionArgs, options: SweepOptions) -> ExitCode {
    let bounds = resolve_bounds(selection);
    let config = SweepConfig {
        jit: JitOptions {
            release: options.release,
            disasm: options.disasm,
        },
        emit: options.emit,
        dump_ir: options.dump_ir,
        max_combinations: selection.max_combinations,
        ..SweepConfig::new(bounds)
    };

    report(run_sweep(&config), &config, options.emit)
}

/// Print the outcome of a sweep and pick the exit code.
fn report(
    result: Result<SweepSummary, SweepError>,
    config: &SweepConfig,
    emit: bool,
) -> ExitCode {
    match result {
        Ok(summary) => {
            let total = Combination::count(config.bounds.len());
            let line = format!(
                "{} of {} combinations passed, {} tuples checked, bounds {}",
                summary.combinations,
                total,
                summary.tuples,
                format_bounds(&config.bounds)
            );
            // stdout carries the tuple stream when emitting
            if emit {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            render_to_stderr(&err);
            for listing in verifier_listings(&err) {
                eprintln!("{listing}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Annotated IR of every nest the verifier rejected.
fn verifier_listings(err: &SweepError) -> Vec<&str> {
    match err {
        SweepError::Compile { source, .. } => source.listing().into_iter().collect(),
        SweepError::Rejected { rejected, .. } => {
            rejected.iter().flat_map(verifier_listings).collect()
        }
        SweepError::Setup(_) | SweepError::Mismatch(_) => Vec::new(),
    }
}
