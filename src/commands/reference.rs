// src/commands/reference.rs

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use super::common::resolve_bounds;
use crate::cli::SelectionArgs;
use crate::harness::Combination;
use crate::harness::oracle::reference_tuples;
use crate::runtime::format_tuple;

/// Print the oracle's tuples for every combination, in sweep order and in
/// the format `sweep --emit` echoes them.
pub fn print_reference(selection: &SelectionArgs) -> ExitCode {
    let bounds = resolve_bounds(selection);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match write_reference(&mut out, &bounds, selection.max_combinations) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: could not write reference output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn write_reference(
    out: &mut impl Write,
    bounds: &[i64],
    max_combinations: Option<usize>,
) -> io::Result<()> {
    let limit = max_combinations.unwrap_or(usize::MAX);
    for combination in Combination::all(bounds.len()).take(limit) {
        for tuple in reference_tuples(combination, bounds) {
            writeln!(out, "{}", format_tuple(&tuple))?;
        }
    }
    out.flush()
}
