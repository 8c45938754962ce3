// src/harness/sweep.rs

use crate::codegen::{
    BodyEffect, CodegenErrorKind, JitOptions, RecordIterators, SweepSession, compile_nest,
};
use crate::runtime::{begin_capture, pop_context, push_context, replace_context, set_echo};

use super::oracle::reference_tuples;
use super::{Combination, Mismatch, SweepError, format_bounds, generate_descriptors};

/// What to sweep and how.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// One scan bound per level, outermost first.
    pub bounds: Vec<i64>,
    pub jit: JitOptions,
    /// Echo every recorded tuple to stdout as it is recorded.
    pub emit: bool,
    /// Print each compiled nest's IR to stderr.
    pub dump_ir: bool,
    /// Stop after this many combinations.
    pub max_combinations: Option<usize>,
}

impl SweepConfig {
    pub fn new(bounds: Vec<i64>) -> Self {
        Self {
            bounds,
            jit: JitOptions::default(),
            emit: false,
            dump_ir: false,
            max_combinations: None,
        }
    }
}

/// Combinations that compiled and matched the reference, and the tuples
/// they recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub combinations: usize,
    pub tuples: usize,
}

/// Compile and run every combination for `config.bounds`, recording each
/// body invocation with [`RecordIterators`].
pub fn run_sweep(config: &SweepConfig) -> Result<SweepSummary, SweepError> {
    run_sweep_with(config, RecordIterators::new)
}

/// [`run_sweep`] with a caller-chosen body effect, built fresh for every
/// combination by `make_effect`.
///
/// A combination the verifier rejects is logged and skipped; the sweep then
/// ends in [`SweepError::Rejected`] listing every rejection. Any other
/// compilation failure, or tuples that disagree with the oracle, stop the
/// sweep at once.
#[tracing::instrument(skip_all, fields(bounds = %format_bounds(&config.bounds)))]
pub fn run_sweep_with<E, F>(
    config: &SweepConfig,
    make_effect: F,
) -> Result<SweepSummary, SweepError>
where
    E: BodyEffect,
    F: FnMut() -> E,
{
    let mut session = SweepSession::new(config.jit)?;

    push_context(&format!("sweep {}", format_bounds(&config.bounds)));
    set_echo(config.emit);
    let result = sweep_combinations(&mut session, config, make_effect);
    set_echo(false);
    pop_context();

    if let Ok(summary) = &result {
        tracing::info!(
            combinations = summary.combinations,
            tuples = summary.tuples,
            "sweep passed"
        );
    }
    result
}

fn sweep_combinations<E, F>(
    session: &mut SweepSession,
    config: &SweepConfig,
    mut make_effect: F,
) -> Result<SweepSummary, SweepError>
where
    E: BodyEffect,
    F: FnMut() -> E,
{
    let limit = config.max_combinations.unwrap_or(usize::MAX);
    let mut summary = SweepSummary::default();
    let mut rejected = Vec::new();

    for combination in Combination::all(config.bounds.len()).take(limit) {
        let mut effect = make_effect();
        match check_combination(session, config, combination, &mut effect) {
            Ok(tuples) => {
                summary.combinations += 1;
                summary.tuples += tuples;
            }
            Err(SweepError::Compile {
                combination,
                source,
            }) if matches!(source.kind, CodegenErrorKind::Verifier { .. }) => {
                tracing::error!(%combination, error = %source, "verifier rejected nest, skipping");
                rejected.push(SweepError::Compile {
                    combination,
                    source,
                });
            }
            Err(err) => return Err(err),
        }
    }

    if rejected.is_empty() {
        Ok(summary)
    } else {
        Err(SweepError::Rejected { rejected, summary })
    }
}

fn check_combination(
    session: &mut SweepSession,
    config: &SweepConfig,
    combination: Combination,
    effect: &mut dyn BodyEffect,
) -> Result<usize, SweepError> {
    replace_context(&format!("{combination} (compiling)"));
    let join_loops = generate_descriptors(combination, &config.bounds);
    let nest = compile_nest(session, &join_loops, effect).map_err(|source| {
        SweepError::Compile {
            combination,
            source,
        }
    })?;

    if config.dump_ir {
        eprintln!("; {combination}\n{}", nest.ir());
    }
    if let Some(disasm) = nest.disasm() {
        eprintln!("; {combination} disassembly\n{disasm}");
    }

    replace_context(&format!("{combination} (executing)"));
    let capture = begin_capture();
    nest.run();
    let actual = capture.finish();

    let expected = reference_tuples(combination, &config.bounds);
    let recorded = actual.len();
    if let Some(mismatch) = Mismatch::check(combination, expected, actual) {
        tracing::error!(%combination, index = mismatch.index, "reference mismatch");
        return Err(mismatch.into());
    }

    tracing::debug!(%combination, tuples = recorded, "combination passed");
    Ok(recorded)
}
