// src/harness/error.rs
//! Sweep errors (E4xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::Diagnostic;
use thiserror::Error;

use crate::codegen::CodegenError;
use crate::runtime::{IteratorTuple, format_tuple};

use super::{Combination, SweepSummary};

#[derive(Error, Debug, Diagnostic)]
pub enum SweepError {
    /// The sweep could not start (host ISA unavailable).
    #[error(transparent)]
    #[diagnostic(transparent)]
    Setup(#[from] CodegenError),

    #[error("{combination}: failed to compile join nest")]
    #[diagnostic(code(E4002))]
    Compile {
        combination: Combination,
        #[source]
        #[diagnostic_source]
        source: CodegenError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Mismatch(#[from] Mismatch),

    /// The verifier rejected some combinations; all others compiled and
    /// matched the reference.
    #[error("{} of {} combinations failed verification", .rejected.len(), .rejected.len() + .summary.combinations)]
    #[diagnostic(
        code(E4003),
        help("each rejected combination is listed below with its verifier error")
    )]
    Rejected {
        #[related]
        rejected: Vec<SweepError>,
        summary: SweepSummary,
    },
}

impl SweepError {
    /// The combination the sweep stopped at, if it got that far, or the
    /// first one the verifier rejected.
    pub fn combination(&self) -> Option<Combination> {
        match self {
            SweepError::Setup(_) => None,
            SweepError::Compile { combination, .. } => Some(*combination),
            SweepError::Mismatch(mismatch) => Some(mismatch.combination),
            SweepError::Rejected { rejected, .. } => {
                rejected.first().and_then(SweepError::combination)
            }
        }
    }
}

/// Compiled nest and reference disagree.
#[derive(Error, Debug, Diagnostic)]
#[error("{combination}: recorded tuples diverge from the reference at index {index}")]
#[diagnostic(code(E4001))]
pub struct Mismatch {
    pub combination: Combination,
    /// First index at which the sequences differ (or where one ends).
    pub index: usize,
    pub expected: Vec<IteratorTuple>,
    pub actual: Vec<IteratorTuple>,
    #[help]
    report: String,
}

impl Mismatch {
    /// Compare `actual` with `expected`; `None` when they are identical.
    pub fn check(
        combination: Combination,
        expected: Vec<IteratorTuple>,
        actual: Vec<IteratorTuple>,
    ) -> Option<Mismatch> {
        let index = expected
            .iter()
            .zip(&actual)
            .position(|(e, a)| e != a)
            .or_else(|| {
                (expected.len() != actual.len()).then_some(expected.len().min(actual.len()))
            })?;

        let report = format!(
            "expected {} tuples, recorded {}\n  expected[{index}]: {}\n  recorded[{index}]: {}\n\nexpected:\n{}\nrecorded:\n{}",
            expected.len(),
            actual.len(),
            describe(expected.get(index)),
            describe(actual.get(index)),
            listing(&expected),
            listing(&actual),
        );

        Some(Mismatch {
            combination,
            index,
            expected,
            actual,
            report,
        })
    }
}

fn describe(tuple: Option<&IteratorTuple>) -> String {
    match tuple {
        Some(tuple) => format!("({})", format_tuple(tuple)),
        None => "<end>".to_string(),
    }
}

fn listing(tuples: &[IteratorTuple]) -> String {
    if tuples.is_empty() {
        return "  <none>".to_string();
    }
    tuples
        .iter()
        .map(|t| format!("  {}", format_tuple(t)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combination() -> Combination {
        Combination::new(0b01, 0b1)
    }

    #[test]
    fn identical_sequences_do_not_mismatch() {
        let tuples = vec![vec![0, 1], vec![1, 1]];
        assert!(Mismatch::check(combination(), tuples.clone(), tuples).is_none());
        assert!(Mismatch::check(combination(), vec![], vec![]).is_none());
    }

    #[test]
    fn first_differing_tuple_is_reported() {
        let expected = vec![vec![0], vec![1], vec![2]];
        let actual = vec![vec![0], vec![2], vec![1]];
        let mismatch = Mismatch::check(combination(), expected, actual).unwrap();
        assert_eq!(mismatch.index, 1);
        assert!(mismatch.report.contains("expected[1]: (1)"));
        assert!(mismatch.report.contains("recorded[1]: (2)"));
    }

    #[test]
    fn missing_tail_is_reported_at_shorter_length() {
        let mismatch = Mismatch::check(combination(), vec![vec![0], vec![1]], vec![vec![0]])
            .unwrap();
        assert_eq!(mismatch.index, 1);
        assert!(mismatch.report.contains("recorded[1]: <end>"));

        let mismatch = Mismatch::check(combination(), vec![], vec![vec![99]]).unwrap();
        assert_eq!(mismatch.index, 0);
        assert!(mismatch.report.contains("  <none>"));
    }

    #[test]
    fn mismatch_names_the_combination_and_code() {
        let err: SweepError = Mismatch::check(combination(), vec![vec![1]], vec![])
            .unwrap()
            .into();
        assert_eq!(err.combination(), Some(combination()));
        assert!(err.to_string().contains("mask=0b1 cond_mask=0b1"));
        assert_eq!(err.code().map(|c| c.to_string()), Some("E4001".to_string()));
    }

    #[test]
    fn rejected_sweep_counts_attempted_combinations() {
        let err = SweepError::Rejected {
            rejected: vec![SweepError::Compile {
                combination: combination(),
                source: CodegenError::verifier("join_nest", "bad nest", "block0:"),
            }],
            summary: SweepSummary {
                combinations: 2,
                tuples: 3,
            },
        };
        assert_eq!(err.to_string(), "1 of 3 combinations failed verification");
        assert_eq!(err.combination(), Some(combination()));
        assert_eq!(err.code().map(|c| c.to_string()), Some("E4003".to_string()));
        assert_eq!(err.related().map(|r| r.count()), Some(1));
    }
}
