// tests/sweep_integration.rs
//! Integration tests for the joinloop binary.

use std::process::{Command, Output};

fn joinloop(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_joinloop"))
        .args(args)
        .env_remove("JOINLOOP_LOG")
        .output()
        .expect("Failed to run joinloop")
}

#[test]
fn default_sweep_passes() {
    let output = joinloop(&["sweep"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "Expected success exit code, got: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        stdout.contains("27 of 27 combinations passed"),
        "Expected summary in output: {}",
        stdout
    );
    assert!(stdout.contains("[5, 3, 9]"));
}

#[test]
fn emitted_tuples_match_reference_output() {
    for bounds in ["5,3,9", "2,0,3", "1,4", ""] {
        let bounds_arg = format!("--bounds={bounds}");
        let sweep = joinloop(&["sweep", "--emit", &bounds_arg]);
        let reference = joinloop(&["reference", &bounds_arg]);

        assert!(sweep.status.success(), "sweep failed for bounds '{bounds}'");
        assert!(reference.status.success(), "reference failed for bounds '{bounds}'");
        assert_eq!(
            String::from_utf8_lossy(&sweep.stdout),
            String::from_utf8_lossy(&reference.stdout),
            "tuple streams differ for bounds '{bounds}'"
        );
        // The summary moves to stderr so stdout stays diffable
        assert!(String::from_utf8_lossy(&sweep.stderr).contains("combinations passed"));
    }
}

#[test]
fn random_sweep_is_reproducible() {
    let args = ["reference", "--random-levels", "3", "--seed", "9"];
    let first = joinloop(&args);
    let second = joinloop(&args);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let sweep = joinloop(&["sweep", "--random-levels", "3", "--seed", "9", "--release"]);
    assert!(sweep.status.success());
}

#[test]
fn dump_ir_prints_functions() {
    let output = joinloop(&["sweep", "--bounds", "2", "--dump-ir"]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("mask=0b0 cond_mask=0b0"));
    assert!(stderr.contains("brif"));
}

#[test]
fn invalid_bounds_are_rejected() {
    let output = joinloop(&["sweep", "--bounds", "3,-1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("negative"));
}

#[test]
fn joinloop_help_works() {
    let output = joinloop(&["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("sweep"));
    assert!(stdout.contains("reference"));
}
