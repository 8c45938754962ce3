// src/errors/mod.rs
//! Error reporting for the joinloop driver.
//!
//! Errors are miette diagnostics; this module re-exports them and renders
//! them for the terminal.

pub mod report;

pub use crate::codegen::errors::{CodegenError, CodegenErrorKind};
pub use crate::harness::{Mismatch, SweepError};
pub use report::{render_to_stderr, render_to_string};
