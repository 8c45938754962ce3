// src/lib.rs

// Public modules (the joinloop driver API)
pub mod cli;
pub mod commands;
pub mod errors;
pub mod harness;

// Internal crate aliases
pub(crate) use joinloop_codegen as codegen;
pub(crate) use joinloop_runtime as runtime;

pub use joinloop_runtime::install_segfault_handler;
