//! joinloop runtime: symbols called from JIT-compiled join loops.
//!
//! # Safety: Raw Pointer Arguments in FFI Functions
//!
//! The functions exported here are only ever called by code emitted by
//! `joinloop-codegen`, which passes pointers into its own stack slots together
//! with the exact element count. A null pointer is only passed with a zero
//! length.
pub mod builtins;
pub mod signal;

pub use builtins::{
    CaptureGuard, IteratorTuple, begin_capture, format_tuple, joinloop_record_iterators, set_echo,
};
pub use signal::{install_segfault_handler, pop_context, push_context, replace_context};
