//! Nested join loops: per-level descriptors and their composition into one
//! Cranelift control-flow nest.

mod compose;
mod domain;

pub use compose::compose_join_loops;
pub use domain::{
    IterationDomainFn, IteratorSlots, JoinLoop, JoinLoopDomain, JoinLoopKind, JoinType, NO_MATCH,
};
