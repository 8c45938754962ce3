//! Join-loop code generation: nested join loops composed into Cranelift IR
//! and JIT-compiled into callable nests.

pub mod body;
pub mod errors;
pub mod jit;
pub mod join_loop;
mod nest;
pub mod runtime_registry;

pub use body::{BodyEffect, RecordIterators, RuntimeImports};
pub use errors::{CodegenError, CodegenErrorKind, CodegenResult};
pub use jit::{JitContext, JitOptions, SweepSession};
pub use join_loop::{
    IterationDomainFn, IteratorSlots, JoinLoop, JoinLoopDomain, JoinLoopKind, JoinType, NO_MATCH,
    compose_join_loops,
};
pub use nest::{CompiledNest, NEST_FUNCTION, compile_nest};

// Cranelift types appearing in the public API
pub use cranelift::prelude::{Block, FunctionBuilder, InstBuilder, Value, types};
