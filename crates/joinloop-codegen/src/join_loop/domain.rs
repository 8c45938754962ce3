// src/join_loop/domain.rs
//
// Join-loop descriptors and the per-level iteration domain they evaluate to.

use std::fmt;

use cranelift::prelude::{FunctionBuilder, Value};
use smallvec::SmallVec;

/// Lookup result meaning "no matching row".
///
/// Row ids and counters are never negative, so any other value of a
/// [`JoinLoopDomain::SlotLookup`] is a match.
pub const NO_MATCH: i64 = -1;

/// Per-level iterator values, outermost first.
///
/// Slot 0 is the outer iterator of the whole nest (`None` when the nest has
/// no enclosing context); slot `i + 1` holds the iterator of level `i`.
pub type IteratorSlots = SmallVec<[Option<Value>; 8]>;

/// How a level iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinLoopKind {
    /// Counter over `[0, upper_bound)`.
    UpperBound,
    /// At most one iteration, driven by a single lookup.
    Singleton,
}

/// Join semantics of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum JoinType {
    /// A level with no rows (exhausted scan or missed lookup) drops the
    /// whole path.
    #[default]
    Inner,
}

/// Iteration domain of one level for one outer context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinLoopDomain {
    /// Iterate the counter over `[0, bound)`; the value is an i64.
    UpperBound(Value),
    /// A single lookup; the value is an i64 equal to [`NO_MATCH`] or the
    /// matched row id.
    SlotLookup(Value),
}

impl JoinLoopDomain {
    /// The loop kind this domain belongs to.
    pub fn kind(&self) -> JoinLoopKind {
        match self {
            JoinLoopDomain::UpperBound(_) => JoinLoopKind::UpperBound,
            JoinLoopDomain::SlotLookup(_) => JoinLoopKind::Singleton,
        }
    }

    pub fn value(&self) -> Value {
        match *self {
            JoinLoopDomain::UpperBound(v) | JoinLoopDomain::SlotLookup(v) => v,
        }
    }
}

/// Emits the instructions computing a level's domain from the outer
/// iterators. Must depend on nothing but its arguments.
pub type IterationDomainFn =
    Box<dyn Fn(&mut FunctionBuilder<'_>, &[Option<Value>]) -> JoinLoopDomain>;

/// One level of a join nest. Levels are composed in slice order, the first
/// being the outermost loop.
pub struct JoinLoop {
    kind: JoinLoopKind,
    join_type: JoinType,
    iteration_domain: IterationDomainFn,
    label: String,
}

impl JoinLoop {
    pub fn new(
        kind: JoinLoopKind,
        join_type: JoinType,
        iteration_domain: impl Fn(&mut FunctionBuilder<'_>, &[Option<Value>]) -> JoinLoopDomain
        + 'static,
        label: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            join_type,
            iteration_domain: Box::new(iteration_domain),
            label: label.into(),
        }
    }

    /// Inner-join scan level.
    pub fn upper_bound(
        label: impl Into<String>,
        iteration_domain: impl Fn(&mut FunctionBuilder<'_>, &[Option<Value>]) -> JoinLoopDomain
        + 'static,
    ) -> Self {
        Self::new(JoinLoopKind::UpperBound, JoinType::Inner, iteration_domain, label)
    }

    /// Inner-join lookup level.
    pub fn singleton(
        label: impl Into<String>,
        iteration_domain: impl Fn(&mut FunctionBuilder<'_>, &[Option<Value>]) -> JoinLoopDomain
        + 'static,
    ) -> Self {
        Self::new(JoinLoopKind::Singleton, JoinType::Inner, iteration_domain, label)
    }

    pub fn kind(&self) -> JoinLoopKind {
        self.kind
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Emit the domain computation for the given outer iterators.
    pub fn iteration_domain(
        &self,
        builder: &mut FunctionBuilder<'_>,
        iterators: &[Option<Value>],
    ) -> JoinLoopDomain {
        (self.iteration_domain)(builder, iterators)
    }
}

impl fmt::Debug for JoinLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinLoop")
            .field("kind", &self.kind)
            .field("join_type", &self.join_type)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift::prelude::*;

    #[test]
    fn domain_kind_follows_variant() {
        let mut func = codegen::ir::Function::new();
        let mut builder_ctx = FunctionBuilderContext::new();
        let mut builder = FunctionBuilder::new(&mut func, &mut builder_ctx);
        let block = builder.create_block();
        builder.switch_to_block(block);
        let v = builder.ins().iconst(types::I64, 3);

        assert_eq!(JoinLoopDomain::UpperBound(v).kind(), JoinLoopKind::UpperBound);
        assert_eq!(JoinLoopDomain::SlotLookup(v).kind(), JoinLoopKind::Singleton);
        assert_eq!(JoinLoopDomain::SlotLookup(v).value(), v);
    }

    #[test]
    fn constructors_set_kind_and_join_type() {
        let scan = JoinLoop::upper_bound("t0", |b, _| {
            JoinLoopDomain::UpperBound(b.ins().iconst(types::I64, 4))
        });
        let probe = JoinLoop::singleton("t1", |b, _| {
            JoinLoopDomain::SlotLookup(b.ins().iconst(types::I64, NO_MATCH))
        });

        assert_eq!(scan.kind(), JoinLoopKind::UpperBound);
        assert_eq!(probe.kind(), JoinLoopKind::Singleton);
        assert_eq!(scan.join_type(), JoinType::Inner);
        assert_eq!(probe.label(), "t1");
    }

    #[test]
    fn debug_shows_label_not_closure() {
        let scan = JoinLoop::upper_bound("orders", |b, _| {
            JoinLoopDomain::UpperBound(b.ins().iconst(types::I64, 1))
        });
        let rendered = format!("{scan:?}");
        assert!(rendered.contains("orders"));
        assert!(rendered.contains("UpperBound"));
    }
}
