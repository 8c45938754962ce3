// src/join_loop/compose.rs
//
// Nested join-loop composition.
//
// Each level is built by `compose_level(i, continuation)`, which returns the
// level's entry block. `continuation` is where the level goes once it has
// nothing (more) to offer the current outer context: the advance block of the
// nearest enclosing scan, or the nest's exit block.
//
//   UpperBound level i:
//     preheader_i:                  ; entry
//         ub = <domain>
//         jump header_i(0)
//     header_i(c):
//         brif c < ub, <entry of level i+1>, continuation
//     advance_i:                    ; continuation of level i+1
//         jump header_i(c + 1)
//
//   Singleton level i:
//     lookup_i:                     ; entry
//         v = <domain>
//         jump check_i
//     check_i:
//         brif v == NO_MATCH, continuation, <entry of level i+1>
//
// header_i and check_i stay empty while the inner levels are composed, so the
// builder never has to leave a half-filled block.

use cranelift::codegen::ir::BlockArg;
use cranelift::prelude::*;
use smallvec::smallvec;

use super::domain::{IteratorSlots, JoinLoop, JoinLoopKind, JoinType, NO_MATCH};

/// Compose `join_loops` into a single nest and return its entry block.
///
/// `body` is called exactly once, with one iterator slot per level plus the
/// leading `outer_iter` slot. It must create and switch to its own block,
/// emit the innermost work and return that block, leaving the builder in the
/// (unterminated) block where the work ends; the composer terminates it with
/// a jump to the innermost continuation.
///
/// Every path out of the nest ends at `exit_block`. The builder's current
/// block must be filled or empty when this is called. The returned entry
/// block and `exit_block` are left unsealed for the caller.
///
/// # Panics
///
/// Panics when a level's domain does not match its kind or is not an i64
/// value. Both are bugs in the descriptor, not runtime conditions.
#[tracing::instrument(skip_all, fields(levels = join_loops.len()))]
pub fn compose_join_loops<F>(
    builder: &mut FunctionBuilder<'_>,
    join_loops: &[JoinLoop],
    body: F,
    outer_iter: Option<Value>,
    exit_block: Block,
) -> Block
where
    F: FnMut(&mut FunctionBuilder<'_>, &[Option<Value>]) -> Block,
{
    let mut composer = JoinLoopComposer {
        join_loops,
        body,
        iterators: smallvec![outer_iter],
    };
    composer.compose_level(builder, 0, exit_block)
}

struct JoinLoopComposer<'l, F> {
    join_loops: &'l [JoinLoop],
    body: F,
    /// Grows by one slot per level while descending, shrinks on the way out.
    iterators: IteratorSlots,
}

impl<F> JoinLoopComposer<'_, F>
where
    F: FnMut(&mut FunctionBuilder<'_>, &[Option<Value>]) -> Block,
{
    fn compose_level(
        &mut self,
        builder: &mut FunctionBuilder<'_>,
        level: usize,
        continuation: Block,
    ) -> Block {
        let join_loops = self.join_loops;
        let Some(join_loop) = join_loops.get(level) else {
            return self.compose_body(builder, continuation);
        };

        tracing::trace!(
            level,
            label = join_loop.label(),
            kind = ?join_loop.kind(),
            "compose level"
        );

        match join_loop.kind() {
            JoinLoopKind::UpperBound => {
                self.compose_upper_bound(builder, join_loop, level, continuation)
            }
            JoinLoopKind::Singleton => {
                self.compose_singleton(builder, join_loop, level, continuation)
            }
        }
    }

    fn compose_body(&mut self, builder: &mut FunctionBuilder<'_>, continuation: Block) -> Block {
        debug_assert_eq!(self.iterators.len(), self.join_loops.len() + 1);
        let body_block = (self.body)(builder, &self.iterators);
        builder.ins().jump(continuation, &[]);
        body_block
    }

    fn compose_upper_bound(
        &mut self,
        builder: &mut FunctionBuilder<'_>,
        join_loop: &JoinLoop,
        level: usize,
        continuation: Block,
    ) -> Block {
        let preheader = builder.create_block();
        let header = builder.create_block();
        let advance = builder.create_block();
        let counter = builder.append_block_param(header, types::I64);

        builder.switch_to_block(preheader);
        let upper_bound = self.evaluate_domain(builder, join_loop);
        let zero = builder.ins().iconst(types::I64, 0);
        builder.ins().jump(header, &[BlockArg::from(zero)]);

        builder.switch_to_block(advance);
        let next = builder.ins().iadd_imm(counter, 1);
        builder.ins().jump(header, &[BlockArg::from(next)]);

        self.iterators.push(Some(counter));
        let inner = self.compose_level(builder, level + 1, advance);
        self.iterators.pop();
        builder.seal_block(advance);

        builder.switch_to_block(header);
        builder.seal_block(header);
        let has_more = builder
            .ins()
            .icmp(IntCC::SignedLessThan, counter, upper_bound);
        builder.ins().brif(has_more, inner, &[], continuation, &[]);
        builder.seal_block(inner);

        preheader
    }

    fn compose_singleton(
        &mut self,
        builder: &mut FunctionBuilder<'_>,
        join_loop: &JoinLoop,
        level: usize,
        continuation: Block,
    ) -> Block {
        let lookup = builder.create_block();
        let check = builder.create_block();

        builder.switch_to_block(lookup);
        let slot = self.evaluate_domain(builder, join_loop);
        builder.ins().jump(check, &[]);

        // A match never loops: the inner levels resume the enclosing scan.
        self.iterators.push(Some(slot));
        let inner = self.compose_level(builder, level + 1, continuation);
        self.iterators.pop();

        builder.switch_to_block(check);
        builder.seal_block(check);
        let on_miss = match join_loop.join_type() {
            // No row drops the whole path
            JoinType::Inner => continuation,
        };
        let is_miss = builder.ins().icmp_imm(IntCC::Equal, slot, NO_MATCH);
        builder.ins().brif(is_miss, on_miss, &[], inner, &[]);
        builder.seal_block(inner);

        lookup
    }

    /// Emit `join_loop`'s domain into the current block and return its value.
    fn evaluate_domain(&self, builder: &mut FunctionBuilder<'_>, join_loop: &JoinLoop) -> Value {
        let domain = join_loop.iteration_domain(builder, &self.iterators);
        assert!(
            domain.kind() == join_loop.kind(),
            "join loop `{}`: {:?} level evaluated to a {:?} domain",
            join_loop.label(),
            join_loop.kind(),
            domain.kind()
        );

        let value = domain.value();
        let ty = builder.func.dfg.value_type(value);
        assert!(
            ty == types::I64,
            "join loop `{}`: domain value must be i64, got {}",
            join_loop.label(),
            ty
        );
        value
    }
}
