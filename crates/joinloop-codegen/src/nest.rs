// src/nest.rs
//
// Whole-function compilation of a join nest: `extern "C" fn()` whose body is
// a composed join-loop nest, verified and lowered to native code.

use cranelift::prelude::*;

use crate::body::{BodyEffect, RuntimeImports};
use crate::errors::{CodegenError, CodegenResult};
use crate::jit::{JitContext, SweepSession};
use crate::join_loop::{JoinLoop, compose_join_loops};

/// Symbol name of the compiled nest function.
pub const NEST_FUNCTION: &str = "join_nest";

/// A natively compiled join nest.
///
/// Owns the JIT module holding its machine code; the code is released when
/// the nest is dropped.
pub struct CompiledNest {
    jit: JitContext,
    entry: *const u8,
    ir: String,
}

impl CompiledNest {
    /// Run the nest once.
    pub fn run(&self) {
        // SAFETY: `entry` was produced by finalizing a `() -> ()` function in
        // `self.jit`, which is alive for the duration of this borrow.
        let nest: extern "C" fn() = unsafe { std::mem::transmute(self.entry) };
        nest();
    }

    /// Cranelift IR of the nest as composed, before lowering.
    pub fn ir(&self) -> &str {
        &self.ir
    }

    /// Disassembly, when the session was created with `JitOptions::disasm`.
    pub fn disasm(&self) -> Option<&str> {
        self.jit
            .get_disasm()
            .iter()
            .find(|(name, _)| name == NEST_FUNCTION)
            .map(|(_, text)| text.as_str())
    }
}

/// Compose `join_loops` around `effect` into a fresh module, verify the
/// function and compile it to native code.
///
/// Verification runs before lowering; on failure nothing is compiled and the
/// module is released with the returned error.
#[tracing::instrument(skip_all, fields(levels = join_loops.len()))]
pub fn compile_nest(
    session: &mut SweepSession,
    join_loops: &[JoinLoop],
    effect: &mut dyn BodyEffect,
) -> CodegenResult<CompiledNest> {
    let mut jit = session.jit();

    let sig = jit.create_signature(&[], None);
    let func_id = jit.declare_function(NEST_FUNCTION, &sig);
    jit.ctx.func.signature = sig;

    let built = {
        let (func, module, imported) = jit.split_for_compile();
        let mut imports = RuntimeImports::new(module, imported);
        let mut builder = FunctionBuilder::new(func, session.builder_ctx());
        let built = build_nest_function(&mut builder, &mut imports, join_loops, effect);
        if built.is_ok() {
            builder.finalize();
        }
        built
    };
    if let Err(err) = built {
        // The builder was abandoned mid-function
        *session.builder_ctx() = FunctionBuilderContext::new();
        return Err(err);
    }

    let ir = jit.ctx.func.display().to_string();
    tracing::trace!(%ir, "composed nest");

    jit.verify(NEST_FUNCTION)?;
    jit.define_function(func_id)?;
    jit.clear();
    jit.finalize()?;

    let entry = jit
        .get_function_ptr(NEST_FUNCTION)
        .ok_or_else(|| CodegenError::not_found("compiled function", NEST_FUNCTION))?;

    Ok(CompiledNest { jit, entry, ir })
}

fn build_nest_function(
    builder: &mut FunctionBuilder<'_>,
    imports: &mut RuntimeImports<'_>,
    join_loops: &[JoinLoop],
    effect: &mut dyn BodyEffect,
) -> CodegenResult<()> {
    let entry_block = builder.create_block();
    let start_block = builder.create_block();
    let exit_block = builder.create_block();
    // Blocks enter the layout when first filled, so the entry block is filled
    // first and forwards to the nest once it exists
    builder.switch_to_block(entry_block);
    builder.ins().jump(start_block, &[]);
    builder.switch_to_block(exit_block);
    builder.ins().return_(&[]);

    effect.prepare(builder, imports)?;
    let nest_block = compose_join_loops(
        builder,
        join_loops,
        |builder, iterators| effect.emit(builder, iterators),
        None,
        exit_block,
    );

    builder.switch_to_block(start_block);
    builder.ins().jump(nest_block, &[]);
    builder.seal_all_blocks();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RecordIterators;
    use crate::errors::CodegenErrorKind;
    use crate::jit::JitOptions;
    use crate::join_loop::{JoinLoopDomain, NO_MATCH};
    use joinloop_runtime::{IteratorTuple, begin_capture};

    fn scan(bound: i64) -> JoinLoop {
        JoinLoop::upper_bound(format!("ub{bound}"), move |b, _| {
            JoinLoopDomain::UpperBound(b.ins().iconst(types::I64, bound))
        })
    }

    fn probe(hit: bool) -> JoinLoop {
        JoinLoop::singleton(if hit { "hit" } else { "miss" }, move |b, _| {
            let slot = if hit { 99 } else { NO_MATCH };
            JoinLoopDomain::SlotLookup(b.ins().iconst(types::I64, slot))
        })
    }

    fn run(join_loops: &[JoinLoop]) -> Vec<IteratorTuple> {
        let mut session = SweepSession::new(JitOptions::debug()).unwrap();
        let nest = compile_nest(&mut session, join_loops, &mut RecordIterators::new()).unwrap();
        let capture = begin_capture();
        nest.run();
        capture.finish()
    }

    fn product(bounds: &[i64]) -> Vec<IteratorTuple> {
        let mut tuples: Vec<IteratorTuple> = vec![Vec::new()];
        for &bound in bounds {
            tuples = tuples
                .into_iter()
                .flat_map(|prefix| {
                    (0..bound).map(move |i| {
                        let mut t = prefix.clone();
                        t.push(i);
                        t
                    })
                })
                .collect();
        }
        tuples
    }

    #[test]
    fn pure_scans_cover_cartesian_product_in_order() {
        let tuples = run(&[scan(5), scan(3), scan(9)]);
        assert_eq!(tuples.len(), 135);
        assert_eq!(tuples, product(&[5, 3, 9]));
    }

    #[test]
    fn matched_probe_contributes_its_value_once() {
        let tuples = run(&[probe(true), scan(3), scan(9)]);
        assert_eq!(tuples.len(), 27);
        assert!(tuples.iter().all(|t| t[0] == 99));
        let tails: Vec<IteratorTuple> = tuples.iter().map(|t| t[1..].to_vec()).collect();
        assert_eq!(tails, product(&[3, 9]));
    }

    #[test]
    fn missed_probe_skips_everything_below_it() {
        assert!(run(&[probe(false), scan(3), scan(9)]).is_empty());
    }

    #[test]
    fn all_probes_run_body_at_most_once() {
        assert_eq!(run(&[probe(true), probe(true), probe(true)]), vec![vec![99, 99, 99]]);
        for miss in 0..3 {
            let join_loops: Vec<JoinLoop> = (0..3).map(|i| probe(i != miss)).collect();
            assert!(run(&join_loops).is_empty(), "miss at level {miss}");
        }
    }

    #[test]
    fn zero_levels_run_body_once() {
        assert_eq!(run(&[]), vec![Vec::<i64>::new()]);
    }

    #[test]
    fn exhausted_inner_scan_resumes_outer_scan() {
        let tuples = run(&[scan(3), probe(true), scan(2)]);
        assert_eq!(
            tuples,
            vec![
                vec![0, 99, 0],
                vec![0, 99, 1],
                vec![1, 99, 0],
                vec![1, 99, 1],
                vec![2, 99, 0],
                vec![2, 99, 1],
            ]
        );
    }

    #[test]
    fn missed_inner_probe_resumes_outer_scan() {
        // Outer scan still runs to completion, the body never does
        assert!(run(&[scan(4), probe(false)]).is_empty());
        assert_eq!(run(&[scan(2), probe(true)]), vec![vec![0, 99], vec![1, 99]]);
    }

    #[test]
    fn empty_scan_between_levels_yields_nothing() {
        assert!(run(&[scan(2), scan(0), scan(3)]).is_empty());
        assert!(run(&[scan(0)]).is_empty());
    }

    #[test]
    fn domains_can_depend_on_outer_iterators() {
        // for i in 0..4 { for j in 0..i + 1 { probe(i even ? i * 10 : miss) } }
        let join_loops = vec![
            scan(4),
            JoinLoop::upper_bound("triangle", |b, iterators| {
                let i = iterators[1].unwrap();
                JoinLoopDomain::UpperBound(b.ins().iadd_imm(i, 1))
            }),
            JoinLoop::singleton("even", |b, iterators| {
                let i = iterators[1].unwrap();
                let odd = b.ins().band_imm(i, 1);
                let scaled = b.ins().imul_imm(i, 10);
                let miss = b.ins().iconst(types::I64, NO_MATCH);
                JoinLoopDomain::SlotLookup(b.ins().select(odd, miss, scaled))
            }),
        ];

        let mut expected = Vec::new();
        for i in 0..4i64 {
            for j in 0..=i {
                if i % 2 == 0 {
                    expected.push(vec![i, j, i * 10]);
                }
            }
        }
        assert_eq!(run(&join_loops), expected);
    }

    #[test]
    fn nest_ir_and_disasm_are_available() {
        let mut session = SweepSession::new(JitOptions::disasm()).unwrap();
        let nest =
            compile_nest(&mut session, &[scan(2), probe(true)], &mut RecordIterators::new())
                .unwrap();
        assert!(nest.ir().contains("brif"));
        assert!(nest.disasm().is_some_and(|text| !text.is_empty()));
    }

    #[test]
    fn session_compiles_many_nests() {
        let mut session = SweepSession::new(JitOptions::release()).unwrap();
        for bound in 0..4 {
            let nest = compile_nest(&mut session, &[scan(bound)], &mut RecordIterators::new())
                .unwrap();
            let capture = begin_capture();
            nest.run();
            assert_eq!(capture.finish().len(), bound as usize);
        }
    }

    /// Emits a body that adds an i64 iterator to an i32 constant.
    struct IllTypedBody;

    impl BodyEffect for IllTypedBody {
        fn emit(&mut self, builder: &mut FunctionBuilder<'_>, iterators: &[Option<Value>]) -> Block {
            let block = builder.create_block();
            builder.switch_to_block(block);
            let narrow = builder.ins().iconst(types::I32, 1);
            let wide = iterators[1].unwrap();
            builder.ins().iadd(wide, narrow);
            block
        }
    }

    #[test]
    fn verifier_failure_is_reported_before_compilation() {
        let mut session = SweepSession::new(JitOptions::debug()).unwrap();
        let err = match compile_nest(&mut session, &[scan(2)], &mut IllTypedBody) {
            Ok(_) => panic!("ill-typed body should not verify"),
            Err(err) => err,
        };
        assert!(matches!(err.kind, CodegenErrorKind::Verifier { .. }));
        assert!(err.listing().is_some_and(|l| l.contains("iadd")));

        // The session stays usable for the next combination
        let nest =
            compile_nest(&mut session, &[scan(1)], &mut RecordIterators::new()).unwrap();
        let capture = begin_capture();
        nest.run();
        assert_eq!(capture.finish(), vec![vec![0]]);
    }
}
