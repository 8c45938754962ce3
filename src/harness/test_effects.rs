// src/harness/test_effects.rs
//! Deliberately broken body effects for exercising sweep failures.

use crate::codegen::{
    BodyEffect, Block, CodegenResult, FunctionBuilder, InstBuilder, RecordIterators,
    RuntimeImports, Value, types,
};

/// Records only the outermost level's iterator.
#[derive(Debug, Default)]
pub struct OutermostOnly(RecordIterators);

impl OutermostOnly {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BodyEffect for OutermostOnly {
    fn prepare(
        &mut self,
        builder: &mut FunctionBuilder<'_>,
        imports: &mut RuntimeImports<'_>,
    ) -> CodegenResult<()> {
        self.0.prepare(builder, imports)
    }

    fn emit(&mut self, builder: &mut FunctionBuilder<'_>, iterators: &[Option<Value>]) -> Block {
        self.0.emit(builder, &iterators[..iterators.len().min(2)])
    }
}

/// Records iterators, or emits an ill-typed body the verifier rejects.
#[derive(Debug)]
pub struct RejectWhen {
    record: RecordIterators,
    reject: bool,
}

impl RejectWhen {
    pub fn new(reject: bool) -> Self {
        Self {
            record: RecordIterators::new(),
            reject,
        }
    }
}

impl BodyEffect for RejectWhen {
    fn prepare(
        &mut self,
        builder: &mut FunctionBuilder<'_>,
        imports: &mut RuntimeImports<'_>,
    ) -> CodegenResult<()> {
        self.record.prepare(builder, imports)
    }

    fn emit(&mut self, builder: &mut FunctionBuilder<'_>, iterators: &[Option<Value>]) -> Block {
        if !self.reject {
            return self.record.emit(builder, iterators);
        }
        let block = builder.create_block();
        builder.switch_to_block(block);
        let wide = builder.ins().iconst(types::I64, 1);
        let narrow = builder.ins().iconst(types::I32, 1);
        builder.ins().iadd(wide, narrow);
        block
    }
}
