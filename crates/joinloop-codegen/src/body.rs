// src/body.rs
//
// Innermost-body effects. The composer only sees a callback returning a
// block; effects are how callers plug concrete work into that callback.

use cranelift::codegen::ir::FuncRef;
use cranelift::prelude::*;
use cranelift_jit::JITModule;
use cranelift_module::{FuncId, Module};
use rustc_hash::FxHashMap;

use crate::errors::CodegenResult;
use crate::jit::lookup_runtime_func;
use crate::runtime_registry::RuntimeKey;

/// Access to runtime functions while a nest is being built.
pub struct RuntimeImports<'a> {
    module: &'a mut JITModule,
    imported: &'a FxHashMap<String, FuncId>,
}

impl<'a> RuntimeImports<'a> {
    pub fn new(module: &'a mut JITModule, imported: &'a FxHashMap<String, FuncId>) -> Self {
        Self { module, imported }
    }

    /// Declare a runtime function inside the function being built.
    pub fn func_ref(
        &mut self,
        builder: &mut FunctionBuilder<'_>,
        key: RuntimeKey,
    ) -> CodegenResult<FuncRef> {
        let func_id = lookup_runtime_func(self.imported, key)?;
        Ok(self.module.declare_func_in_func(func_id, builder.func))
    }

    pub fn pointer_type(&self) -> Type {
        self.module.target_config().pointer_type()
    }
}

/// Work emitted in the innermost body of a join nest.
pub trait BodyEffect {
    /// Resolve whatever the effect needs before composition starts.
    fn prepare(
        &mut self,
        _builder: &mut FunctionBuilder<'_>,
        _imports: &mut RuntimeImports<'_>,
    ) -> CodegenResult<()> {
        Ok(())
    }

    /// Create and switch to the body block, emit the work and return the
    /// block. The builder must be left in the block where the work ends,
    /// unterminated.
    fn emit(&mut self, builder: &mut FunctionBuilder<'_>, iterators: &[Option<Value>]) -> Block;
}

/// Passes every level's iterator value (the sentinel slot excluded) to the
/// runtime tuple recorder.
#[derive(Debug, Default)]
pub struct RecordIterators {
    record: Option<FuncRef>,
    pointer_type: Option<Type>,
}

impl RecordIterators {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BodyEffect for RecordIterators {
    fn prepare(
        &mut self,
        builder: &mut FunctionBuilder<'_>,
        imports: &mut RuntimeImports<'_>,
    ) -> CodegenResult<()> {
        self.record = Some(imports.func_ref(builder, RuntimeKey::RecordIterators)?);
        self.pointer_type = Some(imports.pointer_type());
        Ok(())
    }

    fn emit(&mut self, builder: &mut FunctionBuilder<'_>, iterators: &[Option<Value>]) -> Block {
        let (Some(record), Some(ptr_type)) = (self.record, self.pointer_type) else {
            panic!("INTERNAL: RecordIterators::emit called before prepare");
        };

        let body_block = builder.create_block();
        builder.switch_to_block(body_block);

        let values: Vec<Value> = iterators
            .iter()
            .skip(1)
            .map(|slot| slot.expect("INTERNAL: level iterator slot is empty"))
            .collect();

        let base = if values.is_empty() {
            builder.ins().iconst(ptr_type, 0)
        } else {
            let slot = builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                (values.len() * 8) as u32,
                3,
            ));
            for (i, &value) in values.iter().enumerate() {
                builder.ins().stack_store(value, slot, (i * 8) as i32);
            }
            builder.ins().stack_addr(ptr_type, slot, 0)
        };
        let len = builder.ins().iconst(types::I64, values.len() as i64);
        builder.ins().call(record, &[base, len]);

        body_block
    }
}
