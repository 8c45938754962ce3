// src/jit.rs

use std::mem::ManuallyDrop;

use cranelift::prelude::*;
use cranelift_codegen::isa::OwnedTargetIsa;
use cranelift_codegen::print_errors::pretty_verifier_error;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};
use rustc_hash::FxHashMap;

use crate::errors::{CodegenError, CodegenResult};
use crate::runtime_registry::{AbiTy, RuntimeKey, RuntimeSymbol, runtime_symbols};

/// Options for JIT compilation
#[derive(Clone, Copy, Debug, Default)]
pub struct JitOptions {
    /// Release mode: disable Cranelift's internal verifier. The explicit
    /// verification pass in [`JitContext::verify`] still runs.
    pub release: bool,
    /// Enable disassembly output
    pub disasm: bool,
}

impl JitOptions {
    /// Create options for debug mode (default)
    pub fn debug() -> Self {
        Self {
            release: false,
            disasm: false,
        }
    }

    /// Create options for release mode
    pub fn release() -> Self {
        Self {
            release: true,
            disasm: false,
        }
    }

    /// Create options for disassembly output
    pub fn disasm() -> Self {
        Self {
            release: false,
            disasm: true,
        }
    }
}

/// Build the host ISA with the flags every join-loop module uses.
fn build_isa(options: JitOptions) -> CodegenResult<OwnedTargetIsa> {
    let mut flag_builder = settings::builder();
    flag_builder
        .set("use_colocated_libcalls", "false")
        .expect("INTERNAL: Cranelift config: invalid 'use_colocated_libcalls' flag");
    flag_builder
        .set("is_pic", "false")
        .expect("INTERNAL: Cranelift config: invalid 'is_pic' flag");
    flag_builder
        .set("opt_level", "speed")
        .expect("INTERNAL: Cranelift config: invalid 'opt_level' flag");

    if options.release {
        flag_builder
            .set("enable_verifier", "false")
            .expect("INTERNAL: Cranelift config: invalid 'enable_verifier' flag");
    }

    let isa_builder = cranelift_native::builder().map_err(CodegenError::isa)?;
    isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(CodegenError::isa)
}

/// State that lives for a whole sweep: the host ISA and the reusable
/// function-builder scratch space.
///
/// Every compiled nest gets its own [`JitContext`] (module and function) from
/// [`SweepSession::jit`]; nothing compiled outlives that context.
pub struct SweepSession {
    isa: OwnedTargetIsa,
    options: JitOptions,
    builder_ctx: FunctionBuilderContext,
}

impl SweepSession {
    pub fn new(options: JitOptions) -> CodegenResult<Self> {
        Ok(Self {
            isa: build_isa(options)?,
            options,
            builder_ctx: FunctionBuilderContext::new(),
        })
    }

    /// A fresh JIT module sharing this session's ISA.
    pub fn jit(&self) -> JitContext {
        JitContext::with_isa(self.isa.clone(), self.options)
    }

    pub fn builder_ctx(&mut self) -> &mut FunctionBuilderContext {
        &mut self.builder_ctx
    }
}

/// JIT compiler context
///
/// Owns one `JITModule`. Dropping the context frees the module's machine
/// code, so function pointers obtained from it must not outlive it.
pub struct JitContext {
    pub module: ManuallyDrop<JITModule>,
    pub ctx: codegen::Context,
    /// Functions declared with Export linkage (will be compiled)
    pub func_ids: FxHashMap<String, FuncId>,
    /// Functions declared with Import linkage (runtime functions)
    pub imported_func_ids: FxHashMap<String, FuncId>,
    disasm: bool,
    disasm_output: Vec<(String, String)>,
}

impl JitContext {
    /// Create a new JitContext on an already configured ISA
    pub fn with_isa(isa: OwnedTargetIsa, options: JitOptions) -> Self {
        let mut builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        Self::register_runtime_symbols(&mut builder);

        let module = JITModule::new(builder);
        let ctx = module.make_context();

        let mut jit = Self {
            module: ManuallyDrop::new(module),
            ctx,
            func_ids: FxHashMap::default(),
            imported_func_ids: FxHashMap::default(),
            disasm: options.disasm,
            disasm_output: Vec::new(),
        };

        jit.import_runtime_functions();
        jit
    }

    fn import_runtime_functions(&mut self) {
        for symbol in runtime_symbols() {
            let sig = self.create_runtime_signature(symbol);
            self.import_function(symbol.c_name, &sig);
        }
    }

    fn register_runtime_symbols(builder: &mut JITBuilder) {
        for symbol in runtime_symbols() {
            builder.symbol(symbol.c_name, symbol.ptr);
        }
    }

    /// Get the pointer type for the target
    pub fn pointer_type(&self) -> Type {
        self.module.target_config().pointer_type()
    }

    /// Create a function signature with given parameters and return type
    pub fn create_signature(&self, params: &[Type], ret: Option<Type>) -> Signature {
        let mut sig = self.module.make_signature();
        for &param in params {
            sig.params.push(AbiParam::new(param));
        }
        if let Some(ret_type) = ret {
            sig.returns.push(AbiParam::new(ret_type));
        }
        sig
    }

    fn abi_ty_to_type(&self, ty: AbiTy) -> Type {
        match ty {
            AbiTy::Ptr => self.pointer_type(),
            AbiTy::I64 => types::I64,
        }
    }

    fn create_runtime_signature(&self, symbol: &RuntimeSymbol) -> Signature {
        let mut sig = self.module.make_signature();
        for &param in symbol.params {
            sig.params.push(AbiParam::new(self.abi_ty_to_type(param)));
        }
        if let Some(ret) = symbol.ret {
            sig.returns.push(AbiParam::new(self.abi_ty_to_type(ret)));
        }
        sig
    }

    /// Declare a function in the module
    pub fn declare_function(&mut self, name: &str, sig: &Signature) -> FuncId {
        let func_id = self
            .module
            .declare_function(name, Linkage::Export, sig)
            .unwrap_or_else(|e| panic!("failed to declare function '{}': {:?}", name, e));
        self.func_ids.insert(name.to_string(), func_id);
        func_id
    }

    /// Import an external function
    pub fn import_function(&mut self, name: &str, sig: &Signature) -> FuncId {
        let func_id = self
            .module
            .declare_function(name, Linkage::Import, sig)
            .unwrap_or_else(|e| panic!("failed to import function '{}': {:?}", name, e));
        self.imported_func_ids.insert(name.to_string(), func_id);
        func_id
    }

    /// Run the Cranelift verifier over the function currently in `ctx`.
    ///
    /// On failure the error carries the verifier messages and the function
    /// listing annotated with them.
    pub fn verify(&self, name: &str) -> CodegenResult<()> {
        match cranelift_codegen::verify_function(&self.ctx.func, self.module.isa()) {
            Ok(()) => Ok(()),
            Err(errors) => {
                let diagnostic = errors.to_string();
                let listing = pretty_verifier_error(&self.ctx.func, None, errors);
                tracing::error!(function = name, %diagnostic, "verification failed");
                Err(CodegenError::verifier(name, diagnostic, listing))
            }
        }
    }

    /// Define a function (after building IR)
    pub fn define_function(&mut self, func_id: FuncId) -> CodegenResult<()> {
        let func_name = self
            .func_ids
            .iter()
            .find(|(_, id)| **id == func_id)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| format!("func_{:?}", func_id));

        if self.disasm {
            self.ctx.set_disasm(true);
        }

        self.module
            .define_function(func_id, &mut self.ctx)
            .map_err(|e| CodegenError::compile(&func_name, e))?;

        if self.disasm
            && let Some(compiled) = self.ctx.compiled_code()
            && let Some(vcode) = &compiled.vcode
        {
            self.disasm_output.push((func_name, vcode.clone()));
        }

        Ok(())
    }

    /// Get collected disassembly output
    pub fn get_disasm(&self) -> &[(String, String)] {
        &self.disasm_output
    }

    /// Finalize all functions so code pointers become callable
    pub fn finalize(&mut self) -> CodegenResult<()> {
        self.module
            .finalize_definitions()
            .map_err(CodegenError::finalize)
    }

    /// Get a function pointer by name
    pub fn get_function_ptr(&self, name: &str) -> Option<*const u8> {
        self.func_ids
            .get(name)
            .map(|&func_id| self.module.get_finalized_function(func_id))
    }

    /// Clear the context for reuse
    pub fn clear(&mut self) {
        self.ctx.clear();
    }

    /// Split into parts for compilation - allows FunctionBuilder and the
    /// module to be borrowed at the same time.
    /// Returns disjoint mutable references: (func, module, imported_func_ids)
    pub fn split_for_compile(
        &mut self,
    ) -> (
        &mut cranelift_codegen::ir::Function,
        &mut JITModule,
        &FxHashMap<String, FuncId>,
    ) {
        (
            &mut self.ctx.func,
            &mut *self.module,
            &self.imported_func_ids,
        )
    }
}

pub(crate) fn lookup_runtime_func(
    imported: &FxHashMap<String, FuncId>,
    key: RuntimeKey,
) -> CodegenResult<FuncId> {
    imported
        .get(key.name())
        .copied()
        .ok_or_else(|| CodegenError::not_found("runtime symbol", key.name()))
}

impl Drop for JitContext {
    fn drop(&mut self) {
        // SAFETY: the module is not used after this point, and the only
        // function pointers handed out are scoped to borrows of this context.
        unsafe {
            let module = ManuallyDrop::take(&mut self.module);
            module.free_memory();
        }
    }
}
