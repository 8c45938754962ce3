//! Runtime functions generated code may call.
//!
//! One table holds each function's C name, ABI signature and the host
//! address the JIT links the name to.

use joinloop_runtime::builtins::joinloop_record_iterators;

/// Typed key for a runtime function; indexes [`RUNTIME_SYMBOLS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKey {
    RecordIterators = 0,
}

impl RuntimeKey {
    pub fn symbol(self) -> &'static RuntimeSymbol {
        &RUNTIME_SYMBOLS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.symbol().c_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiTy {
    Ptr,
    I64,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeSymbol {
    pub key: RuntimeKey,
    pub c_name: &'static str,
    pub params: &'static [AbiTy],
    pub ret: Option<AbiTy>,
    pub ptr: *const u8,
}

const RUNTIME_SYMBOLS: &[RuntimeSymbol] = &[RuntimeSymbol {
    key: RuntimeKey::RecordIterators,
    c_name: "joinloop_record_iterators",
    params: &[AbiTy::Ptr, AbiTy::I64],
    ret: None,
    ptr: joinloop_record_iterators as *const u8,
}];

pub fn runtime_symbols() -> &'static [RuntimeSymbol] {
    RUNTIME_SYMBOLS
}
