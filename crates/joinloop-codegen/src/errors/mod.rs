// src/errors/mod.rs
//! Code generation errors.
//!
//! Contract violations in join-loop descriptors are programming errors and
//! panic at composition time. The errors here cover what the backend reports
//! once a function has been composed: verifier rejections, lowering and
//! finalization failures, and missing runtime symbols.
//!
//! Error code ranges:
//! - E3xxx: Codegen errors (this module)
//! - E4xxx: Sweep errors (driver crate)

use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// The kind of code generation error.
#[derive(Debug, Clone)]
pub enum CodegenErrorKind {
    /// The Cranelift verifier rejected a composed function
    Verifier {
        function: String,
        /// Verifier messages, one per line
        diagnostic: String,
        /// Function listing annotated with the verifier errors
        listing: String,
    },

    /// The backend failed to lower a verified function
    Compile { function: String, message: String },

    /// Finalizing (relocating and publishing) machine code failed
    Finalize { message: String },

    /// A runtime symbol or compiled function could not be found
    NotFound { kind: &'static str, name: String },

    /// The host ISA could not be configured
    Isa { message: String },
}

/// Code generation error.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct CodegenError {
    pub kind: CodegenErrorKind,
}

impl CodegenError {
    /// Create a verifier error
    pub fn verifier(
        function: impl Into<String>,
        diagnostic: impl Into<String>,
        listing: impl Into<String>,
    ) -> Self {
        CodegenErrorKind::Verifier {
            function: function.into(),
            diagnostic: diagnostic.into(),
            listing: listing.into(),
        }
        .into()
    }

    /// Wrap a Cranelift module error raised while defining a function
    pub fn compile(function: impl Into<String>, e: impl fmt::Display) -> Self {
        CodegenErrorKind::Compile {
            function: function.into(),
            message: e.to_string(),
        }
        .into()
    }

    /// Wrap a finalization error
    pub fn finalize(e: impl fmt::Display) -> Self {
        CodegenErrorKind::Finalize {
            message: e.to_string(),
        }
        .into()
    }

    /// Create a not found error
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        CodegenErrorKind::NotFound {
            kind,
            name: name.into(),
        }
        .into()
    }

    /// Create an ISA configuration error
    pub fn isa(e: impl fmt::Display) -> Self {
        CodegenErrorKind::Isa {
            message: e.to_string(),
        }
        .into()
    }

    /// The annotated function listing, for verifier errors.
    pub fn listing(&self) -> Option<&str> {
        match &self.kind {
            CodegenErrorKind::Verifier { listing, .. } => Some(listing),
            _ => None,
        }
    }
}

impl From<CodegenErrorKind> for CodegenError {
    fn from(kind: CodegenErrorKind) -> Self {
        CodegenError { kind }
    }
}

impl Diagnostic for CodegenError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code: &'static str = match &self.kind {
            CodegenErrorKind::Verifier { .. } => "E3001",
            CodegenErrorKind::Compile { .. } => "E3002",
            CodegenErrorKind::Finalize { .. } => "E3003",
            CodegenErrorKind::NotFound { .. } => "E3004",
            CodegenErrorKind::Isa { .. } => "E3005",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.kind {
            CodegenErrorKind::Verifier { .. } => {
                Some(Box::new("rerun with --dump-ir to print every composed function"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for CodegenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenErrorKind::Verifier {
                function,
                diagnostic,
                ..
            } => {
                write!(f, "verifier rejected '{}': {}", function, diagnostic.trim_end())
            }
            CodegenErrorKind::Compile { function, message } => {
                write!(f, "failed to compile '{}': {}", function, message)
            }
            CodegenErrorKind::Finalize { message } => {
                write!(f, "finalization error: {}", message)
            }
            CodegenErrorKind::NotFound { kind, name } => {
                write!(f, "{} not found: {}", kind, name)
            }
            CodegenErrorKind::Isa { message } => {
                write!(f, "native ISA not available: {}", message)
            }
        }
    }
}

/// Result type alias for codegen operations.
pub type CodegenResult<T> = Result<T, CodegenError>;
