//! # dotshim Prelude
//!
//! The types a host needs to configure a pipeline, hand it modules and read the
//! reports, available through a single glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotshim operations
pub use crate::Error;

/// The result type used throughout dotshim
pub use crate::Result;

/// Low-level parsing utilities
pub use crate::Parser;

// ================================================================================================
// Modules and References
// ================================================================================================

/// Module representation handed over by the host's loader
pub use crate::metadata::{BinaryModule, CorFlags, Machine, MethodDef, ModuleHeader, TargetWidth};

/// Symbolic references and the module's reference rows
pub use crate::metadata::{
    MemberRef, ReferenceTable, Signature, SymbolicReference, Token, TypeRef, VOID_TYPE,
};

/// Description of the loaded host binaries
pub use crate::metadata::{HostCatalog, HostCatalogBuilder, HostType, Resolution};

// ================================================================================================
// Instructions
// ================================================================================================

/// Decoded CIL instructions
pub use crate::assembly::{Instruction, MethodBody, OpCode, Operand, OperationKind};

// ================================================================================================
// Rewriting
// ================================================================================================

/// Pipeline construction and configuration
pub use crate::rewriter::{
    FacadeMapping, Pipeline, PipelineBuilder, PipelineConfig, RewriteMappings, TrustedOrigins,
};

/// The handler contract, for hosts adding their own stages
pub use crate::rewriter::{Handler, HandlerContext, HandlerKind, ModuleOutcome, Outcome};

/// Pass results
pub use crate::rewriter::{
    Classification, ClassificationRecord, Location, RewriteReport, Severity, SeverityPolicy,
};
