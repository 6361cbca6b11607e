//! The handler capability every pipeline stage implements.
//!
//! Handlers are polymorphic over a single contract: look at one instruction (or, for
//! module-level handlers, the module header) and answer with a closed [`Outcome`]. What
//! a handler looks for and what it does is decided by its configuration and matching
//! logic, never by overriding behaviour of a shared base.

use strum::Display;

use crate::{
    assembly::{Instruction, OpCode},
    metadata::ModuleHeader,
    rewriter::classification::Classification,
    Result,
};

/// What a handler decided about an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to do
    Continue,
    /// Replace the instruction; later handlers see the replacement
    Rewrite(Instruction),
    /// Record a classification against the instruction
    Flag(Classification),
    /// Replace the instruction and record a classification
    RewriteAndFlag(Instruction, Classification),
}

/// What a module-level handler did with the module header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOutcome {
    /// Nothing to do
    Continue,
    /// The header was adapted
    Rewritten,
    /// Record a classification against the module
    Flag(Classification),
}

/// The broad family a handler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum HandlerKind {
    /// Adapts module-level metadata such as the target processor width
    Environment,
    /// Redirects references through fixed mappings or facades
    Rewriter,
    /// Detects references that do not match the loaded host
    HeuristicFinder,
    /// Detects (and optionally upgrades) a known incompatible library version
    VersionFinder,
    /// Detects references to sensitive types, fields or events
    CapabilityFinder,
}

/// Where the instruction being examined lives.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Name of the module being processed
    pub module: &'a str,
    /// `Type::Method` of the method being processed
    pub method: &'a str,
    /// The module header, after module-level handlers ran
    pub header: &'a ModuleHeader,
    /// Opcode of the instruction right before this one, such as a `constrained.` prefix
    pub previous: Option<OpCode>,
}

/// A unit of the rewrite pipeline.
///
/// All handlers must be thread-safe (`Send + Sync`): one pipeline is shared by passes
/// over different modules running in parallel. Handlers only hold immutable
/// configuration.
pub trait Handler: Send + Sync {
    /// Unique name for reports and logging.
    fn name(&self) -> &'static str;

    /// The handler family.
    fn kind(&self) -> HandlerKind;

    /// Get a description of what this handler does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Does this handler operate on the module header instead of instructions?
    ///
    /// Module-level handlers have `examine_module` called once per pass, before any
    /// instruction is examined.
    fn is_module_level(&self) -> bool {
        false
    }

    /// Examine one instruction.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot decide; the pass records it as
    /// [`Classification::HandlerFailure`] and continues with the next handler.
    fn examine(&self, _instruction: &Instruction, _ctx: &HandlerContext<'_>) -> Result<Outcome> {
        Ok(Outcome::Continue)
    }

    /// Examine and optionally adapt the module header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be adapted.
    fn examine_module(&self, _header: &mut ModuleHeader) -> Result<ModuleOutcome> {
        Ok(ModuleOutcome::Continue)
    }
}
