//! One execution of a pipeline over one module.
//!
//! A pass walks through a fixed sequence of states:
//!
//! ```text
//! Start -> Decoding -> ModuleHandlers -> PerMethod -> Encoding -> Aggregating -> Done
//!             |                                          |
//!             +------------------> Rejected <------------+
//! ```
//!
//! Everything is computed on copies: the decoded bodies, a copy of the header and a copy
//! of the reference table. The module itself is only written once, after every changed
//! body was re-encoded successfully, so a rejected pass leaves it exactly as it was.

use log::{debug, info, warn};
use strum::Display;

use crate::{
    assembly::{decode, encode_body, Instruction, MethodBody},
    metadata::{BinaryModule, ModuleHeader},
    rewriter::{
        classification::{Classification, SeverityPolicy},
        handler::{Handler, HandlerContext, HandlerKind, ModuleOutcome, Outcome},
        report::{ClassificationRecord, Location, RewriteReport},
    },
    Error, Result,
};

/// Where a [`RewritePass`] currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PassState {
    /// Nothing happened yet
    Start,
    /// Method bodies are being decoded
    Decoding,
    /// Module-level handlers are examining the header
    ModuleHandlers,
    /// Instruction handlers are walking the method bodies
    PerMethod,
    /// Changed bodies are being written back
    Encoding,
    /// Records are being folded into the report
    Aggregating,
    /// The report was produced and the module updated
    Done,
    /// The module could not be processed and was left untouched
    Rejected,
}

/// Executes an ordered handler list over one module.
///
/// Usually created through [`crate::rewriter::Pipeline::rewrite`]. A pass runs once;
/// afterwards [`RewritePass::state`] is either [`PassState::Done`] or
/// [`PassState::Rejected`].
pub struct RewritePass<'p> {
    handlers: &'p [Box<dyn Handler>],
    policy: &'p SeverityPolicy,
    state: PassState,
    records: Vec<ClassificationRecord>,
}

impl<'p> RewritePass<'p> {
    /// Creates a pass over `handlers`, in order
    #[must_use]
    pub fn new(handlers: &'p [Box<dyn Handler>], policy: &'p SeverityPolicy) -> Self {
        RewritePass {
            handlers,
            policy,
            state: PassState::Start,
            records: Vec::new(),
        }
    }

    /// The current state, or the final one once [`RewritePass::run`] returned
    #[must_use]
    pub fn state(&self) -> PassState {
        self.state
    }

    fn advance(&mut self, next: PassState) {
        log::trace!("pass {} -> {}", self.state, next);
        self.state = next;
    }

    fn record(
        &mut self,
        classification: Classification,
        location: Location,
        handler: &'static str,
        message: impl Into<String>,
    ) {
        self.records.push(ClassificationRecord::new(
            classification,
            location,
            handler,
            message,
        ));
    }

    /// Runs the pass and returns the module's report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a method body cannot be decoded, before any handler
    /// ran, or an error if a rewritten body cannot be encoded. In both cases the module
    /// is not modified. A pass that already ran is rejected with [`Error::Error`].
    pub fn run(&mut self, module: &mut BinaryModule) -> Result<RewriteReport> {
        if self.state != PassState::Start {
            return Err(Error::Error(format!("pass already ran ({})", self.state)));
        }
        self.advance(PassState::Decoding);
        let mut bodies = match decode(module) {
            Ok(bodies) => bodies,
            Err(error) => {
                warn!("Rejecting module {}: {}", module.name(), error);
                self.advance(PassState::Rejected);
                return Err(error);
            }
        };

        self.advance(PassState::ModuleHandlers);
        let mut header = module.header().clone();
        let header_changed = self.run_module_handlers(&mut header);

        self.advance(PassState::PerMethod);
        let mut changed = Vec::new();
        for body in &mut bodies {
            if self.run_method(module.name(), &header, body) {
                changed.push(body.method_index);
            }
        }

        self.advance(PassState::Encoding);
        let mut references = module.references().clone();
        let mut encoded = Vec::with_capacity(changed.len());
        for &index in &changed {
            match encode_body(&bodies[index], &mut references) {
                Ok(code) => encoded.push((index, code)),
                Err(error) => {
                    warn!(
                        "Rejecting module {}: cannot encode {}: {}",
                        module.name(),
                        bodies[index].full_name(),
                        error
                    );
                    self.advance(PassState::Rejected);
                    return Err(error);
                }
            }
        }

        if header_changed {
            module.header = header;
        }
        if !encoded.is_empty() {
            module.references = references;
            for (index, code) in encoded {
                module.methods[index].code = code;
            }
        }

        self.advance(PassState::Aggregating);
        let records = std::mem::take(&mut self.records);
        let report = RewriteReport::aggregate(module.name(), records, self.policy);
        info!("{}", report.summary());
        if !report.may_load() {
            warn!("Module {} must not be loaded", report.module());
        }

        self.advance(PassState::Done);
        Ok(report)
    }

    fn run_module_handlers(&mut self, header: &mut ModuleHeader) -> bool {
        let mut changed = false;
        let handlers = self.handlers;

        for handler in handlers.iter().filter(|h| h.is_module_level()) {
            match handler.examine_module(header) {
                Ok(ModuleOutcome::Continue) => {}
                Ok(ModuleOutcome::Rewritten) => {
                    debug!("{} rewrote the module header", handler.name());
                    changed = true;
                    self.record(
                        Classification::Rewritten,
                        Location::Module,
                        handler.name(),
                        "module header adapted",
                    );
                }
                Ok(ModuleOutcome::Flag(classification)) => {
                    debug!("{} flagged the module: {}", handler.name(), classification);
                    self.record(classification, Location::Module, handler.name(), "");
                }
                Err(error) => {
                    let classification = if handler.kind() == HandlerKind::Environment {
                        Classification::ArchitectureRewriteFailed
                    } else {
                        Classification::HandlerFailure
                    };
                    let message = Error::Handler {
                        name: handler.name(),
                        message: error.to_string(),
                    }
                    .to_string();
                    warn!("{message}");
                    self.record(classification, Location::Module, handler.name(), message);
                }
            }
        }

        changed
    }

    /// Returns `true` if any instruction of the body was replaced.
    fn run_method(&mut self, module: &str, header: &ModuleHeader, body: &mut MethodBody) -> bool {
        let method = body.full_name();
        let handlers = self.handlers;
        let mut changed = false;

        for index in 0..body.instructions.len() {
            let ctx = HandlerContext {
                module,
                method: &method,
                header,
                previous: index
                    .checked_sub(1)
                    .map(|previous| body.instructions[previous].opcode),
            };
            for handler in handlers.iter().filter(|h| !h.is_module_level()) {
                let current = &body.instructions[index];
                let location = Location::Instruction {
                    method: method.clone(),
                    index,
                    offset: current.offset,
                };

                let (replacement, flag) = match handler.examine(current, &ctx) {
                    Ok(Outcome::Continue) => continue,
                    Ok(Outcome::Flag(classification)) => (None, Some(classification)),
                    Ok(Outcome::Rewrite(replacement)) => (Some(replacement), None),
                    Ok(Outcome::RewriteAndFlag(replacement, classification)) => {
                        (Some(replacement), Some(classification))
                    }
                    Err(error) => {
                        let message = Error::Handler {
                            name: handler.name(),
                            message: error.to_string(),
                        }
                        .to_string();
                        warn!("{location}: {message}");
                        self.record(
                            Classification::HandlerFailure,
                            location,
                            handler.name(),
                            message,
                        );
                        continue;
                    }
                };

                if let Some(replacement) = replacement {
                    match check_rewrite(current, &replacement) {
                        Ok(()) => {
                            let message = format!("{current} -> {replacement}");
                            debug!("{}: {location}: {message}", handler.name());
                            self.record(
                                Classification::Rewritten,
                                location.clone(),
                                handler.name(),
                                message,
                            );
                            body.instructions[index] = replacement;
                            changed = true;
                        }
                        Err(reason) => {
                            warn!("{location}: rejected rewrite by {}: {reason}", handler.name());
                            self.record(
                                Classification::HandlerFailure,
                                location.clone(),
                                handler.name(),
                                reason,
                            );
                        }
                    }
                }

                if let Some(classification) = flag {
                    let message = body.instructions[index].to_string();
                    debug!("{}: {location}: {classification}", handler.name());
                    self.record(classification, location, handler.name(), message);
                }
            }
        }

        changed
    }
}

/// A rewrite must not move any other instruction and must leave the evaluation stack
/// exactly as the original did.
fn check_rewrite(
    original: &Instruction,
    replacement: &Instruction,
) -> std::result::Result<(), String> {
    if replacement.offset != original.offset || replacement.index != original.index {
        return Err(format!(
            "replacement for {original} is placed at IL_{:04x}",
            replacement.offset
        ));
    }
    if replacement.size() != original.size() {
        return Err(format!(
            "{replacement} is {} bytes, {original} is {}",
            replacement.size(),
            original.size()
        ));
    }
    if replacement.stack_effect() != original.stack_effect() {
        return Err(format!("{replacement} changes the stack shape of {original}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        MemberRef, MethodDef, ReferenceTable, Signature, SymbolicReference, TypeRef,
    };

    struct Failing;

    impl Handler for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn kind(&self) -> HandlerKind {
            HandlerKind::CapabilityFinder
        }

        fn examine(&self, _instruction: &Instruction, _ctx: &HandlerContext<'_>) -> Result<Outcome> {
            Err(Error::Error("boom".to_string()))
        }
    }

    /// Replaces every call by a call that drops its only argument.
    struct ShapeBreaker;

    impl Handler for ShapeBreaker {
        fn name(&self) -> &'static str {
            "shape-breaker"
        }

        fn kind(&self) -> HandlerKind {
            HandlerKind::Rewriter
        }

        fn examine(&self, instruction: &Instruction, _ctx: &HandlerContext<'_>) -> Result<Outcome> {
            let Some(member) = instruction.member() else {
                return Ok(Outcome::Continue);
            };
            let broken = MemberRef::new(
                member.parent.clone(),
                member.name.clone(),
                Signature::static_method("System.Void", &[]),
            );
            Ok(Outcome::Rewrite(instruction.rewritten(
                instruction.opcode,
                SymbolicReference::Member(broken),
            )))
        }
    }

    fn module() -> BinaryModule {
        let mut references = ReferenceTable::new();
        let token = references
            .intern_member(&MemberRef::new(
                TypeRef::new("mscorlib", "System.Console"),
                "WriteLine",
                Signature::static_method("System.Void", &["System.String"]),
            ))
            .unwrap();

        // ldstr 0x70000001; call WriteLine; ret
        let mut code = vec![0x72, 0x01, 0x00, 0x00, 0x70, 0x28];
        code.extend_from_slice(&token.value().to_le_bytes());
        code.push(0x2A);

        let mut module = BinaryModule::new("Mod", ModuleHeader::any_cpu(), references);
        module.add_method(MethodDef::new("Mod.ModEntry", "Entry", code));
        module
    }

    #[test]
    fn handler_error_is_recorded_and_pass_continues() {
        let handlers: Vec<Box<dyn Handler>> = vec![Box::new(Failing)];
        let policy = SeverityPolicy::default();
        let mut module = module();
        let before = module.clone();

        let mut pass = RewritePass::new(&handlers, &policy);
        let report = pass.run(&mut module).unwrap();

        // one failure per instruction
        assert_eq!(report.count(Classification::HandlerFailure), 3);
        assert!(!report.may_load());
        assert_eq!(module, before);
        assert_eq!(pass.state(), PassState::Done);
    }

    #[test]
    fn pass_runs_only_once() {
        let handlers: Vec<Box<dyn Handler>> = Vec::new();
        let policy = SeverityPolicy::default();
        let mut module = module();

        let mut pass = RewritePass::new(&handlers, &policy);
        pass.run(&mut module).unwrap();
        assert_eq!(pass.state(), PassState::Done);
        assert!(pass.run(&mut module).is_err());
        assert_eq!(pass.state(), PassState::Done);
    }

    #[test]
    fn rewrite_changing_stack_shape_is_rejected() {
        let handlers: Vec<Box<dyn Handler>> = vec![Box::new(ShapeBreaker)];
        let policy = SeverityPolicy::default();
        let mut module = module();
        let before = module.clone();

        let report = RewritePass::new(&handlers, &policy).run(&mut module).unwrap();

        assert_eq!(report.count(Classification::HandlerFailure), 1);
        assert!(!report.has(Classification::Rewritten));
        assert_eq!(module, before);
    }

    #[test]
    fn malformed_body_is_rejected_untouched() {
        let handlers: Vec<Box<dyn Handler>> = vec![Box::new(Failing)];
        let policy = SeverityPolicy::default();
        let mut module = module();
        module.add_method(MethodDef::new("Mod.ModEntry", "Broken", vec![0x28, 0x01]));
        let before = module.clone();

        let mut pass = RewritePass::new(&handlers, &policy);
        assert_eq!(pass.state(), PassState::Start);
        let error = pass.run(&mut module).unwrap_err();

        assert!(error.is_malformed());
        assert_eq!(pass.state(), PassState::Rejected);
        assert_eq!(module, before);
    }
}
