//! Detects the Harmony runtime patching library and upgrades Harmony 1.x references.

use std::sync::Arc;

use log::debug;

use crate::{
    assembly::Instruction,
    metadata::{MemberRef, SymbolicReference},
    rewriter::{
        classification::Classification,
        config::HarmonyShims,
        handler::{Handler, HandlerContext, HandlerKind, Outcome},
    },
    Result,
};

/// Finds Harmony references and, when rewriting, moves Harmony 1.x ones to Harmony 2.
///
/// In detect-only mode Harmony 1.x references are flagged
/// [`Classification::DetectedUnsupportedHarmonyVersion`] and never mutated. Every
/// Harmony reference that remains (or becomes) valid is flagged
/// [`Classification::DetectedGamePatch`], so the operator knows the module patches host
/// code at runtime.
pub struct HarmonyRewriter {
    shims: Arc<HarmonyShims>,
    should_rewrite: bool,
}

impl HarmonyRewriter {
    /// Creates the handler; `should_rewrite == false` selects detect-only mode
    #[must_use]
    pub fn new(shims: Arc<HarmonyShims>, should_rewrite: bool) -> Self {
        HarmonyRewriter {
            shims,
            should_rewrite,
        }
    }

    fn is_legacy(&self, reference: &SymbolicReference) -> bool {
        self.shims.is_legacy(reference.declaring_type())
            || reference
                .signature()
                .is_some_and(|sig| sig.mentioned_types().any(|ty| self.shims.is_legacy_name(ty)))
    }

    fn upgrade(&self, reference: &SymbolicReference) -> SymbolicReference {
        match reference {
            SymbolicReference::Type(ty) => SymbolicReference::Type(self.shims.upgrade_type(ty)),
            SymbolicReference::Member(member) => {
                let parent = if self.shims.is_legacy(&member.parent) {
                    self.shims.upgrade_type(&member.parent)
                } else {
                    member.parent.clone()
                };
                SymbolicReference::Member(MemberRef::new(
                    parent,
                    member.name.clone(),
                    member
                        .signature
                        .map_types(|ty| self.shims.upgrade_name(ty)),
                ))
            }
        }
    }
}

impl Handler for HarmonyRewriter {
    fn name(&self) -> &'static str {
        if self.should_rewrite {
            "harmony-rewriter"
        } else {
            "harmony-finder"
        }
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::VersionFinder
    }

    fn description(&self) -> &'static str {
        "Detects Harmony usage and upgrades Harmony 1.x references"
    }

    fn examine(&self, instruction: &Instruction, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let Some(reference) = instruction.reference() else {
            return Ok(Outcome::Continue);
        };

        if self.is_legacy(reference) {
            if !self.should_rewrite {
                debug!("{}: Harmony 1.x reference {}", ctx.method, reference);
                return Ok(Outcome::Flag(
                    Classification::DetectedUnsupportedHarmonyVersion,
                ));
            }

            let upgraded = self.upgrade(reference);
            log::trace!("{} -> {}", reference, upgraded);
            return Ok(Outcome::RewriteAndFlag(
                instruction.rewritten(instruction.opcode, upgraded),
                Classification::DetectedGamePatch,
            ));
        }

        if self.shims.is_current(reference.declaring_type()) {
            return Ok(Outcome::Flag(Classification::DetectedGamePatch));
        }

        Ok(Outcome::Continue)
    }
}
