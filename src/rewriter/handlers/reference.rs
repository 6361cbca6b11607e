//! Exact symbol-to-symbol rewriting.

use std::sync::Arc;

use crate::{
    assembly::Instruction,
    rewriter::{
        config::RewriteMappings,
        handler::{Handler, HandlerContext, HandlerKind, Outcome},
    },
    Result,
};

/// Redirects references that exactly match a member or type mapping.
///
/// The opcode is kept, so the operation kind is preserved; the pass additionally
/// verifies that the rewritten instruction has the same stack shape.
pub struct ReferenceRewriter {
    mappings: Arc<RewriteMappings>,
}

impl ReferenceRewriter {
    /// Creates a rewriter over the given mappings
    #[must_use]
    pub fn new(mappings: Arc<RewriteMappings>) -> Self {
        ReferenceRewriter { mappings }
    }
}

impl Handler for ReferenceRewriter {
    fn name(&self) -> &'static str {
        "reference-rewriter"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Rewriter
    }

    fn description(&self) -> &'static str {
        "Rewrites references to moved or renamed host members"
    }

    fn examine(&self, instruction: &Instruction, _ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let Some(reference) = instruction.reference() else {
            return Ok(Outcome::Continue);
        };

        match self.mappings.rewrite(reference) {
            Some(target) => {
                log::trace!("{} -> {}", reference, target);
                Ok(Outcome::Rewrite(
                    instruction.rewritten(instruction.opcode, target),
                ))
            }
            None => Ok(Outcome::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{OpCode, Operand},
        metadata::{MemberRef, ModuleHeader, SymbolicReference, Token, TypeRef},
    };

    fn ldsfld(member: MemberRef) -> Instruction {
        Instruction {
            offset: 0,
            index: 0,
            opcode: OpCode::LDSFLD,
            operand: Operand::Reference {
                token: Token(0x0A00_0001),
                reference: SymbolicReference::Member(member),
            },
        }
    }

    #[test]
    fn rewrites_exact_match_only() {
        let old = MemberRef::field(
            TypeRef::new("StardewValley", "StardewValley.Game1"),
            "dayOfMonth",
            "System.Int32",
        );
        let mappings = RewriteMappings::new().with_member(
            &old,
            TypeRef::new("StardewValley", "StardewValley.WorldDate"),
            "DayOfMonth",
        );
        let handler = ReferenceRewriter::new(Arc::new(mappings));
        let header = ModuleHeader::any_cpu();
        let ctx = HandlerContext {
            module: "Mod",
            method: "Mod.ModEntry::Entry",
            header: &header,
            previous: None,
        };

        let Outcome::Rewrite(rewritten) = handler.examine(&ldsfld(old.clone()), &ctx).unwrap()
        else {
            panic!("expected a rewrite");
        };
        assert_eq!(rewritten.opcode, OpCode::LDSFLD);
        assert_eq!(
            rewritten.member(),
            Some(&MemberRef::field(
                TypeRef::new("StardewValley", "StardewValley.WorldDate"),
                "DayOfMonth",
                "System.Int32"
            ))
        );

        // different field type, no match
        let other = MemberRef::field(old.parent.clone(), "dayOfMonth", "System.Int64");
        assert_eq!(
            handler.examine(&ldsfld(other), &ctx).unwrap(),
            Outcome::Continue
        );
    }
}
