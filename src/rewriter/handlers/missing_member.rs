//! Finders for trusted references the loaded host cannot satisfy.
//!
//! Both finders share the same trust rule: only references whose origin is on the
//! [`TrustedOrigins`] allow-list are checked, everything else is assumed to be a
//! third-party dependency that is resolved elsewhere. This is only sound for origins
//! that are guaranteed to be loaded; a trusted assembly the [`HostCatalog`] does not
//! describe makes every reference into it look broken.
//!
//! For any trusted member reference that does not resolve, exactly one of the two
//! finders fires: [`ReferenceToMissingMemberFinder`] when the type or member is absent,
//! [`ReferenceToMemberWithUnexpectedTypeFinder`] when the member exists under a
//! different type.

use std::sync::Arc;

use log::debug;

use crate::{
    assembly::Instruction,
    metadata::{HostCatalog, Resolution, SymbolicReference},
    rewriter::{
        classification::Classification,
        config::TrustedOrigins,
        handler::{Handler, HandlerContext, HandlerKind, Outcome},
    },
    Result,
};

/// Flags trusted references to types or members the host does not declare.
pub struct ReferenceToMissingMemberFinder {
    trusted: Arc<TrustedOrigins>,
    host: Arc<HostCatalog>,
}

impl ReferenceToMissingMemberFinder {
    /// Creates a finder checking references against `host`
    #[must_use]
    pub fn new(trusted: Arc<TrustedOrigins>, host: Arc<HostCatalog>) -> Self {
        ReferenceToMissingMemberFinder { trusted, host }
    }
}

impl Handler for ReferenceToMissingMemberFinder {
    fn name(&self) -> &'static str {
        "missing-member-finder"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::HeuristicFinder
    }

    fn description(&self) -> &'static str {
        "Finds references to host members that no longer exist"
    }

    fn examine(&self, instruction: &Instruction, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let Some(reference) = instruction.reference() else {
            return Ok(Outcome::Continue);
        };
        if !self.trusted.contains(reference.origin()) {
            return Ok(Outcome::Continue);
        }

        let missing = match reference {
            SymbolicReference::Type(ty) => self.host.find_type(ty).is_none(),
            SymbolicReference::Member(member) => matches!(
                self.host.resolve_member(member),
                Resolution::TypeMissing | Resolution::MemberMissing
            ),
        };
        if !missing {
            return Ok(Outcome::Continue);
        }

        debug!("{}: broken reference to {}", ctx.method, reference);
        Ok(Outcome::Flag(Classification::DetectedBrokenReference))
    }
}

/// Flags trusted member references whose field or return type differs from the host.
pub struct ReferenceToMemberWithUnexpectedTypeFinder {
    trusted: Arc<TrustedOrigins>,
    host: Arc<HostCatalog>,
}

impl ReferenceToMemberWithUnexpectedTypeFinder {
    /// Creates a finder checking references against `host`
    #[must_use]
    pub fn new(trusted: Arc<TrustedOrigins>, host: Arc<HostCatalog>) -> Self {
        ReferenceToMemberWithUnexpectedTypeFinder { trusted, host }
    }
}

impl Handler for ReferenceToMemberWithUnexpectedTypeFinder {
    fn name(&self) -> &'static str {
        "unexpected-type-finder"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::HeuristicFinder
    }

    fn description(&self) -> &'static str {
        "Finds references to host members whose type changed"
    }

    fn examine(&self, instruction: &Instruction, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let Some(member) = instruction.member() else {
            return Ok(Outcome::Continue);
        };
        if !self.trusted.contains(&member.parent.origin) {
            return Ok(Outcome::Continue);
        }

        match self.host.resolve_member(member) {
            Resolution::UnexpectedType { expected, actual } => {
                debug!(
                    "{}: {} expects {expected}, host declares {actual}",
                    ctx.method, member
                );
                Ok(Outcome::Flag(Classification::DetectedTypeMismatch))
            }
            _ => Ok(Outcome::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{OpCode, Operand},
        metadata::{HostType, MemberRef, ModuleHeader, Signature, Token, TypeRef},
    };

    fn host() -> Arc<HostCatalog> {
        Arc::new(
            HostCatalog::builder()
                .with_type(
                    "StardewValley",
                    HostType::new("StardewValley.Game1")
                        .field("player", "StardewValley.Farmer")
                        .method(
                            "drawObjectDialogue",
                            Signature::static_method("System.Void", &["System.String"]),
                        ),
                )
                .build(),
        )
    }

    fn game1(origin: &str) -> TypeRef {
        TypeRef::new(origin, "StardewValley.Game1")
    }

    fn instruction(opcode: OpCode, reference: SymbolicReference) -> Instruction {
        Instruction {
            offset: 0,
            index: 0,
            opcode,
            operand: Operand::Reference {
                token: Token(0x0A00_0001),
                reference,
            },
        }
    }

    fn both(instruction: &Instruction) -> (Outcome, Outcome) {
        let trusted = Arc::new(TrustedOrigins::default());
        let missing = ReferenceToMissingMemberFinder::new(trusted.clone(), host());
        let unexpected = ReferenceToMemberWithUnexpectedTypeFinder::new(trusted, host());
        let header = ModuleHeader::any_cpu();
        let ctx = HandlerContext {
            module: "Mod",
            method: "Mod.ModEntry::Entry",
            header: &header,
            previous: None,
        };
        (
            missing.examine(instruction, &ctx).unwrap(),
            unexpected.examine(instruction, &ctx).unwrap(),
        )
    }

    #[test]
    fn resolved_reference_is_clean() {
        let ldsfld = instruction(
            OpCode::LDSFLD,
            SymbolicReference::Member(MemberRef::field(
                game1("StardewValley"),
                "player",
                "StardewValley.Farmer",
            )),
        );
        assert_eq!(both(&ldsfld), (Outcome::Continue, Outcome::Continue));
    }

    #[test]
    fn missing_member_is_broken() {
        let call = instruction(
            OpCode::CALL,
            SymbolicReference::Member(MemberRef::new(
                game1("StardewValley"),
                "showGlobalMessage",
                Signature::static_method("System.Void", &["System.String"]),
            )),
        );
        assert_eq!(
            both(&call),
            (
                Outcome::Flag(Classification::DetectedBrokenReference),
                Outcome::Continue
            )
        );
    }

    #[test]
    fn missing_type_is_broken() {
        let newarr = instruction(
            OpCode::NEWARR,
            SymbolicReference::Type(TypeRef::new("StardewValley", "StardewValley.Removed")),
        );
        assert_eq!(
            both(&newarr).0,
            Outcome::Flag(Classification::DetectedBrokenReference)
        );
    }

    #[test]
    fn changed_type_is_a_mismatch() {
        let ldsfld = instruction(
            OpCode::LDSFLD,
            SymbolicReference::Member(MemberRef::field(
                game1("StardewValley"),
                "player",
                "System.Object",
            )),
        );
        assert_eq!(
            both(&ldsfld),
            (
                Outcome::Continue,
                Outcome::Flag(Classification::DetectedTypeMismatch)
            )
        );
    }

    #[test]
    fn untrusted_origins_are_ignored() {
        let call = instruction(
            OpCode::CALL,
            SymbolicReference::Member(MemberRef::new(
                game1("SpaceCore"),
                "showGlobalMessage",
                Signature::static_method("System.Void", &[]),
            )),
        );
        assert_eq!(both(&call), (Outcome::Continue, Outcome::Continue));
    }
}
