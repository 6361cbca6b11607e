//! Redirects method calls on a retired type to a facade type.

use std::sync::Arc;

use log::debug;

use crate::{
    assembly::{Instruction, OpCode, OperationKind},
    metadata::{Signature, SymbolicReference},
    rewriter::{
        classification::Classification,
        config::RewriteMappings,
        handler::{Handler, HandlerContext, HandlerKind, Outcome},
    },
    Error, Result,
};

/// Rewrites the parent of method references whose declaring type has a facade.
///
/// The facade must declare a compatible member (see
/// [`crate::rewriter::FacadeMapping::find_compatible`]); otherwise the call is left
/// untouched and flagged [`Classification::DetectedIncompatibleFacade`]. Calls to a
/// static facade member use `call`, since `callvirt` requires an instance. A static
/// target cannot replace `ldvirtftn` or a `constrained.` `callvirt`; those sites are
/// flagged the same way.
pub struct MethodParentRewriter {
    mappings: Arc<RewriteMappings>,
}

impl MethodParentRewriter {
    /// Creates a rewriter over the facade mappings in `mappings`
    #[must_use]
    pub fn new(mappings: Arc<RewriteMappings>) -> Self {
        MethodParentRewriter { mappings }
    }
}

impl Handler for MethodParentRewriter {
    fn name(&self) -> &'static str {
        "facade-rewriter"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Rewriter
    }

    fn description(&self) -> &'static str {
        "Redirects calls on retired host types to facade types"
    }

    fn examine(&self, instruction: &Instruction, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        if !matches!(
            instruction.kind(),
            OperationKind::MethodCall | OperationKind::NewObject | OperationKind::FunctionPointer
        ) {
            return Ok(Outcome::Continue);
        }
        let Some(member) = instruction.member().filter(|m| m.is_method()) else {
            return Ok(Outcome::Continue);
        };
        let Some(facade) = self.mappings.facade(&member.parent.full_name) else {
            return Ok(Outcome::Continue);
        };

        let target = match facade.find_compatible(member) {
            Ok(target) => target,
            Err(Error::IncompatibleFacade { member, facade }) => {
                debug!("No compatible member for {member} on facade {facade}");
                return Ok(Outcome::Flag(Classification::DetectedIncompatibleFacade));
            }
            Err(other) => return Err(other),
        };

        let is_static = matches!(
            target.signature,
            Signature::Method {
                has_this: false,
                ..
            }
        );
        // both need an instance method
        let needs_instance = instruction.opcode == OpCode::LDVIRTFTN
            || (instruction.opcode == OpCode::CALLVIRT
                && ctx.previous == Some(OpCode::CONSTRAINED));
        if is_static && needs_instance {
            debug!(
                "{} cannot be redirected to static {} in {}",
                instruction, target, ctx.method
            );
            return Ok(Outcome::Flag(Classification::DetectedIncompatibleFacade));
        }

        let opcode = if instruction.opcode == OpCode::CALLVIRT && is_static {
            OpCode::CALL
        } else {
            instruction.opcode
        };

        log::trace!("{} -> {}", member, target);
        Ok(Outcome::Rewrite(
            instruction.rewritten(opcode, SymbolicReference::Member(target)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::Operand,
        metadata::{MemberRef, ModuleHeader, Token, TypeRef, VOID_TYPE},
        rewriter::config::FacadeMapping,
    };

    fn farmer() -> TypeRef {
        TypeRef::new("StardewValley", "StardewValley.Farmer")
    }

    fn facade_type() -> TypeRef {
        TypeRef::new(
            "StardewModdingAPI",
            "StardewModdingAPI.Framework.Facades.FarmerFacade",
        )
    }

    fn callvirt(member: MemberRef) -> Instruction {
        Instruction {
            offset: 10,
            index: 3,
            opcode: OpCode::CALLVIRT,
            operand: Operand::Reference {
                token: Token(0x0A00_0002),
                reference: SymbolicReference::Member(member),
            },
        }
    }

    fn handler() -> MethodParentRewriter {
        let mappings = RewriteMappings::new().with_facade(
            "StardewValley.Farmer",
            FacadeMapping::new(facade_type())
                .with_member(
                    "changeShirt",
                    Signature::instance_method(VOID_TYPE, &["System.Int32"]),
                )
                .with_member(
                    "getTexture",
                    Signature::static_method("System.String", &["StardewValley.Farmer"]),
                ),
        );
        MethodParentRewriter::new(Arc::new(mappings))
    }

    fn run_after(instruction: &Instruction, previous: Option<OpCode>) -> Outcome {
        let header = ModuleHeader::any_cpu();
        let ctx = HandlerContext {
            module: "Mod",
            method: "Mod.ModEntry::Entry",
            header: &header,
            previous,
        };
        handler().examine(instruction, &ctx).unwrap()
    }

    fn run(instruction: &Instruction) -> Outcome {
        run_after(instruction, None)
    }

    fn get_texture() -> MemberRef {
        MemberRef::new(
            farmer(),
            "getTexture",
            Signature::instance_method("System.String", &[]),
        )
    }

    #[test]
    fn redirects_compatible_call() {
        let call = callvirt(MemberRef::new(
            farmer(),
            "changeShirt",
            Signature::instance_method(VOID_TYPE, &["System.Int32"]),
        ));

        let Outcome::Rewrite(rewritten) = run(&call) else {
            panic!("expected a rewrite");
        };
        assert_eq!(rewritten.opcode, OpCode::CALLVIRT);
        assert_eq!(rewritten.member().map(|m| &m.parent), Some(&facade_type()));
        assert_eq!(rewritten.stack_effect(), call.stack_effect());
    }

    #[test]
    fn static_facade_member_uses_call() {
        let call = callvirt(MemberRef::new(
            farmer(),
            "getTexture",
            Signature::instance_method("System.String", &[]),
        ));

        let Outcome::Rewrite(rewritten) = run(&call) else {
            panic!("expected a rewrite");
        };
        assert_eq!(rewritten.opcode, OpCode::CALL);
        assert_eq!(rewritten.stack_effect(), call.stack_effect());
    }

    #[test]
    fn virtual_function_pointer_to_static_member_fails_closed() {
        let ldvirtftn = Instruction {
            opcode: OpCode::LDVIRTFTN,
            ..callvirt(get_texture())
        };
        assert_eq!(
            run(&ldvirtftn),
            Outcome::Flag(Classification::DetectedIncompatibleFacade)
        );
    }

    #[test]
    fn function_pointer_to_static_member_is_redirected() {
        let ldftn = Instruction {
            opcode: OpCode::LDFTN,
            ..callvirt(get_texture())
        };

        let Outcome::Rewrite(rewritten) = run(&ldftn) else {
            panic!("expected a rewrite");
        };
        assert_eq!(rewritten.opcode, OpCode::LDFTN);
        assert_eq!(rewritten.member().map(|m| &m.parent), Some(&facade_type()));
    }

    #[test]
    fn constrained_call_to_static_member_fails_closed() {
        let call = callvirt(get_texture());
        assert_eq!(
            run_after(&call, Some(OpCode::CONSTRAINED)),
            Outcome::Flag(Classification::DetectedIncompatibleFacade)
        );
    }

    #[test]
    fn constrained_call_to_instance_member_is_redirected() {
        let call = callvirt(MemberRef::new(
            farmer(),
            "changeShirt",
            Signature::instance_method(VOID_TYPE, &["System.Int32"]),
        ));

        let Outcome::Rewrite(rewritten) = run_after(&call, Some(OpCode::CONSTRAINED)) else {
            panic!("expected a rewrite");
        };
        assert_eq!(rewritten.opcode, OpCode::CALLVIRT);
    }

    #[test]
    fn incompatible_arity_fails_closed() {
        let call = callvirt(MemberRef::new(
            farmer(),
            "changeShirt",
            Signature::instance_method(VOID_TYPE, &["System.Int32", "System.Boolean"]),
        ));
        assert_eq!(
            run(&call),
            Outcome::Flag(Classification::DetectedIncompatibleFacade)
        );
    }

    #[test]
    fn fields_are_ignored() {
        let field = Instruction {
            opcode: OpCode::LDFLD,
            ..callvirt(MemberRef::field(farmer(), "money", "System.Int32"))
        };
        assert_eq!(run(&field), Outcome::Continue);
    }
}
