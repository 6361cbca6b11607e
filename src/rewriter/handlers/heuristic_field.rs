//! Rewrites field accesses to host fields that became properties.

use std::sync::Arc;

use crate::{
    assembly::{Instruction, OpCode, OperationKind},
    metadata::{HostCatalog, MemberRef, Resolution, SymbolicReference},
    rewriter::{
        config::TrustedOrigins,
        handler::{Handler, HandlerContext, HandlerKind, Outcome},
    },
    Result,
};

/// Turns `ldfld X` / `stfld X` into accessor calls when the host replaced field `X` by a
/// property `X` of the same type.
///
/// Only trusted origins are considered, like the finders. Loads of the field address
/// (`ldflda`) have no property equivalent and are left for the finders to report.
pub struct HeuristicFieldRewriter {
    trusted: Arc<TrustedOrigins>,
    host: Arc<HostCatalog>,
}

impl HeuristicFieldRewriter {
    /// Creates a rewriter checking references against `host`
    #[must_use]
    pub fn new(trusted: Arc<TrustedOrigins>, host: Arc<HostCatalog>) -> Self {
        HeuristicFieldRewriter { trusted, host }
    }
}

impl Handler for HeuristicFieldRewriter {
    fn name(&self) -> &'static str {
        "heuristic-field-rewriter"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Rewriter
    }

    fn description(&self) -> &'static str {
        "Rewrites accesses to host fields that were replaced by properties"
    }

    fn examine(&self, instruction: &Instruction, _ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let is_load = match instruction.kind() {
            OperationKind::FieldLoad => true,
            OperationKind::FieldStore => false,
            _ => return Ok(Outcome::Continue),
        };
        let Some(field) = instruction.member().filter(|m| m.is_field()) else {
            return Ok(Outcome::Continue);
        };
        if !self.trusted.contains(&field.parent.origin)
            || self.host.resolve_member(field) != Resolution::MemberMissing
        {
            return Ok(Outcome::Continue);
        }

        let Some(property) = self
            .host
            .find_type(&field.parent)
            .and_then(|ty| ty.find_property(&field.name))
            .filter(|p| p.property_type == field.signature.value_type())
        else {
            return Ok(Outcome::Continue);
        };

        let is_static_access = matches!(instruction.opcode, OpCode::LDSFLD | OpCode::STSFLD);
        if property.is_static != is_static_access || (!is_load && !property.writable) {
            return Ok(Outcome::Continue);
        }

        let (name, signature) = if is_load {
            (format!("get_{}", property.name), property.getter_signature())
        } else {
            (format!("set_{}", property.name), property.setter_signature())
        };
        let opcode = if property.is_static {
            OpCode::CALL
        } else {
            OpCode::CALLVIRT
        };
        let accessor = MemberRef::new(field.parent.clone(), name, signature);

        log::trace!("{} -> {}", field, accessor);
        Ok(Outcome::Rewrite(
            instruction.rewritten(opcode, SymbolicReference::Member(accessor)),
        ))
    }
}
