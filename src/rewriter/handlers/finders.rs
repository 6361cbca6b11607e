//! Capability finders: report uses of specific types, fields and events.
//!
//! None of these ever rewrite. They only attach a fixed classification to every
//! instruction that references what they look for.

use std::collections::HashSet;

use log::debug;

use crate::{
    assembly::Instruction,
    rewriter::{
        classification::Classification,
        handler::{Handler, HandlerContext, HandlerKind, Outcome},
    },
    Result,
};

/// Finds references to a set of types by full name.
///
/// Without a member filter any mention counts, including types appearing only in a
/// signature. With a member filter only references to those members of the types
/// match.
pub struct TypeFinder {
    name: &'static str,
    types: HashSet<String>,
    members: Option<HashSet<String>>,
    classification: Classification,
}

impl TypeFinder {
    /// Creates a finder for `types` reporting `classification`
    pub fn new<I, S>(name: &'static str, types: I, classification: Classification) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeFinder {
            name,
            types: types.into_iter().map(Into::into).collect(),
            members: None,
            classification,
        }
    }

    /// Restricts matches to the named members
    #[must_use]
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = Some(members.into_iter().map(Into::into).collect());
        self
    }
}

impl Handler for TypeFinder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::CapabilityFinder
    }

    fn description(&self) -> &'static str {
        "Finds references to a set of types"
    }

    fn examine(&self, instruction: &Instruction, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let Some(reference) = instruction.reference() else {
            return Ok(Outcome::Continue);
        };

        let found = match &self.members {
            None => self.types.iter().any(|ty| reference.mentions_type(ty)),
            Some(members) => {
                self.types.contains(&reference.declaring_type().full_name)
                    && reference
                        .member_name()
                        .is_some_and(|name| members.contains(name))
            }
        };
        if !found {
            return Ok(Outcome::Continue);
        }

        debug!("{}: {} at {}", self.name, reference, ctx.method);
        Ok(Outcome::Flag(self.classification))
    }
}

/// Finds any access (load, address or store) to named fields of one type.
pub struct FieldFinder {
    name: &'static str,
    declaring_type: String,
    fields: HashSet<String>,
    classification: Classification,
}

impl FieldFinder {
    /// Creates a finder for `fields` declared on `declaring_type`
    pub fn new<I, S>(
        name: &'static str,
        declaring_type: impl Into<String>,
        fields: I,
        classification: Classification,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldFinder {
            name,
            declaring_type: declaring_type.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            classification,
        }
    }
}

impl Handler for FieldFinder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::CapabilityFinder
    }

    fn description(&self) -> &'static str {
        "Finds accesses to specific fields"
    }

    fn examine(&self, instruction: &Instruction, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let Some(field) = instruction.member().filter(|m| m.is_field()) else {
            return Ok(Outcome::Continue);
        };
        if field.parent.full_name != self.declaring_type || !self.fields.contains(&field.name) {
            return Ok(Outcome::Continue);
        }

        debug!("{}: {} at {}", self.name, field, ctx.method);
        Ok(Outcome::Flag(self.classification))
    }
}

/// Finds subscriptions to, or removals from, named events of one type.
///
/// Events are only visible in IL through their `add_X` / `remove_X` accessor calls.
pub struct EventFinder {
    name: &'static str,
    declaring_type: String,
    events: HashSet<String>,
    classification: Classification,
}

impl EventFinder {
    /// Creates a finder for `events` declared on `declaring_type`
    pub fn new<I, S>(
        name: &'static str,
        declaring_type: impl Into<String>,
        events: I,
        classification: Classification,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EventFinder {
            name,
            declaring_type: declaring_type.into(),
            events: events.into_iter().map(Into::into).collect(),
            classification,
        }
    }

    fn event_name(accessor: &str) -> Option<&str> {
        accessor
            .strip_prefix("add_")
            .or_else(|| accessor.strip_prefix("remove_"))
    }
}

impl Handler for EventFinder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::CapabilityFinder
    }

    fn description(&self) -> &'static str {
        "Finds subscriptions to specific events"
    }

    fn examine(&self, instruction: &Instruction, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let Some(method) = instruction.member().filter(|m| m.is_method()) else {
            return Ok(Outcome::Continue);
        };
        if method.parent.full_name != self.declaring_type {
            return Ok(Outcome::Continue);
        }
        match Self::event_name(&method.name) {
            Some(event) if self.events.contains(event) => {
                debug!("{}: {} at {}", self.name, method, ctx.method);
                Ok(Outcome::Flag(self.classification))
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
        metadata::{MemberRef, ModuleHeader, Signature, SymbolicReference, Token, TypeRef},
    };

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

    fn run(handler: &dyn Handler, instruction: &Instruction) -> Outcome {
        let header = ModuleHeader::any_cpu();
        let ctx = HandlerContext {
            module: "Mod",
            method: "Mod.ModEntry::Entry",
            header: &header,
            previous: None,
        };
        handler.examine(instruction, &ctx).unwrap()
    }

    fn console_write() -> Instruction {
        instruction(
            OpCode::CALL,
            SymbolicReference::Member(MemberRef::new(
                TypeRef::new("mscorlib", "System.Console"),
                "WriteLine",
                Signature::static_method("System.Void", &["System.String"]),
            )),
        )
    }

    #[test]
    fn type_finder_matches_declaring_and_signature_types() {
        let finder = TypeFinder::new(
            "console-finder",
            ["System.Console"],
            Classification::DetectedConsoleAccess,
        );
        assert_eq!(
            run(&finder, &console_write()),
            Outcome::Flag(Classification::DetectedConsoleAccess)
        );

        let process_finder = TypeFinder::new(
            "shell-finder",
            ["System.Diagnostics.Process"],
            Classification::DetectedShellAccess,
        );
        let returns_process = instruction(
            OpCode::CALL,
            SymbolicReference::Member(MemberRef::new(
                TypeRef::new("Mod", "Mod.Helpers"),
                "Launch",
                Signature::static_method("System.Diagnostics.Process", &[]),
            )),
        );
        assert_eq!(
            run(&process_finder, &returns_process),
            Outcome::Flag(Classification::DetectedShellAccess)
        );
        assert_eq!(run(&process_finder, &console_write()), Outcome::Continue);
    }

    #[test]
    fn type_finder_member_filter() {
        let finder = TypeFinder::new(
            "console-finder",
            ["System.Console"],
            Classification::DetectedConsoleAccess,
        )
        .with_members(["ReadLine"]);
        assert_eq!(run(&finder, &console_write()), Outcome::Continue);
    }

    #[test]
    fn field_finder() {
        let finder = FieldFinder::new(
            "save-serializer-finder",
            "StardewValley.SaveGame",
            ["serializer", "farmerSerializer"],
            Classification::DetectedSaveSerializerAccess,
        );
        let save_game = TypeRef::new("StardewValley", "StardewValley.SaveGame");
        let ldsfld = instruction(
            OpCode::LDSFLD,
            SymbolicReference::Member(MemberRef::field(
                save_game.clone(),
                "farmerSerializer",
                "System.Xml.Serialization.XmlSerializer",
            )),
        );
        assert_eq!(
            run(&finder, &ldsfld),
            Outcome::Flag(Classification::DetectedSaveSerializerAccess)
        );

        let other = instruction(
            OpCode::LDSFLD,
            SymbolicReference::Member(MemberRef::field(save_game, "loaded", "System.Object")),
        );
        assert_eq!(run(&finder, &other), Outcome::Continue);
    }

    #[test]
    fn event_finder_matches_add_and_remove() {
        let finder = EventFinder::new(
            "unvalidated-event-finder",
            "StardewModdingAPI.Events.ISpecializedEvents",
            ["UnvalidatedUpdateTicked"],
            Classification::DetectedUnvalidatedEventAccess,
        );
        let events = TypeRef::new(
            "StardewModdingAPI",
            "StardewModdingAPI.Events.ISpecializedEvents",
        );

        for accessor in ["add_UnvalidatedUpdateTicked", "remove_UnvalidatedUpdateTicked"] {
            let call = instruction(
                OpCode::CALLVIRT,
                SymbolicReference::Member(MemberRef::new(
                    events.clone(),
                    accessor,
                    Signature::instance_method("System.Void", &["System.EventHandler"]),
                )),
            );
            assert_eq!(
                run(&finder, &call),
                Outcome::Flag(Classification::DetectedUnvalidatedEventAccess)
            );
        }

        let other = instruction(
            OpCode::CALLVIRT,
            SymbolicReference::Member(MemberRef::new(
                events,
                "add_LoadStageChanged",
                Signature::instance_method("System.Void", &["System.EventHandler"]),
            )),
        );
        assert_eq!(run(&finder, &other), Outcome::Continue);
    }
}
