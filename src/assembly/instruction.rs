//! Decoded CIL instructions and their operands.
//!
//! Token operands that point into the module's reference table are resolved to their
//! [`SymbolicReference`] at decode time, so handlers never deal with raw tokens for
//! external code. Instructions produced by a rewrite carry a null token until the
//! encoder interns their reference.

use std::fmt;

use crate::{
    assembly::opcodes::{OpCode, OperandType, OperationKind, StackEffect},
    metadata::{MemberRef, Signature, SymbolicReference, Token},
};

/// An inline immediate value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit value
    Int8(i8),
    /// Unsigned 8-bit value
    UInt8(u8),
    /// Unsigned 16-bit value
    UInt16(u16),
    /// Signed 32-bit value
    Int32(i32),
    /// Signed 64-bit value
    Int64(i64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
}

impl Immediate {
    /// The operand layout this immediate is encoded with
    #[must_use]
    pub fn operand_type(&self) -> OperandType {
        match self {
            Immediate::Int8(_) => OperandType::Int8,
            Immediate::UInt8(_) => OperandType::UInt8,
            Immediate::UInt16(_) => OperandType::UInt16,
            Immediate::Int32(_) => OperandType::Int32,
            Immediate::Int64(_) => OperandType::Int64,
            Immediate::Float32(_) => OperandType::Float32,
            Immediate::Float64(_) => OperandType::Float64,
        }
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(v) => write!(f, "{v}"),
            Immediate::UInt8(v) => write!(f, "{v}"),
            Immediate::UInt16(v) => write!(f, "{v}"),
            Immediate::Int32(v) => write!(f, "{v}"),
            Immediate::Int64(v) => write!(f, "{v}"),
            Immediate::Float32(v) => write!(f, "{v}"),
            Immediate::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// The operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Inline immediate value
    Immediate(Immediate),
    /// `switch` jump offsets
    Switch(Vec<i32>),
    /// Token pointing at an external type or member
    Reference {
        /// Original token; null for references introduced by a rewrite
        token: Token,
        /// The resolved reference
        reference: SymbolicReference,
    },
    /// Token into one of the module's own tables or its string heap
    Definition(Token),
}

/// A single decoded CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset within the method body
    pub offset: u32,
    /// Position within the method's instruction list
    pub index: usize,
    /// The opcode
    pub opcode: OpCode,
    /// The operand
    pub operand: Operand,
}

impl Instruction {
    /// The opcode's mnemonic
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.opcode.mnemonic()
    }

    /// The operation kind handlers match on
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.opcode.kind()
    }

    /// Encoded size in bytes, opcode included
    #[must_use]
    pub fn size(&self) -> usize {
        let operand = match &self.operand {
            Operand::None => 0,
            Operand::Immediate(imm) => imm.operand_type().size().unwrap_or(0),
            Operand::Switch(targets) => 4 + 4 * targets.len(),
            Operand::Reference { .. } | Operand::Definition(_) => 4,
        };
        self.opcode.size() + operand
    }

    /// The external reference this instruction points at, if any
    #[must_use]
    pub fn reference(&self) -> Option<&SymbolicReference> {
        match &self.operand {
            Operand::Reference { reference, .. } => Some(reference),
            _ => None,
        }
    }

    /// The external member this instruction points at, if any
    #[must_use]
    pub fn member(&self) -> Option<&MemberRef> {
        self.reference().and_then(SymbolicReference::as_member)
    }

    /// Returns `true` if the operand was produced by a rewrite and still needs a token
    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        matches!(&self.operand, Operand::Reference { token, .. } if token.is_null())
    }

    /// Creates the replacement for this instruction at the same position.
    ///
    /// The result points at `reference` through a null token which the encoder resolves
    /// by interning the reference into the module's reference table.
    #[must_use]
    pub fn rewritten(&self, opcode: OpCode, reference: SymbolicReference) -> Instruction {
        Instruction {
            offset: self.offset,
            index: self.index,
            opcode,
            operand: Operand::Reference {
                token: Token::new(0),
                reference,
            },
        }
    }

    /// Values this instruction pops and pushes.
    ///
    /// Calls derive their effect from the referenced signature. Returns `None` where the
    /// effect cannot be known without more context (`ret`, `calli`, calls through
    /// definition tokens).
    #[must_use]
    pub fn stack_effect(&self) -> Option<StackEffect> {
        let info = self.opcode.info()?;
        if let Some(fixed) = info.stack {
            return Some(fixed);
        }

        let signature = &self.member()?.signature;
        let Signature::Method {
            has_this,
            parameters,
            ..
        } = signature
        else {
            return None;
        };
        let params = u16::try_from(parameters.len()).ok()?;

        match info.kind {
            OperationKind::MethodCall => Some(StackEffect::new(
                params + u16::from(*has_this),
                u16::from(signature.returns_value()),
            )),
            OperationKind::NewObject => Some(StackEffect::new(params, 1)),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.mnemonic())?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(imm) => write!(f, " {imm}"),
            Operand::Switch(targets) => write!(f, " ({} targets)", targets.len()),
            Operand::Reference { reference, .. } => write!(f, " {reference}"),
            Operand::Definition(token) => write!(f, " {token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{TypeRef, VOID_TYPE};

    fn call(opcode: OpCode, signature: Signature) -> Instruction {
        Instruction {
            offset: 0,
            index: 0,
            opcode,
            operand: Operand::Reference {
                token: Token(0x0A00_0001),
                reference: SymbolicReference::Member(MemberRef::new(
                    TypeRef::new("StardewValley", "StardewValley.Farmer"),
                    "addItem",
                    signature,
                )),
            },
        }
    }

    #[test]
    fn call_stack_effect_from_signature() {
        let instance = call(
            OpCode::CALLVIRT,
            Signature::instance_method("System.Boolean", &["StardewValley.Item"]),
        );
        assert_eq!(instance.stack_effect(), Some(StackEffect::new(2, 1)));

        let static_void = call(OpCode::CALL, Signature::static_method(VOID_TYPE, &[]));
        assert_eq!(static_void.stack_effect(), Some(StackEffect::new(0, 0)));

        let ctor = call(
            OpCode::NEWOBJ,
            Signature::instance_method(VOID_TYPE, &["System.String"]),
        );
        assert_eq!(ctor.stack_effect(), Some(StackEffect::new(1, 1)));
    }

    #[test]
    fn field_access_matches_accessor_call() {
        let field = Instruction {
            offset: 4,
            index: 1,
            opcode: OpCode::LDFLD,
            operand: Operand::Definition(Token(0x0400_0001)),
        };
        let getter = call(
            OpCode::CALLVIRT,
            Signature::instance_method("System.Int32", &[]),
        );

        assert_eq!(field.stack_effect(), getter.stack_effect());
        assert_eq!(field.size(), getter.size());
    }

    #[test]
    fn rewritten_keeps_position() {
        let original = call(OpCode::CALL, Signature::static_method(VOID_TYPE, &[]));
        let target = SymbolicReference::Type(TypeRef::new("Mod", "Mod.Shim"));
        let replacement = original.rewritten(OpCode::CALL, target.clone());

        assert!(replacement.is_rewritten());
        assert!(!original.is_rewritten());
        assert_eq!(replacement.offset, original.offset);
        assert_eq!(replacement.reference(), Some(&target));
    }

    #[test]
    fn sizes() {
        let switch = Instruction {
            offset: 0,
            index: 0,
            opcode: OpCode::SWITCH,
            operand: Operand::Switch(vec![1, 2, 3]),
        };
        assert_eq!(switch.size(), 1 + 4 + 12);

        let ldarg = Instruction {
            offset: 0,
            index: 0,
            opcode: OpCode::LDARG,
            operand: Operand::Immediate(Immediate::UInt16(300)),
        };
        assert_eq!(ldarg.size(), 4);
        assert_eq!(ldarg.to_string(), "IL_0000: ldarg 300");
    }
}
