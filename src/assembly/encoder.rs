//! CIL instruction encoding, the inverse of [`crate::assembly::decoder`].
//!
//! References introduced by a rewrite are interned into the module's reference table
//! while encoding. Instructions that were never touched keep their original tokens, so a
//! decode/encode cycle of an unmodified body reproduces it byte for byte.

use crate::{
    assembly::{
        body::MethodBody,
        instruction::{Immediate, Instruction, Operand},
    },
    file::io::write_le,
    metadata::ReferenceTable,
    Result,
};

/// Appends one encoded instruction to `out`.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if a new reference cannot be interned or a
/// switch table is too large.
pub fn encode_instruction(
    instruction: &Instruction,
    references: &mut ReferenceTable,
    out: &mut Vec<u8>,
) -> Result<()> {
    instruction.opcode.encode(out);

    match &instruction.operand {
        Operand::None => {}
        Operand::Immediate(imm) => match *imm {
            Immediate::Int8(v) => write_le(out, v),
            Immediate::UInt8(v) => write_le(out, v),
            Immediate::UInt16(v) => write_le(out, v),
            Immediate::Int32(v) => write_le(out, v),
            Immediate::Int64(v) => write_le(out, v),
            Immediate::Float32(v) => write_le(out, v),
            Immediate::Float64(v) => write_le(out, v),
        },
        Operand::Switch(targets) => {
            let Ok(count) = u32::try_from(targets.len()) else {
                return Err(malformed_error!("Switch with {} targets", targets.len()));
            };
            write_le(out, count);
            for target in targets {
                write_le(out, *target);
            }
        }
        Operand::Reference { token, reference } => {
            let token = if !token.is_null()
                && references.resolve(*token).as_ref() == Some(reference)
            {
                *token
            } else {
                references.intern(reference)?
            };
            write_le(out, token.value());
        }
        Operand::Definition(token) => write_le(out, token.value()),
    }

    Ok(())
}

/// Encodes a method body, interning rewritten references into `references`.
///
/// # Errors
///
/// Returns the first error [`encode_instruction`] reports.
pub fn encode_body(body: &MethodBody, references: &mut ReferenceTable) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(body.code_size());
    for instruction in &body.instructions {
        encode_instruction(instruction, references, &mut out)?;
    }
    Ok(out)
}
