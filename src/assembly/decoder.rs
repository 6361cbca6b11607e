//! CIL instruction decoding.
//!
//! Decoding is linear: every method body is a flat instruction stream and the rewrite
//! pipeline never needs control flow, so no basic blocks are built.
//!
//! # Key Components
//!
//! - [`decode_instruction`] - Decodes a single instruction
//! - [`decode_stream`] - Decodes a complete instruction stream
//! - [`decode_method`] - Decodes one method definition into a [`MethodBody`]
//! - [`decode`] - Decodes every method of a module
//!
//! # Usage Examples
//!
//! ```rust
//! use dotshim::{assembly::{decode_instruction, decode_stream, OpCode}, metadata::ReferenceTable, Parser};
//!
//! let references = ReferenceTable::new();
//!
//! // ldc.i4.s 10
//! let mut parser = Parser::new(&[0x1F, 0x0A]);
//! let instr = decode_instruction(&mut parser, 0, &references)?;
//! assert_eq!(instr.mnemonic(), "ldc.i4.s");
//!
//! // nop, ret
//! let instrs = decode_stream(&[0x00, 0x2A], &references)?;
//! assert_eq!(instrs[1].opcode, OpCode::RET);
//! # Ok::<(), dotshim::Error>(())
//! ```

use crate::{
    assembly::{
        body::MethodBody,
        instruction::{Immediate, Instruction, Operand},
        opcodes::{OpCode, OperandType},
    },
    file::parser::Parser,
    metadata::{BinaryModule, MethodDef, ReferenceTable, TableId, Token},
    Error, Result,
};

/// Decodes a single instruction at the parser's position.
///
/// # Arguments
///
/// * `parser` - Parser positioned at the first byte of the instruction
/// * `index` - Position of the instruction within its method
/// * `references` - Reference table used to resolve external tokens
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for unassigned opcodes, switch tables running past
/// the end of the stream and reference tokens naming rows that do not exist, and
/// [`crate::Error::OutOfBounds`] for truncated operands.
pub fn decode_instruction(
    parser: &mut Parser<'_>,
    index: usize,
    references: &ReferenceTable,
) -> Result<Instruction> {
    let Ok(offset) = u32::try_from(parser.pos()) else {
        return Err(malformed_error!("Method body exceeds 4 GiB"));
    };

    let first_byte = parser.read_le::<u8>()?;
    let opcode = if first_byte == OpCode::PREFIX {
        OpCode(0xFE00 | u16::from(parser.read_le::<u8>()?))
    } else {
        OpCode(u16::from(first_byte))
    };

    let Some(info) = opcode.info() else {
        return Err(malformed_error!(
            "Invalid opcode {:#06x} at offset {:#x}",
            opcode.0,
            offset
        ));
    };

    let operand = match info.operand {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)),
        OperandType::UInt8 => Operand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)),
        OperandType::UInt16 => Operand::Immediate(Immediate::UInt16(parser.read_le::<u16>()?)),
        OperandType::Int32 => Operand::Immediate(Immediate::Int32(parser.read_le::<i32>()?)),
        OperandType::Int64 => Operand::Immediate(Immediate::Int64(parser.read_le::<i64>()?)),
        OperandType::Float32 => Operand::Immediate(Immediate::Float32(parser.read_le::<f32>()?)),
        OperandType::Float64 => Operand::Immediate(Immediate::Float64(parser.read_le::<f64>()?)),
        OperandType::Token => resolve_token(Token::new(parser.read_le::<u32>()?), references)?,
        OperandType::Switch => {
            let case_count = parser.read_le::<u32>()? as usize;
            if case_count > parser.remaining() / 4 {
                return Err(malformed_error!(
                    "Switch with {} targets at offset {:#x} runs past the end of the body",
                    case_count,
                    offset
                ));
            }

            let mut targets = Vec::with_capacity(case_count);
            for _ in 0..case_count {
                targets.push(parser.read_le::<i32>()?);
            }
            Operand::Switch(targets)
        }
    };

    Ok(Instruction {
        offset,
        index,
        opcode,
        operand,
    })
}

fn resolve_token(token: Token, references: &ReferenceTable) -> Result<Operand> {
    match token.table_id() {
        Some(TableId::TypeRef | TableId::MemberRef) => match references.resolve(token) {
            Some(reference) => Ok(Operand::Reference { token, reference }),
            None => Err(malformed_error!(
                "Token {} points at a missing reference row",
                token
            )),
        },
        _ => Ok(Operand::Definition(token)),
    }
}

/// Decodes a complete instruction stream.
///
/// # Errors
///
/// Returns the first error [`decode_instruction`] reports.
pub fn decode_stream(code: &[u8], references: &ReferenceTable) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        let index = instructions.len();
        instructions.push(decode_instruction(&mut parser, index, references)?);
    }

    Ok(instructions)
}

/// Decodes one method definition.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] naming the method if its body cannot be decoded;
/// truncated streams are reported as malformed as well.
pub fn decode_method(
    method: &MethodDef,
    method_index: usize,
    references: &ReferenceTable,
) -> Result<MethodBody> {
    let instructions = decode_stream(&method.code, references).map_err(|error| match error {
        Error::OutOfBounds { .. } => malformed_error!(
            "Truncated instruction stream in {}",
            method.full_name()
        ),
        Error::Malformed { message, .. } => {
            malformed_error!("{} in {}", message, method.full_name())
        }
        other => other,
    })?;

    Ok(MethodBody {
        method_index,
        declaring_type: method.declaring_type.clone(),
        name: method.name.clone(),
        instructions,
    })
}

/// Decodes every method body of a module, in declaration order.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for the first method that fails to decode.
pub fn decode(module: &BinaryModule) -> Result<Vec<MethodBody>> {
    module
        .methods()
        .iter()
        .enumerate()
        .map(|(index, method)| decode_method(method, index, module.references()))
        .collect()
}
