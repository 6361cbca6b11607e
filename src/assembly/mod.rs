//! CIL instruction model, decoder and encoder.
//!
//! This module turns the raw code of a [`crate::metadata::MethodDef`] into a list of
//! [`Instruction`]s the rewrite handlers can inspect and replace, and turns the result
//! back into bytes.
//!
//! # Key Types
//! - [`Instruction`] - A decoded CIL instruction
//! - [`Operand`] - Instruction operands (immediates, switch tables, references)
//! - [`OpCode`] - A CIL opcode with its static description
//! - [`OperationKind`] - The classification handlers match on
//! - [`MethodBody`] - The decoded instructions of one method
//!
//! # Main Functions
//! - [`decode`] - Decode every method of a module
//! - [`decode_instruction`] / [`decode_stream`] - Lower level decoding
//! - [`encode_body`] - Encode a (possibly rewritten) method body
//!
//! # Example
//! ```rust
//! use dotshim::assembly::{decode_stream, encode_body, MethodBody};
//! use dotshim::metadata::ReferenceTable;
//!
//! let mut references = ReferenceTable::new();
//! let code = [0x00, 0x2A]; // nop, ret
//! let body = MethodBody {
//!     method_index: 0,
//!     declaring_type: "Mod.ModEntry".to_string(),
//!     name: "Entry".to_string(),
//!     instructions: decode_stream(&code, &references)?,
//! };
//! assert_eq!(encode_body(&body, &mut references)?, code);
//! # Ok::<(), dotshim::Error>(())
//! ```

mod body;
mod decoder;
mod encoder;
mod instruction;
mod opcodes;

pub use body::MethodBody;
pub use decoder::{decode, decode_instruction, decode_method, decode_stream};
pub use encoder::{encode_body, encode_instruction};
pub use instruction::{Immediate, Instruction, Operand};
pub use opcodes::{OpCode, OpCodeInfo, OperandType, OperationKind, StackEffect};
