//! Serialized form of a [`BinaryModule`].
//!
//! A host that persists rewritten modules (or a fuzzer) needs a byte representation.
//! The layout is little-endian, with counts and lengths as ECMA-335 compressed
//! unsigned integers and strings as compressed-length-prefixed UTF-8:
//!
//! ```text
//! magic      "DSHM"
//! version    u16 (1)
//! name       string
//! machine    u16
//! flags      u32
//! typerefs   count, then per row: origin string, full name string
//! memberrefs count, then per row: parent typeref row (1-based), name string, signature
//! methods    count, then per row: declaring type string, name string, code length, code
//! ```
//!
//! A signature starts with a tag byte: `0x06` field (type string), `0x00` static
//! method or `0x20` instance method (return type string, parameter count, parameter
//! type strings). Trailing bytes after the method table are rejected.

use crate::{
    file::{
        io::{write_compressed_uint, write_le, write_prefixed_string_utf8},
        parser::Parser,
    },
    metadata::{
        module::{BinaryModule, CorFlags, Machine, MethodDef, ModuleHeader},
        reference::{MemberRef, Signature, TypeRef},
        table::ReferenceTable,
    },
    Result,
};

const MAGIC: &[u8; 4] = b"DSHM";
const VERSION: u16 = 1;

const SIG_FIELD: u8 = 0x06;
const SIG_STATIC: u8 = 0x00;
const SIG_INSTANCE: u8 = 0x20;

impl BinaryModule {
    /// Parses a module from its serialized container form.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] for empty input, [`crate::Error::OutOfBounds`] for
    /// truncated input and [`crate::Error::Malformed`] for corrupt metadata.
    pub fn from_bytes(data: &[u8]) -> Result<BinaryModule> {
        if data.is_empty() {
            return Err(crate::Error::Empty);
        }

        let mut parser = Parser::new(data);
        if parser.read_bytes(MAGIC.len())? != MAGIC {
            return Err(malformed_error!("Invalid module magic"));
        }

        let version = parser.read_le::<u16>()?;
        if version != VERSION {
            return Err(malformed_error!("Unsupported container version - {}", version));
        }

        let name = parser.read_prefixed_string_utf8()?;
        let header = read_header(&mut parser)?;

        let mut references = ReferenceTable::new();
        let type_count = read_count(&mut parser)?;
        for _ in 0..type_count {
            let origin = parser.read_prefixed_string_utf8()?;
            let full_name = parser.read_prefixed_string_utf8()?;
            references.push_type(TypeRef::new(origin, full_name))?;
        }

        let member_count = read_count(&mut parser)?;
        for _ in 0..member_count {
            let parent_row = parser.read_compressed_uint()? as usize;
            let Some(parent) = parent_row
                .checked_sub(1)
                .and_then(|index| references.types().get(index))
                .cloned()
            else {
                return Err(malformed_error!(
                    "Member reference points at missing type row {}",
                    parent_row
                ));
            };
            let name = parser.read_prefixed_string_utf8()?;
            let signature = read_signature(&mut parser)?;
            references.push_member(MemberRef::new(parent, name, signature))?;
        }

        let mut module = BinaryModule::new(name, header, references);

        let method_count = read_count(&mut parser)?;
        for _ in 0..method_count {
            let declaring_type = parser.read_prefixed_string_utf8()?;
            let method_name = parser.read_prefixed_string_utf8()?;
            let code_len = parser.read_compressed_uint()? as usize;
            let code = parser.read_bytes(code_len)?.to_vec();
            module.add_method(MethodDef::new(declaring_type, method_name, code));
        }

        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after method table",
                parser.remaining()
            ));
        }

        Ok(module)
    }

    /// Serializes the module into its container form.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a count, string or body is too large for
    /// the compressed encoding, or if a member row's parent type is not in the table.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        write_le(&mut out, VERSION);
        write_prefixed_string_utf8(&mut out, &self.name)?;
        write_le(&mut out, self.header.machine as u16);
        write_le(&mut out, self.header.flags.bits());

        let types = self.references.types();
        write_count(&mut out, types.len())?;
        for ty in types {
            write_prefixed_string_utf8(&mut out, &ty.origin)?;
            write_prefixed_string_utf8(&mut out, &ty.full_name)?;
        }

        let members = self.references.members();
        write_count(&mut out, members.len())?;
        for member in members {
            let Some(parent_row) = self.references.type_row(&member.parent) else {
                return Err(malformed_error!(
                    "Parent of {} is not in the reference table",
                    member
                ));
            };
            write_compressed_uint(&mut out, parent_row)?;
            write_prefixed_string_utf8(&mut out, &member.name)?;
            write_signature(&mut out, &member.signature)?;
        }

        write_count(&mut out, self.methods.len())?;
        for method in &self.methods {
            write_prefixed_string_utf8(&mut out, &method.declaring_type)?;
            write_prefixed_string_utf8(&mut out, &method.name)?;
            write_count(&mut out, method.code.len())?;
            out.extend_from_slice(&method.code);
        }

        Ok(out)
    }
}

fn read_header(parser: &mut Parser<'_>) -> Result<ModuleHeader> {
    let raw_machine = parser.read_le::<u16>()?;
    let Some(machine) = Machine::from_repr(raw_machine) else {
        return Err(malformed_error!("Unknown machine type - {:#06x}", raw_machine));
    };

    let raw_flags = parser.read_le::<u32>()?;
    let Some(flags) = CorFlags::from_bits(raw_flags) else {
        return Err(malformed_error!("Unknown CLI header flags - {:#010x}", raw_flags));
    };

    Ok(ModuleHeader { machine, flags })
}

/// Reads a count and checks it against the bytes left, so a corrupt count cannot
/// trigger a huge allocation or a long loop.
fn read_count(parser: &mut Parser<'_>) -> Result<usize> {
    let count = parser.read_compressed_uint()? as usize;
    if count > parser.remaining() {
        return Err(malformed_error!(
            "Count {} exceeds the {} remaining bytes",
            count,
            parser.remaining()
        ));
    }
    Ok(count)
}

fn write_count(out: &mut Vec<u8>, count: usize) -> Result<()> {
    let Ok(count) = u32::try_from(count) else {
        return Err(malformed_error!("Count {} too large", count));
    };
    write_compressed_uint(out, count)
}

fn read_signature(parser: &mut Parser<'_>) -> Result<Signature> {
    let tag = parser.read_le::<u8>()?;
    match tag {
        SIG_FIELD => Ok(Signature::Field {
            field_type: parser.read_prefixed_string_utf8()?,
        }),
        SIG_STATIC | SIG_INSTANCE => {
            let return_type = parser.read_prefixed_string_utf8()?;
            let param_count = read_count(parser)?;
            let mut parameters = Vec::with_capacity(param_count);
            for _ in 0..param_count {
                parameters.push(parser.read_prefixed_string_utf8()?);
            }
            Ok(Signature::Method {
                has_this: tag == SIG_INSTANCE,
                return_type,
                parameters,
            })
        }
        _ => Err(malformed_error!("Invalid signature tag - {:#04x}", tag)),
    }
}

fn write_signature(out: &mut Vec<u8>, signature: &Signature) -> Result<()> {
    match signature {
        Signature::Field { field_type } => {
            out.push(SIG_FIELD);
            write_prefixed_string_utf8(out, field_type)
        }
        Signature::Method {
            has_this,
            return_type,
            parameters,
        } => {
            out.push(if *has_this { SIG_INSTANCE } else { SIG_STATIC });
            write_prefixed_string_utf8(out, return_type)?;
            write_count(out, parameters.len())?;
            for parameter in parameters {
                write_prefixed_string_utf8(out, parameter)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn sample() -> BinaryModule {
        let mut references = ReferenceTable::new();
        let farmer = TypeRef::new("StardewValley", "StardewValley.Farmer");
        references
            .push_member(MemberRef::field(farmer.clone(), "money", "System.Int32"))
            .unwrap();
        references
            .push_member(MemberRef::new(
                farmer,
                "getName",
                Signature::instance_method("System.String", &[]),
            ))
            .unwrap();

        let mut module = BinaryModule::new("ExampleMod", ModuleHeader::any_cpu(), references);
        // ldarg.0; ldfld money; pop; ret
        module.add_method(MethodDef::new(
            "ExampleMod.ModEntry",
            "Entry",
            vec![0x02, 0x7B, 0x01, 0x00, 0x00, 0x0A, 0x26, 0x2A],
        ));
        module
    }

    #[test]
    fn container_roundtrip() {
        let module = sample();
        let bytes = module.to_bytes().unwrap();
        let parsed = BinaryModule::from_bytes(&bytes).unwrap();

        assert_eq!(parsed, module);
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn rejects_empty_and_bad_magic() {
        assert!(matches!(BinaryModule::from_bytes(&[]), Err(Error::Empty)));
        assert!(matches!(
            BinaryModule::from_bytes(b"MZ\x90\x00\x03\x00"),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_truncation_everywhere() {
        let bytes = sample().to_bytes().unwrap();
        for len in 1..bytes.len() {
            let result = BinaryModule::from_bytes(&bytes[..len]);
            assert!(
                result.as_ref().is_err_and(Error::is_malformed),
                "truncated to {len} bytes: {result:?}"
            );
        }
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            BinaryModule::from_bytes(&bytes),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_dangling_parent_row() {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        write_le(&mut out, VERSION);
        write_prefixed_string_utf8(&mut out, "Broken").unwrap();
        write_le(&mut out, Machine::I386 as u16);
        write_le(&mut out, CorFlags::ILONLY.bits());
        out.push(0); // no type refs
        out.push(1); // one member ref
        out.push(1); // parent row 1 does not exist
        out.extend_from_slice(&[0x01, b'x', SIG_FIELD, 0x01, b'y', 0x00]);

        assert!(matches!(
            BinaryModule::from_bytes(&out),
            Err(Error::Malformed { .. })
        ));
    }
}
