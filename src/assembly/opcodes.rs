//! The CIL opcode table (ECMA-335 Partition III).
//!
//! Every opcode is described by its mnemonic, the layout of its inline operand, its
//! fixed stack behaviour and the [`OperationKind`] handlers match on. One-byte opcodes
//! are stored as their byte value, two-byte opcodes as `0xFE00 | second_byte`.

use std::fmt;

use strum::Display;

/// Layout of an instruction's inline operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    /// No operand
    None,
    /// Signed 8-bit immediate (short branches, `ldc.i4.s`)
    Int8,
    /// Unsigned 8-bit immediate (short local and argument indices)
    UInt8,
    /// Unsigned 16-bit immediate (long local and argument indices)
    UInt16,
    /// Signed 32-bit immediate (branches, `ldc.i4`)
    Int32,
    /// Signed 64-bit immediate
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// 32-bit metadata token
    Token,
    /// `switch` jump table: a `u32` count followed by that many `i32` offsets
    Switch,
}

impl OperandType {
    /// Encoded size of the operand, `None` for the variable-length switch table
    #[must_use]
    pub fn size(self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 => Some(1),
            OperandType::UInt16 => Some(2),
            OperandType::Int32 | OperandType::Float32 | OperandType::Token => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// What an instruction does with its token operand, as far as handlers care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum OperationKind {
    /// `ldfld`, `ldsfld`
    FieldLoad,
    /// `ldflda`, `ldsflda`
    FieldAddress,
    /// `stfld`, `stsfld`
    FieldStore,
    /// `call`, `callvirt`
    MethodCall,
    /// `newobj`
    NewObject,
    /// `ldftn`, `ldvirtftn`
    FunctionPointer,
    /// Instructions whose token names a type (`box`, `castclass`, `newarr`, ...)
    TypeReference,
    /// `ldtoken`
    TokenLoad,
    /// Everything else
    Other,
}

/// Number of values an instruction pops from and pushes onto the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackEffect {
    /// Values consumed
    pub pops: u16,
    /// Values produced
    pub pushes: u16,
}

impl StackEffect {
    /// Creates a stack effect
    #[must_use]
    pub const fn new(pops: u16, pushes: u16) -> Self {
        StackEffect { pops, pushes }
    }

    /// Net change of the stack depth
    #[must_use]
    pub fn net(self) -> i32 {
        i32::from(self.pushes) - i32::from(self.pops)
    }
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCodeInfo {
    /// Assembler mnemonic
    pub mnemonic: &'static str,
    /// Inline operand layout
    pub operand: OperandType,
    /// Fixed stack behaviour, `None` where it depends on the operand (calls, `ret`)
    pub stack: Option<StackEffect>,
    /// Operation kind
    pub kind: OperationKind,
}

/// A CIL opcode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpCode(pub u16);

impl OpCode {
    /// Prefix byte of two-byte opcodes
    pub const PREFIX: u8 = 0xFE;

    /// Returns `true` for opcodes encoded with the `0xFE` prefix
    #[must_use]
    pub fn is_two_byte(self) -> bool {
        self.0 > 0xFF
    }

    /// Number of bytes the opcode itself occupies
    #[must_use]
    pub fn size(self) -> usize {
        if self.is_two_byte() {
            2
        } else {
            1
        }
    }

    /// Appends the opcode bytes to `out`
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(self, out: &mut Vec<u8>) {
        if self.is_two_byte() {
            out.push(Self::PREFIX);
            out.push(self.0 as u8);
        } else {
            out.push(self.0 as u8);
        }
    }

    /// The opcode's mnemonic, `"??"` for unknown values
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.info().map_or("??", |info| info.mnemonic)
    }

    /// The opcode's operation kind, [`OperationKind::Other`] for unknown values
    #[must_use]
    pub fn kind(self) -> OperationKind {
        self.info().map_or(OperationKind::Other, |info| info.kind)
    }
}

impl fmt::Debug for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpCode({:#06x} {})", self.0, self.mnemonic())
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

macro_rules! stack {
    (var) => {
        None
    };
    ([$pops:literal, $pushes:literal]) => {
        Some(StackEffect::new($pops, $pushes))
    };
}

macro_rules! opcodes {
    ($($code:literal => $name:ident, $mnemonic:literal, $operand:ident, $stack:tt, $kind:ident;)*) => {
        impl OpCode {
            $(
                #[doc = concat!("`", $mnemonic, "`")]
                pub const $name: OpCode = OpCode($code);
            )*

            /// Static description of the opcode, `None` for unassigned values
            #[must_use]
            pub fn info(self) -> Option<OpCodeInfo> {
                match self.0 {
                    $(
                        $code => Some(OpCodeInfo {
                            mnemonic: $mnemonic,
                            operand: OperandType::$operand,
                            stack: stack!($stack),
                            kind: OperationKind::$kind,
                        }),
                    )*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    0x00 => NOP, "nop", None, [0, 0], Other;
    0x01 => BREAK, "break", None, [0, 0], Other;
    0x02 => LDARG_0, "ldarg.0", None, [0, 1], Other;
    0x03 => LDARG_1, "ldarg.1", None, [0, 1], Other;
    0x04 => LDARG_2, "ldarg.2", None, [0, 1], Other;
    0x05 => LDARG_3, "ldarg.3", None, [0, 1], Other;
    0x06 => LDLOC_0, "ldloc.0", None, [0, 1], Other;
    0x07 => LDLOC_1, "ldloc.1", None, [0, 1], Other;
    0x08 => LDLOC_2, "ldloc.2", None, [0, 1], Other;
    0x09 => LDLOC_3, "ldloc.3", None, [0, 1], Other;
    0x0A => STLOC_0, "stloc.0", None, [1, 0], Other;
    0x0B => STLOC_1, "stloc.1", None, [1, 0], Other;
    0x0C => STLOC_2, "stloc.2", None, [1, 0], Other;
    0x0D => STLOC_3, "stloc.3", None, [1, 0], Other;
    0x0E => LDARG_S, "ldarg.s", UInt8, [0, 1], Other;
    0x0F => LDARGA_S, "ldarga.s", UInt8, [0, 1], Other;
    0x10 => STARG_S, "starg.s", UInt8, [1, 0], Other;
    0x11 => LDLOC_S, "ldloc.s", UInt8, [0, 1], Other;
    0x12 => LDLOCA_S, "ldloca.s", UInt8, [0, 1], Other;
    0x13 => STLOC_S, "stloc.s", UInt8, [1, 0], Other;
    0x14 => LDNULL, "ldnull", None, [0, 1], Other;
    0x15 => LDC_I4_M1, "ldc.i4.m1", None, [0, 1], Other;
    0x16 => LDC_I4_0, "ldc.i4.0", None, [0, 1], Other;
    0x17 => LDC_I4_1, "ldc.i4.1", None, [0, 1], Other;
    0x18 => LDC_I4_2, "ldc.i4.2", None, [0, 1], Other;
    0x19 => LDC_I4_3, "ldc.i4.3", None, [0, 1], Other;
    0x1A => LDC_I4_4, "ldc.i4.4", None, [0, 1], Other;
    0x1B => LDC_I4_5, "ldc.i4.5", None, [0, 1], Other;
    0x1C => LDC_I4_6, "ldc.i4.6", None, [0, 1], Other;
    0x1D => LDC_I4_7, "ldc.i4.7", None, [0, 1], Other;
    0x1E => LDC_I4_8, "ldc.i4.8", None, [0, 1], Other;
    0x1F => LDC_I4_S, "ldc.i4.s", Int8, [0, 1], Other;
    0x20 => LDC_I4, "ldc.i4", Int32, [0, 1], Other;
    0x21 => LDC_I8, "ldc.i8", Int64, [0, 1], Other;
    0x22 => LDC_R4, "ldc.r4", Float32, [0, 1], Other;
    0x23 => LDC_R8, "ldc.r8", Float64, [0, 1], Other;
    0x25 => DUP, "dup", None, [1, 2], Other;
    0x26 => POP, "pop", None, [1, 0], Other;
    0x27 => JMP, "jmp", Token, [0, 0], Other;
    0x28 => CALL, "call", Token, var, MethodCall;
    0x29 => CALLI, "calli", Token, var, Other;
    0x2A => RET, "ret", None, var, Other;
    0x2B => BR_S, "br.s", Int8, [0, 0], Other;
    0x2C => BRFALSE_S, "brfalse.s", Int8, [1, 0], Other;
    0x2D => BRTRUE_S, "brtrue.s", Int8, [1, 0], Other;
    0x2E => BEQ_S, "beq.s", Int8, [2, 0], Other;
    0x2F => BGE_S, "bge.s", Int8, [2, 0], Other;
    0x30 => BGT_S, "bgt.s", Int8, [2, 0], Other;
    0x31 => BLE_S, "ble.s", Int8, [2, 0], Other;
    0x32 => BLT_S, "blt.s", Int8, [2, 0], Other;
    0x33 => BNE_UN_S, "bne.un.s", Int8, [2, 0], Other;
    0x34 => BGE_UN_S, "bge.un.s", Int8, [2, 0], Other;
    0x35 => BGT_UN_S, "bgt.un.s", Int8, [2, 0], Other;
    0x36 => BLE_UN_S, "ble.un.s", Int8, [2, 0], Other;
    0x37 => BLT_UN_S, "blt.un.s", Int8, [2, 0], Other;
    0x38 => BR, "br", Int32, [0, 0], Other;
    0x39 => BRFALSE, "brfalse", Int32, [1, 0], Other;
    0x3A => BRTRUE, "brtrue", Int32, [1, 0], Other;
    0x3B => BEQ, "beq", Int32, [2, 0], Other;
    0x3C => BGE, "bge", Int32, [2, 0], Other;
    0x3D => BGT, "bgt", Int32, [2, 0], Other;
    0x3E => BLE, "ble", Int32, [2, 0], Other;
    0x3F => BLT, "blt", Int32, [2, 0], Other;
    0x40 => BNE_UN, "bne.un", Int32, [2, 0], Other;
    0x41 => BGE_UN, "bge.un", Int32, [2, 0], Other;
    0x42 => BGT_UN, "bgt.un", Int32, [2, 0], Other;
    0x43 => BLE_UN, "ble.un", Int32, [2, 0], Other;
    0x44 => BLT_UN, "blt.un", Int32, [2, 0], Other;
    0x45 => SWITCH, "switch", Switch, [1, 0], Other;
    0x46 => LDIND_I1, "ldind.i1", None, [1, 1], Other;
    0x47 => LDIND_U1, "ldind.u1", None, [1, 1], Other;
    0x48 => LDIND_I2, "ldind.i2", None, [1, 1], Other;
    0x49 => LDIND_U2, "ldind.u2", None, [1, 1], Other;
    0x4A => LDIND_I4, "ldind.i4", None, [1, 1], Other;
    0x4B => LDIND_U4, "ldind.u4", None, [1, 1], Other;
    0x4C => LDIND_I8, "ldind.i8", None, [1, 1], Other;
    0x4D => LDIND_I, "ldind.i", None, [1, 1], Other;
    0x4E => LDIND_R4, "ldind.r4", None, [1, 1], Other;
    0x4F => LDIND_R8, "ldind.r8", None, [1, 1], Other;
    0x50 => LDIND_REF, "ldind.ref", None, [1, 1], Other;
    0x51 => STIND_REF, "stind.ref", None, [2, 0], Other;
    0x52 => STIND_I1, "stind.i1", None, [2, 0], Other;
    0x53 => STIND_I2, "stind.i2", None, [2, 0], Other;
    0x54 => STIND_I4, "stind.i4", None, [2, 0], Other;
    0x55 => STIND_I8, "stind.i8", None, [2, 0], Other;
    0x56 => STIND_R4, "stind.r4", None, [2, 0], Other;
    0x57 => STIND_R8, "stind.r8", None, [2, 0], Other;
    0x58 => ADD, "add", None, [2, 1], Other;
    0x59 => SUB, "sub", None, [2, 1], Other;
    0x5A => MUL, "mul", None, [2, 1], Other;
    0x5B => DIV, "div", None, [2, 1], Other;
    0x5C => DIV_UN, "div.un", None, [2, 1], Other;
    0x5D => REM, "rem", None, [2, 1], Other;
    0x5E => REM_UN, "rem.un", None, [2, 1], Other;
    0x5F => AND, "and", None, [2, 1], Other;
    0x60 => OR, "or", None, [2, 1], Other;
    0x61 => XOR, "xor", None, [2, 1], Other;
    0x62 => SHL, "shl", None, [2, 1], Other;
    0x63 => SHR, "shr", None, [2, 1], Other;
    0x64 => SHR_UN, "shr.un", None, [2, 1], Other;
    0x65 => NEG, "neg", None, [1, 1], Other;
    0x66 => NOT, "not", None, [1, 1], Other;
    0x67 => CONV_I1, "conv.i1", None, [1, 1], Other;
    0x68 => CONV_I2, "conv.i2", None, [1, 1], Other;
    0x69 => CONV_I4, "conv.i4", None, [1, 1], Other;
    0x6A => CONV_I8, "conv.i8", None, [1, 1], Other;
    0x6B => CONV_R4, "conv.r4", None, [1, 1], Other;
    0x6C => CONV_R8, "conv.r8", None, [1, 1], Other;
    0x6D => CONV_U4, "conv.u4", None, [1, 1], Other;
    0x6E => CONV_U8, "conv.u8", None, [1, 1], Other;
    0x6F => CALLVIRT, "callvirt", Token, var, MethodCall;
    0x70 => CPOBJ, "cpobj", Token, [2, 0], TypeReference;
    0x71 => LDOBJ, "ldobj", Token, [1, 1], TypeReference;
    0x72 => LDSTR, "ldstr", Token, [0, 1], Other;
    0x73 => NEWOBJ, "newobj", Token, var, NewObject;
    0x74 => CASTCLASS, "castclass", Token, [1, 1], TypeReference;
    0x75 => ISINST, "isinst", Token, [1, 1], TypeReference;
    0x76 => CONV_R_UN, "conv.r.un", None, [1, 1], Other;
    0x79 => UNBOX, "unbox", Token, [1, 1], TypeReference;
    0x7A => THROW, "throw", None, [1, 0], Other;
    0x7B => LDFLD, "ldfld", Token, [1, 1], FieldLoad;
    0x7C => LDFLDA, "ldflda", Token, [1, 1], FieldAddress;
    0x7D => STFLD, "stfld", Token, [2, 0], FieldStore;
    0x7E => LDSFLD, "ldsfld", Token, [0, 1], FieldLoad;
    0x7F => LDSFLDA, "ldsflda", Token, [0, 1], FieldAddress;
    0x80 => STSFLD, "stsfld", Token, [1, 0], FieldStore;
    0x81 => STOBJ, "stobj", Token, [2, 0], TypeReference;
    0x82 => CONV_OVF_I1_UN, "conv.ovf.i1.un", None, [1, 1], Other;
    0x83 => CONV_OVF_I2_UN, "conv.ovf.i2.un", None, [1, 1], Other;
    0x84 => CONV_OVF_I4_UN, "conv.ovf.i4.un", None, [1, 1], Other;
    0x85 => CONV_OVF_I8_UN, "conv.ovf.i8.un", None, [1, 1], Other;
    0x86 => CONV_OVF_U1_UN, "conv.ovf.u1.un", None, [1, 1], Other;
    0x87 => CONV_OVF_U2_UN, "conv.ovf.u2.un", None, [1, 1], Other;
    0x88 => CONV_OVF_U4_UN, "conv.ovf.u4.un", None, [1, 1], Other;
    0x89 => CONV_OVF_U8_UN, "conv.ovf.u8.un", None, [1, 1], Other;
    0x8A => CONV_OVF_I_UN, "conv.ovf.i.un", None, [1, 1], Other;
    0x8B => CONV_OVF_U_UN, "conv.ovf.u.un", None, [1, 1], Other;
    0x8C => BOX, "box", Token, [1, 1], TypeReference;
    0x8D => NEWARR, "newarr", Token, [1, 1], TypeReference;
    0x8E => LDLEN, "ldlen", None, [1, 1], Other;
    0x8F => LDELEMA, "ldelema", Token, [2, 1], TypeReference;
    0x90 => LDELEM_I1, "ldelem.i1", None, [2, 1], Other;
    0x91 => LDELEM_U1, "ldelem.u1", None, [2, 1], Other;
    0x92 => LDELEM_I2, "ldelem.i2", None, [2, 1], Other;
    0x93 => LDELEM_U2, "ldelem.u2", None, [2, 1], Other;
    0x94 => LDELEM_I4, "ldelem.i4", None, [2, 1], Other;
    0x95 => LDELEM_U4, "ldelem.u4", None, [2, 1], Other;
    0x96 => LDELEM_I8, "ldelem.i8", None, [2, 1], Other;
    0x97 => LDELEM_I, "ldelem.i", None, [2, 1], Other;
    0x98 => LDELEM_R4, "ldelem.r4", None, [2, 1], Other;
    0x99 => LDELEM_R8, "ldelem.r8", None, [2, 1], Other;
    0x9A => LDELEM_REF, "ldelem.ref", None, [2, 1], Other;
    0x9B => STELEM_I, "stelem.i", None, [3, 0], Other;
    0x9C => STELEM_I1, "stelem.i1", None, [3, 0], Other;
    0x9D => STELEM_I2, "stelem.i2", None, [3, 0], Other;
    0x9E => STELEM_I4, "stelem.i4", None, [3, 0], Other;
    0x9F => STELEM_I8, "stelem.i8", None, [3, 0], Other;
    0xA0 => STELEM_R4, "stelem.r4", None, [3, 0], Other;
    0xA1 => STELEM_R8, "stelem.r8", None, [3, 0], Other;
    0xA2 => STELEM_REF, "stelem.ref", None, [3, 0], Other;
    0xA3 => LDELEM, "ldelem", Token, [2, 1], TypeReference;
    0xA4 => STELEM, "stelem", Token, [3, 0], TypeReference;
    0xA5 => UNBOX_ANY, "unbox.any", Token, [1, 1], TypeReference;
    0xB3 => CONV_OVF_I1, "conv.ovf.i1", None, [1, 1], Other;
    0xB4 => CONV_OVF_U1, "conv.ovf.u1", None, [1, 1], Other;
    0xB5 => CONV_OVF_I2, "conv.ovf.i2", None, [1, 1], Other;
    0xB6 => CONV_OVF_U2, "conv.ovf.u2", None, [1, 1], Other;
    0xB7 => CONV_OVF_I4, "conv.ovf.i4", None, [1, 1], Other;
    0xB8 => CONV_OVF_U4, "conv.ovf.u4", None, [1, 1], Other;
    0xB9 => CONV_OVF_I8, "conv.ovf.i8", None, [1, 1], Other;
    0xBA => CONV_OVF_U8, "conv.ovf.u8", None, [1, 1], Other;
    0xC2 => REFANYVAL, "refanyval", Token, [1, 1], TypeReference;
    0xC3 => CKFINITE, "ckfinite", None, [1, 1], Other;
    0xC6 => MKREFANY, "mkrefany", Token, [1, 1], TypeReference;
    0xD0 => LDTOKEN, "ldtoken", Token, [0, 1], TokenLoad;
    0xD1 => CONV_U2, "conv.u2", None, [1, 1], Other;
    0xD2 => CONV_U1, "conv.u1", None, [1, 1], Other;
    0xD3 => CONV_I, "conv.i", None, [1, 1], Other;
    0xD4 => CONV_OVF_I, "conv.ovf.i", None, [1, 1], Other;
    0xD5 => CONV_OVF_U, "conv.ovf.u", None, [1, 1], Other;
    0xD6 => ADD_OVF, "add.ovf", None, [2, 1], Other;
    0xD7 => ADD_OVF_UN, "add.ovf.un", None, [2, 1], Other;
    0xD8 => MUL_OVF, "mul.ovf", None, [2, 1], Other;
    0xD9 => MUL_OVF_UN, "mul.ovf.un", None, [2, 1], Other;
    0xDA => SUB_OVF, "sub.ovf", None, [2, 1], Other;
    0xDB => SUB_OVF_UN, "sub.ovf.un", None, [2, 1], Other;
    0xDC => ENDFINALLY, "endfinally", None, [0, 0], Other;
    0xDD => LEAVE, "leave", Int32, [0, 0], Other;
    0xDE => LEAVE_S, "leave.s", Int8, [0, 0], Other;
    0xDF => STIND_I, "stind.i", None, [2, 0], Other;
    0xE0 => CONV_U, "conv.u", None, [1, 1], Other;
    0xFE00 => ARGLIST, "arglist", None, [0, 1], Other;
    0xFE01 => CEQ, "ceq", None, [2, 1], Other;
    0xFE02 => CGT, "cgt", None, [2, 1], Other;
    0xFE03 => CGT_UN, "cgt.un", None, [2, 1], Other;
    0xFE04 => CLT, "clt", None, [2, 1], Other;
    0xFE05 => CLT_UN, "clt.un", None, [2, 1], Other;
    0xFE06 => LDFTN, "ldftn", Token, [0, 1], FunctionPointer;
    0xFE07 => LDVIRTFTN, "ldvirtftn", Token, [1, 1], FunctionPointer;
    0xFE09 => LDARG, "ldarg", UInt16, [0, 1], Other;
    0xFE0A => LDARGA, "ldarga", UInt16, [0, 1], Other;
    0xFE0B => STARG, "starg", UInt16, [1, 0], Other;
    0xFE0C => LDLOC, "ldloc", UInt16, [0, 1], Other;
    0xFE0D => LDLOCA, "ldloca", UInt16, [0, 1], Other;
    0xFE0E => STLOC, "stloc", UInt16, [1, 0], Other;
    0xFE0F => LOCALLOC, "localloc", None, [1, 1], Other;
    0xFE11 => ENDFILTER, "endfilter", None, [1, 0], Other;
    0xFE12 => UNALIGNED, "unaligned.", UInt8, [0, 0], Other;
    0xFE13 => VOLATILE, "volatile.", None, [0, 0], Other;
    0xFE14 => TAIL, "tail.", None, [0, 0], Other;
    0xFE15 => INITOBJ, "initobj", Token, [1, 0], TypeReference;
    0xFE16 => CONSTRAINED, "constrained.", Token, [0, 0], TypeReference;
    0xFE17 => CPBLK, "cpblk", None, [3, 0], Other;
    0xFE18 => INITBLK, "initblk", None, [3, 0], Other;
    0xFE19 => NO, "no.", UInt8, [0, 0], Other;
    0xFE1A => RETHROW, "rethrow", None, [0, 0], Other;
    0xFE1C => SIZEOF, "sizeof", Token, [0, 1], TypeReference;
    0xFE1D => REFANYTYPE, "refanytype", None, [1, 1], Other;
    0xFE1E => READONLY, "readonly.", None, [0, 0], Other;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_one_and_two_byte() {
        let ldfld = OpCode::LDFLD.info().unwrap();
        assert_eq!(ldfld.mnemonic, "ldfld");
        assert_eq!(ldfld.operand, OperandType::Token);
        assert_eq!(ldfld.kind, OperationKind::FieldLoad);
        assert_eq!(ldfld.stack, Some(StackEffect::new(1, 1)));

        let ldftn = OpCode::LDFTN.info().unwrap();
        assert_eq!(ldftn.kind, OperationKind::FunctionPointer);
        assert!(OpCode::LDFTN.is_two_byte());
        assert_eq!(OpCode::LDFTN.size(), 2);
    }

    #[test]
    fn unassigned_opcodes() {
        for code in [0x24_u16, 0x77, 0x78, 0xA6, 0xBB, 0xE1, 0xFE08, 0xFE10, 0xFE1B, 0xFE1F] {
            assert!(OpCode(code).info().is_none(), "{code:#x} should be unassigned");
        }
        assert_eq!(OpCode(0x24).mnemonic(), "??");
    }

    #[test]
    fn encode_opcode_bytes() {
        let mut out = Vec::new();
        OpCode::CALLVIRT.encode(&mut out);
        OpCode::CEQ.encode(&mut out);
        assert_eq!(out, [0x6F, 0xFE, 0x01]);
    }

    #[test]
    fn call_like_opcodes_have_operand_dependent_stack() {
        for opcode in [OpCode::CALL, OpCode::CALLVIRT, OpCode::NEWOBJ, OpCode::RET] {
            assert_eq!(opcode.info().unwrap().stack, None, "{opcode}");
        }
        assert_eq!(OperationKind::MethodCall.to_string(), "method-call");
    }
}
