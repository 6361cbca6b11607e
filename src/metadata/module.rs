//! The binary module handed over by the loader, and its header metadata.

use bitflags::bitflags;
use strum::{Display, EnumIter, FromRepr};

use crate::metadata::table::ReferenceTable;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// CLI header flags (ECMA-335 II.25.3.3.1)
    pub struct CorFlags: u32 {
        /// Image contains only IL code
        const ILONLY = 0x0000_0001;
        /// Image can only be loaded into a 32-bit process
        const REQUIRED_32BIT = 0x0000_0002;
        /// Image is an IL library
        const IL_LIBRARY = 0x0000_0004;
        /// Image is strong-name signed
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// Entry point is native code
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// Debug data is tracked
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// Image prefers to run in a 32-bit process
        const PREFERRED_32BIT = 0x0002_0000;
    }
}

/// PE machine type of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u16)]
pub enum Machine {
    /// x86, also used by `AnyCPU` IL-only images
    I386 = 0x014C,
    /// 32-bit ARM
    Arm = 0x01C4,
    /// x64
    Amd64 = 0x8664,
    /// 64-bit ARM
    Arm64 = 0xAA64,
}

impl Machine {
    /// Native pointer width of the machine
    #[must_use]
    pub fn width(self) -> TargetWidth {
        match self {
            Machine::I386 | Machine::Arm => TargetWidth::Bits32,
            Machine::Amd64 | Machine::Arm64 => TargetWidth::Bits64,
        }
    }
}

/// Processor width a process runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TargetWidth {
    /// 32-bit process
    #[strum(serialize = "32-bit")]
    Bits32,
    /// 64-bit process
    #[strum(serialize = "64-bit")]
    Bits64,
}

/// Module-level metadata describing what process width the image can run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleHeader {
    /// PE machine type
    pub machine: Machine,
    /// CLI header flags
    pub flags: CorFlags,
}

impl ModuleHeader {
    /// Header of a plain `AnyCPU` IL-only library
    #[must_use]
    pub fn any_cpu() -> Self {
        ModuleHeader {
            machine: Machine::I386,
            flags: CorFlags::ILONLY,
        }
    }

    /// Returns `true` if the image contains no native code
    #[must_use]
    pub fn is_il_only(&self) -> bool {
        self.flags.contains(CorFlags::ILONLY)
    }

    /// The width this image insists on, or `None` if it runs at whatever the host uses.
    #[must_use]
    pub fn required_width(&self) -> Option<TargetWidth> {
        if self.machine.width() == TargetWidth::Bits64 {
            return Some(TargetWidth::Bits64);
        }

        let pinned_32 = self
            .flags
            .intersects(CorFlags::REQUIRED_32BIT | CorFlags::PREFERRED_32BIT);
        if pinned_32 || !self.is_il_only() {
            Some(TargetWidth::Bits32)
        } else {
            None
        }
    }

    /// Returns `true` if the image can run in a process of the given width
    #[must_use]
    pub fn runs_at(&self, width: TargetWidth) -> bool {
        self.required_width().map_or(true, |required| required == width)
    }
}

impl Default for ModuleHeader {
    fn default() -> Self {
        Self::any_cpu()
    }
}

/// A method defined by the module, with its raw CIL body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    /// Full name of the declaring type
    pub declaring_type: String,
    /// Method name
    pub name: String,
    /// Raw CIL instruction stream (without method header)
    pub code: Vec<u8>,
}

impl MethodDef {
    /// Creates a new method definition
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>, code: Vec<u8>) -> Self {
        MethodDef {
            declaring_type: declaring_type.into(),
            name: name.into(),
            code,
        }
    }

    /// `Type::Method` form used in diagnostics
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.declaring_type, self.name)
    }
}

/// A loaded extension's compiled code unit.
///
/// Constructed by the host's loader (or [`BinaryModule::from_bytes`]) and borrowed
/// mutably by one rewrite pass at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryModule {
    pub(crate) name: String,
    pub(crate) header: ModuleHeader,
    pub(crate) references: ReferenceTable,
    pub(crate) methods: Vec<MethodDef>,
}

impl BinaryModule {
    /// Creates a module without methods
    pub fn new(name: impl Into<String>, header: ModuleHeader, references: ReferenceTable) -> Self {
        BinaryModule {
            name: name.into(),
            header,
            references,
            methods: Vec::new(),
        }
    }

    /// Module identity
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module header
    #[must_use]
    pub fn header(&self) -> &ModuleHeader {
        &self.header
    }

    /// External references used by the method bodies
    #[must_use]
    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    /// Mutable access to the reference table, for loaders assembling a module
    pub fn references_mut(&mut self) -> &mut ReferenceTable {
        &mut self.references
    }

    /// Method definitions in declaration order
    #[must_use]
    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Appends a method definition
    pub fn add_method(&mut self, method: MethodDef) {
        self.methods.push(method);
    }

    /// Looks up a method by declaring type and name
    #[must_use]
    pub fn method(&self, declaring_type: &str, name: &str) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.declaring_type == declaring_type && m.name == name)
    }
}
