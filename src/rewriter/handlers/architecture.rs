//! Adapts a module's header to the processor width of the host process.

use log::debug;

use crate::{
    metadata::{CorFlags, ModuleHeader, TargetWidth},
    rewriter::{
        classification::Classification,
        handler::{Handler, HandlerKind, ModuleOutcome},
    },
    Result,
};

/// Clears the 32-bit requirement of IL-only images so they run in a 64-bit host.
///
/// IL-only images are width-agnostic apart from the `32BITREQUIRED` / `32BITPREFERRED`
/// flags, which can simply be dropped. Images containing native code are compiled for
/// one machine and cannot be adapted; they are flagged
/// [`Classification::ArchitectureRewriteFailed`], which always blocks loading.
pub struct ArchitectureRewriter {
    target: TargetWidth,
}

impl ArchitectureRewriter {
    /// Creates a rewriter for a host running at `target` width
    #[must_use]
    pub fn new(target: TargetWidth) -> Self {
        ArchitectureRewriter { target }
    }
}

impl Handler for ArchitectureRewriter {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Environment
    }

    fn description(&self) -> &'static str {
        "Adapts the module header to the host's processor width"
    }

    fn is_module_level(&self) -> bool {
        true
    }

    fn examine_module(&self, header: &mut ModuleHeader) -> Result<ModuleOutcome> {
        if header.runs_at(self.target) {
            return Ok(ModuleOutcome::Continue);
        }

        let pinned_32 = CorFlags::REQUIRED_32BIT | CorFlags::PREFERRED_32BIT;
        if self.target == TargetWidth::Bits64
            && header.is_il_only()
            && header.machine.width() == TargetWidth::Bits32
        {
            header.flags.remove(pinned_32);
            debug!(
                "Cleared 32-bit flags of IL-only image, now {:?}",
                header.flags
            );
            return Ok(ModuleOutcome::Rewritten);
        }

        debug!(
            "{} image ({:?}) cannot run in a {} host",
            header.machine, header.flags, self.target
        );
        Ok(ModuleOutcome::Flag(Classification::ArchitectureRewriteFailed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Machine;

    #[test]
    fn any_cpu_untouched() {
        let mut header = ModuleHeader::any_cpu();
        let outcome = ArchitectureRewriter::new(TargetWidth::Bits64)
            .examine_module(&mut header)
            .unwrap();

        assert_eq!(outcome, ModuleOutcome::Continue);
        assert_eq!(header, ModuleHeader::any_cpu());
    }

    #[test]
    fn clears_32bit_flags_on_il_only() {
        let mut header = ModuleHeader {
            machine: Machine::I386,
            flags: CorFlags::ILONLY | CorFlags::REQUIRED_32BIT | CorFlags::STRONG_NAME_SIGNED,
        };
        let outcome = ArchitectureRewriter::new(TargetWidth::Bits64)
            .examine_module(&mut header)
            .unwrap();

        assert_eq!(outcome, ModuleOutcome::Rewritten);
        assert_eq!(
            header.flags,
            CorFlags::ILONLY | CorFlags::STRONG_NAME_SIGNED
        );
        assert!(header.runs_at(TargetWidth::Bits64));
    }

    #[test]
    fn mixed_mode_fails() {
        let mut header = ModuleHeader {
            machine: Machine::I386,
            flags: CorFlags::empty(),
        };
        let before = header;
        let outcome = ArchitectureRewriter::new(TargetWidth::Bits64)
            .examine_module(&mut header)
            .unwrap();

        assert_eq!(
            outcome,
            ModuleOutcome::Flag(Classification::ArchitectureRewriteFailed)
        );
        assert_eq!(header, before);
    }

    #[test]
    fn x64_image_in_32bit_host_fails() {
        let mut header = ModuleHeader {
            machine: Machine::Amd64,
            flags: CorFlags::ILONLY,
        };
        let outcome = ArchitectureRewriter::new(TargetWidth::Bits32)
            .examine_module(&mut header)
            .unwrap();

        assert_eq!(
            outcome,
            ModuleOutcome::Flag(Classification::ArchitectureRewriteFailed)
        );
    }
}
