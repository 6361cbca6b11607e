//! Method bodies as decoded instruction lists.

use crate::assembly::instruction::Instruction;

/// The decoded instruction list of one method definition.
///
/// Instructions are replaced in place by the rewrite pass, never inserted, removed or
/// reordered, so offsets and branch targets stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Index of the method definition within the module
    pub method_index: usize,
    /// Full name of the declaring type
    pub declaring_type: String,
    /// Method name
    pub name: String,
    /// Decoded instructions in stream order
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    /// `Type::Method` form used in reports and logs
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.declaring_type, self.name)
    }

    /// Total encoded size of the body
    #[must_use]
    pub fn code_size(&self) -> usize {
        self.instructions.iter().map(Instruction::size).sum()
    }

    /// Returns `true` if any instruction was replaced by a rewrite
    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        self.instructions.iter().any(Instruction::is_rewritten)
    }
}
