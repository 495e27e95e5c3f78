//! Errors raised while building instructions.

use thiserror::Error;

use crate::opcode::Opcode;

/// Errors that occur when an instruction is assembled from parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    /// The operand count does not match the opcode's arity.
    #[error("{opcode} expects {expected} operand(s), got {found}")]
    ArityMismatch {
        opcode: Opcode,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_arity_mismatch() {
        assert_eq!(
            InstructionError::ArityMismatch {
                opcode: Opcode::Mov,
                expected: 2,
                found: 1
            }
            .to_string(),
            "mov expects 2 operand(s), got 1"
        );
    }
}
