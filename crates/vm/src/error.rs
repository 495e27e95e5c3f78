//! Runtime errors for the Kestrel VM.
//!
//! Errors raised while executing carry the instruction index (`at`) of the
//! instruction that failed. Every error aborts the run; nothing is retried.

use kestrel_common::{Label, Opcode, Register};
use thiserror::Error;

/// Broad classification of a [`RuntimeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Duplicate, missing or uncollected labels.
    Resolution,
    /// Operand kind or value tag does not fit the opcode.
    Type,
    /// Stack, memory or step budget exhausted.
    Resource,
    /// Failure writing to a standard stream.
    Io,
}

/// Errors that occur while resolving labels or executing a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// A label marker appears twice, or `collect_labels` ran twice.
    #[error("label {label} is already defined")]
    DuplicateLabel { label: Label },

    /// A jump or call targets a label with no definition.
    #[error("undefined label {label} at instruction {at}")]
    UndefinedLabel { at: usize, label: Label },

    /// `run` was called before `collect_labels` registered the entry label.
    #[error("entry label not resolved; collect labels before running")]
    LabelsNotCollected,

    /// An operand kind the opcode does not accept in that position.
    #[error("{opcode} does not accept a {found} as operand {position} at instruction {at}")]
    InvalidOperand {
        at: usize,
        opcode: Opcode,
        position: usize,
        found: &'static str,
    },

    /// Arithmetic on values that are not both integer-tagged.
    #[error("{opcode} needs two integers, got {lhs} and {rhs} at instruction {at}")]
    NotIntegers {
        at: usize,
        opcode: Opcode,
        lhs: &'static str,
        rhs: &'static str,
    },

    /// `ret` popped something other than a return address.
    #[error("ret expected a return address, found {found} at instruction {at}")]
    ReturnAddressExpected { at: usize, found: &'static str },

    /// A return address was read where a value is required.
    #[error("return address used as a value at instruction {at}")]
    AddressAsValue { at: usize },

    /// A machine register holds something that is not a usable index.
    #[error("register {register} holds an invalid index at instruction {at}")]
    InvalidRegister { at: usize, register: Register },

    /// The instruction's operand count does not match its opcode.
    #[error("{opcode} with {found} operand(s) at instruction {at}")]
    ArityMismatch {
        at: usize,
        opcode: Opcode,
        found: usize,
    },

    /// The stack pointer was driven below 0.
    #[error("stack overflow (stack size {stack_size}) at instruction {at}")]
    StackOverflow { at: usize, stack_size: usize },

    /// Pop on an empty stack.
    #[error("stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    /// A frame offset resolved outside the stack.
    #[error("frame cell {index} outside stack of {stack_size} at instruction {at}")]
    FrameOutOfBounds {
        at: usize,
        index: i64,
        stack_size: usize,
    },

    /// Flat memory access outside its capacity.
    #[error("memory address {address} out of range (size {size})")]
    MemoryOutOfBounds { address: usize, size: usize },

    /// The configured step budget ran out before the program exited.
    #[error("step budget of {budget} instructions exhausted")]
    StepBudgetExhausted { budget: u64 },

    /// The program counter points past the end of the program.
    #[error("program counter out of range at instruction {at}")]
    ProgramCounterOutOfRange { at: usize },

    /// `syscall write` targeted standard input.
    #[error("cannot write to stdin at instruction {at}")]
    WriteToStdin { at: usize },

    /// Writing to a standard stream failed.
    #[error("write failed at instruction {at}: {message}")]
    Io { at: usize, message: String },
}

impl RuntimeError {
    /// Which class of failure this is.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RuntimeError::DuplicateLabel { .. }
            | RuntimeError::UndefinedLabel { .. }
            | RuntimeError::LabelsNotCollected => ErrorCategory::Resolution,

            RuntimeError::InvalidOperand { .. }
            | RuntimeError::NotIntegers { .. }
            | RuntimeError::ReturnAddressExpected { .. }
            | RuntimeError::AddressAsValue { .. }
            | RuntimeError::InvalidRegister { .. }
            | RuntimeError::ArityMismatch { .. } => ErrorCategory::Type,

            RuntimeError::StackOverflow { .. }
            | RuntimeError::StackUnderflow { .. }
            | RuntimeError::FrameOutOfBounds { .. }
            | RuntimeError::MemoryOutOfBounds { .. }
            | RuntimeError::StepBudgetExhausted { .. }
            | RuntimeError::ProgramCounterOutOfRange { .. } => ErrorCategory::Resource,

            RuntimeError::WriteToStdin { .. } | RuntimeError::Io { .. } => ErrorCategory::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        assert_eq!(
            RuntimeError::DuplicateLabel {
                label: Label::function(0)
            }
            .to_string(),
            "label l_0 is already defined"
        );
        assert_eq!(
            RuntimeError::StackOverflow {
                at: 4,
                stack_size: 2
            }
            .to_string(),
            "stack overflow (stack size 2) at instruction 4"
        );
        assert_eq!(
            RuntimeError::InvalidOperand {
                at: 1,
                opcode: Opcode::Pop,
                position: 0,
                found: "value"
            }
            .to_string(),
            "pop does not accept a value as operand 0 at instruction 1"
        );
    }

    #[test]
    fn categories() {
        assert_eq!(
            RuntimeError::LabelsNotCollected.category(),
            ErrorCategory::Resolution
        );
        assert_eq!(
            RuntimeError::ReturnAddressExpected {
                at: 0,
                found: "integer"
            }
            .category(),
            ErrorCategory::Type
        );
        assert_eq!(
            RuntimeError::StackOverflow {
                at: 0,
                stack_size: 1
            }
            .category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            RuntimeError::WriteToStdin { at: 0 }.category(),
            ErrorCategory::Io
        );
    }
}
