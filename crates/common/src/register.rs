//! The VM register file layout.

use std::fmt;

/// A machine register. Registers hold [`Value`](crate::Value)s.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    /// Index of the next instruction to execute.
    ProgramCounter = 0,
    /// Base of the current call frame.
    BasePointer = 1,
    /// Top of the stack. The stack grows downward.
    StackPointer = 2,
    /// Set by comparison opcodes, read by conditional jumps.
    ZeroFlag = 3,
    /// The dispatch loop stops once this holds `true`.
    ExitFlag = 4,
    /// First return value.
    Accumulator1 = 5,
    /// Second return value.
    Accumulator2 = 6,
    /// Scratch register, left operand of generated binary operations.
    General1 = 7,
    /// Scratch register, right operand of generated binary operations.
    General2 = 8,
    /// Sink for values that are popped only to be discarded.
    Temporary = 9,
}

/// Number of registers in the register file.
pub const REGISTER_COUNT: usize = 10;

/// All registers, in index order.
pub const ALL_REGISTERS: [Register; REGISTER_COUNT] = [
    Register::ProgramCounter,
    Register::BasePointer,
    Register::StackPointer,
    Register::ZeroFlag,
    Register::ExitFlag,
    Register::Accumulator1,
    Register::Accumulator2,
    Register::General1,
    Register::General2,
    Register::Temporary,
];

impl Register {
    /// Slot of this register in the register file.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Assembly name of the register.
    pub fn name(self) -> &'static str {
        match self {
            Register::ProgramCounter => "pc",
            Register::BasePointer => "bp",
            Register::StackPointer => "sp",
            Register::ZeroFlag => "zf",
            Register::ExitFlag => "ef",
            Register::Accumulator1 => "acm1",
            Register::Accumulator2 => "acm2",
            Register::General1 => "r1",
            Register::General2 => "r2",
            Register::Temporary => "tmp",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense() {
        for (i, reg) in ALL_REGISTERS.iter().enumerate() {
            assert_eq!(reg.index(), i, "{reg:?} out of order");
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = ALL_REGISTERS.iter().map(|r| r.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REGISTER_COUNT);
    }
}
