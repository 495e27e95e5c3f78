//! Opcode definitions for the Kestrel instruction set.

use std::fmt;

/// Identifies the operation to perform.
///
/// Every opcode has a fixed arity: the number of operands that follow it.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation.
    Nop = 0x00,
    /// Set the exit flag; the dispatch loop stops on its next iteration.
    Exit = 0x01,

    // Data movement
    /// `mov dest src`: copy `src` into a register or frame cell.
    Mov = 0x10,
    /// `push src`: decrement `sp`, store `src` at the new top.
    Push = 0x11,
    /// `pop dest`: move the top of stack into `dest`, increment `sp`.
    Pop = 0x12,

    // Calls
    /// `call label`: push the return address, jump to `label`.
    Call = 0x20,
    /// `ret`: pop a return address and jump to it.
    Ret = 0x21,

    // Arithmetic
    /// `add dest src`: integer `dest += src`.
    Add = 0x30,
    /// `sub dest src`: integer `dest -= src`.
    Sub = 0x31,

    // Jumps
    /// `jmp label`: unconditional jump.
    Jmp = 0x40,
    /// `jz label`: jump if the zero flag is true.
    JumpIfZero = 0x41,
    /// `jnz label`: jump if the zero flag is false.
    JumpIfNotZero = 0x42,

    // Comparison (result in the zero flag)
    /// Tag and value equality.
    Eq = 0x50,
    /// Tag or value inequality.
    Ne = 0x51,
    /// Scalar `<`.
    Lt = 0x52,
    /// Scalar `<=`.
    Le = 0x53,

    /// `syscall number stream value`.
    Syscall = 0x60,
}

/// All opcodes, in definition order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 17] = [
    Opcode::Nop,
    Opcode::Exit,
    Opcode::Mov,
    Opcode::Push,
    Opcode::Pop,
    Opcode::Call,
    Opcode::Ret,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Jmp,
    Opcode::JumpIfZero,
    Opcode::JumpIfNotZero,
    Opcode::Eq,
    Opcode::Ne,
    Opcode::Lt,
    Opcode::Le,
    Opcode::Syscall,
];

impl Opcode {
    /// Number of operands that follow this opcode.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Nop | Opcode::Exit | Opcode::Ret => 0,
            Opcode::Push
            | Opcode::Pop
            | Opcode::Call
            | Opcode::Jmp
            | Opcode::JumpIfZero
            | Opcode::JumpIfNotZero => 1,
            Opcode::Mov
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Lt
            | Opcode::Le => 2,
            Opcode::Syscall => 3,
        }
    }

    /// Returns the assembly mnemonic for this opcode.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Exit => "exit",
            Opcode::Mov => "mov",
            Opcode::Push => "push",
            Opcode::Pop => "pop",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Jmp => "jmp",
            Opcode::JumpIfZero => "jz",
            Opcode::JumpIfNotZero => "jnz",
            Opcode::Eq => "eq",
            Opcode::Ne => "ne",
            Opcode::Lt => "lt",
            Opcode::Le => "le",
            Opcode::Syscall => "syscall",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
