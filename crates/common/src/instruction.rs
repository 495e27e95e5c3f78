//! Typed instructions.
//!
//! An [`Instruction`] is an opcode together with exactly `opcode.arity()`
//! operands. The arity is checked once, when the instruction is built, so
//! the VM never has to guess where one instruction ends and the next
//! begins.

use std::fmt;

use crate::address::Label;
use crate::error::InstructionError;
use crate::opcode::Opcode;
use crate::operand::Operand;
use crate::syscall::{Stream, SystemCall};

/// A single Kestrel instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    opcode: Opcode,
    operands: Vec<Operand>,
}

impl Instruction {
    /// Build an instruction, checking the operand count against the arity.
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Result<Self, InstructionError> {
        if operands.len() != opcode.arity() {
            return Err(InstructionError::ArityMismatch {
                opcode,
                expected: opcode.arity(),
                found: operands.len(),
            });
        }
        Ok(Self { opcode, operands })
    }

    // Infallible builders. Each one matches its opcode's arity by
    // construction.

    fn nullary(opcode: Opcode) -> Self {
        Self {
            opcode,
            operands: Vec::new(),
        }
    }

    fn unary(opcode: Opcode, a: Operand) -> Self {
        Self {
            opcode,
            operands: vec![a],
        }
    }

    fn binary(opcode: Opcode, a: Operand, b: Operand) -> Self {
        Self {
            opcode,
            operands: vec![a, b],
        }
    }

    pub fn nop() -> Self {
        Self::nullary(Opcode::Nop)
    }

    pub fn exit() -> Self {
        Self::nullary(Opcode::Exit)
    }

    pub fn ret() -> Self {
        Self::nullary(Opcode::Ret)
    }

    pub fn mov(dest: impl Into<Operand>, src: impl Into<Operand>) -> Self {
        Self::binary(Opcode::Mov, dest.into(), src.into())
    }

    pub fn push(src: impl Into<Operand>) -> Self {
        Self::unary(Opcode::Push, src.into())
    }

    pub fn pop(dest: impl Into<Operand>) -> Self {
        Self::unary(Opcode::Pop, dest.into())
    }

    pub fn call(target: Label) -> Self {
        Self::unary(Opcode::Call, Operand::Label(target))
    }

    pub fn jmp(target: Label) -> Self {
        Self::unary(Opcode::Jmp, Operand::Label(target))
    }

    pub fn jump_if_zero(target: Label) -> Self {
        Self::unary(Opcode::JumpIfZero, Operand::Label(target))
    }

    pub fn jump_if_not_zero(target: Label) -> Self {
        Self::unary(Opcode::JumpIfNotZero, Operand::Label(target))
    }

    pub fn add(dest: impl Into<Operand>, src: impl Into<Operand>) -> Self {
        Self::binary(Opcode::Add, dest.into(), src.into())
    }

    pub fn sub(dest: impl Into<Operand>, src: impl Into<Operand>) -> Self {
        Self::binary(Opcode::Sub, dest.into(), src.into())
    }

    pub fn eq(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::binary(Opcode::Eq, lhs.into(), rhs.into())
    }

    pub fn ne(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::binary(Opcode::Ne, lhs.into(), rhs.into())
    }

    pub fn lt(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::binary(Opcode::Lt, lhs.into(), rhs.into())
    }

    pub fn le(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::binary(Opcode::Le, lhs.into(), rhs.into())
    }

    /// `syscall write stream value`
    pub fn write(stream: Stream, value: impl Into<Operand>) -> Self {
        Self {
            opcode: Opcode::Syscall,
            operands: vec![
                Operand::SystemCall(SystemCall::Write),
                Operand::Stream(stream),
                value.into(),
            ],
        }
    }

    /// The operation to perform.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// The operands, exactly `opcode().arity()` of them.
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Number of cells this instruction occupies in a flat encoding.
    pub fn width(&self) -> usize {
        1 + self.operands.len()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::FrameOffset;
    use crate::opcode::ALL_OPCODES;
    use crate::register::Register;
    use crate::value::Value;

    #[test]
    fn new_checks_arity() {
        let err = Instruction::new(Opcode::Mov, vec![Operand::Register(Register::General1)])
            .unwrap_err();
        assert_eq!(
            err,
            InstructionError::ArityMismatch {
                opcode: Opcode::Mov,
                expected: 2,
                found: 1
            }
        );
        assert!(Instruction::new(Opcode::Ret, vec![]).is_ok());
    }

    #[test]
    fn builders_match_arity() {
        let built = [
            Instruction::nop(),
            Instruction::exit(),
            Instruction::ret(),
            Instruction::mov(Register::General1, Value::Integer(1)),
            Instruction::push(Register::BasePointer),
            Instruction::pop(Register::General2),
            Instruction::call(Label::function(1)),
            Instruction::jmp(Label::local(0, 1)),
            Instruction::jump_if_zero(Label::local(0, 2)),
            Instruction::jump_if_not_zero(Label::local(0, 3)),
            Instruction::add(Register::StackPointer, Value::Integer(2)),
            Instruction::sub(Register::StackPointer, Value::Integer(2)),
            Instruction::eq(Register::General1, Register::General2),
            Instruction::ne(Register::General1, Register::General2),
            Instruction::lt(Register::General1, Register::General2),
            Instruction::le(Register::General1, Register::General2),
            Instruction::write(Stream::StdOut, Value::character('a')),
        ];
        for instr in &built {
            assert_eq!(instr.operands().len(), instr.opcode().arity(), "{instr}");
        }
        // Every opcode has a builder above.
        for op in ALL_OPCODES {
            assert!(built.iter().any(|i| i.opcode() == op), "{op:?} not covered");
        }
    }

    #[test]
    fn width_counts_opcode_cell() {
        assert_eq!(Instruction::ret().width(), 1);
        assert_eq!(Instruction::push(Value::Integer(1)).width(), 2);
        assert_eq!(Instruction::mov(FrameOffset::bp(-1), FrameOffset::bp(2)).width(), 3);
    }

    #[test]
    fn display() {
        assert_eq!(
            Instruction::mov(FrameOffset::bp(-1), FrameOffset::bp(2)).to_string(),
            "mov [bp-1], [bp+2]"
        );
        assert_eq!(Instruction::ret().to_string(), "ret");
        assert_eq!(
            Instruction::write(Stream::StdOut, Value::character('h')).to_string(),
            "syscall write, stdout, 'h'"
        );
    }
}
