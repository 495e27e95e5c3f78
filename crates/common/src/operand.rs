//! Instruction operands.

use std::fmt;

use crate::address::{AbsoluteAddress, FrameOffset, Label};
use crate::register::Register;
use crate::syscall::{Stream, SystemCall};
use crate::value::Value;

/// Anything that can appear as an instruction argument.
///
/// Which kinds are legal depends on the opcode and the operand position;
/// the VM rejects the rest as type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Register(Register),
    /// A literal value.
    Value(Value),
    /// An unresolved jump target.
    Label(Label),
    /// A stack cell relative to `bp` or `sp`.
    Frame(FrameOffset),
    /// A resolved program-counter index.
    Address(AbsoluteAddress),
    /// System call number (first operand of `Syscall`).
    SystemCall(SystemCall),
    /// Standard stream selector (second operand of `Syscall`).
    Stream(Stream),
}

impl Operand {
    /// Short name of the operand kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operand::Register(_) => "register",
            Operand::Value(_) => "value",
            Operand::Label(_) => "label",
            Operand::Frame(_) => "frame offset",
            Operand::Address(_) => "address",
            Operand::SystemCall(_) => "syscall",
            Operand::Stream(_) => "stream",
        }
    }
}

impl From<Register> for Operand {
    fn from(r: Register) -> Self {
        Operand::Register(r)
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Label> for Operand {
    fn from(l: Label) -> Self {
        Operand::Label(l)
    }
}

impl From<FrameOffset> for Operand {
    fn from(o: FrameOffset) -> Self {
        Operand::Frame(o)
    }
}

impl From<AbsoluteAddress> for Operand {
    fn from(a: AbsoluteAddress) -> Self {
        Operand::Address(a)
    }
}

impl From<SystemCall> for Operand {
    fn from(s: SystemCall) -> Self {
        Operand::SystemCall(s)
    }
}

impl From<Stream> for Operand {
    fn from(s: Stream) -> Self {
        Operand::Stream(s)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{r}"),
            Operand::Value(Value::Character(c)) => match u32::try_from(*c)
                .ok()
                .and_then(char::from_u32)
            {
                Some(ch) => write!(f, "{ch:?}"),
                None => write!(f, "char({c})"),
            },
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Label(l) => write!(f, "{l}"),
            Operand::Frame(o) => write!(f, "{o}"),
            Operand::Address(a) => write!(f, "{a}"),
            Operand::SystemCall(s) => write!(f, "{s}"),
            Operand::Stream(s) => write!(f, "{s}"),
        }
    }
}
