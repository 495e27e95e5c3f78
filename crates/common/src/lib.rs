//! Kestrel common types.
//!
//! This crate provides the data model shared by the code generator and the
//! virtual machine:
//!
//! - [`Value`]: tagged runtime values with a scalar projection
//! - [`Register`]: the closed register set
//! - [`Label`], [`FrameOffset`], [`AbsoluteAddress`]: the addressing model
//! - [`Operand`]: anything that can appear as an instruction argument
//! - [`Opcode`]: the instruction set, with per-opcode arity
//! - [`Instruction`]: an opcode plus exactly `arity` operands
//! - [`Program`]: the emitted cell stream (instructions and label markers)

pub mod address;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod operand;
pub mod program;
pub mod register;
pub mod syscall;
pub mod value;

// Re-export commonly used types at the crate root.
pub use address::{AbsoluteAddress, FrameBase, FrameOffset, Label, ENTRY_LABEL, MAIN_LABEL};
pub use error::InstructionError;
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use operand::Operand;
pub use program::{Cell, Program};
pub use register::Register;
pub use syscall::{Stream, SystemCall};
pub use value::Value;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy that generates a random Opcode.
    fn arb_opcode() -> impl Strategy<Value = Opcode> {
        prop::sample::select(&opcode::ALL_OPCODES[..])
    }

    /// Strategy that generates a random Value.
    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::Integer),
            any::<i32>().prop_map(Value::Character),
            any::<bool>().prop_map(Value::Bool),
            Just(Value::Null),
            any::<i64>().prop_map(Value::ListHandle),
        ]
    }

    proptest! {
        /// `Instruction::new` accepts exactly the opcode's arity.
        #[test]
        fn new_accepts_only_arity(op in arb_opcode(), n in 0usize..5) {
            let operands = vec![Operand::Value(Value::Null); n];
            let built = Instruction::new(op, operands);
            prop_assert_eq!(built.is_ok(), n == op.arity());
        }

        /// Equal values always have equal scalars and equal tags.
        #[test]
        fn equality_implies_same_tag_and_scalar(a in arb_value(), b in arb_value()) {
            if a == b {
                prop_assert_eq!(a.scalar(), b.scalar());
                prop_assert_eq!(a.tag_name(), b.tag_name());
            }
        }

        /// An integer and a character never compare equal, whatever the scalar.
        #[test]
        fn integer_never_equals_character(n in any::<i32>()) {
            prop_assert_ne!(Value::Integer(n as i64), Value::Character(n));
        }
    }
}
