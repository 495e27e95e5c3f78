//! Kestrel virtual machine: executes generated bytecode programs.
//!
//! The VM is a register/stack machine with:
//! - A small fixed register file (`pc`, `bp`, `sp`, flags, accumulators,
//!   scratch registers)
//! - A bounded downward-growing stack holding values and return addresses
//! - A bounded flat memory
//! - A label table resolved once, before execution
//!
//! # Usage
//!
//! ```
//! use kestrel_common::{Instruction, Label, Program, Register, Value};
//! use kestrel_vm::Runtime;
//!
//! let mut program = Program::default();
//! program.def_label(Label::function(0));
//! program.push(Instruction::mov(Register::Accumulator1, Value::Integer(42)));
//! program.push(Instruction::ret());
//!
//! let mut rt = Runtime::new(16, 0);
//! rt.load(program);
//! rt.collect_labels().unwrap();
//! rt.run().unwrap();
//! assert_eq!(rt.status(), Value::Integer(42));
//! ```

pub mod config;
pub mod error;
pub mod execute;
pub mod labels;
pub mod machine;
pub mod memory;

pub use config::{RuntimeConfig, DEFAULT_MEMORY_SIZE, DEFAULT_STACK_SIZE};
pub use error::{ErrorCategory, RuntimeError};
pub use labels::LabelTable;
pub use machine::{RegisterFile, Runtime, Slot};
pub use memory::Memory;

use kestrel_common::{Program, Value};

/// Load, resolve and run a program with the given configuration, returning
/// the primary accumulator.
///
/// # Errors
///
/// Returns [`RuntimeError`] if label resolution or execution fails.
pub fn run(program: Program, config: RuntimeConfig) -> Result<Value, RuntimeError> {
    let mut rt = Runtime::with_config(config);
    rt.load(program);
    rt.collect_labels()?;
    rt.run()?;
    Ok(rt.status())
}
