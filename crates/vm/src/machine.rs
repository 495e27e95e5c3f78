//! VM state management: registers, stack, memory, loading and label
//! collection.

use std::io::{self, Write};
use std::rc::Rc;

use kestrel_common::register::REGISTER_COUNT;
use kestrel_common::{
    AbsoluteAddress, Cell, Instruction, Program, Register, Value, ENTRY_LABEL, MAIN_LABEL,
};
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::labels::LabelTable;
use crate::memory::Memory;

/// A stack cell: either a value or a return address pushed by `call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Value(Value),
    ReturnAddress(AbsoluteAddress),
}

impl Default for Slot {
    fn default() -> Self {
        Slot::Value(Value::Null)
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Value(value)
    }
}

impl Slot {
    /// Short description of the slot contents, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Slot::Value(v) => v.tag_name(),
            Slot::ReturnAddress(_) => "return address",
        }
    }
}

/// The register file. Every register holds a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    values: [Value; REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            values: [Value::Null; REGISTER_COUNT],
        }
    }
}

impl RegisterFile {
    pub fn get(&self, register: Register) -> Value {
        self.values[register.index()]
    }

    pub fn set(&mut self, register: Register, value: Value) {
        self.values[register.index()] = value;
    }
}

/// The Kestrel virtual machine.
///
/// Lifecycle: [`new`](Runtime::new) → [`load`](Runtime::load) →
/// [`collect_labels`](Runtime::collect_labels) → [`run`](Runtime::run).
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    /// Loaded cells, bootstrap included.
    pub(crate) program: Program,
    /// Instructions with label markers removed, filled by `collect_labels`.
    pub(crate) code: Rc<Vec<Instruction>>,
    pub(crate) labels: LabelTable,
    pub(crate) registers: RegisterFile,
    /// Grows downward; `sp` indexes the current top.
    pub(crate) stack: Vec<Slot>,
    pub(crate) memory: Memory,
    pub(crate) stdout: Box<dyn Write>,
    pub(crate) stderr: Box<dyn Write>,
    /// Index of the instruction being executed, for error reporting.
    pub(crate) at: usize,
    /// Instructions dispatched so far.
    pub(crate) steps: u64,
}

impl Runtime {
    /// Create a runtime with the given stack and memory capacities.
    pub fn new(stack_size: usize, memory_size: usize) -> Self {
        Self::with_config(
            RuntimeConfig::default()
                .with_stack_size(stack_size)
                .with_memory_size(memory_size),
        )
    }

    /// Create a runtime from a full configuration.
    ///
    /// `sp` starts at `stack_size - 1`, `bp` and `pc` at 0, the flags at
    /// `false`, and every other register at `Null`.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut registers = RegisterFile::default();
        registers.set(
            Register::StackPointer,
            Value::Integer(config.stack_size as i64 - 1),
        );
        registers.set(Register::BasePointer, Value::Integer(0));
        registers.set(Register::ProgramCounter, Value::Integer(0));
        registers.set(Register::ZeroFlag, Value::FALSE);
        registers.set(Register::ExitFlag, Value::FALSE);

        Self {
            config,
            program: Program::default(),
            code: Rc::new(Vec::new()),
            labels: LabelTable::default(),
            registers,
            stack: vec![Slot::default(); config.stack_size],
            memory: Memory::new(config.memory_size),
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
            at: 0,
            steps: 0,
        }
    }

    /// Redirect the streams used by `syscall write`.
    pub fn with_streams(
        mut self,
        stdout: impl Write + 'static,
        stderr: impl Write + 'static,
    ) -> Self {
        self.stdout = Box::new(stdout);
        self.stderr = Box::new(stderr);
        self
    }

    /// Load a program, prefixed with the bootstrap sequence
    /// `l_-1: call l_0; exit` so that `ret` in `main` has somewhere to go.
    ///
    /// Any previously collected labels are discarded.
    pub fn load(&mut self, program: Program) {
        let mut loaded = Program::default();
        loaded.def_label(ENTRY_LABEL);
        loaded.push(Instruction::call(MAIN_LABEL));
        loaded.push(Instruction::exit());
        loaded.append(program);

        debug!(cells = loaded.len(), width = loaded.flat_len(), "program loaded");
        self.program = loaded;
        self.code = Rc::new(Vec::new());
        self.labels = LabelTable::default();
    }

    /// Resolve every label marker to the index of the instruction that
    /// follows it, and strip the markers from the executable code.
    ///
    /// Fails on the first label defined twice, including a label already
    /// registered by an earlier call. On failure nothing is committed.
    pub fn collect_labels(&mut self) -> Result<(), RuntimeError> {
        let mut labels = self.labels.clone();
        let mut code = Vec::with_capacity(self.program.len());

        for cell in &self.program.cells {
            match cell {
                Cell::DefLabel(label) => labels.insert(*label, AbsoluteAddress(code.len()))?,
                Cell::Instruction(instr) => code.push(instr.clone()),
            }
        }

        debug!(
            labels = labels.len(),
            instructions = code.len(),
            "labels collected"
        );
        self.labels = labels;
        self.code = Rc::new(code);
        Ok(())
    }

    /// The primary return-value accumulator: the program's final status.
    pub fn status(&self) -> Value {
        self.registers.get(Register::Accumulator1)
    }

    /// Current value of `register`.
    pub fn register(&self, register: Register) -> Value {
        self.registers.get(register)
    }

    /// The stack cell at `index`, if it exists.
    pub fn stack_slot(&self, index: usize) -> Option<Slot> {
        self.stack.get(index).copied()
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// The loaded program, bootstrap included.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Executable instructions, available after `collect_labels`.
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of instructions dispatched so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Push a slot onto the stack.
    pub fn push(&mut self, slot: Slot) -> Result<(), RuntimeError> {
        let sp = self.stack_pointer()? - 1;
        if sp < 0 {
            return Err(RuntimeError::StackOverflow {
                at: self.at,
                stack_size: self.stack.len(),
            });
        }
        let index = self.stack_index(sp)?;
        self.stack[index] = slot;
        self.registers
            .set(Register::StackPointer, Value::Integer(sp));
        Ok(())
    }

    /// Pop the top slot off the stack, leaving `Null` behind.
    pub fn pop(&mut self) -> Result<Slot, RuntimeError> {
        let sp = self.stack_pointer()?;
        let index = self.top_index(sp)?;
        let slot = std::mem::take(&mut self.stack[index]);
        self.registers
            .set(Register::StackPointer, Value::Integer(sp + 1));
        Ok(slot)
    }

    /// The top slot, without popping it.
    pub fn peek(&self) -> Result<Slot, RuntimeError> {
        let index = self.top_index(self.stack_pointer()?)?;
        Ok(self.stack[index])
    }

    /// Current `sp` as a signed index.
    pub(crate) fn stack_pointer(&self) -> Result<i64, RuntimeError> {
        self.integer_register(Register::StackPointer)
    }

    pub(crate) fn integer_register(&self, register: Register) -> Result<i64, RuntimeError> {
        self.registers
            .get(register)
            .as_integer()
            .ok_or(RuntimeError::InvalidRegister {
                at: self.at,
                register,
            })
    }

    /// Index of the top of stack. The cell at `stack_size - 1` is never
    /// written, so `sp` there means the stack is empty.
    fn top_index(&self, sp: i64) -> Result<usize, RuntimeError> {
        if sp >= self.stack.len() as i64 - 1 {
            return Err(RuntimeError::StackUnderflow { at: self.at });
        }
        self.stack_index(sp)
    }

    /// Bounds-check a signed stack index.
    pub(crate) fn stack_index(&self, index: i64) -> Result<usize, RuntimeError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.stack.len())
            .ok_or(RuntimeError::FrameOutOfBounds {
                at: self.at,
                index,
                stack_size: self.stack.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_common::Label;

    #[test]
    fn new_initializes_registers() {
        let rt = Runtime::new(15, 15);
        assert_eq!(rt.register(Register::StackPointer), Value::Integer(14));
        assert_eq!(rt.register(Register::BasePointer), Value::Integer(0));
        assert_eq!(rt.register(Register::ProgramCounter), Value::Integer(0));
        assert_eq!(rt.register(Register::ZeroFlag), Value::FALSE);
        assert_eq!(rt.register(Register::ExitFlag), Value::FALSE);
        assert_eq!(rt.status(), Value::Null);
        assert_eq!(rt.stack_size(), 15);
        assert_eq!(rt.memory().len(), 15);
    }

    #[test]
    fn load_prepends_bootstrap() {
        let mut rt = Runtime::new(1, 1);
        let mut program = Program::default();
        program.def_label(Label::function(0));
        program.push(Instruction::ret());
        rt.load(program);

        let mut expected = Program::default();
        expected.def_label(ENTRY_LABEL);
        expected.push(Instruction::call(MAIN_LABEL));
        expected.push(Instruction::exit());
        expected.def_label(Label::function(0));
        expected.push(Instruction::ret());
        assert_eq!(rt.program(), &expected);
        assert_eq!(rt.program().flat_len(), 6);
    }

    #[test]
    fn collect_labels_strips_markers() {
        let mut rt = Runtime::new(1, 1);
        let mut program = Program::default();
        program.def_label(Label::function(0));
        program.push(Instruction::ret());
        rt.load(program);
        rt.collect_labels().unwrap();

        assert_eq!(rt.labels().get(ENTRY_LABEL), Some(AbsoluteAddress(0)));
        assert_eq!(rt.labels().get(MAIN_LABEL), Some(AbsoluteAddress(2)));
        assert_eq!(
            rt.code(),
            &[
                Instruction::call(MAIN_LABEL),
                Instruction::exit(),
                Instruction::ret()
            ]
        );
    }

    #[test]
    fn push_pop_lifo() {
        let mut rt = Runtime::new(10, 0);
        for i in 1..=3 {
            rt.push(Slot::Value(Value::Integer(i))).unwrap();
        }
        assert_eq!(rt.register(Register::StackPointer), Value::Integer(6));
        assert_eq!(rt.stack_slot(6), Some(Slot::Value(Value::Integer(3))));
        assert_eq!(rt.peek(), Ok(Slot::Value(Value::Integer(3))));
        assert_eq!(rt.pop(), Ok(Slot::Value(Value::Integer(3))));
        assert_eq!(rt.pop(), Ok(Slot::Value(Value::Integer(2))));
        assert_eq!(rt.pop(), Ok(Slot::Value(Value::Integer(1))));
        assert_eq!(rt.register(Register::StackPointer), Value::Integer(9));
        assert_eq!(rt.stack_slot(8), Some(Slot::Value(Value::Null)));
    }

    #[test]
    fn pop_empty_underflows() {
        let mut rt = Runtime::new(4, 0);
        assert_eq!(rt.pop(), Err(RuntimeError::StackUnderflow { at: 0 }));
    }

    #[test]
    fn push_past_bottom_overflows() {
        let mut rt = Runtime::new(2, 0);
        rt.push(Slot::Value(Value::Integer(1))).unwrap();
        assert_eq!(
            rt.push(Slot::Value(Value::Integer(2))),
            Err(RuntimeError::StackOverflow {
                at: 0,
                stack_size: 2
            })
        );
        // The failed push changed nothing.
        assert_eq!(rt.register(Register::StackPointer), Value::Integer(0));
        assert_eq!(rt.stack_slot(0), Some(Slot::Value(Value::Integer(1))));
    }
}
