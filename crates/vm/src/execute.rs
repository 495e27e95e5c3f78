//! Main execution loop and opcode dispatch for the Kestrel VM.

use std::io::Write;
use std::rc::Rc;

use kestrel_common::{
    AbsoluteAddress, FrameOffset, Instruction, Label, Opcode, Operand, Register, Stream,
    SystemCall, Value, ENTRY_LABEL,
};
use tracing::{debug, trace};

use crate::error::RuntimeError;
use crate::machine::{Runtime, Slot};

/// A writable location: a register or a stack cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Place {
    Register(Register),
    Stack(usize),
}

impl Runtime {
    /// Execute from the bootstrap label until the exit flag is set.
    ///
    /// Requires [`collect_labels`](Runtime::collect_labels) to have run.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let entry = self
            .labels
            .get(ENTRY_LABEL)
            .ok_or(RuntimeError::LabelsNotCollected)?;
        self.set_pc(entry.0);
        let code = Rc::clone(&self.code);
        debug!(entry = entry.0, instructions = code.len(), "run started");

        loop {
            if self.registers.get(Register::ExitFlag).is_true() {
                self.flush()?;
                debug!(steps = self.steps, status = %self.status(), "run finished");
                return Ok(());
            }
            if let Some(budget) = self.config.step_budget {
                if self.steps >= budget {
                    return Err(RuntimeError::StepBudgetExhausted { budget });
                }
            }

            let at = self.pc()?;
            self.at = at;
            let instr = code
                .get(at)
                .ok_or(RuntimeError::ProgramCounterOutOfRange { at })?;
            trace!(at, %instr, "dispatch");
            self.steps += 1;
            self.dispatch(at, instr)?;
        }
    }

    /// Execute one instruction. Operands are validated before any state
    /// changes, so a failing instruction leaves the machine untouched.
    fn dispatch(&mut self, at: usize, instr: &Instruction) -> Result<(), RuntimeError> {
        let opcode = instr.opcode();
        let next = at + 1;

        match (opcode, instr.operands()) {
            (Opcode::Nop, []) => self.set_pc(next),

            (Opcode::Exit, []) => {
                self.registers.set(Register::ExitFlag, Value::TRUE);
                self.set_pc(next);
            }

            (Opcode::Call, [target]) => {
                let dest = self.resolve_label(opcode, target)?;
                self.push(Slot::ReturnAddress(AbsoluteAddress(next)))?;
                self.set_pc(dest.0);
            }

            (Opcode::Ret, []) => match self.peek()? {
                Slot::ReturnAddress(dest) => {
                    self.pop()?;
                    self.set_pc(dest.0);
                }
                Slot::Value(v) => {
                    return Err(RuntimeError::ReturnAddressExpected {
                        at,
                        found: v.tag_name(),
                    })
                }
            },

            (Opcode::Jmp, [target]) => {
                let dest = self.resolve_label(opcode, target)?;
                self.set_pc(dest.0);
            }

            (Opcode::JumpIfZero, [target]) => {
                let dest = self.resolve_label(opcode, target)?;
                let taken = self.registers.get(Register::ZeroFlag).is_true();
                self.set_pc(if taken { dest.0 } else { next });
            }

            (Opcode::JumpIfNotZero, [target]) => {
                let dest = self.resolve_label(opcode, target)?;
                let taken = !self.registers.get(Register::ZeroFlag).is_true();
                self.set_pc(if taken { dest.0 } else { next });
            }

            (Opcode::Mov, [dest, src]) => {
                let place = self.place(opcode, 0, dest)?;
                let slot = self.read_slot(opcode, 1, src)?;
                self.store(place, slot)?;
                self.set_pc(next);
            }

            (Opcode::Push, [src]) => {
                let slot = self.read_slot(opcode, 0, src)?;
                self.push(slot)?;
                self.set_pc(next);
            }

            (Opcode::Pop, [dest]) => {
                let place = self.place(opcode, 0, dest)?;
                let top = self.peek()?;
                self.check_store(place, top)?;
                self.pop()?;
                self.store(place, top)?;
                self.set_pc(next);
            }

            (Opcode::Add | Opcode::Sub, [dest, src]) => {
                let register = match dest {
                    Operand::Register(r) if *r != Register::ProgramCounter => *r,
                    other => return Err(self.invalid_operand(opcode, 0, other)),
                };
                let lhs = self.registers.get(register);
                let rhs = self.read_value(opcode, 1, src)?;
                let result = match (lhs, rhs) {
                    (Value::Integer(a), Value::Integer(b)) if opcode == Opcode::Add => {
                        a.wrapping_add(b)
                    }
                    (Value::Integer(a), Value::Integer(b)) => a.wrapping_sub(b),
                    _ => {
                        return Err(RuntimeError::NotIntegers {
                            at,
                            opcode,
                            lhs: lhs.tag_name(),
                            rhs: rhs.tag_name(),
                        })
                    }
                };
                self.store(Place::Register(register), Slot::Value(Value::Integer(result)))?;
                self.set_pc(next);
            }

            (Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le, [lhs, rhs]) => {
                let a = self.read_value(opcode, 0, lhs)?;
                let b = self.read_value(opcode, 1, rhs)?;
                // Equality looks at the tag; ordering only at the scalar.
                let result = match opcode {
                    Opcode::Eq => a == b,
                    Opcode::Ne => a != b,
                    Opcode::Lt => a.scalar() < b.scalar(),
                    _ => a.scalar() <= b.scalar(),
                };
                self.registers.set(Register::ZeroFlag, Value::Bool(result));
                self.set_pc(next);
            }

            (Opcode::Syscall, [call, stream, value]) => {
                match call {
                    Operand::SystemCall(SystemCall::Write) => {}
                    other => return Err(self.invalid_operand(opcode, 0, other)),
                }
                let stream = match stream {
                    Operand::Stream(s) => *s,
                    other => return Err(self.invalid_operand(opcode, 1, other)),
                };
                let value = self.read_value(opcode, 2, value)?;
                self.write_stream(stream, value)?;
                self.set_pc(next);
            }

            (_, operands) => {
                return Err(RuntimeError::ArityMismatch {
                    at,
                    opcode,
                    found: operands.len(),
                })
            }
        }

        Ok(())
    }

    // ---- Program counter ----

    pub(crate) fn pc(&self) -> Result<usize, RuntimeError> {
        let pc = self.integer_register(Register::ProgramCounter)?;
        usize::try_from(pc).map_err(|_| RuntimeError::InvalidRegister {
            at: self.at,
            register: Register::ProgramCounter,
        })
    }

    pub(crate) fn set_pc(&mut self, pc: usize) {
        self.registers
            .set(Register::ProgramCounter, Value::Integer(pc as i64));
    }

    fn resolve_label(
        &self,
        opcode: Opcode,
        operand: &Operand,
    ) -> Result<AbsoluteAddress, RuntimeError> {
        let label: Label = match operand {
            Operand::Label(l) => *l,
            other => return Err(self.invalid_operand(opcode, 0, other)),
        };
        self.labels
            .get(label)
            .ok_or(RuntimeError::UndefinedLabel { at: self.at, label })
    }

    // ---- Operand access ----

    fn invalid_operand(&self, opcode: Opcode, position: usize, operand: &Operand) -> RuntimeError {
        RuntimeError::InvalidOperand {
            at: self.at,
            opcode,
            position,
            found: operand.kind_name(),
        }
    }

    /// Stack index addressed by a frame offset.
    fn frame_index(&self, offset: FrameOffset) -> Result<usize, RuntimeError> {
        let base = self.integer_register(offset.base.register())?;
        let index = base
            .checked_add(offset.distance)
            .ok_or(RuntimeError::FrameOutOfBounds {
                at: self.at,
                index: base.saturating_add(offset.distance),
                stack_size: self.stack.len(),
            })?;
        self.stack_index(index)
    }

    /// Read a source operand: a register, a literal, or a frame cell.
    fn read_slot(
        &self,
        opcode: Opcode,
        position: usize,
        operand: &Operand,
    ) -> Result<Slot, RuntimeError> {
        match operand {
            Operand::Register(r) => Ok(Slot::Value(self.registers.get(*r))),
            Operand::Value(v) => Ok(Slot::Value(*v)),
            Operand::Frame(offset) => Ok(self.stack[self.frame_index(*offset)?]),
            other => Err(self.invalid_operand(opcode, position, other)),
        }
    }

    /// Read a source operand that must be a value, not a return address.
    fn read_value(
        &self,
        opcode: Opcode,
        position: usize,
        operand: &Operand,
    ) -> Result<Value, RuntimeError> {
        match self.read_slot(opcode, position, operand)? {
            Slot::Value(v) => Ok(v),
            Slot::ReturnAddress(_) => Err(RuntimeError::AddressAsValue { at: self.at }),
        }
    }

    /// Resolve a destination operand. The program counter is not writable.
    fn place(
        &self,
        opcode: Opcode,
        position: usize,
        operand: &Operand,
    ) -> Result<Place, RuntimeError> {
        match operand {
            Operand::Register(r) if *r != Register::ProgramCounter => Ok(Place::Register(*r)),
            Operand::Frame(offset) => Ok(Place::Stack(self.frame_index(*offset)?)),
            other => Err(self.invalid_operand(opcode, position, other)),
        }
    }

    /// Validate that `slot` may be stored at `place`.
    fn check_store(&self, place: Place, slot: Slot) -> Result<(), RuntimeError> {
        match (place, slot) {
            (Place::Register(_), Slot::ReturnAddress(_)) => {
                Err(RuntimeError::AddressAsValue { at: self.at })
            }
            (Place::Register(Register::StackPointer), Slot::Value(Value::Integer(sp)))
                if sp < 0 =>
            {
                Err(RuntimeError::StackOverflow {
                    at: self.at,
                    stack_size: self.stack.len(),
                })
            }
            _ => Ok(()),
        }
    }

    fn store(&mut self, place: Place, slot: Slot) -> Result<(), RuntimeError> {
        self.check_store(place, slot)?;
        match (place, slot) {
            (Place::Register(r), Slot::Value(v)) => self.registers.set(r, v),
            (Place::Stack(index), slot) => self.stack[index] = slot,
            // Rejected by check_store.
            (Place::Register(_), Slot::ReturnAddress(_)) => {}
        }
        Ok(())
    }

    // ---- System calls ----

    fn write_stream(&mut self, stream: Stream, value: Value) -> Result<(), RuntimeError> {
        let at = self.at;
        let sink = match stream {
            Stream::StdIn => return Err(RuntimeError::WriteToStdin { at }),
            Stream::StdOut => &mut self.stdout,
            Stream::StdErr => &mut self.stderr,
        };
        write!(sink, "{value}").map_err(|e| RuntimeError::Io {
            at,
            message: e.to_string(),
        })
    }

    fn flush(&mut self) -> Result<(), RuntimeError> {
        let at = self.at;
        let to_err = |e: std::io::Error| RuntimeError::Io {
            at,
            message: e.to_string(),
        };
        self.stdout.flush().map_err(to_err)?;
        self.stderr.flush().map_err(to_err)
    }
}
