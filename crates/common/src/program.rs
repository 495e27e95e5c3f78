//! Program representation: the emitted instruction stream.
//!
//! A program is an ordered sequence of cells. A cell is either an
//! instruction or a zero-width label marker. Markers exist only until the
//! runtime collects labels; they are never executed.

use std::fmt;

use crate::address::Label;
use crate::instruction::Instruction;

/// One entry of the instruction stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Defines `Label` at the position of the next instruction.
    DefLabel(Label),
    /// An executable instruction.
    Instruction(Instruction),
}

impl From<Instruction> for Cell {
    fn from(instr: Instruction) -> Self {
        Cell::Instruction(instr)
    }
}

/// A Kestrel program: a sequence of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// The cell stream.
    pub cells: Vec<Cell>,
}

impl Program {
    /// Create a new program from a vector of cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Append a label marker.
    pub fn def_label(&mut self, label: Label) {
        self.cells.push(Cell::DefLabel(label));
    }

    /// Append an instruction.
    pub fn push(&mut self, instr: Instruction) {
        self.cells.push(Cell::Instruction(instr));
    }

    /// Append every cell of `other`.
    pub fn append(&mut self, other: Program) {
        self.cells.extend(other.cells);
    }

    /// Number of cells, label markers included.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the program has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over the instructions, skipping label markers.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.cells.iter().filter_map(|cell| match cell {
            Cell::Instruction(instr) => Some(instr),
            Cell::DefLabel(_) => None,
        })
    }

    /// Iterate over the labels defined in this program, in order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.cells.iter().filter_map(|cell| match cell {
            Cell::DefLabel(label) => Some(*label),
            Cell::Instruction(_) => None,
        })
    }

    /// Length of the program in a flat cell encoding: one cell per label
    /// marker, `1 + arity` cells per instruction.
    pub fn flat_len(&self) -> usize {
        self.cells
            .iter()
            .map(|cell| match cell {
                Cell::DefLabel(_) => 1,
                Cell::Instruction(instr) => instr.width(),
            })
            .sum()
    }
}

impl FromIterator<Cell> for Program {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Cell::Instruction).collect())
    }
}

impl Extend<Cell> for Program {
    fn extend<I: IntoIterator<Item = Cell>>(&mut self, iter: I) {
        self.cells.extend(iter);
    }
}

impl Extend<Instruction> for Program {
    fn extend<I: IntoIterator<Item = Instruction>>(&mut self, iter: I) {
        self.cells.extend(iter.into_iter().map(Cell::Instruction));
    }
}

/// Listing format: one cell per line, label markers flush left and
/// instructions indented.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.cells {
            match cell {
                Cell::DefLabel(label) => writeln!(f, "{label}:")?,
                Cell::Instruction(instr) => writeln!(f, "    {instr}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Register;
    use crate::value::Value;

    fn sample() -> Program {
        let mut program = Program::default();
        program.def_label(Label::function(0));
        program.push(Instruction::push(Value::Integer(100)));
        program.push(Instruction::pop(Register::Accumulator1));
        program.push(Instruction::ret());
        program
    }

    #[test]
    fn empty_program() {
        let program = Program::default();
        assert!(program.is_empty());
        assert_eq!(program.len(), 0);
        assert_eq!(program.flat_len(), 0);
        assert_eq!(program.to_string(), "");
    }

    #[test]
    fn len_counts_markers() {
        let program = sample();
        assert_eq!(program.len(), 4);
        assert_eq!(program.instructions().count(), 3);
        assert_eq!(program.labels().collect::<Vec<_>>(), vec![Label::function(0)]);
    }

    #[test]
    fn flat_len_counts_operands() {
        // marker(1) + push(2) + pop(2) + ret(1)
        assert_eq!(sample().flat_len(), 6);
    }

    #[test]
    fn append_preserves_order() {
        let mut a = sample();
        let mut b = Program::default();
        b.def_label(Label::function(1));
        b.push(Instruction::ret());
        a.append(b);
        assert_eq!(a.len(), 6);
        assert_eq!(a.cells[4], Cell::DefLabel(Label::function(1)));
    }

    #[test]
    fn collect_from_instructions() {
        let program: Program = vec![Instruction::nop(), Instruction::exit()]
            .into_iter()
            .collect();
        assert_eq!(program.len(), 2);
        assert_eq!(program.labels().count(), 0);
    }

    #[test]
    fn listing() {
        assert_eq!(
            sample().to_string(),
            "l_0:\n    push 100\n    pop acm1\n    ret\n"
        );
    }
}
