//! Lowering from syntax tree to [`Program`].
//!
//! Expressions are compiled for a stack machine: every expression leaves
//! exactly one value on the stack. Binary operators pop their right operand
//! into `r2` and their left operand into `r1`, operate, and push the result.
//!
//! Frame layout, relative to `bp` after the prologue:
//!
//! ```text
//! [bp+2+i]  argument i
//! [bp+1]    return address
//! [bp]      caller's bp
//! [bp-1]..  local slots (arguments are copied into the first ones)
//! ```

use std::collections::HashSet;

use kestrel_common::{FrameOffset, Instruction, Label, Program, Register, Value};
use tracing::{debug, warn};

use crate::error::{GenerateError, SymbolError};
use crate::node::{Leaf, Node, SyntaxKind};
use crate::symbol::SymbolTable;

/// Return values beyond this count are dropped with a warning.
pub const MAX_RETURN_VALUES: usize = 2;

const ACCUMULATORS: [Register; MAX_RETURN_VALUES] =
    [Register::Accumulator1, Register::Accumulator2];

/// Generate a program from a chain of top-level function definitions.
pub fn generate(root: &Node) -> Result<Program, GenerateError> {
    Generator::new().generate(root)
}

/// Per-compilation state threaded through every generation step.
#[derive(Debug, Default)]
pub struct Generator {
    symbols: SymbolTable,
    /// Label number of the function being generated.
    function: i64,
    /// Disambiguates generated label names.
    unique: u64,
    defined: HashSet<String>,
    /// Called functions, in first-reference order.
    referenced: Vec<String>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate every function in the `next` chain starting at `root`.
    ///
    /// Calls may refer to functions defined later; a callee that is never
    /// defined is reported once the whole chain has been generated.
    pub fn generate(mut self, root: &Node) -> Result<Program, GenerateError> {
        let mut program = Program::default();
        for node in root.siblings() {
            match node.kind() {
                SyntaxKind::DefineFunction => program.append(self.define_function(node)?),
                kind => {
                    return Err(GenerateError::UnsupportedSyntax {
                        context: "top level",
                        kind,
                    })
                }
            }
        }

        if let Some(name) = self
            .referenced
            .iter()
            .find(|name| !self.defined.contains(*name))
        {
            return Err(GenerateError::UndefinedFunction { name: name.clone() });
        }

        debug!(
            functions = self.defined.len(),
            cells = program.len(),
            "program generated"
        );
        Ok(program)
    }

    // ---- Declarations ----

    fn define_function(&mut self, node: &Node) -> Result<Program, GenerateError> {
        let decl = required(node.lhs(), node, "missing declaration")?;
        let body = required(node.rhs(), node, "missing body")?;
        let header = match decl.kind() {
            SyntaxKind::FunctionDeclaration => required(decl.lhs(), decl, "missing header")?,
            SyntaxKind::FunctionHeader => decl,
            kind => {
                return Err(GenerateError::UnsupportedSyntax {
                    context: "function definition",
                    kind,
                })
            }
        };

        let name = ident_name(header.lhs(), header)?;
        if !self.defined.insert(name.to_string()) {
            return Err(SymbolError::DuplicateFunction {
                name: name.to_string(),
            }
            .into());
        }
        self.function = self.function_number(name)?;
        self.symbols.enter_function(name);

        let binding = match header.rhs() {
            Some(args) => self.function_arguments(args)?,
            None => Program::default(),
        };

        if body.kind() != SyntaxKind::Block {
            return Err(GenerateError::UnsupportedSyntax {
                context: "function body",
                kind: body.kind(),
            });
        }
        let mut code = self.statements(body)?;
        let returns_last = body
            .lhs()
            .and_then(|first| first.siblings().last())
            .is_some_and(|last| last.kind() == SyntaxKind::Return);
        if !returns_last {
            code.extend(epilogue());
        }

        // Sized after the body so block-local slots are reserved too.
        let frame = self.symbols.total_variables();
        let label = Label::function(self.function);

        let mut program = Program::default();
        program.def_label(label);
        program.push(Instruction::push(Register::BasePointer));
        program.push(Instruction::mov(
            Register::BasePointer,
            Register::StackPointer,
        ));
        program.push(Instruction::sub(
            Register::StackPointer,
            Value::Integer(frame as i64),
        ));
        program.append(binding);
        program.append(code);

        debug!(function = name, %label, frame, "function generated");
        Ok(program)
    }

    /// Bind each argument to a local slot, copying it out of the caller's
    /// pushes.
    fn function_arguments(&mut self, args: &Node) -> Result<Program, GenerateError> {
        if args.kind() != SyntaxKind::FunctionArguments {
            return Err(GenerateError::UnsupportedSyntax {
                context: "function header",
                kind: args.kind(),
            });
        }
        let mut program = Program::default();
        let Some(first) = args.lhs() else {
            return Ok(program);
        };
        for (i, arg) in first.siblings().enumerate() {
            let name = match arg.kind() {
                SyntaxKind::FunctionArgument => ident_name(arg.lhs(), arg)?,
                SyntaxKind::Ident => ident_name(Some(arg), args)?,
                kind => {
                    return Err(GenerateError::UnsupportedSyntax {
                        context: "function arguments",
                        kind,
                    })
                }
            };
            let slot = self.symbols.register_variable(name)?;
            program.push(Instruction::mov(local(slot), FrameOffset::bp(2 + i as i64)));
        }
        Ok(program)
    }

    fn function_number(&mut self, name: &str) -> Result<i64, GenerateError> {
        match self.symbols.find_function(name) {
            Some(number) => Ok(number),
            None => Ok(self.symbols.register_function(name)?),
        }
    }

    fn local_label(&mut self, name: &str) -> Result<Label, GenerateError> {
        let number = self.symbols.register_label(name)?;
        Ok(Label::local(self.function, number))
    }

    // ---- Statements ----

    /// A nested block: its declarations are scoped one level deeper.
    fn block(&mut self, node: &Node) -> Result<Program, GenerateError> {
        if node.kind() != SyntaxKind::Block {
            return Err(GenerateError::UnsupportedSyntax {
                context: "block",
                kind: node.kind(),
            });
        }
        self.symbols.enter_block();
        let program = self.statements(node);
        self.symbols.leave_block();
        program
    }

    fn statements(&mut self, block: &Node) -> Result<Program, GenerateError> {
        let mut program = Program::default();
        if let Some(first) = block.lhs() {
            for stmt in first.siblings() {
                program.append(self.statement(stmt)?);
            }
        }
        Ok(program)
    }

    fn statement(&mut self, node: &Node) -> Result<Program, GenerateError> {
        match node.kind() {
            SyntaxKind::Return => self.return_statement(node),
            SyntaxKind::IfElse => self.if_else(node),
            SyntaxKind::VarDecl => self.var_decl(node),
            SyntaxKind::Block => self.block(node),
            SyntaxKind::ExprStmt => {
                let expr = required(node.lhs(), node, "missing expression")?;
                self.discarded(expr)
            }
            _ => self.discarded(node),
        }
    }

    /// Evaluate an expression for its effect only.
    fn discarded(&mut self, expr: &Node) -> Result<Program, GenerateError> {
        let mut program = self.expression(expr)?;
        program.push(Instruction::pop(Register::Temporary));
        Ok(program)
    }

    /// Evaluate up to [`MAX_RETURN_VALUES`] values into the accumulators,
    /// then leave the function.
    ///
    /// All values are evaluated before any accumulator is written, so a call
    /// in a later value cannot clobber an earlier one.
    fn return_statement(&mut self, node: &Node) -> Result<Program, GenerateError> {
        let values: Vec<&Node> = node
            .lhs()
            .map(|first| first.siblings().collect())
            .unwrap_or_default();
        if values.len() > MAX_RETURN_VALUES {
            warn!(
                function = self.symbols.current_function(),
                values = values.len(),
                kept = MAX_RETURN_VALUES,
                "extra return values dropped"
            );
        }
        let kept = &values[..values.len().min(MAX_RETURN_VALUES)];

        let mut program = Program::default();
        for value in kept {
            program.append(self.expression(value)?);
        }
        for register in ACCUMULATORS[..kept.len()].iter().rev() {
            program.push(Instruction::pop(*register));
        }
        program.extend(epilogue());
        Ok(program)
    }

    /// Both branches are always laid out; a missing `else` is an empty block.
    fn if_else(&mut self, node: &Node) -> Result<Program, GenerateError> {
        let branch = required(node.lhs(), node, "missing if")?;
        if branch.kind() != SyntaxKind::If {
            return Err(GenerateError::UnsupportedSyntax {
                context: "if/else",
                kind: branch.kind(),
            });
        }
        let cond = required(branch.lhs(), branch, "missing condition")?;
        let then = required(branch.rhs(), branch, "missing block")?;
        if !cond.kind().is_comparison() {
            return Err(GenerateError::UnsupportedCondition { kind: cond.kind() });
        }

        let token = self.unique;
        self.unique += 1;
        let if_label = self.local_label(&format!("if_{token}"))?;
        let else_label = self.local_label(&format!("else_{token}"))?;
        let end_label = self.local_label(&format!("end_{token}"))?;

        // The branch reads the zero flag; the pushed result is discarded.
        let mut program = self.expression(cond)?;
        program.push(Instruction::pop(Register::Temporary));
        program.push(Instruction::jump_if_zero(if_label));
        program.push(Instruction::jmp(else_label));

        program.def_label(if_label);
        program.append(self.block(then)?);
        program.push(Instruction::jmp(end_label));

        program.def_label(else_label);
        if let Some(otherwise) = node.rhs() {
            program.append(self.block(otherwise)?);
        }
        program.push(Instruction::jmp(end_label));

        program.def_label(end_label);
        Ok(program)
    }

    fn var_decl(&mut self, node: &Node) -> Result<Program, GenerateError> {
        let name = ident_name(node.lhs(), node)?;
        let init = required(node.rhs(), node, "missing initializer")?;
        // The initializer cannot see the name it initializes.
        let mut program = self.expression(init)?;
        let slot = self.symbols.register_variable(name)?;
        program.push(Instruction::pop(local(slot)));
        Ok(program)
    }

    // ---- Expressions, loosest binding first ----

    fn expression(&mut self, node: &Node) -> Result<Program, GenerateError> {
        self.assignment(node)
    }

    /// `name = value`. The assigned value is also the expression's result.
    fn assignment(&mut self, node: &Node) -> Result<Program, GenerateError> {
        if node.kind() != SyntaxKind::Assign {
            return self.logical(node);
        }
        let name = ident_name(node.lhs(), node)?;
        let value = required(node.rhs(), node, "missing value")?;
        let mut program = self.expression(value)?;
        let slot = self.variable(name)?;
        program.push(Instruction::pop(local(slot)));
        program.push(Instruction::push(local(slot)));
        Ok(program)
    }

    // No logical operators in the grammar yet.
    fn logical(&mut self, node: &Node) -> Result<Program, GenerateError> {
        self.equality(node)
    }

    fn equality(&mut self, node: &Node) -> Result<Program, GenerateError> {
        match node.kind() {
            SyntaxKind::Eq => self.comparison(node, Instruction::eq, false),
            SyntaxKind::Ne => self.comparison(node, Instruction::ne, false),
            _ => self.relational(node),
        }
    }

    /// `>` and `>=` are `<` and `<=` with the operands swapped.
    fn relational(&mut self, node: &Node) -> Result<Program, GenerateError> {
        match node.kind() {
            SyntaxKind::Lt => self.comparison(node, Instruction::lt, false),
            SyntaxKind::Le => self.comparison(node, Instruction::le, false),
            SyntaxKind::Gt => self.comparison(node, Instruction::lt, true),
            SyntaxKind::Ge => self.comparison(node, Instruction::le, true),
            _ => self.additive(node),
        }
    }

    fn additive(&mut self, node: &Node) -> Result<Program, GenerateError> {
        match node.kind() {
            SyntaxKind::Add => self.arithmetic(node, Instruction::add),
            SyntaxKind::Sub => self.arithmetic(node, Instruction::sub),
            _ => self.multiplicative(node),
        }
    }

    // No multiplicative operators in the grammar yet.
    fn multiplicative(&mut self, node: &Node) -> Result<Program, GenerateError> {
        self.unary(node)
    }

    // No unary operators in the grammar yet.
    fn unary(&mut self, node: &Node) -> Result<Program, GenerateError> {
        self.primary(node)
    }

    fn primary(&mut self, node: &Node) -> Result<Program, GenerateError> {
        match node.kind() {
            SyntaxKind::Call => self.call(node),
            _ => self.access(node),
        }
    }

    /// Variable read.
    fn access(&mut self, node: &Node) -> Result<Program, GenerateError> {
        if node.kind() != SyntaxKind::Ident {
            return self.literal(node);
        }
        let name = ident_name(Some(node), node)?;
        let slot = self.variable(name)?;
        Ok(Program::from_iter([Instruction::push(local(slot))]))
    }

    fn literal(&mut self, node: &Node) -> Result<Program, GenerateError> {
        match node.kind() {
            SyntaxKind::Primitive => self.primitive(node),
            kind => Err(GenerateError::UnsupportedSyntax {
                context: "expression",
                kind,
            }),
        }
    }

    /// Only integer literals can be emitted.
    fn primitive(&mut self, node: &Node) -> Result<Program, GenerateError> {
        let value = required(node.lhs(), node, "missing literal")?;
        match value.kind() {
            SyntaxKind::Integer => {
                let n = value.leaf().and_then(Leaf::as_integer).ok_or(
                    GenerateError::MalformedNode {
                        kind: SyntaxKind::Integer,
                        reason: "missing integer value",
                    },
                )?;
                Ok(Program::from_iter([Instruction::push(Value::Integer(n))]))
            }
            kind => Err(GenerateError::UnsupportedLiteral { kind }),
        }
    }

    /// Arguments are pushed last-to-first so argument `i` sits at
    /// `bp + 2 + i` in the callee. The result comes back in `acm1`.
    fn call(&mut self, node: &Node) -> Result<Program, GenerateError> {
        let name = ident_name(node.lhs(), node)?;
        let number = self.function_number(name)?;
        if !self.referenced.iter().any(|known| known == name) {
            self.referenced.push(name.to_string());
        }

        let args: Vec<&Node> = node
            .rhs()
            .map(|first| first.siblings().collect())
            .unwrap_or_default();
        let mut program = Program::default();
        for arg in args.iter().rev() {
            program.append(self.expression(arg)?);
        }
        program.push(Instruction::call(Label::function(number)));
        if !args.is_empty() {
            program.push(Instruction::add(
                Register::StackPointer,
                Value::Integer(args.len() as i64),
            ));
        }
        program.push(Instruction::push(Register::Accumulator1));
        Ok(program)
    }

    // ---- Helpers ----

    /// Evaluate both operands of a binary node into `r1` (left) and `r2`
    /// (right).
    fn operands(&mut self, node: &Node) -> Result<Program, GenerateError> {
        let lhs = required(node.lhs(), node, "missing left operand")?;
        let rhs = required(node.rhs(), node, "missing right operand")?;
        let mut program = self.expression(lhs)?;
        program.append(self.expression(rhs)?);
        program.push(Instruction::pop(Register::General2));
        program.push(Instruction::pop(Register::General1));
        Ok(program)
    }

    /// `r1 = r1 op r2`, pushed as the result.
    fn arithmetic(
        &mut self,
        node: &Node,
        operate: fn(Register, Register) -> Instruction,
    ) -> Result<Program, GenerateError> {
        let mut program = self.operands(node)?;
        program.push(operate(Register::General1, Register::General2));
        program.push(Instruction::push(Register::General1));
        Ok(program)
    }

    /// Compare the operands, leaving the zero flag on the stack as the
    /// result. `swap` compares right against left.
    fn comparison(
        &mut self,
        node: &Node,
        compare: fn(Register, Register) -> Instruction,
        swap: bool,
    ) -> Result<Program, GenerateError> {
        let (a, b) = if swap {
            (Register::General2, Register::General1)
        } else {
            (Register::General1, Register::General2)
        };
        let mut program = self.operands(node)?;
        program.push(compare(a, b));
        program.push(Instruction::push(Register::ZeroFlag));
        Ok(program)
    }

    fn variable(&self, name: &str) -> Result<usize, GenerateError> {
        self.symbols
            .find_variable(name)
            .ok_or_else(|| GenerateError::UndefinedVariable {
                function: self.symbols.current_function().to_string(),
                name: name.to_string(),
            })
    }
}

/// Frame cell of local slot `slot`.
fn local(slot: usize) -> FrameOffset {
    FrameOffset::bp(-(slot as i64))
}

/// Restore the caller's frame and return.
fn epilogue() -> [Instruction; 3] {
    [
        Instruction::mov(Register::StackPointer, Register::BasePointer),
        Instruction::pop(Register::BasePointer),
        Instruction::ret(),
    ]
}

fn required<'n>(
    child: Option<&'n Node>,
    parent: &Node,
    reason: &'static str,
) -> Result<&'n Node, GenerateError> {
    child.ok_or(GenerateError::MalformedNode {
        kind: parent.kind(),
        reason,
    })
}

fn ident_name<'n>(node: Option<&'n Node>, parent: &Node) -> Result<&'n str, GenerateError> {
    node.filter(|n| n.kind() == SyntaxKind::Ident)
        .and_then(Node::leaf)
        .and_then(Leaf::as_ident)
        .ok_or(GenerateError::MalformedNode {
            kind: parent.kind(),
            reason: "expected an identifier",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_returning(values: Vec<Node>) -> Node {
        Node::function("main", &[], Node::block(vec![Node::ret(values)]))
    }

    #[test]
    fn main_return_listing() {
        let program = generate(&main_returning(vec![Node::integer(100)])).unwrap();
        let expected = "\
l_0:
    push bp
    mov bp, sp
    sub sp, 0
    push 100
    pop acm1
    mov sp, bp
    pop bp
    ret
";
        assert_eq!(program.to_string(), expected);
    }

    #[test]
    fn two_return_values_fill_both_accumulators() {
        let program = generate(&main_returning(vec![Node::integer(1), Node::integer(2)])).unwrap();
        let pops: Vec<&Instruction> = program
            .instructions()
            .filter(|i| i.opcode() == kestrel_common::Opcode::Pop)
            .collect();
        assert_eq!(pops[0], &Instruction::pop(Register::Accumulator2));
        assert_eq!(pops[1], &Instruction::pop(Register::Accumulator1));
    }

    #[test]
    fn third_return_value_is_dropped() {
        let two = generate(&main_returning(vec![Node::integer(1), Node::integer(2)])).unwrap();
        let three = generate(&main_returning(vec![
            Node::integer(1),
            Node::integer(2),
            Node::integer(3),
        ]))
        .unwrap();
        assert_eq!(two, three);
    }

    #[test]
    fn arguments_bind_to_locals() {
        let f = Node::function(
            "f",
            &["a", "b"],
            Node::block(vec![Node::ret(vec![Node::ident("b")])]),
        );
        let main = main_returning(vec![Node::call(
            "f",
            vec![Node::integer(1), Node::integer(2)],
        )]);
        let program = generate(&Node::chain(vec![main, f]).unwrap()).unwrap();
        let instrs: Vec<&Instruction> = program.instructions().collect();

        assert!(instrs.contains(&&Instruction::mov(FrameOffset::bp(-1), FrameOffset::bp(2))));
        assert!(instrs.contains(&&Instruction::mov(FrameOffset::bp(-2), FrameOffset::bp(3))));
        let reserve = Instruction::sub(Register::StackPointer, Value::Integer(2));
        assert!(instrs.contains(&&reserve));
        assert!(instrs.contains(&&Instruction::push(FrameOffset::bp(-2))));
    }

    #[test]
    fn frame_counts_block_locals() {
        let body = Node::block(vec![
            Node::var("a", Node::integer(1)),
            Node::block(vec![Node::var("b", Node::integer(2))]),
            Node::block(vec![Node::var("c", Node::integer(3))]),
            Node::ret(vec![Node::ident("a")]),
        ]);
        let program = generate(&Node::function("main", &[], body)).unwrap();
        let reserve = Instruction::sub(Register::StackPointer, Value::Integer(3));
        assert_eq!(program.instructions().nth(2), Some(&reserve));
        let deepest = Instruction::pop(FrameOffset::bp(-3));
        assert!(program.instructions().any(|i| i == &deepest));
    }

    #[test]
    fn implicit_epilogue_when_body_falls_through() {
        let program = generate(&Node::function(
            "main",
            &[],
            Node::block(vec![Node::expr_stmt(Node::integer(5))]),
        ))
        .unwrap();
        let tail: Vec<&Instruction> = program.instructions().collect();
        assert_eq!(
            &tail[tail.len() - 3..],
            &[
                &Instruction::mov(Register::StackPointer, Register::BasePointer),
                &Instruction::pop(Register::BasePointer),
                &Instruction::ret(),
            ]
        );
    }

    #[test]
    fn greater_than_swaps_registers() {
        let cond = Node::binary(SyntaxKind::Gt, Node::integer(2), Node::integer(1));
        let program = generate(&main_returning(vec![cond])).unwrap();
        assert!(program
            .instructions()
            .any(|i| i == &Instruction::lt(Register::General2, Register::General1)));
    }

    #[test]
    fn if_labels_are_local_to_the_function() {
        let body = Node::block(vec![
            Node::if_else(
                Node::binary(SyntaxKind::Eq, Node::integer(1), Node::integer(1)),
                Node::block(vec![]),
                None,
            ),
            Node::ret(vec![Node::integer(0)]),
        ]);
        let program = generate(&Node::function("main", &[], body)).unwrap();
        let labels: Vec<Label> = program.labels().collect();
        assert_eq!(
            labels,
            vec![
                Label::function(0),
                Label::local(0, 1),
                Label::local(0, 2),
                Label::local(0, 3)
            ]
        );
    }
}
