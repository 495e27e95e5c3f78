//! Kestrel code generator: lowers a syntax tree into a [`Program`].
//!
//! The front end hands over a chain of function definitions. Each function
//! becomes a label marker followed by a prologue, argument bindings and the
//! body. Control flow is lowered to jumps between per-function labels; the
//! runtime resolves them before execution.
//!
//! # Usage
//!
//! ```
//! use kestrel_codegen::{generate, Node};
//!
//! let main = Node::function("main", &[], Node::block(vec![Node::ret(vec![Node::integer(100)])]));
//! let program = generate(&main).unwrap();
//! assert!(program.to_string().starts_with("l_0:\n    push bp\n"));
//! ```
//!
//! [`Program`]: kestrel_common::Program

pub mod error;
pub mod generate;
pub mod node;
pub mod symbol;

pub use error::{GenerateError, SymbolError};
pub use generate::{generate, Generator, MAX_RETURN_VALUES};
pub use node::{Leaf, Node, SyntaxKind};
pub use symbol::SymbolTable;
