//! Error types for the Kestrel code generator.

use thiserror::Error;

use crate::node::SyntaxKind;

/// Symbol registration failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("function '{name}' is already defined")]
    DuplicateFunction { name: String },

    #[error("variable '{function}.{name}' is already defined")]
    DuplicateVariable { function: String, name: String },

    #[error("label '{function}.{label}' is already defined")]
    DuplicateLabel { function: String, label: String },
}

/// Errors produced while lowering a syntax tree. Generation stops at the
/// first one; no partial program is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// A node kind that has no meaning in this position.
    #[error("unsupported {kind} in {context}")]
    UnsupportedSyntax {
        context: &'static str,
        kind: SyntaxKind,
    },

    /// A literal other than an integer.
    #[error("unsupported literal {kind}")]
    UnsupportedLiteral { kind: SyntaxKind },

    /// A node is missing a child or leaf its kind requires.
    #[error("malformed {kind}: {reason}")]
    MalformedNode {
        kind: SyntaxKind,
        reason: &'static str,
    },

    #[error("undefined variable '{name}' in function '{function}'")]
    UndefinedVariable { function: String, name: String },

    /// A function is called but never defined.
    #[error("call to undefined function '{name}'")]
    UndefinedFunction { name: String },

    /// An `if` condition whose code does not set the zero flag.
    #[error("{kind} cannot be used as an if condition")]
    UnsupportedCondition { kind: SyntaxKind },

    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            GenerateError::UnsupportedSyntax {
                context: "top level",
                kind: SyntaxKind::Return
            }
            .to_string(),
            "unsupported RETURN in top level"
        );
        assert_eq!(
            GenerateError::from(SymbolError::DuplicateFunction { name: "f".into() }).to_string(),
            "function 'f' is already defined"
        );
        assert_eq!(
            GenerateError::UnsupportedLiteral {
                kind: SyntaxKind::Character
            }
            .to_string(),
            "unsupported literal CHARACTER"
        );
    }
}
