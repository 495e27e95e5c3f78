//! Runtime value representation for the Kestrel VM.
//!
//! Values live in registers and on the stack during execution, and appear
//! as literal operands in the instruction stream.

use std::fmt;

/// A tagged runtime value.
///
/// Equality is structural and tag-sensitive: `Integer(1) != Character(1)`
/// even though both project to the same scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Value {
    /// Signed 64-bit integer.
    Integer(i64),
    /// Character stored as its codepoint.
    Character(i32),
    /// Boolean value.
    Bool(bool),
    /// The absent value. Registers start out holding it.
    #[default]
    Null,
    /// Handle to a list object.
    ListHandle(i64),
}

impl Value {
    /// Shorthand for `Value::Bool(true)`.
    pub const TRUE: Value = Value::Bool(true);
    /// Shorthand for `Value::Bool(false)`.
    pub const FALSE: Value = Value::Bool(false);

    /// Build a character value from a Rust `char`.
    pub fn character(c: char) -> Self {
        Value::Character(c as i32)
    }

    /// The scalar projection used by arithmetic and ordering comparisons.
    ///
    /// Booleans project to 0/1 and `Null` projects to 0.
    pub fn scalar(&self) -> i64 {
        match *self {
            Value::Integer(i) => i,
            Value::Character(c) => c as i64,
            Value::Bool(b) => b as i64,
            Value::Null => 0,
            Value::ListHandle(h) => h,
        }
    }

    /// Returns the integer payload if this value is integer-tagged.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Human-readable tag name, used in error messages.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Character(_) => "character",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::ListHandle(_) => "list",
        }
    }

    /// `true` when the value is `Bool(true)`.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::character(c)
    }
}

/// Textual form written by `Syscall Write`.
///
/// Characters render as the character itself; a codepoint that is not a
/// valid `char` renders as U+FFFD.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Character(c) => {
                let ch = u32::try_from(c)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(f, "{ch}")
            }
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            Value::ListHandle(h) => write!(f, "list#{h}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_projection() {
        assert_eq!(Value::Integer(-7).scalar(), -7);
        assert_eq!(Value::character('A').scalar(), 65);
        assert_eq!(Value::TRUE.scalar(), 1);
        assert_eq!(Value::FALSE.scalar(), 0);
        assert_eq!(Value::Null.scalar(), 0);
        assert_eq!(Value::ListHandle(3).scalar(), 3);
    }

    #[test]
    fn equality_is_tag_sensitive() {
        assert_ne!(Value::Integer(1), Value::Character(1));
        assert_ne!(Value::Integer(1), Value::TRUE);
        assert_ne!(Value::Integer(0), Value::Null);
        assert_ne!(Value::ListHandle(4), Value::Integer(4));
    }

    #[test]
    fn equality_same_tag() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_ne!(Value::Integer(42), Value::Integer(43));
        assert_eq!(Value::character('x'), Value::Character('x' as i32));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn default_is_null() {
        assert_eq!(Value::default(), Value::Null);
    }

    #[test]
    fn as_integer_only_for_integers() {
        assert_eq!(Value::Integer(9).as_integer(), Some(9));
        assert_eq!(Value::Character(9).as_integer(), None);
        assert_eq!(Value::Null.as_integer(), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::character('h').to_string(), "h");
        assert_eq!(Value::Character(-1).to_string(), "\u{FFFD}");
        assert_eq!(Value::TRUE.to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::ListHandle(2).to_string(), "list#2");
    }
}
