//! System call numbers and standard stream selectors.

use std::fmt;

/// The system call requested by a `Syscall` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCall {
    /// Write a value's textual form to a standard stream.
    Write,
}

/// A standard stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    StdIn,
    StdOut,
    StdErr,
}

impl fmt::Display for SystemCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemCall::Write => f.write_str("write"),
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::StdIn => f.write_str("stdin"),
            Stream::StdOut => f.write_str("stdout"),
            Stream::StdErr => f.write_str("stderr"),
        }
    }
}
