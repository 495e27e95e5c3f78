//! Addressing model: symbolic jump targets and frame-relative references.

use std::fmt;

use crate::register::Register;

/// A symbolic jump target.
///
/// Labels are two-part so that per-function control-flow label numbers
/// never collide with each other or with function entry labels once every
/// function is laid out in one flat program. `local == 0` is the entry of
/// `function`; control-flow labels number from 1 within their function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    /// Label number of the owning function.
    pub function: i64,
    /// Per-function label number, 0 for the function entry.
    pub local: u32,
}

/// Bootstrap label prepended by the runtime; the program starts here.
pub const ENTRY_LABEL: Label = Label::function(-1);

/// Entry label of `main`.
pub const MAIN_LABEL: Label = Label::function(0);

impl Label {
    /// Entry label of the function numbered `function`.
    pub const fn function(function: i64) -> Self {
        Self { function, local: 0 }
    }

    /// Control-flow label `local` inside the function numbered `function`.
    pub const fn local(function: i64, local: u32) -> Self {
        Self { function, local }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.local == 0 {
            write!(f, "l_{}", self.function)
        } else {
            write!(f, "l_{}.{}", self.function, self.local)
        }
    }
}

/// Register a frame offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameBase {
    BasePointer,
    StackPointer,
}

impl FrameBase {
    /// The register holding this base.
    pub fn register(self) -> Register {
        match self {
            FrameBase::BasePointer => Register::BasePointer,
            FrameBase::StackPointer => Register::StackPointer,
        }
    }
}

/// A stack cell addressed as a signed distance from `bp` or `sp`.
///
/// Arguments live at positive distances from `bp` (starting at 2), locals
/// at negative ones (starting at -1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameOffset {
    pub base: FrameBase,
    pub distance: i64,
}

impl FrameOffset {
    /// `[bp + distance]`
    pub const fn bp(distance: i64) -> Self {
        Self {
            base: FrameBase::BasePointer,
            distance,
        }
    }

    /// `[sp + distance]`
    pub const fn sp(distance: i64) -> Self {
        Self {
            base: FrameBase::StackPointer,
            distance,
        }
    }
}

impl fmt::Display for FrameOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base.register();
        if self.distance < 0 {
            write!(f, "[{base}{}]", self.distance)
        } else {
            write!(f, "[{base}+{}]", self.distance)
        }
    }
}

/// A resolved program-counter index. Only ever produced at runtime, as the
/// return address pushed by `Call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsoluteAddress(pub usize);

impl fmt::Display for AbsoluteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_and_local_labels_differ() {
        assert_ne!(Label::function(1), Label::local(1, 1));
        assert_ne!(Label::local(1, 1), Label::local(2, 1));
        assert_eq!(Label::function(3), Label::local(3, 0));
    }

    #[test]
    fn reserved_labels() {
        assert_eq!(ENTRY_LABEL, Label::function(-1));
        assert_eq!(MAIN_LABEL, Label::function(0));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Label::function(-1).to_string(), "l_-1");
        assert_eq!(Label::local(2, 5).to_string(), "l_2.5");
        assert_eq!(FrameOffset::bp(-1).to_string(), "[bp-1]");
        assert_eq!(FrameOffset::bp(2).to_string(), "[bp+2]");
        assert_eq!(FrameOffset::sp(0).to_string(), "[sp+0]");
        assert_eq!(AbsoluteAddress(7).to_string(), "@7");
    }
}
