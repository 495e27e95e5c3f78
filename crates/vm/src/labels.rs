//! Runtime label table: resolved label → absolute address.

use std::collections::HashMap;

use kestrel_common::{AbsoluteAddress, Label};

use crate::error::RuntimeError;

/// Maps each label to the index of the instruction it marks.
///
/// Populated once by [`Runtime::collect_labels`](crate::Runtime::collect_labels)
/// and read-only while the program runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    entries: HashMap<Label, AbsoluteAddress>,
}

impl LabelTable {
    /// Register `label`. A second registration is an error and leaves the
    /// first one in place.
    pub fn insert(&mut self, label: Label, address: AbsoluteAddress) -> Result<(), RuntimeError> {
        if self.entries.contains_key(&label) {
            return Err(RuntimeError::DuplicateLabel { label });
        }
        self.entries.insert(label, address);
        Ok(())
    }

    pub fn get(&self, label: Label) -> Option<AbsoluteAddress> {
        self.entries.get(&label).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut table = LabelTable::default();
        table.insert(Label::function(0), AbsoluteAddress(3)).unwrap();
        assert_eq!(table.get(Label::function(0)), Some(AbsoluteAddress(3)));
        assert_eq!(table.get(Label::function(1)), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn duplicate_keeps_first() {
        let mut table = LabelTable::default();
        table.insert(Label::local(0, 1), AbsoluteAddress(1)).unwrap();
        let err = table
            .insert(Label::local(0, 1), AbsoluteAddress(9))
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::DuplicateLabel {
                label: Label::local(0, 1)
            }
        );
        assert_eq!(table.get(Label::local(0, 1)), Some(AbsoluteAddress(1)));
    }
}
