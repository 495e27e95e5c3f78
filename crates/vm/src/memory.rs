//! Flat addressable memory.
//!
//! Generated code does not address memory yet; the arena is allocated at
//! construction so embedders and future addressing modes can use it.

use kestrel_common::Value;

use crate::error::RuntimeError;

/// Fixed-capacity array of value cells. Cells start out `Null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<Value>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![Value::Null; size],
        }
    }

    pub fn get(&self, address: usize) -> Result<Value, RuntimeError> {
        self.cells
            .get(address)
            .copied()
            .ok_or(RuntimeError::MemoryOutOfBounds {
                address,
                size: self.cells.len(),
            })
    }

    pub fn set(&mut self, address: usize, value: Value) -> Result<(), RuntimeError> {
        let size = self.cells.len();
        let cell = self
            .cells
            .get_mut(address)
            .ok_or(RuntimeError::MemoryOutOfBounds { address, size })?;
        *cell = value;
        Ok(())
    }

    /// Reset a cell to `Null`.
    pub fn clear(&mut self, address: usize) -> Result<(), RuntimeError> {
        self.set(address, Value::Null)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear() {
        let mut mem = Memory::new(4);
        assert_eq!(mem.len(), 4);
        assert_eq!(mem.get(2), Ok(Value::Null));
        mem.set(2, Value::Integer(7)).unwrap();
        assert_eq!(mem.get(2), Ok(Value::Integer(7)));
        mem.clear(2).unwrap();
        assert_eq!(mem.get(2), Ok(Value::Null));
    }

    #[test]
    fn out_of_range() {
        let mut mem = Memory::new(2);
        assert_eq!(
            mem.set(2, Value::Null),
            Err(RuntimeError::MemoryOutOfBounds { address: 2, size: 2 })
        );
        assert_eq!(
            mem.get(5),
            Err(RuntimeError::MemoryOutOfBounds { address: 5, size: 2 })
        );
    }
}
