//! Compile-time symbol table: function labels, variable slots and
//! control-flow labels.
//!
//! Variables are scoped by (function, nesting level). Slot numbers come from
//! a per-function running counter, so a slot is never handed out twice
//! within one function, whatever block it was declared in. The slot count
//! is the frame size the prologue reserves.

use std::collections::{BTreeMap, HashMap};

use crate::error::SymbolError;

/// Variables of a single function.
#[derive(Debug, Default)]
struct FunctionScope {
    /// Nesting level → variable name → slot.
    levels: BTreeMap<usize, HashMap<String, usize>>,
    /// Slots handed out so far.
    allocated: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    functions: HashMap<String, i64>,
    next_function: i64,
    current: String,
    nest: usize,
    scopes: HashMap<String, FunctionScope>,
    labels: HashMap<String, HashMap<String, u32>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Functions ----

    /// Allocate a label number for `name`. `main` is always 0; every other
    /// function gets the next number from 1 upward.
    pub fn register_function(&mut self, name: &str) -> Result<i64, SymbolError> {
        if self.functions.contains_key(name) {
            return Err(SymbolError::DuplicateFunction {
                name: name.to_string(),
            });
        }
        let number = if name == "main" {
            0
        } else {
            self.next_function += 1;
            self.next_function
        };
        self.functions.insert(name.to_string(), number);
        Ok(number)
    }

    pub fn find_function(&self, name: &str) -> Option<i64> {
        self.functions.get(name).copied()
    }

    /// Make `name` the current function and reset the nesting level.
    pub fn enter_function(&mut self, name: &str) {
        self.current = name.to_string();
        self.nest = 0;
    }

    pub fn current_function(&self) -> &str {
        &self.current
    }

    // ---- Nesting ----

    pub fn enter_block(&mut self) {
        self.nest += 1;
    }

    /// Leave the current block. Its names go out of scope; their slots stay
    /// allocated.
    pub fn leave_block(&mut self) {
        if let Some(scope) = self.scopes.get_mut(&self.current) {
            scope.levels.remove(&self.nest);
        }
        self.nest = self.nest.saturating_sub(1);
    }

    pub fn nesting_level(&self) -> usize {
        self.nest
    }

    // ---- Variables ----

    /// Bind `name` to a fresh slot at the current nesting level. Fails if the
    /// name is already visible.
    pub fn register_variable(&mut self, name: &str) -> Result<usize, SymbolError> {
        if self.find_variable(name).is_some() {
            return Err(SymbolError::DuplicateVariable {
                function: self.current.clone(),
                name: name.to_string(),
            });
        }
        let scope = self.scopes.entry(self.current.clone()).or_default();
        scope.allocated += 1;
        let slot = scope.allocated;
        scope
            .levels
            .entry(self.nest)
            .or_default()
            .insert(name.to_string(), slot);
        Ok(slot)
    }

    /// Slot of `name` if it is visible at the current nesting level.
    ///
    /// Every level at or above the current one is searched. Which level wins
    /// when several declare the same name is not part of the contract;
    /// redeclaration is rejected, so this only arises across sibling blocks.
    pub fn find_variable(&self, name: &str) -> Option<usize> {
        let scope = self.scopes.get(&self.current)?;
        scope
            .levels
            .range(..=self.nest)
            .find_map(|(_, vars)| vars.get(name).copied())
    }

    /// Slots allocated in the current function across every nesting level.
    pub fn total_variables(&self) -> usize {
        self.scopes
            .get(&self.current)
            .map_or(0, |scope| scope.allocated)
    }

    // ---- Labels ----

    /// Allocate the next control-flow label number in the current function,
    /// starting at 1.
    pub fn register_label(&mut self, label: &str) -> Result<u32, SymbolError> {
        let labels = self.labels.entry(self.current.clone()).or_default();
        if labels.contains_key(label) {
            return Err(SymbolError::DuplicateLabel {
                function: self.current.clone(),
                label: label.to_string(),
            });
        }
        let number = labels.len() as u32 + 1;
        labels.insert(label.to_string(), number);
        Ok(number)
    }

    pub fn find_label(&self, label: &str) -> Option<u32> {
        self.labels.get(&self.current)?.get(label).copied()
    }
}
