//! Runtime configuration.

/// Stack capacity used by [`RuntimeConfig::default`], in cells.
pub const DEFAULT_STACK_SIZE: usize = 1024;

/// Memory capacity used by [`RuntimeConfig::default`], in cells.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// Sizes and limits fixed when a [`Runtime`](crate::Runtime) is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of stack cells. The stack pointer starts at `stack_size - 1`.
    pub stack_size: usize,
    /// Number of flat memory cells.
    pub memory_size: usize,
    /// Maximum number of instructions `run` may dispatch. `None` runs
    /// until the program exits.
    pub step_budget: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            memory_size: DEFAULT_MEMORY_SIZE,
            step_budget: None,
        }
    }
}

impl RuntimeConfig {
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    pub fn with_step_budget(mut self, budget: u64) -> Self {
        self.step_budget = Some(budget);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(config.memory_size, DEFAULT_MEMORY_SIZE);
        assert_eq!(config.step_budget, None);
    }

    #[test]
    fn builder_methods() {
        let config = RuntimeConfig::default()
            .with_stack_size(16)
            .with_memory_size(4)
            .with_step_budget(100);
        assert_eq!(
            config,
            RuntimeConfig {
                stack_size: 16,
                memory_size: 4,
                step_budget: Some(100),
            }
        );
    }
}
