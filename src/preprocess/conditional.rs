//! `#ifdef`/`#ifndef`/`#else`/`#endif` bookkeeping for one file.

/// Nesting counters for conditional blocks.
///
/// `depth` counts open blocks, `true_depth` counts how many of the outermost
/// open blocks are active. Text is emitted only while the two are equal.
/// Blocks opened inside an inactive region raise `depth` only, so their
/// `#else` can never activate them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalStack {
    depth: usize,
    true_depth: usize,
}

/// Returned when `#else` or `#endif` has no block to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoOpenBlock;

impl ConditionalStack {
    /// Creates a stack with no open blocks.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            depth: 0,
            true_depth: 0,
        }
    }

    /// Whether lines at the current position are emitted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.depth == self.true_depth
    }

    /// Number of open blocks.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Opens a block whose condition evaluated to `condition`.
    pub fn open(&mut self, condition: bool) {
        if self.is_active() && condition {
            self.true_depth += 1;
        }
        self.depth += 1;
    }

    /// Switches the innermost block to its other branch.
    pub fn flip(&mut self) -> Result<(), NoOpenBlock> {
        if self.depth == 0 {
            return Err(NoOpenBlock);
        }
        if self.true_depth == self.depth {
            self.true_depth -= 1;
        } else if self.true_depth + 1 == self.depth {
            self.true_depth = self.depth;
        }
        Ok(())
    }

    /// Closes the innermost block.
    pub fn close(&mut self) -> Result<(), NoOpenBlock> {
        if self.depth == 0 {
            return Err(NoOpenBlock);
        }
        if self.true_depth == self.depth {
            self.true_depth -= 1;
        }
        self.depth -= 1;
        Ok(())
    }
}
