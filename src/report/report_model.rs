use serde::{Deserialize, Serialize};

use crate::model::status::Status;
use crate::model::step_model::Step;

// ============================================================================
// Tree summary: status counts over a finished step tree
// ============================================================================

/// Status counts over every node of a step tree, root included.
///
/// Built from a finished `Step` via `from_step()`. Consumed by the console
/// renderer and the CLI exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TreeSummary {
    /// Total number of nodes
    pub total: usize,

    pub passed: usize,

    pub failed: usize,

    pub broken: usize,

    /// Deepest nesting level (the root is depth 1)
    pub depth: usize,
}

impl TreeSummary {
    pub fn from_step(step: &Step) -> Self {
        let mut summary = Self::default();
        summary.visit(step, 1);
        summary
    }

    fn visit(&mut self, step: &Step, depth: usize) {
        self.total += 1;
        self.depth = self.depth.max(depth);
        match step.status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Broken => self.broken += 1,
        }
        for child in &step.steps {
            self.visit(child, depth + 1);
        }
    }

    /// Whether no node in the tree failed or broke.
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.broken == 0
    }
}
