use serde::{Deserialize, Serialize};

/// Outcome of a step in the report tree.
///
/// Ordered by severity: `Passed < Failed < Broken`. A node only ever moves up
/// this ordering, see [`Status::escalate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Passed,
    /// An assertion or reported error failed inside the step
    Failed,
    /// The step terminated through an uncontrolled panic
    Broken,
}

impl Status {
    /// The more severe of `self` and `other`.
    pub fn escalate(self, other: Status) -> Status {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Broken => "broken",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic text attached to a failed or broken step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusDetails {
    pub message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trace: String,
}

impl StatusDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: String::new(),
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = trace.into();
        self
    }
}
