//! Argument validation report types.
//!
//! Before any other check, the guard validates call arguments against the
//! tool's declared JSON Schema. Only a passing `ValidationReport` lets the
//! call proceed.

use serde::{Deserialize, Serialize};

/// The result of validating one argument set against one schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True only if no failure was recorded.
    pub passed: bool,
    /// All failures collected during this validation run. Empty on pass.
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn pass() -> Self {
        Self {
            passed: true,
            failures: Vec::new(),
        }
    }

    /// Join all failures into one human-readable line.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.path, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A single schema violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// JSON pointer into the arguments, e.g. `"/to"`. Empty for the root.
    pub path: String,
    pub message: String,
}
