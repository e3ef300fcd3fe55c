use std::fmt;

use serde::{Deserialize, Serialize};

use crate::level::Level;

/// A single leveled finding produced by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationProblem {
    pub level: Level,
    pub message: String,
}

impl ValidationProblem {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

/// Problem counts broken down by level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub info: usize,
    pub warning: usize,
    pub error: usize,
}

impl LevelCounts {
    pub fn record(&mut self, level: Level) {
        match level {
            Level::Info => self.info += 1,
            Level::Warning => self.warning += 1,
            Level::Error => self.error += 1,
        }
    }

    pub fn merge(&mut self, other: LevelCounts) {
        self.info += other.info;
        self.warning += other.warning;
        self.error += other.error;
    }

    pub fn get(&self, level: Level) -> usize {
        match level {
            Level::Info => self.info,
            Level::Warning => self.warning,
            Level::Error => self.error,
        }
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.error
    }

    pub fn has_errors(&self) -> bool {
        self.error > 0
    }
}

impl fmt::Display for LevelCounts {
    /// Renders as `3 problems (1x ERROR, 2x WARNING)`, omitting empty levels.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        if total == 0 {
            return f.write_str("no problems");
        }
        let noun = if total == 1 { "problem" } else { "problems" };
        let parts: Vec<String> = Level::DESCENDING
            .iter()
            .filter(|level| self.get(**level) > 0)
            .map(|level| format!("{}x {}", self.get(*level), level))
            .collect();
        write!(f, "{total} {noun} ({})", parts.join(", "))
    }
}

/// Ordered list of problems produced by one validation function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult {
    problems: Vec<ValidationProblem>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result holding exactly one ERROR problem.
    pub fn single_error(message: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.add(Level::Error, message);
        result
    }

    pub fn add(&mut self, level: Level, message: impl Into<String>) {
        self.problems.push(ValidationProblem::new(level, message));
    }

    pub fn push(&mut self, problem: ValidationProblem) {
        self.problems.push(problem);
    }

    /// Appends all problems of `other`, preserving their order.
    pub fn merge(&mut self, other: ValidationResult) {
        self.problems.extend(other.problems);
    }

    /// Appends all problems of `other` with `label: ` prepended to each message.
    pub fn merge_labeled(&mut self, label: &str, other: ValidationResult) {
        self.problems
            .extend(other.problems.into_iter().map(|problem| ValidationProblem {
                level: problem.level,
                message: format!("{label}: {}", problem.message),
            }));
    }

    pub fn problems(&self) -> &[ValidationProblem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<ValidationProblem> {
        self.problems
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.problems
            .iter()
            .any(|problem| problem.level == Level::Error)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn counts(&self) -> LevelCounts {
        let mut counts = LevelCounts::default();
        for problem in &self.problems {
            counts.record(problem.level);
        }
        counts
    }
}

impl FromIterator<ValidationProblem> for ValidationResult {
    fn from_iter<T: IntoIterator<Item = ValidationProblem>>(iter: T) -> Self {
        Self {
            problems: iter.into_iter().collect(),
        }
    }
}
