//! What a finished (or canceled) run reports.

use std::time::Duration;

use serde::{Serialize, Serializer};

use psp_model::{LevelCounts, RuleState, ValidationResult};

#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub name: String,
    pub description: Option<String>,
    pub state: RuleState,
    pub counts: LevelCounts,
    pub problems: ValidationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionOutcome {
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub state: RuleState,
    pub counts: LevelCounts,
    pub rules: Vec<RuleOutcome>,
}

impl SectionOutcome {
    pub fn has_errors(&self) -> bool {
        self.counts.has_errors()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub sections: Vec<SectionOutcome>,
    pub totals: LevelCounts,
    pub canceled: bool,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl RunOutcome {
    /// Valid means the run completed without a single ERROR.
    pub fn is_valid(&self) -> bool {
        !self.canceled && !self.totals.has_errors()
    }

    /// Sections that actually ran.
    pub fn enabled_sections(&self) -> impl Iterator<Item = &SectionOutcome> {
        self.sections.iter().filter(|section| section.enabled)
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
