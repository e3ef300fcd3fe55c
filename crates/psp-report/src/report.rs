use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use psp_engine::RunOutcome;
use psp_model::Dmf;

/// A finished run together with what was validated and when.
#[derive(Debug, Clone, Copy)]
pub struct ValidationReport<'a> {
    pub dmf: &'a Dmf,
    pub package: &'a Path,
    pub outcome: &'a RunOutcome,
    pub created: DateTime<Utc>,
}

impl<'a> ValidationReport<'a> {
    /// Report stamped with the current time.
    pub fn new(dmf: &'a Dmf, package: &'a Path, outcome: &'a RunOutcome) -> Self {
        Self {
            dmf,
            package,
            outcome,
            created: Utc::now(),
        }
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub(crate) fn timestamp(&self) -> String {
        self.created.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub(crate) fn duration_ms(&self) -> u64 {
        u64::try_from(self.outcome.duration.as_millis()).unwrap_or(u64::MAX)
    }

    pub(crate) fn verdict(&self) -> &'static str {
        if self.outcome.is_valid() {
            "valid"
        } else {
            "invalid"
        }
    }
}
