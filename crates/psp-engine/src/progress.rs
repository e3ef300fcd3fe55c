use psp_model::{LevelCounts, ValidationResult};

use crate::outcome::RunOutcome;
use crate::ruleset::{Rule, RulesSection};

/// Callbacks invoked synchronously on the run thread.
///
/// Every method defaults to doing nothing.
pub trait ProgressListener {
    fn run_started(&mut self, _sections: usize, _rules: usize) {}

    fn section_started(&mut self, _section: &RulesSection) {}

    fn section_skipped(&mut self, _section: &RulesSection) {}

    fn section_finished(&mut self, _section: &RulesSection, _counts: LevelCounts) {}

    fn section_canceled(&mut self, _section: &RulesSection) {}

    fn rule_started(&mut self, _rule: &Rule) {}

    /// `section_counts` covers the rules of the section finished so far.
    fn rule_finished(
        &mut self,
        _rule: &Rule,
        _rule_counts: LevelCounts,
        _section_counts: LevelCounts,
        _result: &ValidationResult,
    ) {
    }

    fn rule_canceled(&mut self, _rule: &Rule) {}

    fn run_finished(&mut self, _outcome: &RunOutcome) {}
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {}
