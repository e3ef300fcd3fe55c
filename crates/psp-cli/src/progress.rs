//! Terminal progress bar driven by engine progress callbacks.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;

use psp_engine::{ProgressListener, Rule, RulesSection, RunOutcome};
use psp_model::{LevelCounts, ValidationResult};

const TEMPLATE: &str = "{spinner:.cyan} [{bar:32.cyan/blue}] {pos}/{len} {wide_msg}";

/// One tick per rule; rules of skipped sections are counted as done.
pub struct ProgressReporter {
    bar: ProgressBar,
    current_section: String,
}

impl ProgressReporter {
    /// Bar drawn on stderr.
    pub fn stderr() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(
            Some(0),
            ProgressDrawTarget::stderr(),
        ))
    }

    /// Bar that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self {
            bar,
            current_section: String::new(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl ProgressListener for ProgressReporter {
    fn run_started(&mut self, _sections: usize, rules: usize) {
        self.bar.set_length(rules as u64);
        self.bar.set_position(0);
    }

    fn section_started(&mut self, section: &RulesSection) {
        self.current_section.clone_from(&section.name);
        self.bar.set_message(section.name.clone());
    }

    fn section_skipped(&mut self, section: &RulesSection) {
        self.bar.inc(section.rules.len() as u64);
    }

    fn section_finished(&mut self, section: &RulesSection, counts: LevelCounts) {
        info!(section = %section.name, %counts, "section finished");
    }

    fn rule_started(&mut self, rule: &Rule) {
        self.bar
            .set_message(format!("{} / {}", self.current_section, rule.name));
    }

    fn rule_finished(
        &mut self,
        _rule: &Rule,
        _rule_counts: LevelCounts,
        _section_counts: LevelCounts,
        _result: &ValidationResult,
    ) {
        self.bar.inc(1);
    }

    fn run_finished(&mut self, _outcome: &RunOutcome) {
        self.bar.finish_and_clear();
    }
}
