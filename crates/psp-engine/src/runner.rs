//! Runs every enabled section of a rule set against one package.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, debug_span, info, info_span, warn};

use psp_model::{CancellationToken, LevelCounts, RuleState, ValidationResult};
use psp_tools::ToolManager;

use crate::engine::Engine;
use crate::outcome::{RuleOutcome, RunOutcome, SectionOutcome};
use crate::progress::ProgressListener;
use crate::ruleset::{Rule, RuleSet, RulesSection, VariableDefinition};
use crate::scope::ProvidedValues;

/// Executes the functions bound to variables and rules.
pub trait RuleExecutor {
    /// Evaluates and stores one rule-set variable. Called in declaration
    /// order before the first rule.
    fn define_variable(&mut self, _variable: &VariableDefinition) {}

    /// Stores a variable whose evaluation could not complete.
    fn define_failed(&mut self, _variable: &VariableDefinition, _message: String) {}

    fn execute(&mut self, rule: &Rule) -> ValidationResult;
}

impl RuleExecutor for Engine<'_> {
    fn define_variable(&mut self, variable: &VariableDefinition) {
        Engine::define_variable(self, variable);
    }

    fn define_failed(&mut self, variable: &VariableDefinition, message: String) {
        Engine::define_failed(self, variable, message);
    }

    fn execute(&mut self, rule: &Rule) -> ValidationResult {
        self.validate(&rule.function)
    }
}

/// Mutable state of one run, indexed by section and rule id. The rule set
/// itself is never touched.
#[derive(Debug)]
struct RunState {
    sections: Vec<SectionRun>,
    rules: Vec<RuleRun>,
}

#[derive(Debug, Default)]
struct SectionRun {
    state: RuleState,
    counts: LevelCounts,
}

#[derive(Debug, Default)]
struct RuleRun {
    state: RuleState,
    result: ValidationResult,
}

impl RunState {
    fn new(rules: &RuleSet) -> Self {
        Self {
            sections: rules.sections().iter().map(|_| SectionRun::default()).collect(),
            rules: rules.rules().iter().map(|_| RuleRun::default()).collect(),
        }
    }
}

/// Validator for one rule set, with the caller's run options.
pub struct Validator<'a> {
    rules: &'a RuleSet,
    tools: &'a ToolManager,
    provided: ProvidedValues,
    skipped: BTreeSet<String>,
}

impl<'a> Validator<'a> {
    pub fn new(rules: &'a RuleSet, tools: &'a ToolManager) -> Self {
        Self {
            rules,
            tools,
            provided: ProvidedValues::default(),
            skipped: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_provided(mut self, provided: ProvidedValues) -> Self {
        self.provided = provided;
        self
    }

    /// Disables sections by name for this run only.
    #[must_use]
    pub fn with_skipped_sections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skipped.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_enabled(&self, section: &RulesSection) -> bool {
        section.enabled && !self.skipped.contains(&section.name)
    }

    /// Runs all enabled sections with a fresh engine.
    pub fn run(
        &self,
        listener: &mut dyn ProgressListener,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut engine = Engine::new(self.rules, self.tools, &self.provided, cancel);
        self.run_with(&mut engine, listener, cancel)
    }

    /// Defines the rule-set variables, then runs all enabled sections,
    /// delegating each variable and rule to `executor`.
    pub fn run_with(
        &self,
        executor: &mut dyn RuleExecutor,
        listener: &mut dyn ProgressListener,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let started = Instant::now();
        let mut state = RunState::new(self.rules);
        let mut canceled = false;
        listener.run_started(self.rules.sections().len(), self.rules.rules().len());
        info!(
            sections = self.rules.sections().len(),
            rules = self.rules.rules().len(),
            "validation started"
        );
        for variable in self.rules.variables() {
            define_guarded(executor, variable);
        }

        for section in self.rules.sections() {
            if !self.is_enabled(section) {
                debug!(section = %section.name, "section skipped");
                listener.section_skipped(section);
                continue;
            }
            if cancel.is_canceled() {
                state.sections[section.id.index()].state = RuleState::Canceled;
                listener.section_canceled(section);
                canceled = true;
                break;
            }
            if self.run_section(section, executor, listener, cancel, &mut state) {
                canceled = true;
                break;
            }
        }

        let outcome = self.outcome(&state, canceled, started);
        info!(
            valid = outcome.is_valid(),
            canceled,
            errors = outcome.totals.error,
            warnings = outcome.totals.warning,
            infos = outcome.totals.info,
            "validation finished"
        );
        listener.run_finished(&outcome);
        outcome
    }

    /// Returns true when the run was canceled inside the section.
    fn run_section(
        &self,
        section: &RulesSection,
        executor: &mut dyn RuleExecutor,
        listener: &mut dyn ProgressListener,
        cancel: &CancellationToken,
        state: &mut RunState,
    ) -> bool {
        let span = info_span!("section", name = %section.name);
        let _guard = span.enter();
        state.sections[section.id.index()].state = RuleState::Running;
        listener.section_started(section);

        for rule in self.rules.rules_of(section) {
            if cancel.is_canceled() {
                state.rules[rule.id.index()].state = RuleState::Canceled;
                state.sections[section.id.index()].state = RuleState::Canceled;
                listener.rule_canceled(rule);
                listener.section_canceled(section);
                warn!(rule = %rule.name, "validation canceled");
                return true;
            }

            let rule_span = debug_span!("rule", name = %rule.name);
            let _rule_guard = rule_span.enter();
            state.rules[rule.id.index()].state = RuleState::Running;
            listener.rule_started(rule);

            let result = execute_guarded(executor, rule);
            let rule_counts = result.counts();
            let section_run = &mut state.sections[section.id.index()];
            section_run.counts.merge(rule_counts);
            let section_counts = section_run.counts;
            debug!(problems = result.len(), "rule finished");
            listener.rule_finished(rule, rule_counts, section_counts, &result);

            let rule_run = &mut state.rules[rule.id.index()];
            rule_run.state = RuleState::Finished;
            rule_run.result = result;
        }

        let section_run = &mut state.sections[section.id.index()];
        section_run.state = RuleState::Finished;
        listener.section_finished(section, section_run.counts);
        false
    }

    fn outcome(&self, state: &RunState, canceled: bool, started: Instant) -> RunOutcome {
        let mut totals = LevelCounts::default();
        let sections = self
            .rules
            .sections()
            .iter()
            .map(|section| {
                let section_run = &state.sections[section.id.index()];
                totals.merge(section_run.counts);
                SectionOutcome {
                    name: section.name.clone(),
                    description: section.description.clone(),
                    enabled: self.is_enabled(section),
                    state: section_run.state,
                    counts: section_run.counts,
                    rules: self
                        .rules
                        .rules_of(section)
                        .map(|rule| {
                            let rule_run = &state.rules[rule.id.index()];
                            RuleOutcome {
                                name: rule.name.clone(),
                                description: rule.description.clone(),
                                state: rule_run.state,
                                counts: rule_run.result.counts(),
                                problems: rule_run.result.clone(),
                            }
                        })
                        .collect(),
                }
            })
            .collect();
        RunOutcome {
            sections,
            totals,
            canceled,
            duration: started.elapsed(),
        }
    }
}

/// Runs one rule, turning a panic into a single ERROR so sibling rules still run.
fn execute_guarded(executor: &mut dyn RuleExecutor, rule: &Rule) -> ValidationResult {
    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(rule))) {
        Ok(result) => result,
        Err(payload) => {
            let detail = panic_detail(payload.as_ref());
            warn!(rule = %rule.name, %detail, "rule panicked");
            ValidationResult::single_error(format!("unexpected internal error: {detail}"))
        }
    }
}

/// Evaluates one variable, storing a panic as a failed evaluation.
fn define_guarded(executor: &mut dyn RuleExecutor, variable: &VariableDefinition) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| executor.define_variable(variable)));
    if let Err(payload) = result {
        let detail = panic_detail(payload.as_ref());
        warn!(variable = %variable.name, %detail, "variable evaluation panicked");
        executor.define_failed(variable, format!("unexpected internal error: {detail}"));
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
