use std::fs;
use std::path::Path;

use psp_engine::{
    Bindings, Engine, EvaluationFunction, EvaluationKind, NoProgress, Pattern, ProgressListener,
    ProvidedValues, Rule, RuleExecutor, RuleSet, RulesSection, ValidationFunction,
    ValidationKind, Validator, Value, VariableDefinition,
};
use psp_model::{CancellationToken, Level, LevelCounts, RuleState, ValidationResult};
use psp_profile::MetadataProfile;
use psp_tools::ToolManager;

const INFO_PROFILE: &str = r#"
[profile]
schema = "psp-validator.metadata-profile"
schema_version = 1
name = "info"

[namespaces]
i = "http://example.org/info"

[root]
name = "i:info"

[[root.children]]
name = "i:title"

[[root.children]]
name = "i:created"
mandatory = false
"#;

fn write(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write fixture");
}

/// A package with one info file, a data directory and one stray file.
fn package() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        &dir.path().join("info_abc001.xml"),
        r#"<info xmlns="http://example.org/info"><title>Kronika</title></info>"#,
    );
    fs::create_dir(dir.path().join("data")).expect("data dir");
    write(&dir.path().join("stray.txt"), "left behind");
    dir
}

fn rule_set() -> RuleSet {
    let mut builder = RuleSet::builder();
    builder.namespace("i", "http://example.org/info");
    builder
        .pattern("data_dir", Pattern::single("data").expect("pattern"))
        .expect("pattern");
    builder
        .metadata_profile(MetadataProfile::from_toml_str(INFO_PROFILE).expect("profile"))
        .expect("profile");

    builder
        .variable(
            "PSP_ROOT",
            EvaluationFunction::new(
                EvaluationKind::GetProvidedFile,
                Bindings::new().constant("file_id", Value::String("PSP_DIR".to_string())),
            ),
        )
        .expect("variable");
    builder
        .variable(
            "PSP_ID",
            EvaluationFunction::new(
                EvaluationKind::GetProvidedString,
                Bindings::new().constant("string_id", Value::String("PSP_ID".to_string())),
            ),
        )
        .expect("variable");
    builder
        .variable(
            "INFO_FILES",
            EvaluationFunction::new(
                EvaluationKind::FindFilesInDirByPattern,
                Bindings::new()
                    .reference("dir", "PSP_ROOT")
                    .pattern("pattern", Pattern::single(r"info_${PSP_ID}\.xml").expect("p")),
            ),
        )
        .expect("variable");
    builder
        .variable(
            "DATA_DIRS",
            EvaluationFunction::new(
                EvaluationKind::FindFilesInDirByPattern,
                Bindings::new()
                    .reference("dir", "PSP_ROOT")
                    .named_pattern("pattern", "data_dir"),
            ),
        )
        .expect("variable");

    let structure = builder
        .section("structure", Some("package layout".to_string()), true)
        .expect("section");
    builder
        .rule(
            structure,
            "root is a directory",
            None,
            ValidationFunction::new(
                ValidationKind::CheckFileIsDir,
                Bindings::new().reference("file", "PSP_ROOT"),
            ),
        )
        .expect("rule");
    builder
        .rule(
            structure,
            "one info file",
            None,
            ValidationFunction::new(
                ValidationKind::CheckFilelistExactSize,
                Bindings::new()
                    .reference("files", "INFO_FILES")
                    .constant("size", Value::Integer(1)),
            ),
        )
        .expect("rule");
    builder
        .rule(
            structure,
            "no other files",
            None,
            ValidationFunction::new(
                ValidationKind::CheckNoOtherFilesInDir,
                Bindings::new()
                    .reference("dir", "PSP_ROOT")
                    .reference("files", "INFO_FILES")
                    .reference("files", "DATA_DIRS")
                    .constant("level", Value::Level(Level::Warning)),
            ),
        )
        .expect("rule");

    let disabled = builder
        .section("disabled", None, false)
        .expect("section");
    builder
        .rule(
            disabled,
            "never runs",
            None,
            ValidationFunction::new(
                ValidationKind::CheckFileIsDir,
                Bindings::new().constant("file", Value::File("/psp/does/not/exist".into())),
            ),
        )
        .expect("rule");

    let metadata = builder.section("metadata", None, true).expect("section");
    builder
        .rule(
            metadata,
            "info is well formed",
            None,
            ValidationFunction::new(
                ValidationKind::CheckXmlIsWellFormed,
                Bindings::new().reference("xml_files", "INFO_FILES"),
            ),
        )
        .expect("rule");
    builder
        .rule(
            metadata,
            "info matches profile",
            None,
            ValidationFunction::new(
                ValidationKind::CheckMetadataProfile,
                Bindings::new()
                    .reference("xml_files", "INFO_FILES")
                    .constant("profile", Value::String("info".to_string())),
            ),
        )
        .expect("rule");

    builder.build()
}

fn provided(package: &Path) -> ProvidedValues {
    ProvidedValues::for_package(package).with_string("PSP_ID", "abc001")
}

#[test]
fn package_run_collects_problems_per_rule() {
    let package = package();
    let rules = rule_set();
    let tools = ToolManager::default();

    let outcome = Validator::new(&rules, &tools)
        .with_provided(provided(package.path()))
        .run(&mut NoProgress, &CancellationToken::new());

    assert!(outcome.is_valid(), "{outcome:#?}");
    assert_eq!(outcome.totals.warning, 1);
    assert_eq!(outcome.totals.info, 1);

    let structure = &outcome.sections[0];
    assert_eq!(structure.state, RuleState::Finished);
    let stray = &structure.rules[2].problems.problems()[0];
    assert_eq!(stray.level, Level::Warning);
    assert!(stray.message.starts_with("unexpected file 'stray.txt' in "), "{}", stray.message);

    let metadata = &outcome.sections[2];
    assert_eq!(
        metadata.rules[1].problems.problems()[0].message,
        "info_abc001.xml: /i:info: expected recommended element 'i:created' not found"
    );
}

#[test]
fn disabled_section_contributes_nothing() {
    let package = package();
    let rules = rule_set();
    let tools = ToolManager::default();

    let outcome = Validator::new(&rules, &tools)
        .with_provided(provided(package.path()))
        .run(&mut NoProgress, &CancellationToken::new());

    let disabled = &outcome.sections[1];
    assert!(!disabled.enabled);
    assert_eq!(disabled.state, RuleState::Waiting);
    assert_eq!(disabled.counts, LevelCounts::default());
    assert_eq!(disabled.rules[0].state, RuleState::Waiting);
    assert!(disabled.rules[0].problems.is_empty());
    assert_eq!(outcome.enabled_sections().count(), 2);
}

#[test]
fn skipped_section_is_not_run_and_definition_is_untouched() {
    let package = package();
    let rules = rule_set();
    let tools = ToolManager::default();

    let outcome = Validator::new(&rules, &tools)
        .with_provided(provided(package.path()))
        .with_skipped_sections(["metadata"])
        .run(&mut NoProgress, &CancellationToken::new());

    let metadata = &outcome.sections[2];
    assert!(!metadata.enabled);
    assert!(metadata.rules.iter().all(|rule| rule.state == RuleState::Waiting));
    assert!(rules.section_named("metadata").expect("section").enabled);
}

#[test]
fn missing_provided_value_fails_only_dependent_rules() {
    let package = package();
    let rules = rule_set();
    let tools = ToolManager::default();

    let outcome = Validator::new(&rules, &tools)
        .with_provided(ProvidedValues::for_package(package.path()))
        .run(&mut NoProgress, &CancellationToken::new());

    let structure = &outcome.sections[0];
    assert!(structure.rules[0].problems.is_empty());
    let size = structure.rules[1].problems.problems();
    assert_eq!(size.len(), 1);
    assert_eq!(size[0].level, Level::Error);
    assert!(size[0].message.contains("INFO_FILES"), "{}", size[0].message);
}

#[test]
fn contract_violation_is_a_single_error() {
    let mut builder = RuleSet::builder();
    let section = builder.section("s", None, true).expect("section");
    builder
        .rule(
            section,
            "two sizes",
            None,
            ValidationFunction::new(
                ValidationKind::CheckFilelistExactSize,
                Bindings::new()
                    .constant("files", Value::FileList(Vec::new()))
                    .constant("size", Value::Integer(1))
                    .constant("size", Value::Integer(2)),
            ),
        )
        .expect("rule");
    let rules = builder.build();
    let tools = ToolManager::default();

    let outcome = Validator::new(&rules, &tools).run(&mut NoProgress, &CancellationToken::new());

    let problems = outcome.sections[0].rules[0].problems.problems();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].level, Level::Error);
    insta::assert_snapshot!(
        problems[0].message.as_str(),
        @"contract not met: parameter 'size' bound 2 times, expected [1, 1]"
    );
}

/// Cancels the run as soon as the first rule finishes.
struct CancelAfterFirstRule {
    cancel: CancellationToken,
    events: Vec<String>,
}

impl ProgressListener for CancelAfterFirstRule {
    fn section_started(&mut self, section: &RulesSection) {
        self.events.push(format!("section started {}", section.name));
    }

    fn rule_finished(
        &mut self,
        rule: &Rule,
        _rule_counts: LevelCounts,
        _section_counts: LevelCounts,
        _result: &ValidationResult,
    ) {
        self.events.push(format!("rule finished {}", rule.name));
        self.cancel.cancel();
    }

    fn rule_canceled(&mut self, rule: &Rule) {
        self.events.push(format!("rule canceled {}", rule.name));
    }

    fn section_canceled(&mut self, section: &RulesSection) {
        self.events.push(format!("section canceled {}", section.name));
    }
}

#[test]
fn cancellation_stops_at_the_next_rule() {
    let package = package();
    let rules = rule_set();
    let tools = ToolManager::default();
    let cancel = CancellationToken::new();
    let mut listener = CancelAfterFirstRule {
        cancel: cancel.clone(),
        events: Vec::new(),
    };

    let outcome = Validator::new(&rules, &tools)
        .with_provided(provided(package.path()))
        .run(&mut listener, &cancel);

    assert!(outcome.canceled);
    assert!(!outcome.is_valid());
    assert_eq!(
        listener.events,
        vec![
            "section started structure",
            "rule finished root is a directory",
            "rule canceled one info file",
            "section canceled structure",
        ]
    );
    let structure = &outcome.sections[0];
    assert_eq!(structure.state, RuleState::Canceled);
    assert_eq!(structure.rules[0].state, RuleState::Finished);
    assert_eq!(structure.rules[1].state, RuleState::Canceled);
    assert_eq!(structure.rules[2].state, RuleState::Waiting);
    assert_eq!(outcome.sections[2].state, RuleState::Waiting);
}

/// Panics on one named rule and reports nothing for the others.
struct PanicsOn(&'static str);

impl RuleExecutor for PanicsOn {
    fn execute(&mut self, rule: &Rule) -> ValidationResult {
        if rule.name == self.0 {
            panic!("index out of bounds");
        }
        ValidationResult::new()
    }
}

#[test]
fn panicking_rule_becomes_an_error_and_siblings_still_run() {
    let rules = rule_set();
    let tools = ToolManager::default();

    let outcome = Validator::new(&rules, &tools).run_with(
        &mut PanicsOn("one info file"),
        &mut NoProgress,
        &CancellationToken::new(),
    );

    let structure = &outcome.sections[0];
    assert_eq!(
        structure.rules[1].problems.problems()[0].message,
        "unexpected internal error: index out of bounds"
    );
    assert_eq!(structure.rules[2].state, RuleState::Finished);
    assert_eq!(outcome.totals.error, 1);
}

/// Delegates to a real engine but panics while evaluating one variable.
struct PanicsOnVariable<'a> {
    engine: Engine<'a>,
    variable: &'static str,
}

impl RuleExecutor for PanicsOnVariable<'_> {
    fn define_variable(&mut self, variable: &VariableDefinition) {
        if variable.name == self.variable {
            panic!("directory listing exploded");
        }
        self.engine.define_variable(variable);
    }

    fn define_failed(&mut self, variable: &VariableDefinition, message: String) {
        self.engine.define_failed(variable, message);
    }

    fn execute(&mut self, rule: &Rule) -> ValidationResult {
        self.engine.validate(&rule.function)
    }
}

#[test]
fn panicking_variable_fails_only_rules_that_use_it() {
    let package = package();
    let rules = rule_set();
    let tools = ToolManager::default();
    let provided = provided(package.path());
    let cancel = CancellationToken::new();
    let mut executor = PanicsOnVariable {
        engine: Engine::new(&rules, &tools, &provided, &cancel),
        variable: "INFO_FILES",
    };

    let outcome = Validator::new(&rules, &tools).run_with(&mut executor, &mut NoProgress, &cancel);

    let structure = &outcome.sections[0];
    assert!(structure.rules[0].problems.is_empty());
    let size = structure.rules[1].problems.problems();
    assert_eq!(size.len(), 1);
    assert_eq!(size[0].level, Level::Error);
    assert_eq!(
        size[0].message,
        "variable 'INFO_FILES' could not be evaluated: unexpected internal error: directory listing exploded"
    );
    assert_eq!(structure.rules[2].state, RuleState::Finished);
    assert_eq!(outcome.sections[2].state, RuleState::Finished);
}
