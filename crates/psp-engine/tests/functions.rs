use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use psp_engine::{
    Bindings, Engine, EvaluationFunction, EvaluationKind, Expression, NoProgress, Pattern,
    ProvidedValues, RuleSet, ValidationFunction, ValidationKind, Validator, Value, ValueType,
};
use psp_model::{CancellationToken, Level, ValidationResult};
use psp_tools::{BinaryFileProfile, ToolManager};

fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn messages(result: &ValidationResult) -> Vec<String> {
    result.problems().iter().map(ToString::to_string).collect()
}

fn files(paths: &[&PathBuf]) -> Value {
    Value::FileList(paths.iter().map(|path| (*path).clone()).collect())
}

struct Fixture {
    rules: RuleSet,
    tools: ToolManager,
    provided: ProvidedValues,
    cancel: CancellationToken,
}

impl Fixture {
    fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            tools: ToolManager::default(),
            provided: ProvidedValues::default()
                .with_string("PSP_ID", "abc")
                .with_integer("PAGES", 3),
            cancel: CancellationToken::new(),
        }
    }

    fn engine(&self) -> Engine<'_> {
        Engine::new(&self.rules, &self.tools, &self.provided, &self.cancel)
    }
}

#[test]
fn provided_values_are_typed() {
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();

    let pages = engine.evaluate(&EvaluationFunction::new(
        EvaluationKind::GetProvidedInteger,
        Bindings::new().constant("int_id", Value::String("PAGES".to_string())),
    ));
    assert_eq!(pages.data(), Some(&Value::Integer(3)));

    let missing = engine.evaluate(&EvaluationFunction::new(
        EvaluationKind::GetProvidedFile,
        Bindings::new().constant("file_id", Value::String("PSP_DIR".to_string())),
    ));
    assert_eq!(missing.value_type(), ValueType::File);
    assert_eq!(missing.error_message(), Some("file 'PSP_DIR' was not provided"));
    assert!(missing.data().is_none());
}

#[test]
fn file_lists_are_merged_without_duplicates() {
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();
    let a = PathBuf::from("/p/a.xml");
    let b = PathBuf::from("/p/b.xml");

    let merged = engine.evaluate(&EvaluationFunction::new(
        EvaluationKind::MergeFileLists,
        Bindings::new()
            .constant("files", files(&[&a, &b]))
            .constant("files", files(&[&b, &a])),
    ));
    assert_eq!(merged.data(), Some(&Value::FileList(vec![a, b])));

    let first = engine.evaluate(&EvaluationFunction::new(
        EvaluationKind::GetFirstFileFromFileList,
        Bindings::new().constant("files", Value::FileList(Vec::new())),
    ));
    assert_eq!(first.error_message(), Some("file list is empty"));
}

#[test]
fn string_is_read_by_xpath_with_rule_set_prefixes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let info = write(
        dir.path(),
        "info.xml",
        br#"<info xmlns="http://example.org/info"><packageid>abc</packageid></info>"#,
    );
    let mut builder = RuleSet::builder();
    builder.namespace("i", "http://example.org/info");
    let fixture = Fixture::new(builder.build());
    let mut engine = fixture.engine();

    let id = engine.evaluate(&EvaluationFunction::new(
        EvaluationKind::GetStringByXpath,
        Bindings::new()
            .constant("xml_file", Value::File(info.clone()))
            .constant("xpath", Value::String("/i:info/i:packageid".to_string())),
    ));
    assert_eq!(id.data(), Some(&Value::String("abc".to_string())));

    let broken = engine.evaluate(&EvaluationFunction::new(
        EvaluationKind::GetStringByXpath,
        Bindings::new()
            .constant("xml_file", Value::File(info))
            .constant("xpath", Value::String("/x:info".to_string())),
    ));
    let message = broken.error_message().expect("invalid xpath");
    assert!(message.starts_with("xpath '/x:info' is invalid"), "{message}");
}

#[test]
fn file_names_are_matched_against_pattern() {
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();
    let pattern = Pattern::new(vec![Expression::new(r"[a-z]+_[0-9]{4}\.jp2", false).expect("e")])
        .expect("pattern");

    let result = engine.validate(&ValidationFunction::new(
        ValidationKind::CheckAllFilenamesMatch,
        Bindings::new()
            .constant(
                "files",
                Value::FileList(vec!["/p/mc_0001.JP2".into(), "/p/mc_1.jp2".into()]),
            )
            .constant("level", Value::Level(Level::Warning))
            .pattern("pattern", pattern),
    ));

    assert_eq!(
        messages(&result),
        vec![
            r"WARNING: file name 'mc_1.jp2' does not match '[a-z]+_[0-9]{4}\.jp2' (case-insensitive)"
                .to_string()
        ]
    );
}

#[test]
fn exact_size_uses_default_error_level() {
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();

    let result = engine.validate(&ValidationFunction::new(
        ValidationKind::CheckFilelistExactSize,
        Bindings::new()
            .constant("files", Value::FileList(vec!["/p/a.xml".into(), "/p/b.xml".into()]))
            .constant("size", Value::Integer(1)),
    ));

    assert_eq!(
        messages(&result),
        vec!["ERROR: expected 1 files, found 2: a.xml, b.xml".to_string()]
    );
}

#[test]
fn encoding_and_well_formedness_are_checked_per_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = write(dir.path(), "good.xml", "<a>žluťoučký</a>".as_bytes());
    let latin = write(dir.path(), "latin.xml", b"<a>\xe9</a>");
    let broken = write(dir.path(), "broken.xml", b"<a><b></a>");
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();

    let utf8 = engine.validate(&ValidationFunction::new(
        ValidationKind::CheckAllFilesInUtf8,
        Bindings::new().constant("files", files(&[&good, &latin, &broken])),
    ));
    assert_eq!(utf8.len(), 1);
    assert!(utf8.problems()[0].message.contains("latin.xml"));
    assert!(utf8.problems()[0].message.ends_with("at offset 3"));

    let well_formed = engine.validate(&ValidationFunction::new(
        ValidationKind::CheckXmlIsWellFormed,
        Bindings::new().constant("xml_files", files(&[&good, &latin, &broken])),
    ));
    assert_eq!(well_formed.len(), 2);
    assert!(well_formed.problems().iter().all(|p| p.level == Level::Error));
}

#[test]
fn missing_directory_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write(dir.path(), "a.txt", b"x");
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();

    let result = engine.validate(&ValidationFunction::new(
        ValidationKind::CheckFileIsDir,
        Bindings::new().constant("file", Value::File(file.clone())),
    ));
    assert_eq!(
        messages(&result),
        vec![format!("ERROR: {} is not a directory", file.display())]
    );

    let listing = engine.validate(&ValidationFunction::new(
        ValidationKind::CheckNoOtherFilesInDir,
        Bindings::new().constant("dir", Value::File(dir.path().join("nope"))),
    ));
    assert_eq!(listing.len(), 1);
    assert!(listing.problems()[0].message.ends_with("does not exist or is not a directory"));
}

#[test]
fn unknown_profiles_are_errors() {
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();

    let result = engine.validate(&ValidationFunction::new(
        ValidationKind::CheckMetadataProfile,
        Bindings::new()
            .constant("xml_files", Value::FileList(vec!["/p/mets.xml".into()]))
            .constant("profile", Value::String("mets".to_string())),
    ));
    assert_eq!(
        messages(&result),
        vec!["ERROR: metadata profile 'mets' is not defined".to_string()]
    );
}

#[test]
fn binary_profile_without_tool_fails_each_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let profile_path = write(
        dir.path(),
        "jp2.toml",
        br#"
[profile]
schema = "psp-validator.binary-profile"
schema_version = 1
name = "jp2_master"
tool = "jpylyzer"

[[rule]]
name = "valid"
extraction = { type = "raw" }
constraint = { type = "constant", value = "True" }
"#,
    );
    let mut builder = RuleSet::builder();
    builder
        .binary_profile(BinaryFileProfile::load(&profile_path).expect("profile"))
        .expect("register");
    let fixture = Fixture::new(builder.build());
    let mut engine = fixture.engine();

    let result = engine.validate(&ValidationFunction::new(
        ValidationKind::CheckBinaryFilesByProfile,
        Bindings::new()
            .constant(
                "files",
                Value::FileList(vec!["/p/mc_0001.jp2".into(), "/p/mc_0002.jp2".into()]),
            )
            .constant("profile", Value::String("jp2_master".to_string())),
    ));

    assert_eq!(
        messages(&result),
        vec![
            "ERROR: mc_0001.jp2: execution of jpylyzer is not defined".to_string(),
            "ERROR: mc_0002.jp2: execution of jpylyzer is not defined".to_string(),
        ]
    );
}

#[test]
fn undefined_named_pattern_is_an_undefined_variable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();

    let found = engine.evaluate(&EvaluationFunction::new(
        EvaluationKind::FindFilesInDirByPattern,
        Bindings::new()
            .constant("dir", Value::File(dir.path().to_path_buf()))
            .named_pattern("pattern", "MISSING"),
    ));

    assert_eq!(found.error_message(), Some("variable 'MISSING' is not defined"));
}

#[test]
fn documents_are_parsed_once_per_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let info = write(dir.path(), "info.xml", b"<info><title>Kronika</title></info>");
    let fixture = Fixture::new(RuleSet::default());
    let mut engine = fixture.engine();

    let first = engine.document(&info).expect("parsed");
    write(dir.path(), "info.xml", b"<info><title>");
    let second = engine.document(&info).expect("cached");

    assert!(Arc::ptr_eq(&first, &second));
    let fresh = fixture.engine().document(&info);
    assert!(fresh.is_err(), "a new run parses the file again");
}

#[test]
fn invalid_xpath_reaching_a_rule_is_one_error_naming_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let info = write(dir.path(), "info.xml", b"<info/>");
    let mut builder = RuleSet::builder();
    builder
        .variable(
            "PROFILE_NAME",
            EvaluationFunction::new(
                EvaluationKind::GetStringByXpath,
                Bindings::new()
                    .constant("xml_file", Value::File(info.clone()))
                    .constant("xpath", Value::String("/info[@".to_string())),
            ),
        )
        .expect("variable");
    let section = builder.section("metadata", None, true).expect("section");
    builder
        .rule(
            section,
            "info matches profile",
            None,
            ValidationFunction::new(
                ValidationKind::CheckMetadataProfile,
                Bindings::new()
                    .constant("xml_files", files(&[&info]))
                    .reference("profile", "PROFILE_NAME"),
            ),
        )
        .expect("rule");
    let rules = builder.build();
    let tools = ToolManager::default();

    let outcome = Validator::new(&rules, &tools)
        .run(&mut NoProgress, &CancellationToken::new());

    let problems = outcome.sections[0].rules[0].problems.problems();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].level, Level::Error);
    assert!(
        problems[0]
            .message
            .starts_with("variable 'PROFILE_NAME' could not be evaluated: xpath '/info[@' is invalid"),
        "{}",
        problems[0].message
    );
}
