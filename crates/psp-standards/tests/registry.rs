use std::fs;
use std::path::Path;

use psp_engine::{NoProgress, ProvidedValues, Validator};
use psp_model::{CancellationToken, DmfVersion, DocumentType, Level};
use psp_standards::{ConfigError, DetectedDmf, FdmfRegistry, UnknownFdmf, ValidatorConfig};
use psp_tools::ToolManager;

const HEADER: &str = r#"
[fdmf]
schema = "psp-validator.fdmf"
schema_version = 1
document_type = "MONOGRAPH"
"#;

const DEFINITIONS: &str = r#"
[namespaces]
i = "http://example.org/info"

[[pattern]]
name = "INFO_FILE"
expressions = [{ regex = 'info_${PSP_ID}\.xml', case_sensitive = false }]

[[variable]]
name = "PSP_ROOT"
function = "getProvidedFile"
params = { file_id = "PSP_DIR" }

[[variable]]
name = "PSP_ID"
function = "getProvidedString"
params = { string_id = "PSP_ID" }

[[variable]]
name = "INFO_FILES"
function = "findFilesInDirByPattern"
params = { dir = { ref = "PSP_ROOT" } }
patterns = { pattern = { ref = "INFO_FILE" } }

[[section]]
name = "Root directory"
description = "files in the package root"

[[section.rule]]
name = "one info file"
function = "checkFilelistExactSize"
params = { files = { ref = "INFO_FILES" }, size = 1 }

[[section.rule]]
name = "nothing else"
function = "checkNoOtherFilesInDir"
params = { dir = { ref = "PSP_ROOT" }, files = [{ ref = "INFO_FILES" }], level = { type = "LEVEL", value = "WARNING" } }

[[section]]
name = "Info"

[[section.rule]]
name = "info follows profile"
function = "checkMetadataProfile"
params = { xml_files = { ref = "INFO_FILES" }, profile = "info" }
"#;

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
"#;

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    fs::write(path, contents).expect("write fixture");
}

fn fdmf(version: &str, definitions: &str) -> String {
    format!("{HEADER}version = \"{version}\"\n{definitions}")
}

/// Config dir with monograph 1.2 and 1.10 and a stray directory.
fn config_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for version in ["1.2", "1.10"] {
        let root = dir.path().join(format!("fdmf/monograph_{version}"));
        write(&root.join("fdmf.toml"), &fdmf(version, DEFINITIONS));
        write(&root.join("metadata_profiles/info.toml"), INFO_PROFILE);
    }
    fs::create_dir_all(dir.path().join("fdmf/drafts")).expect("stray dir");
    dir
}

fn version(text: &str) -> DmfVersion {
    text.parse().expect("version")
}

#[test]
fn versions_are_ordered_numerically_and_latest_is_default() {
    let config = config_dir();
    let loaded = ValidatorConfig::load(config.path()).expect("config");
    let registry = &loaded.registry;

    assert_eq!(
        registry.versions(DocumentType::Monograph),
        vec![&version("1.2"), &version("1.10")]
    );
    let latest = registry
        .resolve(DocumentType::Monograph, None)
        .expect("latest");
    assert_eq!(latest.dmf.version, version("1.10"));
    let forced = registry
        .resolve(DocumentType::Monograph, Some(&version("1.2")))
        .expect("forced");
    assert_eq!(forced.dmf.version, version("1.2"));
    assert!(loaded.tools.definitions.is_empty());
}

#[test]
fn unknown_fdmf_names_the_key() {
    let config = config_dir();
    let registry = FdmfRegistry::load(&config.path().join("fdmf")).expect("registry");

    let missing = registry
        .resolve(DocumentType::Monograph, Some(&version("9.9")))
        .expect_err("unknown version");
    assert_eq!(missing.to_string(), "no fDMF registered for MONOGRAPH 9.9");

    let no_type = registry
        .resolve(DocumentType::AudioFono, None)
        .expect_err("unknown type");
    assert_eq!(
        no_type,
        UnknownFdmf::DocumentType {
            document_type: DocumentType::AudioFono
        }
    );
}

#[test]
fn loaded_rule_set_validates_a_package() {
    let config = config_dir();
    let registry = FdmfRegistry::load(&config.path().join("fdmf")).expect("registry");
    let fdmf = registry
        .resolve(DocumentType::Monograph, None)
        .expect("fdmf");

    let package = tempfile::tempdir().expect("package");
    write(
        &package.path().join("INFO_abc.XML"),
        r#"<info xmlns="http://example.org/info"/>"#,
    );
    write(&package.path().join("notes.txt"), "x");

    let tools = ToolManager::default();
    let outcome = Validator::new(&fdmf.rules, &tools)
        .with_provided(ProvidedValues::for_package(package.path()).with_string("PSP_ID", "abc"))
        .run(&mut NoProgress, &CancellationToken::new());

    assert!(!outcome.is_valid());
    let root = &outcome.sections[0];
    assert!(root.rules[0].problems.is_empty());
    let stray = root.rules[1].problems.problems();
    assert_eq!(stray.len(), 1);
    assert_eq!(stray[0].level, Level::Warning);
    assert!(stray[0].message.contains("notes.txt"));
    let info = outcome.sections[1].rules[0].problems.problems();
    assert_eq!(info.len(), 1);
    assert_eq!(
        info[0].message,
        "INFO_abc.XML: /i:info: expected mandatory element 'i:title' not found"
    );
}

fn load_single(definitions: &str) -> Result<FdmfRegistry, ConfigError> {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        &dir.path().join("monograph_1.2/fdmf.toml"),
        &fdmf("1.2", definitions),
    );
    FdmfRegistry::load(dir.path())
}

#[test]
fn unknown_function_is_a_configuration_error() {
    let error = load_single(
        r#"
[[section]]
name = "s"

[[section.rule]]
name = "r"
function = "checkEverything"
"#,
    )
    .expect_err("unknown function");

    assert!(
        error.to_string().ends_with("rule 's/r': unknown function 'checkEverything'"),
        "{error}"
    );
}

#[test]
fn undefined_named_pattern_is_a_configuration_error() {
    let error = load_single(
        r#"
[[variable]]
name = "FILES"
function = "findFilesInDirByPattern"
params = { dir = { type = "FILE", value = "/psp" } }
patterns = { pattern = { ref = "NOWHERE" } }
"#,
    )
    .expect_err("undefined pattern");

    assert!(matches!(error, ConfigError::InvalidDefinition { .. }), "{error}");
}

#[test]
fn invalid_regex_is_a_configuration_error() {
    let error = load_single(
        r#"
[[pattern]]
name = "BROKEN"
expressions = [{ regex = "info_(" }]
"#,
    )
    .expect_err("invalid regex");

    assert!(matches!(error, ConfigError::Pattern { .. }), "{error}");
}

#[test]
fn xpath_with_unknown_prefix_is_a_configuration_error() {
    let error = load_single(
        r#"
[[variable]]
name = "ID"
function = "getStringByXpath"
params = { xml_file = { type = "FILE", value = "/psp/info.xml" }, xpath = "/x:info" }
"#,
    )
    .expect_err("invalid xpath");

    assert!(matches!(error, ConfigError::XPath { .. }), "{error}");
}

#[test]
fn typed_value_must_match_its_type() {
    let error = load_single(
        r#"
[[section]]
name = "s"

[[section.rule]]
name = "r"
function = "checkFilelistExactSize"
params = { files = { type = "FILE_LIST", value = "not a list" }, size = 1 }
"#,
    )
    .expect_err("type mismatch");

    assert!(
        error
            .to_string()
            .ends_with("parameter 'files': expected a FILE_LIST value, found string"),
        "{error}"
    );
}

#[test]
fn duplicate_section_is_rejected() {
    let error = load_single(
        r#"
[[section]]
name = "s"

[[section]]
name = "s"
"#,
    )
    .expect_err("duplicate");

    assert!(error.to_string().ends_with("duplicate section 's'"), "{error}");
}

#[test]
fn header_must_match_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        &dir.path().join("periodical_1.6/fdmf.toml"),
        &fdmf("1.6", ""),
    );

    let error = FdmfRegistry::load(dir.path()).expect_err("mismatch");

    assert!(matches!(error, ConfigError::InvalidHeader { .. }), "{error}");
    assert!(error.to_string().contains("declares MONOGRAPH 1.6"), "{error}");
}

#[test]
fn unknown_keys_are_rejected() {
    let error = load_single(
        r#"
[[section]]
name = "s"
enabeld = false
"#,
    )
    .expect_err("unknown key");

    assert!(matches!(error, ConfigError::Toml { .. }), "{error}");
}

#[test]
fn missing_configuration_directory_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");

    let error = ValidatorConfig::load(&dir.path().join("nope")).expect_err("missing");

    assert!(matches!(error, ConfigError::DirectoryNotFound { .. }));
}

#[test]
fn shipped_configuration_loads() {
    let config = ValidatorConfig::load(&psp_standards::config_root(None)).expect("config");

    assert!(!config.registry.is_empty());
    assert!(config.registry.latest(DocumentType::Monograph).is_some());
}

/// Package whose METS and info files name the given type and version.
fn described_package(mets_type: &str, metadata_version: &str) -> tempfile::TempDir {
    let package = tempfile::tempdir().expect("package");
    write(
        &package.path().join("mets_abc.xml"),
        &format!(
            r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/" TYPE="{mets_type}"/>"#
        ),
    );
    write(
        &package.path().join("info_abc.xml"),
        &format!("<info><metadataversion> {metadata_version} </metadataversion></info>"),
    );
    package
}

#[test]
fn package_metadata_names_its_fdmf() {
    let package = described_package("Monograph", "1.2");

    let detected = DetectedDmf::from_package(package.path());

    assert_eq!(detected.document_type, Some(DocumentType::Monograph));
    assert_eq!(detected.version, Some(version("1.2")));
}

#[test]
fn package_without_metadata_detects_nothing() {
    let package = tempfile::tempdir().expect("package");
    write(&package.path().join("mets_abc.xml"), "<mets TYPE=\"Newspaper\"/>");
    write(&package.path().join("info_abc.xml"), "<info><metadataversion>");

    assert_eq!(DetectedDmf::from_package(package.path()), DetectedDmf::default());
}

#[test]
fn detected_fdmf_is_used_unless_forced() {
    let config = config_dir();
    let registry = FdmfRegistry::load(&config.path().join("fdmf")).expect("registry");
    let package = described_package("Monograph", "1.2");

    let detected = registry
        .resolve_for_package(None, None, package.path())
        .expect("detected");
    assert_eq!(detected.dmf.dir_name(), "monograph_1.2");

    let forced = registry
        .resolve_for_package(None, Some(&version("1.10")), package.path())
        .expect("forced version");
    assert_eq!(forced.dmf.dir_name(), "monograph_1.10");

    let other_type = registry
        .resolve_for_package(Some(DocumentType::Periodical), None, package.path())
        .expect_err("forced type has no fDMF");
    assert_eq!(other_type.to_string(), "no fDMF registered for PERIODICAL 1.2");
}

#[test]
fn undetected_version_falls_back_to_latest() {
    let config = config_dir();
    let registry = FdmfRegistry::load(&config.path().join("fdmf")).expect("registry");
    let package = tempfile::tempdir().expect("package");
    write(
        &package.path().join("METS_ABC.XML"),
        r#"<mets xmlns="http://www.loc.gov/METS/" TYPE="monograph"/>"#,
    );

    let resolved = registry
        .resolve_for_package(None, None, package.path())
        .expect("latest");

    assert_eq!(resolved.dmf.dir_name(), "monograph_1.10");
}

#[test]
fn undetected_type_is_reported() {
    let config = config_dir();
    let registry = FdmfRegistry::load(&config.path().join("fdmf")).expect("registry");
    let package = tempfile::tempdir().expect("package");

    let error = registry
        .resolve_for_package(None, None, package.path())
        .expect_err("nothing to detect");

    assert!(matches!(error, UnknownFdmf::Undetected { .. }), "{error}");
}
