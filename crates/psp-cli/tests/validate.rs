use std::fs;
use std::path::{Path, PathBuf};

use psp_cli::{ProgressReporter, ToolPath, ValidateRequest, package_id, validate_package};
use psp_engine::{NoProgress, RunOutcome, SectionOutcome};
use psp_model::{CancellationToken, DocumentType};
use psp_tools::ExternalTool;

fn shipped_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config")
}

/// Package `abc123` holding the two root XML files and nothing else.
fn package() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("abc123");
    fs::create_dir_all(&root).expect("package dir");
    fs::write(
        root.join("info_abc123.xml"),
        "<info><created>2026-01-01T00:00:00</created></info>",
    )
    .expect("info");
    fs::write(root.join("mets_abc123.xml"), "<mets/>").expect("mets");
    (dir, root)
}

fn section<'a>(outcome: &'a RunOutcome, name: &str) -> &'a SectionOutcome {
    outcome
        .sections
        .iter()
        .find(|section| section.name == name)
        .expect("section present")
}

#[test]
fn tool_path_parses_name_and_directory() {
    let parsed: ToolPath = "jpylyzer=/opt/jpylyzer".parse().expect("tool path");
    assert_eq!(parsed.tool, ExternalTool::Jpylyzer);
    assert_eq!(parsed.dir, PathBuf::from("/opt/jpylyzer"));

    let dashed: ToolPath = "image-magick = /usr/local/bin".parse().expect("dashed name");
    assert_eq!(dashed.tool, ExternalTool::ImageMagick);
    assert_eq!(dashed.dir, PathBuf::from("/usr/local/bin"));
}

#[test]
fn malformed_tool_paths_are_rejected() {
    let missing = "jpylyzer".parse::<ToolPath>().expect_err("no separator");
    assert_eq!(missing, "expected NAME=DIR, got 'jpylyzer'");
    assert!("photoshop=/opt".parse::<ToolPath>().is_err());
    let empty = "kakadu=".parse::<ToolPath>().expect_err("empty dir");
    assert_eq!(empty, "empty directory for tool 'kakadu'");
}

#[test]
fn package_id_is_the_directory_name() {
    assert_eq!(
        package_id(Path::new("/data/psp/abc123/")),
        Some("abc123".to_string())
    );
}

#[test]
fn shipped_monograph_rules_flag_an_incomplete_package() {
    let (_dir, root) = package();
    let mut request = ValidateRequest::new(shipped_config(), &root);
    request.document_type = Some(DocumentType::Monograph);

    let run = validate_package(&request, &mut NoProgress, &CancellationToken::new())
        .expect("validation run");

    assert_eq!(run.psp_id, "abc123");
    assert_eq!(run.dmf.dir_name(), "monograph_1.2");
    assert!(!run.outcome.is_valid());
    let names: Vec<&str> = run
        .outcome
        .sections
        .iter()
        .map(|section| section.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Root directory",
            "Directories",
            "File names",
            "Encoding",
            "Info",
            "METS",
            "Images"
        ]
    );

    let root_section = section(&run.outcome, "Root directory");
    let rule = |name: &str| {
        root_section
            .rules
            .iter()
            .find(|rule| rule.name == name)
            .expect("rule present")
    };
    assert!(rule("one info file").problems.is_empty());
    assert!(rule("one main METS").problems.is_empty());
    let checksum = rule("one checksum file").problems.problems();
    assert_eq!(checksum.len(), 1);
    assert_eq!(checksum[0].to_string(), "ERROR: expected 1 files, found 0");
    assert!(section(&run.outcome, "Directories").has_errors());
}

#[test]
fn skipped_sections_do_not_run() {
    let (_dir, root) = package();
    let mut request = ValidateRequest::new(shipped_config(), &root);
    request.document_type = Some(DocumentType::Monograph);
    request.skipped_sections = vec!["Images".to_string(), "Encoding".to_string()];
    request.psp_id = Some("abc123".to_string());

    let run = validate_package(&request, &mut NoProgress, &CancellationToken::new())
        .expect("validation run");

    for name in ["Images", "Encoding"] {
        let skipped = section(&run.outcome, name);
        assert!(!skipped.enabled);
        assert_eq!(skipped.counts.total(), 0);
    }
    assert!(section(&run.outcome, "Info").enabled);
}

#[test]
fn progress_reporter_counts_every_rule() {
    let (_dir, root) = package();
    let mut request = ValidateRequest::new(shipped_config(), &root);
    request.document_type = Some(DocumentType::Monograph);
    request.skipped_sections = vec!["Images".to_string()];
    let mut reporter = ProgressReporter::hidden();

    validate_package(&request, &mut reporter, &CancellationToken::new()).expect("validation run");

    let length = reporter.length().expect("length set at run start");
    assert!(length > 0);
    assert_eq!(reporter.position(), length);
}

#[test]
fn unknown_version_fails_before_any_rule() {
    let (_dir, root) = package();
    let mut request = ValidateRequest::new(shipped_config(), &root);
    request.document_type = Some(DocumentType::Monograph);
    request.version = Some("9.9".parse().expect("version"));

    let error = validate_package(&request, &mut NoProgress, &CancellationToken::new())
        .expect_err("unknown fDMF");

    insta::assert_snapshot!(error.to_string(), @"no fDMF registered for MONOGRAPH 9.9");
}

#[test]
fn missing_package_directory_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let request = ValidateRequest::new(shipped_config(), dir.path().join("missing"));

    let error = validate_package(&request, &mut NoProgress, &CancellationToken::new())
        .expect_err("missing package");

    assert!(error.to_string().ends_with("does not exist or is not a directory"));
}

#[test]
fn fdmf_is_detected_from_package_metadata() {
    let (_dir, root) = package();
    fs::write(
        root.join("mets_abc123.xml"),
        r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/" TYPE="Monograph"/>"#,
    )
    .expect("mets");
    fs::write(
        root.join("info_abc123.xml"),
        "<info><metadataversion>1.2</metadataversion></info>",
    )
    .expect("info");
    let request = ValidateRequest::new(shipped_config(), &root);

    let run = validate_package(&request, &mut NoProgress, &CancellationToken::new())
        .expect("validation run");

    assert_eq!(run.dmf.dir_name(), "monograph_1.2");
}

#[test]
fn undetectable_package_needs_a_forced_type() {
    let (_dir, root) = package();
    let request = ValidateRequest::new(shipped_config(), &root);

    let error = validate_package(&request, &mut NoProgress, &CancellationToken::new())
        .expect_err("no document type");

    assert!(error.to_string().contains("could not be detected"), "{error}");
}
