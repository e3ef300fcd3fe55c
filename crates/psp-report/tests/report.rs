use std::path::Path;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use psp_engine::{RuleOutcome, RunOutcome, SectionOutcome};
use psp_model::{Dmf, Level, LevelCounts, RuleState, ValidationResult};
use psp_report::{
    ValidationReport, Verbosity, render_text, write_json_log, write_json_log_file, write_xml_log,
};

fn rule(name: &str, description: Option<&str>, problems: ValidationResult) -> RuleOutcome {
    RuleOutcome {
        name: name.to_string(),
        description: description.map(str::to_string),
        state: RuleState::Finished,
        counts: problems.counts(),
        problems,
    }
}

fn section(name: &str, description: Option<&str>, rules: Vec<RuleOutcome>) -> SectionOutcome {
    let mut counts = LevelCounts::default();
    for rule in &rules {
        counts.merge(rule.counts);
    }
    SectionOutcome {
        name: name.to_string(),
        description: description.map(str::to_string),
        enabled: true,
        state: RuleState::Finished,
        counts,
        rules,
    }
}

fn outcome() -> RunOutcome {
    let mut encoding = ValidationResult::new();
    encoding.add(
        Level::Warning,
        "txt_0001.txt: invalid UTF-8 sequence at byte 3 (<0xff>)",
    );
    let sections = vec![
        section(
            "Root directory",
            Some("files in the package root"),
            vec![
                rule(
                    "one info file",
                    Some("exactly one info file"),
                    ValidationResult::single_error("expected 1 files, found 0"),
                ),
                rule("nothing else", None, ValidationResult::new()),
            ],
        ),
        section(
            "Encoding",
            None,
            vec![rule("txt files in UTF-8", None, encoding)],
        ),
        section("Names", None, vec![rule("ids", None, ValidationResult::new())]),
        SectionOutcome {
            name: "Images".to_string(),
            description: None,
            enabled: false,
            state: RuleState::Waiting,
            counts: LevelCounts::default(),
            rules: Vec::new(),
        },
    ];
    let mut totals = LevelCounts::default();
    for section in &sections {
        totals.merge(section.counts);
    }
    RunOutcome {
        sections,
        totals,
        canceled: false,
        duration: Duration::from_millis(1500),
    }
}

fn dmf() -> Dmf {
    "monograph_1.2".parse().expect("dmf")
}

fn report<'a>(dmf: &'a Dmf, outcome: &'a RunOutcome) -> ValidationReport<'a> {
    let created = Utc
        .with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
        .single()
        .expect("timestamp");
    ValidationReport::new(dmf, Path::new("/data/psp/abc"), outcome).with_created(created)
}

fn header(title: &str) -> String {
    format!("\n{title}\n{}\n", "-".repeat(title.len()))
}

#[test]
fn default_verbosity_lists_sections_and_rules_with_problems() {
    let dmf = dmf();
    let outcome = outcome();

    let text = render_text(&report(&dmf, &outcome), Verbosity::default());

    let expected = [
        header("Section Root directory: 1 problem (1x ERROR)"),
        "Rule one info file: 1 problem (1x ERROR)\n".to_string(),
        "\texactly one info file\n".to_string(),
        "\tERROR: expected 1 files, found 0\n".to_string(),
        header("Section Encoding: 1 problem (1x WARNING)"),
        "Rule txt files in UTF-8: 1 problem (1x WARNING)\n".to_string(),
        "\tWARNING: txt_0001.txt: invalid UTF-8 sequence at byte 3 (<0xff>)\n".to_string(),
        "\nTotal: 2 problems (1x ERROR, 1x WARNING), package is: invalid\n".to_string(),
    ]
    .concat();
    assert_eq!(text, expected);
}

#[test]
fn section_verbosity_prints_headers_only() {
    let dmf = dmf();
    let outcome = outcome();

    let text = render_text(&report(&dmf, &outcome), Verbosity::SECTIONS);

    assert!(text.contains("Section Encoding: 1 problem (1x WARNING)"));
    assert!(!text.contains("Rule "));
    assert!(!text.contains("Section Names"));
}

#[test]
fn summary_verbosity_prints_only_the_verdict() {
    let dmf = dmf();
    let outcome = outcome();

    let text = render_text(&report(&dmf, &outcome), Verbosity::SUMMARY);

    insta::assert_snapshot!(text.trim(), @"Total: 2 problems (1x ERROR, 1x WARNING), package is: invalid");
}

#[test]
fn full_verbosity_includes_clean_sections_but_not_disabled_ones() {
    let dmf = dmf();
    let outcome = outcome();

    let text = render_text(&report(&dmf, &outcome), Verbosity::FULL);

    assert!(text.contains(&header("Section Names: no problems")));
    assert!(text.contains("Rule nothing else: no problems\n"));
    assert!(text.contains("Rule ids: no problems\n"));
    assert!(!text.contains("Images"));
}

#[test]
fn clean_run_is_valid() {
    let dmf = dmf();
    let outcome = RunOutcome {
        sections: vec![section("Names", None, Vec::new())],
        totals: LevelCounts::default(),
        canceled: false,
        duration: Duration::ZERO,
    };

    let text = render_text(&report(&dmf, &outcome), Verbosity::default());

    insta::assert_snapshot!(text.trim(), @"Total: no problems, package is: valid");
}

#[test]
fn canceled_run_is_reported_invalid() {
    let dmf = dmf();
    let mut outcome = outcome();
    outcome.canceled = true;

    let text = render_text(&report(&dmf, &outcome), Verbosity::SUMMARY);

    assert!(text.contains("\nValidation canceled\n"));
    assert!(text.ends_with("package is: invalid\n"));
}

#[test]
fn xml_log_carries_the_whole_tree() {
    let dmf = dmf();
    let outcome = outcome();
    let mut buffer = Vec::new();

    write_xml_log(&mut buffer, &report(&dmf, &outcome)).expect("xml log");
    let xml = String::from_utf8(buffer).expect("utf-8");

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("created=\"2026-03-01T10:00:00Z\""));
    assert!(xml.contains("dmf=\"monograph_1.2\""));
    assert!(xml.contains("documentType=\"MONOGRAPH\""));
    assert!(xml.contains("valid=\"false\""));
    assert!(xml.contains("durationMs=\"1500\""));
    assert!(xml.contains("<totals errors=\"1\" warnings=\"1\" infos=\"0\"/>"));
    assert!(xml.contains("<problem level=\"ERROR\">expected 1 files, found 0</problem>"));
    assert!(xml.contains("(&lt;0xff&gt;)</problem>"));
    assert!(xml.contains("<section name=\"Images\" enabled=\"false\" state=\"WAITING\""));
    assert!(xml.trim_end().ends_with("</validationLog>"));
}

#[test]
fn json_log_carries_the_whole_tree() {
    let dmf = dmf();
    let outcome = outcome();
    let mut buffer = Vec::new();

    write_json_log(&mut buffer, &report(&dmf, &outcome)).expect("json log");
    let value: serde_json::Value = serde_json::from_slice(&buffer).expect("valid json");

    insta::assert_snapshot!(value["created"].as_str().expect("created"), @"2026-03-01T10:00:00Z");
    assert_eq!(value["dmf"], "monograph_1.2");
    assert_eq!(value["document_type"], "MONOGRAPH");
    assert_eq!(value["version"], "1.2");
    assert_eq!(value["package"], "/data/psp/abc");
    assert_eq!(value["valid"], false);
    assert_eq!(value["duration_ms"], 1500);
    assert_eq!(value["totals"]["error"], 1);
    assert_eq!(value["sections"].as_array().map(Vec::len), Some(4));
    let problem = &value["sections"][0]["rules"][0]["problems"][0];
    assert_eq!(problem["level"], "ERROR");
    assert_eq!(problem["message"], "expected 1 files, found 0");
    assert_eq!(value["sections"][3]["state"], "WAITING");
}

#[test]
fn json_log_file_is_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("log.json");
    let dmf = dmf();
    let outcome = outcome();

    write_json_log_file(&path, &report(&dmf, &outcome)).expect("json file");

    let contents = std::fs::read_to_string(&path).expect("read log");
    assert!(contents.contains("\"dmf\": \"monograph_1.2\""));
}
