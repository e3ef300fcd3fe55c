use psp_model::{Level, ValidationResult};
use psp_profile::{MetadataProfile, ProfileError, validate};
use psp_xml::XmlDocument;

const HEADER: &str = r#"
[profile]
schema = "psp-validator.metadata-profile"
schema_version = 1
name = "test"

[namespaces]
ns = "http://example.org/ns"
"#;

fn profile(body: &str) -> MetadataProfile {
    MetadataProfile::from_toml_str(&format!("{HEADER}\n{body}")).expect("load profile")
}

fn check(profile: &MetadataProfile, xml: &str) -> ValidationResult {
    let document = XmlDocument::parse(xml).expect("parse xml");
    validate(profile, &document)
}

fn messages(result: &ValidationResult, level: Level) -> Vec<String> {
    result
        .problems()
        .iter()
        .filter(|problem| problem.level == level)
        .map(|problem| problem.message.clone())
        .collect()
}

#[test]
fn duplicate_non_repeatable_element_is_one_error() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.children]]
name = "ns:Title"
repeatable = false
"#,
    );
    let result = check(
        &profile,
        r#"<r:Record xmlns:r="http://example.org/ns"><r:Title>A</r:Title><r:Title>B</r:Title></r:Record>"#,
    );
    assert_eq!(result.len(), 1, "{result:?}");
    assert_eq!(
        messages(&result, Level::Error),
        vec!["/ns:Record: multiple occurrences of non-repeatable element 'ns:Title'".to_string()]
    );
}

#[test]
fn missing_mandatory_attribute_is_the_only_problem() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.attributes]]
name = "id"
mandatory = true
"#,
    );
    let result = check(&profile, r#"<Record xmlns="http://example.org/ns"/>"#);
    assert_eq!(result.len(), 1);
    assert_eq!(
        messages(&result, Level::Error),
        vec!["/ns:Record: mandatory attribute 'id' not found".to_string()]
    );
}

#[test]
fn recommended_attribute_missing_is_info() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.attributes]]
name = "lang"
mandatory = false
"#,
    );
    let result = check(&profile, r#"<Record xmlns="http://example.org/ns"/>"#);
    assert!(!result.has_errors());
    assert_eq!(
        messages(&result, Level::Info),
        vec!["/ns:Record: recommended attribute 'lang' not found".to_string()]
    );
}

#[test]
fn missing_elements_follow_mandatory_flag_and_custom_message() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.children]]
name = "ns:Identifier"
error_message = "every record needs an identifier"

[[root.children]]
name = "ns:Note"
mandatory = false
"#,
    );
    let result = check(&profile, r#"<Record xmlns="http://example.org/ns"/>"#);
    assert_eq!(
        messages(&result, Level::Error),
        vec![
            "/ns:Record: expected mandatory element 'ns:Identifier' not found: every record needs an identifier"
                .to_string()
        ]
    );
    assert_eq!(
        messages(&result, Level::Info),
        vec!["/ns:Record: expected recommended element 'ns:Note' not found".to_string()]
    );
}

#[test]
fn unexpected_nodes_are_warnings_unless_ignored() {
    let strict = profile(
        r#"
[root]
name = "ns:Record"
"#,
    );
    let xml = r#"<Record xmlns="http://example.org/ns" xmlns:x="urn:x" status="draft"><Extra a="1" b="2"/></Record>"#;
    let result = check(&strict, xml);
    assert_eq!(
        messages(&result, Level::Warning),
        vec![
            "/ns:Record: unexpected attribute 'status'".to_string(),
            "/ns:Record: unexpected element 'Extra' (a=\"1\", b=\"2\")".to_string(),
        ]
    );

    let lenient = profile(
        r#"
[root]
name = "ns:Record"
ignore_unexpected_attributes = true
ignore_unexpected_children = true
"#,
    );
    assert!(check(&lenient, xml).is_empty());
}

#[test]
fn elements_are_consumed_by_the_first_matching_definition() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.children]]
name = "ns:Title"
predicate = "@type='main'"

[[root.children.attributes]]
name = "type"

[[root.children]]
name = "ns:Title"
repeatable = true

[[root.children.attributes]]
name = "type"
expected = { type = "constant", value = "alternative" }
"#,
    );
    let result = check(
        &profile,
        r#"<Record xmlns="http://example.org/ns">
             <Title type="main">A</Title>
             <Title type="alternative">B</Title>
             <Title type="alternative">C</Title>
           </Record>"#,
    );
    // The main title is consumed by the first definition, so the attribute
    // constraint of the second definition never sees it.
    assert!(result.is_empty(), "{result:?}");
}

#[test]
fn attribute_and_content_constraints_use_their_levels() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.children]]
name = "ns:Year"
expected = { type = "int_range", min = 1800, max = 2100 }

[[root.children]]
name = "ns:Lang"
recommended = { type = "one_of", values = ["cze", "eng"] }

[[root.children.attributes]]
name = "authority"
expected = { type = "constant", value = "iso639-2b" }
"#,
    );
    let result = check(
        &profile,
        r#"<Record xmlns="http://example.org/ns"><Year>1700</Year><Lang authority="rfc">ger</Lang></Record>"#,
    );
    assert_eq!(
        messages(&result, Level::Error),
        vec![
            "/ns:Record/ns:Year: value '1700' must be an integer in interval <1800, 2100>".to_string(),
            "/ns:Record/ns:Lang/@authority: value 'rfc' must be exactly 'iso639-2b'".to_string(),
        ]
    );
    assert_eq!(
        messages(&result, Level::Warning),
        vec!["/ns:Record/ns:Lang: value 'ger' must be one of 'cze', 'eng'".to_string()]
    );
}

#[test]
fn repeated_elements_carry_positions_in_paths() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.children]]
name = "ns:Page"
repeatable = true

[[root.children.attributes]]
name = "n"
expected = { type = "regex", pattern = "[0-9]+" }
"#,
    );
    let result = check(
        &profile,
        r#"<Record xmlns="http://example.org/ns"><Page n="1"/><Page n="x"/></Record>"#,
    );
    insta::assert_snapshot!(
        result.problems()[0].to_string(),
        @"ERROR: /ns:Record/ns:Page[2]/@n: value 'x' must match '[0-9]+'"
    );
}

#[test]
fn extra_rules_report_errors() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"
ignore_unexpected_children = true

[[root.extra_rules]]
type = "exists_at_least_one_of"
xpaths = ["ns:Isbn", "ns:Issn"]

[[root.extra_rules]]
type = "expression"
xpath = "count(ns:Page) <= 2"
description = "at most two pages"
"#,
    );
    let result = check(
        &profile,
        r#"<Record xmlns="http://example.org/ns"><Page/><Page/><Page/></Record>"#,
    );
    assert_eq!(
        messages(&result, Level::Error),
        vec![
            "/ns:Record: extra rule not met: none of ns:Isbn, ns:Issn found".to_string(),
            "/ns:Record: extra rule not met: at most two pages".to_string(),
        ]
    );
}

#[test]
fn wrong_root_is_reported_once() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.children]]
name = "ns:Title"
"#,
    );
    let result = check(&profile, r#"<Other xmlns="http://example.org/ns"><Title/></Other>"#);
    assert_eq!(
        messages(&result, Level::Error),
        vec!["root element 'ns:Record' not found".to_string()]
    );
    assert_eq!(result.len(), 1);
}

#[test]
fn nested_children_are_checked_recursively() {
    let profile = profile(
        r#"
[root]
name = "ns:Record"

[[root.children]]
name = "ns:TitleInfo"

[[root.children.children]]
name = "ns:Title"
expected = { type = "non_empty" }
"#,
    );
    let result = check(
        &profile,
        r#"<Record xmlns="http://example.org/ns"><TitleInfo><Title>  </Title></TitleInfo></Record>"#,
    );
    assert_eq!(
        messages(&result, Level::Error),
        vec!["/ns:Record/ns:TitleInfo/ns:Title: value '' must not be empty".to_string()]
    );
}

#[test]
fn invalid_profiles_are_rejected_at_load() {
    let both = MetadataProfile::from_toml_str(&format!(
        "{HEADER}\n[root]\nname = \"ns:Record\"\nexpected = {{ type = \"non_empty\" }}\nrecommended = {{ type = \"non_empty\" }}\n"
    ));
    assert!(matches!(both, Err(ProfileError::InvalidDefinition { .. })));

    let unknown_prefix =
        MetadataProfile::from_toml_str(&format!("{HEADER}\n[root]\nname = \"mods:mods\"\n"));
    assert!(matches!(unknown_prefix, Err(ProfileError::XPath(_))));

    let bad_schema = MetadataProfile::from_toml_str(
        "[profile]\nschema = \"other\"\nschema_version = 1\nname = \"x\"\n[root]\nname = \"a\"\n",
    );
    assert!(matches!(bad_schema, Err(ProfileError::InvalidHeader { .. })));

    let unknown_field =
        MetadataProfile::from_toml_str(&format!("{HEADER}\n[root]\nname = \"ns:a\"\nrequired = true\n"));
    assert!(matches!(unknown_field, Err(ProfileError::Syntax { .. })));
}

#[test]
fn loads_profile_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("record.toml");
    std::fs::write(&path, format!("{HEADER}\n[root]\nname = \"ns:Record\"\n")).expect("write");
    let profile = MetadataProfile::load(&path).expect("load");
    assert_eq!(profile.name, "test");
    assert_eq!(profile.root_xpath().source(), "/ns:Record");

    let missing = MetadataProfile::load(&dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(ProfileError::Io { .. })));
}
