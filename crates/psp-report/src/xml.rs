//! Structured XML log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use psp_engine::{RuleOutcome, SectionOutcome};
use psp_model::LevelCounts;

use crate::error::ReportError;
use crate::report::ValidationReport;

const ROOT: &str = "validationLog";

/// Writes the full Section → Rule → Problem tree as XML.
///
/// Every section is included, disabled ones with `enabled="false"` and no
/// rules, so the log mirrors the rule set regardless of verbosity.
pub fn write_xml_log<W: Write>(writer: W, report: &ValidationReport<'_>) -> Result<(), ReportError> {
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let created = report.timestamp();
    let package = report.package.display().to_string();
    let dir_name = report.dmf.dir_name();
    let duration = report.duration_ms().to_string();
    let mut root = BytesStart::new(ROOT);
    root.push_attribute(("created", created.as_str()));
    root.push_attribute(("dmf", dir_name.as_str()));
    root.push_attribute(("documentType", report.dmf.document_type.as_str()));
    root.push_attribute(("version", report.dmf.version.as_str()));
    root.push_attribute(("package", package.as_str()));
    root.push_attribute(("valid", bool_str(report.outcome.is_valid())));
    root.push_attribute(("canceled", bool_str(report.outcome.canceled)));
    root.push_attribute(("durationMs", duration.as_str()));
    xml.write_event(Event::Start(root))?;

    write_counts(&mut xml, BytesStart::new("totals"), report.outcome.totals)?;
    for section in &report.outcome.sections {
        write_section(&mut xml, section)?;
    }

    xml.write_event(Event::End(BytesEnd::new(ROOT)))?;
    xml.into_inner().flush()?;
    Ok(())
}

/// Writes [`write_xml_log`] output to a new file at `path`.
pub fn write_xml_log_file(path: &Path, report: &ValidationReport<'_>) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| ReportError::write(path, e))?;
    write_xml_log(BufWriter::new(file), report)
}

fn write_section<W: Write>(
    xml: &mut Writer<W>,
    section: &SectionOutcome,
) -> Result<(), ReportError> {
    let mut start = BytesStart::new("section");
    start.push_attribute(("name", section.name.as_str()));
    if let Some(description) = &section.description {
        start.push_attribute(("description", description.as_str()));
    }
    start.push_attribute(("enabled", bool_str(section.enabled)));
    start.push_attribute(("state", section.state.as_str()));
    push_counts(&mut start, section.counts);
    if section.rules.is_empty() {
        xml.write_event(Event::Empty(start))?;
        return Ok(());
    }
    xml.write_event(Event::Start(start))?;
    for rule in &section.rules {
        write_rule(xml, rule)?;
    }
    xml.write_event(Event::End(BytesEnd::new("section")))?;
    Ok(())
}

fn write_rule<W: Write>(xml: &mut Writer<W>, rule: &RuleOutcome) -> Result<(), ReportError> {
    let mut start = BytesStart::new("rule");
    start.push_attribute(("name", rule.name.as_str()));
    if let Some(description) = &rule.description {
        start.push_attribute(("description", description.as_str()));
    }
    start.push_attribute(("state", rule.state.as_str()));
    push_counts(&mut start, rule.counts);
    if rule.problems.is_empty() {
        xml.write_event(Event::Empty(start))?;
        return Ok(());
    }
    xml.write_event(Event::Start(start))?;
    for problem in rule.problems.problems() {
        let mut element = BytesStart::new("problem");
        element.push_attribute(("level", problem.level.as_str()));
        xml.write_event(Event::Start(element))?;
        xml.write_event(Event::Text(BytesText::new(&problem.message)))?;
        xml.write_event(Event::End(BytesEnd::new("problem")))?;
    }
    xml.write_event(Event::End(BytesEnd::new("rule")))?;
    Ok(())
}

fn write_counts<W: Write>(
    xml: &mut Writer<W>,
    mut element: BytesStart<'_>,
    counts: LevelCounts,
) -> Result<(), ReportError> {
    push_counts(&mut element, counts);
    xml.write_event(Event::Empty(element))?;
    Ok(())
}

fn push_counts(element: &mut BytesStart<'_>, counts: LevelCounts) {
    element.push_attribute(("errors", counts.error.to_string().as_str()));
    element.push_attribute(("warnings", counts.warning.to_string().as_str()));
    element.push_attribute(("infos", counts.info.to_string().as_str()));
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
