//! Human-readable report.

use std::fmt::Write as _;
use std::path::Path;

use psp_engine::RuleOutcome;

use crate::error::ReportError;
use crate::report::ValidationReport;
use crate::verbosity::Verbosity;

/// Renders the report as plain text.
///
/// ```text
///
/// Section Root directory: 1 problem (1x ERROR)
/// --------------------------------------------
/// Rule one info file: 1 problem (1x ERROR)
///     the root contains exactly one info_<ID>.xml
///     ERROR: expected 1 files, found 0
///
/// Total: 1 problem (1x ERROR), package is: invalid
/// ```
///
/// Rule detail lines are tab-indented.
pub fn render_text(report: &ValidationReport<'_>, verbosity: Verbosity) -> String {
    let mut out = String::new();
    for section in report.outcome.enabled_sections() {
        if !verbosity.shows_section(section.counts.total() > 0) {
            continue;
        }
        let title = format!("Section {}: {}", section.name, section.counts);
        let _ = writeln!(out);
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "-".repeat(title.chars().count()));
        for rule in &section.rules {
            if verbosity.shows_rule(rule.problems.has_problems()) {
                write_rule(&mut out, rule);
            }
        }
    }
    if report.outcome.canceled {
        let _ = writeln!(out);
        let _ = writeln!(out, "Validation canceled");
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {}, package is: {}",
        report.outcome.totals,
        report.verdict()
    );
    out
}

fn write_rule(out: &mut String, rule: &RuleOutcome) {
    let _ = writeln!(out, "Rule {}: {}", rule.name, rule.counts);
    if let Some(description) = &rule.description {
        let _ = writeln!(out, "\t{description}");
    }
    for problem in rule.problems.problems() {
        let _ = writeln!(out, "\t{problem}");
    }
}

/// Writes [`render_text`] output to `path`.
pub fn write_text_report(
    path: &Path,
    report: &ValidationReport<'_>,
    verbosity: Verbosity,
) -> Result<(), ReportError> {
    std::fs::write(path, render_text(report, verbosity)).map_err(|e| ReportError::write(path, e))
}
