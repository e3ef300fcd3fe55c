//! Structured JSON log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use psp_engine::SectionOutcome;
use psp_model::{DmfVersion, DocumentType, LevelCounts};

use crate::error::ReportError;
use crate::report::ValidationReport;

#[derive(Serialize)]
struct JsonLog<'a> {
    created: String,
    dmf: String,
    document_type: DocumentType,
    version: &'a DmfVersion,
    package: String,
    valid: bool,
    canceled: bool,
    duration_ms: u64,
    totals: LevelCounts,
    sections: &'a [SectionOutcome],
}

impl<'a> JsonLog<'a> {
    fn new(report: &ValidationReport<'a>) -> Self {
        Self {
            created: report.timestamp(),
            dmf: report.dmf.dir_name(),
            document_type: report.dmf.document_type,
            version: &report.dmf.version,
            package: report.package.display().to_string(),
            valid: report.outcome.is_valid(),
            canceled: report.outcome.canceled,
            duration_ms: report.duration_ms(),
            totals: report.outcome.totals,
            sections: &report.outcome.sections,
        }
    }
}

/// Writes the run as pretty-printed JSON.
pub fn write_json_log<W: Write>(
    mut writer: W,
    report: &ValidationReport<'_>,
) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(&mut writer, &JsonLog::new(report))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes [`write_json_log`] output to a new file at `path`.
pub fn write_json_log_file(path: &Path, report: &ValidationReport<'_>) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| ReportError::write(path, e))?;
    write_json_log(BufWriter::new(file), report)
}
