//! Report generation for PSP validation runs.
//!
//! - **Text report**: the human-readable Section → Rule → Problem listing,
//!   filtered by [`Verbosity`]
//! - **XML log**: structured protocol written with `quick-xml`
//! - **JSON log**: the same tree serialized with `serde_json`

mod error;
mod json;
mod report;
mod text;
mod verbosity;
mod xml;

pub use error::ReportError;
pub use json::{write_json_log, write_json_log_file};
pub use report::ValidationReport;
pub use text::{render_text, write_text_report};
pub use verbosity::Verbosity;
pub use xml::{write_xml_log, write_xml_log_file};
