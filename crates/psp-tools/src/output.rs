use psp_xml::XmlDocument;

use crate::config::OutputFormat;
use crate::error::OutputParsingError;
use crate::tool::ExternalTool;

/// Tool output turned into the object binary profiles are checked against.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Xml(XmlDocument),
    Text(String),
}

impl ToolOutput {
    pub fn parse(
        tool: ExternalTool,
        format: OutputFormat,
        raw: &str,
    ) -> Result<Self, OutputParsingError> {
        if raw.trim().is_empty() {
            return Err(OutputParsingError::Empty { tool });
        }
        match format {
            OutputFormat::Xml => XmlDocument::parse(raw)
                .map(ToolOutput::Xml)
                .map_err(|source| OutputParsingError::Xml { tool, source }),
            OutputFormat::Text => Ok(ToolOutput::Text(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_is_a_parsing_error() {
        let error = ToolOutput::parse(ExternalTool::Mp3val, OutputFormat::Text, "  \n")
            .expect_err("empty output");
        assert!(matches!(error, OutputParsingError::Empty { .. }));
    }

    #[test]
    fn broken_xml_is_a_parsing_error() {
        let error = ToolOutput::parse(ExternalTool::Jpylyzer, OutputFormat::Xml, "<jpylyzer>")
            .expect_err("broken xml");
        assert!(matches!(error, OutputParsingError::Xml { .. }));
    }
}
