#![deny(unsafe_code)]

use std::path::PathBuf;

use psp_profile::ProfileError;
use psp_xml::{XPathError, XmlError};

use crate::tool::ExternalTool;

/// Failures of tool configuration and binary profile files. Fatal at load.
#[derive(Debug, thiserror::Error)]
pub enum ToolConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid header in {path}: {message}")]
    InvalidHeader { path: PathBuf, message: String },

    #[error("unknown external tool '{name}'")]
    UnknownTool { name: String },

    #[error("duplicate definition of tool {tool}")]
    DuplicateTool { tool: ExternalTool },

    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid binary profile rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    XPath(#[from] XPathError),
}

impl ToolConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of a single tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{capability} of {tool} is not defined")]
    NotDefined {
        tool: ExternalTool,
        capability: &'static str,
    },

    #[error("{tool} is not available")]
    Unavailable { tool: ExternalTool },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} was interrupted")]
    Interrupted { tool: ExternalTool },

    #[error("{tool} did not finish within {seconds} s")]
    TimedOut { tool: ExternalTool, seconds: u64 },

    #[error("i/o error while running {tool}: {source}")]
    Io {
        tool: ExternalTool,
        #[source]
        source: std::io::Error,
    },
}

/// The tool ran but its output could not be turned into a profile object.
#[derive(Debug, thiserror::Error)]
pub enum OutputParsingError {
    #[error("{tool} produced no output")]
    Empty { tool: ExternalTool },

    #[error("output of {tool} is not valid XML: {source}")]
    Xml {
        tool: ExternalTool,
        #[source]
        source: XmlError,
    },
}
