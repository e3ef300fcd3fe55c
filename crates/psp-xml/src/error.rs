#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("failed to read XML file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML file {path} is not valid UTF-8")]
    Encoding { path: PathBuf },

    #[error("XML is not well-formed: {message}")]
    Parse { message: String },

    #[error("XML file {path} is not well-formed: {message}")]
    ParseFile { path: PathBuf, message: String },
}

impl XmlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XPathError {
    #[error("invalid XPath expression '{expression}': {message}")]
    InvalidExpression { expression: String, message: String },

    #[error("XPath expression '{expression}' does not evaluate to a node-set")]
    NotNodeSet { expression: String },
}
