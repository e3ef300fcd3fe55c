#![deny(unsafe_code)]

use std::path::PathBuf;

use psp_xml::XPathError;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse profile: {source}")]
    Syntax {
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid profile header: {message}")]
    InvalidHeader { message: String },

    #[error("invalid definition of '{element}': {message}")]
    InvalidDefinition { element: String, message: String },

    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    XPath(#[from] XPathError),
}

impl ProfileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn definition(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            element: element.into(),
            message: message.into(),
        }
    }
}
