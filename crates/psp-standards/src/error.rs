//! Error types for validator configuration loading.

#![deny(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

use psp_engine::{EngineError, PatternError};
use psp_model::{DmfVersion, DocumentType};
use psp_profile::ProfileError;
use psp_tools::ToolConfigError;
use psp_xml::XPathError;

/// Malformed configuration. Fatal before any rule runs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Configuration directory not found.
    #[error("configuration directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

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

    /// A definition inside `fdmf.toml` does not make sense.
    #[error("{path}: {context}: {message}")]
    InvalidDefinition {
        path: PathBuf,
        context: String,
        message: String,
    },

    #[error("{path}: {context}: {source}")]
    Pattern {
        path: PathBuf,
        context: String,
        #[source]
        source: PatternError,
    },

    #[error("{path}: {context}: {source}")]
    XPath {
        path: PathBuf,
        context: String,
        #[source]
        source: XPathError,
    },

    #[error("{path}: {source}")]
    Engine {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("metadata profile {path}: {source}")]
    Profile {
        path: PathBuf,
        #[source]
        source: ProfileError,
    },

    #[error("tool configuration: {0}")]
    Tools(#[from] ToolConfigError),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// No rule set is registered under the requested key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownFdmf {
    #[error("no fDMF registered for {document_type} {version}")]
    Version {
        document_type: DocumentType,
        version: DmfVersion,
    },

    #[error("no fDMF registered for {document_type}")]
    DocumentType { document_type: DocumentType },

    #[error("document type of package {} could not be detected", package.display())]
    Undetected { package: PathBuf },
}
