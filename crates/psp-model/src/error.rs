use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid level '{value}' (expected INFO, WARNING or ERROR)")]
    InvalidLevel { value: String },
    #[error("unknown document type '{value}'")]
    InvalidDocumentType { value: String },
    #[error("invalid fDMF version '{value}'")]
    InvalidVersion { value: String },
    #[error("invalid fDMF key '{value}' (expected <type>_<version>)")]
    InvalidDmfKey { value: String },
}
