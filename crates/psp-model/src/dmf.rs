//! Document types and versioned fDMF keys.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Kind of preservation package a rule set applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Monograph,
    Periodical,
    AudioGram,
    AudioFono,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Monograph,
        DocumentType::Periodical,
        DocumentType::AudioGram,
        DocumentType::AudioFono,
    ];

    /// Prefix of the configuration directories holding this type's rule sets.
    pub fn dir_prefix(self) -> &'static str {
        match self {
            DocumentType::Monograph => "monograph",
            DocumentType::Periodical => "periodical",
            DocumentType::AudioGram => "audio_gram",
            DocumentType::AudioFono => "audio_fono",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Monograph => "MONOGRAPH",
            DocumentType::Periodical => "PERIODICAL",
            DocumentType::AudioGram => "AUDIO_GRAM",
            DocumentType::AudioFono => "AUDIO_FONO",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|doc_type| doc_type.dir_prefix() == normalized)
            .ok_or_else(|| ModelError::InvalidDocumentType {
                value: s.to_string(),
            })
    }
}

/// Dotted numeric version such as `1.2` or `2.0.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DmfVersion {
    text: String,
    components: Vec<u32>,
}

impl DmfVersion {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }
}

impl FromStr for DmfVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidVersion {
            value: s.to_string(),
        };
        if s.is_empty() {
            return Err(invalid());
        }
        let components = s
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u32>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            text: s.to_string(),
            components,
        })
    }
}

impl TryFrom<String> for DmfVersion {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DmfVersion> for String {
    fn from(value: DmfVersion) -> Self {
        value.text
    }
}

impl Ord for DmfVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Missing trailing components count as zero so 1.2 == 1.2.0 numerically;
        // the text breaks the tie to keep the order total.
        let len = self.components.len().max(other.components.len());
        for index in 0..len {
            let left = self.components.get(index).copied().unwrap_or(0);
            let right = other.components.get(index).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        self.text.cmp(&other.text)
    }
}

impl PartialOrd for DmfVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DmfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Lookup key of one rule set: document type plus version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dmf {
    pub document_type: DocumentType,
    pub version: DmfVersion,
}

impl Dmf {
    pub fn new(document_type: DocumentType, version: DmfVersion) -> Self {
        Self {
            document_type,
            version,
        }
    }

    /// Directory name of this rule set, e.g. `monograph_1.2`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.document_type.dir_prefix(), self.version)
    }
}

impl fmt::Display for Dmf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.document_type, self.version)
    }
}

impl FromStr for Dmf {
    type Err = ModelError;

    /// Parses a directory-style key such as `audio_gram_0.3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, version) = s.rsplit_once('_').ok_or_else(|| ModelError::InvalidDmfKey {
            value: s.to_string(),
        })?;
        let document_type = prefix.parse().map_err(|_| ModelError::InvalidDmfKey {
            value: s.to_string(),
        })?;
        let version = version.parse().map_err(|_| ModelError::InvalidDmfKey {
            value: s.to_string(),
        })?;
        Ok(Self {
            document_type,
            version,
        })
    }
}
