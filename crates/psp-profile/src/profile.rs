#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use psp_xml::{NamespaceContext, XPath};

use crate::definition::{ElementSpec, ExpectedElementDefinition};
use crate::error::ProfileError;

pub const METADATA_PROFILE_SCHEMA: &str = "psp-validator.metadata-profile";
pub const METADATA_PROFILE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileFile {
    pub profile: ProfileHeader,
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
    pub root: ElementSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileHeader {
    pub schema: String,
    pub schema_version: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A declarative description of the expected structure of one XML document.
#[derive(Debug, Clone)]
pub struct MetadataProfile {
    pub name: String,
    pub description: Option<String>,
    pub namespaces: NamespaceContext,
    pub root: ExpectedElementDefinition,
    root_xpath: XPath,
}

impl MetadataProfile {
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ProfileError::io(path, e))?;
        let file: ProfileFile = toml::from_str(&contents).map_err(|e| ProfileError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        let profile = Self::from_file(&file)?;
        debug!(profile = %profile.name, path = %path.display(), "loaded metadata profile");
        Ok(profile)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ProfileError> {
        let file: ProfileFile =
            toml::from_str(contents).map_err(|source| ProfileError::Syntax { source })?;
        Self::from_file(&file)
    }

    pub fn from_file(file: &ProfileFile) -> Result<Self, ProfileError> {
        validate_header(&file.profile)?;
        let namespaces: NamespaceContext = file
            .namespaces
            .iter()
            .map(|(prefix, uri)| (prefix.clone(), uri.clone()))
            .collect();
        let root = ExpectedElementDefinition::compile(&file.root, &namespaces)?;
        let root_xpath = XPath::compile(&format!("/{}", root.relative_xpath()), &namespaces)?;
        Ok(Self {
            name: file.profile.name.clone(),
            description: file.profile.description.clone(),
            namespaces,
            root,
            root_xpath,
        })
    }

    /// Absolute XPath of the root element, e.g. `/mods:modsCollection`.
    pub fn root_xpath(&self) -> &XPath {
        &self.root_xpath
    }
}

fn validate_header(header: &ProfileHeader) -> Result<(), ProfileError> {
    if header.schema != METADATA_PROFILE_SCHEMA {
        return Err(ProfileError::InvalidHeader {
            message: format!("unsupported schema: {}", header.schema),
        });
    }
    if header.schema_version != METADATA_PROFILE_SCHEMA_VERSION {
        return Err(ProfileError::InvalidHeader {
            message: format!("unsupported schema_version: {}", header.schema_version),
        });
    }
    if header.name.trim().is_empty() {
        return Err(ProfileError::InvalidHeader {
            message: "profile name is empty".to_string(),
        });
    }
    Ok(())
}
