//! Registry of every fDMF version found in the configuration directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use psp_model::{Dmf, DmfVersion, DocumentType};
use psp_tools::ToolsConfig;

use crate::configuration::FdmfConfiguration;
use crate::detect::DetectedDmf;
use crate::error::{ConfigError, UnknownFdmf};
use crate::paths;

/// Loaded rule sets keyed by document type and version.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct FdmfRegistry {
    configurations: BTreeMap<Dmf, FdmfConfiguration>,
}

impl FdmfRegistry {
    /// Loads every `<type>_<version>` directory under `fdmf_dir`.
    ///
    /// Directories whose names are not fDMF keys are skipped with a warning.
    /// Any malformed configuration fails the whole load.
    pub fn load(fdmf_dir: &Path) -> Result<Self, ConfigError> {
        if !fdmf_dir.is_dir() {
            return Err(ConfigError::DirectoryNotFound {
                path: fdmf_dir.to_path_buf(),
            });
        }
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(fdmf_dir).map_err(|e| ConfigError::io(fdmf_dir, e))? {
            let path = entry.map_err(|e| ConfigError::io(fdmf_dir, e))?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut configurations = BTreeMap::new();
        for dir in dirs {
            let name = dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Ok(dmf) = name.parse::<Dmf>() else {
                warn!(dir = %dir.display(), "not an fDMF directory, skipped");
                continue;
            };
            let configuration = FdmfConfiguration::load(&dir, &dmf)?;
            configurations.insert(dmf, configuration);
        }
        info!(count = configurations.len(), "fDMF registry loaded");
        Ok(Self { configurations })
    }

    pub fn insert(&mut self, configuration: FdmfConfiguration) {
        self.configurations
            .insert(configuration.dmf.clone(), configuration);
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// All keys, by document type then ascending version.
    pub fn dmfs(&self) -> impl Iterator<Item = &Dmf> {
        self.configurations.keys()
    }

    /// Registered versions of `document_type` in ascending numeric order.
    pub fn versions(&self, document_type: DocumentType) -> Vec<&DmfVersion> {
        self.configurations
            .keys()
            .filter(|dmf| dmf.document_type == document_type)
            .map(|dmf| &dmf.version)
            .collect()
    }

    pub fn latest(&self, document_type: DocumentType) -> Option<&FdmfConfiguration> {
        self.configurations
            .iter()
            .filter(|(dmf, _)| dmf.document_type == document_type)
            .map(|(_, configuration)| configuration)
            .next_back()
    }

    pub fn get(&self, dmf: &Dmf) -> Result<&FdmfConfiguration, UnknownFdmf> {
        self.configurations
            .get(dmf)
            .ok_or_else(|| UnknownFdmf::Version {
                document_type: dmf.document_type,
                version: dmf.version.clone(),
            })
    }

    /// The forced version when given, otherwise the latest registered one.
    pub fn resolve(
        &self,
        document_type: DocumentType,
        version: Option<&DmfVersion>,
    ) -> Result<&FdmfConfiguration, UnknownFdmf> {
        match version {
            Some(version) => self.get(&Dmf::new(document_type, version.clone())),
            None => self
                .latest(document_type)
                .ok_or(UnknownFdmf::DocumentType { document_type }),
        }
    }

    /// Resolves the fDMF of a package.
    ///
    /// Forced values win. Missing ones are taken from the package metadata;
    /// an undetected version falls back to the latest registered one.
    pub fn resolve_for_package(
        &self,
        document_type: Option<DocumentType>,
        version: Option<&DmfVersion>,
        package_dir: &Path,
    ) -> Result<&FdmfConfiguration, UnknownFdmf> {
        let detected = if document_type.is_some() && version.is_some() {
            DetectedDmf::default()
        } else {
            DetectedDmf::from_package(package_dir)
        };
        let document_type =
            document_type
                .or(detected.document_type)
                .ok_or_else(|| UnknownFdmf::Undetected {
                    package: package_dir.to_path_buf(),
                })?;
        let version = version.cloned().or(detected.version);
        self.resolve(document_type, version.as_ref())
    }
}

/// Everything loaded from one configuration directory.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub config_dir: PathBuf,
    pub registry: FdmfRegistry,
    pub tools: ToolsConfig,
}

impl ValidatorConfig {
    /// Loads the registry and `tools.toml`. A missing `tools.toml` means no
    /// external tool is defined.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        if !config_dir.is_dir() {
            return Err(ConfigError::DirectoryNotFound {
                path: config_dir.to_path_buf(),
            });
        }
        let registry = FdmfRegistry::load(&paths::fdmf_root(config_dir))?;
        let tools_path = paths::tools_config_path(config_dir);
        let tools = if tools_path.is_file() {
            ToolsConfig::load(&tools_path)?
        } else {
            warn!(path = %tools_path.display(), "no tool configuration, external tools disabled");
            ToolsConfig::default()
        };
        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            registry,
            tools,
        })
    }
}
