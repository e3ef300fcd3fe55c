//! Binary-file profiles: rules over the output of one external tool.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use psp_model::{CancellationToken, Level, ValidationResult};
use psp_profile::{ContentConstraint, ContentDefinition};
use psp_xml::{NamespaceContext, XPath};

use crate::error::ToolConfigError;
use crate::manager::ToolManager;
use crate::output::ToolOutput;
use crate::tool::ExternalTool;

pub const BINARY_PROFILE_SCHEMA: &str = "psp-validator.binary-profile";
pub const BINARY_PROFILE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryProfileFile {
    pub profile: BinaryProfileHeader,
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<BinaryRuleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryProfileHeader {
    pub schema: String,
    pub schema_version: u32,
    pub name: String,
    pub tool: ExternalTool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryRuleSpec {
    pub name: String,
    #[serde(default = "default_level")]
    pub level: Level,
    pub extraction: ExtractionSpec,
    pub constraint: ContentDefinition,
}

fn default_level() -> Level {
    Level::Error
}

/// Where a rule takes its value from in the tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ExtractionSpec {
    /// String value of an XPath over XML output.
    Xpath { xpath: String },
    /// First capture group of a regex over text output.
    Regex { pattern: String },
    /// The whole output, trimmed.
    Raw,
}

#[derive(Debug, Clone)]
enum Extraction {
    XPath(XPath),
    Regex(Regex),
    Raw,
}

impl Extraction {
    fn compile(
        rule: &str,
        spec: &ExtractionSpec,
        namespaces: &NamespaceContext,
    ) -> Result<Self, ToolConfigError> {
        match spec {
            ExtractionSpec::Xpath { xpath } => {
                Ok(Extraction::XPath(XPath::compile(xpath, namespaces)?))
            }
            ExtractionSpec::Regex { pattern } => {
                let regex = Regex::new(pattern).map_err(|source| ToolConfigError::InvalidRegex {
                    pattern: pattern.clone(),
                    source,
                })?;
                if regex.captures_len() < 2 {
                    return Err(ToolConfigError::InvalidRule {
                        rule: rule.to_string(),
                        message: format!("regex '{pattern}' has no capture group"),
                    });
                }
                Ok(Extraction::Regex(regex))
            }
            ExtractionSpec::Raw => Ok(Extraction::Raw),
        }
    }

    /// `Ok(None)` when the output holds no value for the rule.
    fn extract(&self, output: &ToolOutput) -> Result<Option<String>, String> {
        match (self, output) {
            (Extraction::XPath(xpath), ToolOutput::Xml(document)) => {
                let strings = xpath
                    .select_strings(document.root())
                    .map_err(|error| error.to_string())?;
                Ok(strings.into_iter().next())
            }
            (Extraction::XPath(_), ToolOutput::Text(_)) => {
                Err("xpath extraction needs xml output".to_string())
            }
            (Extraction::Regex(regex), ToolOutput::Text(text)) => Ok(regex
                .captures(text)
                .and_then(|captures| captures.get(1))
                .map(|matched| matched.as_str().trim().to_string())),
            (Extraction::Regex(_), ToolOutput::Xml(_)) => {
                Err("regex extraction needs text output".to_string())
            }
            (Extraction::Raw, ToolOutput::Text(text)) => Ok(Some(text.trim().to_string())),
            (Extraction::Raw, ToolOutput::Xml(document)) => {
                Ok(Some(document.root().string_value().trim().to_string()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryRule {
    pub name: String,
    pub level: Level,
    extraction: Extraction,
    constraint: ContentConstraint,
}

/// Expectations on what one external tool reports about a file.
#[derive(Debug, Clone)]
pub struct BinaryFileProfile {
    pub name: String,
    pub tool: ExternalTool,
    pub rules: Vec<BinaryRule>,
}

impl BinaryFileProfile {
    pub fn load(path: &Path) -> Result<Self, ToolConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ToolConfigError::io(path, e))?;
        let file: BinaryProfileFile =
            toml::from_str(&contents).map_err(|e| ToolConfigError::Toml {
                path: path.to_path_buf(),
                source: e,
            })?;
        let profile = Self::from_file(&file, path)?;
        debug!(profile = %profile.name, tool = %profile.tool, "loaded binary profile");
        Ok(profile)
    }

    pub fn from_file(file: &BinaryProfileFile, path: &Path) -> Result<Self, ToolConfigError> {
        let header = &file.profile;
        if header.schema != BINARY_PROFILE_SCHEMA {
            return Err(ToolConfigError::InvalidHeader {
                path: path.to_path_buf(),
                message: format!("unsupported schema: {}", header.schema),
            });
        }
        if header.schema_version != BINARY_PROFILE_SCHEMA_VERSION {
            return Err(ToolConfigError::InvalidHeader {
                path: path.to_path_buf(),
                message: format!("unsupported schema_version: {}", header.schema_version),
            });
        }
        let namespaces: NamespaceContext = file
            .namespaces
            .iter()
            .map(|(prefix, uri)| (prefix.clone(), uri.clone()))
            .collect();
        let mut rules: Vec<BinaryRule> = Vec::with_capacity(file.rules.len());
        for spec in &file.rules {
            if rules.iter().any(|rule| rule.name == spec.name) {
                return Err(ToolConfigError::InvalidRule {
                    rule: spec.name.clone(),
                    message: "duplicate rule name".to_string(),
                });
            }
            rules.push(BinaryRule {
                name: spec.name.clone(),
                level: spec.level,
                extraction: Extraction::compile(&spec.name, &spec.extraction, &namespaces)?,
                constraint: spec.constraint.compile()?,
            });
        }
        Ok(Self {
            name: header.name.clone(),
            tool: header.tool,
            rules,
        })
    }

    /// Checks a tool output against every rule.
    pub fn check_output(&self, output: &ToolOutput) -> ValidationResult {
        let mut result = ValidationResult::new();
        for rule in &self.rules {
            match rule.extraction.extract(output) {
                Ok(Some(value)) => {
                    if let Err(message) = rule.constraint.check(&value) {
                        result.add(rule.level, format!("{}: {message}", rule.name));
                    }
                }
                Ok(None) => result.add(rule.level, format!("{}: no value found", rule.name)),
                Err(message) => result.add(Level::Error, format!("{}: {message}", rule.name)),
            }
        }
        result
    }

    /// Runs the profile's tool on `file` and checks its output.
    ///
    /// Tool and parsing failures become a single ERROR; the run never aborts.
    pub fn validate_file(
        &self,
        manager: &ToolManager,
        file: &Path,
        cancel: &CancellationToken,
    ) -> ValidationResult {
        if !manager.is_execution_defined(self.tool) {
            return ValidationResult::single_error(format!(
                "execution of {} is not defined",
                self.tool
            ));
        }
        if !manager.is_available(self.tool) {
            return ValidationResult::single_error(format!(
                "{} is not available, file {} not checked",
                self.tool,
                file.display()
            ));
        }
        let raw = match manager.execute(self.tool, file, cancel) {
            Ok(raw) => raw,
            Err(error) => return ValidationResult::single_error(error.to_string()),
        };
        match ToolOutput::parse(self.tool, manager.output_format(self.tool), &raw) {
            Ok(output) => self.check_output(&output),
            Err(error) => ValidationResult::single_error(error.to_string()),
        }
    }
}
