//! `tools.toml`: how each external tool is probed and executed.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ToolConfigError;
use crate::tool::ExternalTool;

pub const TOOLS_SCHEMA: &str = "psp-validator.tools";
pub const TOOLS_SCHEMA_VERSION: u32 = 1;

/// Placeholder replaced by the checked file's path in execution arguments.
pub const INPUT_FILE_PLACEHOLDER: &str = "${INPUT_FILE}";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsFile {
    pub tools: ToolsHeader,
    #[serde(default)]
    pub tool: Vec<ToolSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsHeader {
    pub schema: String,
    pub schema_version: u32,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub parser: OutputFormat,
    #[serde(default)]
    pub version: Option<InvocationSpec>,
    #[serde(default)]
    pub execution: Option<InvocationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvocationSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub stream: OutputStream,
    /// First capture group extracts the version from the probe output.
    #[serde(default)]
    pub version_regex: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Xml,
    #[default]
    Text,
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub stream: OutputStream,
    pub version_regex: Option<Regex>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stream: OutputStream::Stdout,
            version_regex: None,
        }
    }

    fn compile(spec: &InvocationSpec) -> Result<Self, ToolConfigError> {
        let version_regex = spec
            .version_regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ToolConfigError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self {
            program: spec.program.clone(),
            args: spec.args.clone(),
            stream: spec.stream,
            version_regex,
        })
    }

    /// Arguments with the input placeholder substituted.
    pub fn args_for(&self, input: Option<&Path>) -> Vec<String> {
        let input = input.map(|path| path.display().to_string());
        self.args
            .iter()
            .map(|arg| match &input {
                Some(input) => arg.replace(INPUT_FILE_PLACEHOLDER, input),
                None => arg.clone(),
            })
            .collect()
    }
}

/// How one tool is probed, executed and its output parsed.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub tool: ExternalTool,
    pub parser: OutputFormat,
    pub version_detection: Option<Invocation>,
    pub execution: Option<Invocation>,
}

impl ToolDefinition {
    pub fn new(tool: ExternalTool, parser: OutputFormat) -> Self {
        Self {
            tool,
            parser,
            version_detection: None,
            execution: None,
        }
    }

    #[must_use]
    pub fn with_version_detection(mut self, invocation: Invocation) -> Self {
        self.version_detection = Some(invocation);
        self
    }

    #[must_use]
    pub fn with_execution(mut self, invocation: Invocation) -> Self {
        self.execution = Some(invocation);
        self
    }
}

/// Parsed and checked tool configuration.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub timeout_secs: u64,
    pub definitions: BTreeMap<ExternalTool, ToolDefinition>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            definitions: BTreeMap::new(),
        }
    }
}

impl ToolsConfig {
    pub fn load(path: &Path) -> Result<Self, ToolConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ToolConfigError::io(path, e))?;
        let file: ToolsFile = toml::from_str(&contents).map_err(|e| ToolConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_file(&file, path)
    }

    pub fn from_file(file: &ToolsFile, path: &Path) -> Result<Self, ToolConfigError> {
        if file.tools.schema != TOOLS_SCHEMA {
            return Err(ToolConfigError::InvalidHeader {
                path: path.to_path_buf(),
                message: format!("unsupported schema: {}", file.tools.schema),
            });
        }
        if file.tools.schema_version != TOOLS_SCHEMA_VERSION {
            return Err(ToolConfigError::InvalidHeader {
                path: path.to_path_buf(),
                message: format!("unsupported schema_version: {}", file.tools.schema_version),
            });
        }
        let mut definitions = BTreeMap::new();
        for spec in &file.tool {
            let tool: ExternalTool = spec.name.parse()?;
            let definition = ToolDefinition {
                tool,
                parser: spec.parser,
                version_detection: spec.version.as_ref().map(Invocation::compile).transpose()?,
                execution: spec.execution.as_ref().map(Invocation::compile).transpose()?,
            };
            if definitions.insert(tool, definition).is_some() {
                return Err(ToolConfigError::DuplicateTool { tool });
            }
        }
        Ok(Self {
            timeout_secs: file.tools.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            definitions,
        })
    }
}
