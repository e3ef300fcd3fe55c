//! Tool availability detection and execution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use psp_model::CancellationToken;

use crate::config::{Invocation, OutputFormat, OutputStream, ToolDefinition, ToolsConfig};
use crate::error::ToolError;
use crate::process::{self, ProcessError};
use crate::tool::ExternalTool;

/// Outcome of probing one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolStatus {
    /// Not probed yet.
    Unknown,
    /// Configuration lacks version detection or execution.
    Undefined { reason: String },
    Available { version: String },
    Unavailable { reason: String },
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ToolStatus::Available { .. })
    }
}

/// Tool definitions plus the availability recorded for the current session.
#[derive(Debug)]
pub struct ToolManager {
    definitions: BTreeMap<ExternalTool, ToolDefinition>,
    paths: BTreeMap<ExternalTool, PathBuf>,
    statuses: Mutex<BTreeMap<ExternalTool, ToolStatus>>,
    timeout: Duration,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new(ToolsConfig::default())
    }
}

impl ToolManager {
    pub fn new(config: ToolsConfig) -> Self {
        Self {
            definitions: config.definitions,
            paths: BTreeMap::new(),
            statuses: Mutex::new(BTreeMap::new()),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory the tool's executables are resolved in instead of `PATH`.
    pub fn set_path(&mut self, tool: ExternalTool, dir: impl Into<PathBuf>) {
        self.paths.insert(tool, dir.into());
        self.statuses().remove(&tool);
    }

    pub fn definition(&self, tool: ExternalTool) -> Option<&ToolDefinition> {
        self.definitions.get(&tool)
    }

    pub fn is_version_detection_defined(&self, tool: ExternalTool) -> bool {
        self.definitions
            .get(&tool)
            .is_some_and(|definition| definition.version_detection.is_some())
    }

    pub fn is_execution_defined(&self, tool: ExternalTool) -> bool {
        self.definitions
            .get(&tool)
            .is_some_and(|definition| definition.execution.is_some())
    }

    pub fn status(&self, tool: ExternalTool) -> ToolStatus {
        self.statuses()
            .get(&tool)
            .cloned()
            .unwrap_or(ToolStatus::Unknown)
    }

    pub fn is_available(&self, tool: ExternalTool) -> bool {
        self.status(tool).is_available()
    }

    /// Probes every known tool and records the outcome.
    pub fn detect_all(&self, cancel: &CancellationToken) {
        for tool in ExternalTool::ALL {
            let status = self.detect_version(tool, cancel);
            match &status {
                ToolStatus::Available { version } => info!(%tool, %version, "tool available"),
                ToolStatus::Unavailable { reason } => warn!(%tool, %reason, "tool unavailable"),
                _ => debug!(%tool, ?status, "tool not probed"),
            }
            self.statuses().insert(tool, status);
        }
    }

    /// Probes one tool without recording the outcome.
    ///
    /// Start failures and interruption leave the tool unavailable; they are
    /// never errors.
    pub fn detect_version(&self, tool: ExternalTool, cancel: &CancellationToken) -> ToolStatus {
        let Some(definition) = self.definitions.get(&tool) else {
            return ToolStatus::Undefined {
                reason: "no configuration".to_string(),
            };
        };
        let Some(probe) = &definition.version_detection else {
            return ToolStatus::Undefined {
                reason: "version detection not defined".to_string(),
            };
        };
        if definition.execution.is_none() {
            return ToolStatus::Undefined {
                reason: "execution not defined".to_string(),
            };
        }
        match self.invoke(tool, probe, None, cancel) {
            Ok(output) => ToolStatus::Available {
                version: extract_version(probe, &output),
            },
            Err(ToolError::Spawn { program, source }) => ToolStatus::Unavailable {
                reason: format!("'{program}' not found: {source}"),
            },
            Err(ToolError::Interrupted { .. }) => ToolStatus::Unavailable {
                reason: "version detection interrupted".to_string(),
            },
            Err(error) => ToolStatus::Unavailable {
                reason: error.to_string(),
            },
        }
    }

    /// Runs the tool on `input` and returns the raw output of its configured stream.
    ///
    /// A tool that cannot be started or is interrupted is marked unavailable
    /// for the rest of the session.
    pub fn execute(
        &self,
        tool: ExternalTool,
        input: &Path,
        cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let execution = self
            .definitions
            .get(&tool)
            .and_then(|definition| definition.execution.as_ref())
            .ok_or(ToolError::NotDefined {
                tool,
                capability: "execution",
            })?;
        if !self.is_available(tool) {
            return Err(ToolError::Unavailable { tool });
        }
        let result = self.invoke(tool, execution, Some(input), cancel);
        if let Err(
            error @ (ToolError::Spawn { .. }
            | ToolError::Interrupted { .. }
            | ToolError::TimedOut { .. }),
        ) = &result
        {
            warn!(%tool, %error, "marking tool unavailable");
            self.statuses().insert(
                tool,
                ToolStatus::Unavailable {
                    reason: error.to_string(),
                },
            );
        }
        result
    }

    /// Parser configured for the tool's output.
    pub fn output_format(&self, tool: ExternalTool) -> OutputFormat {
        self.definitions
            .get(&tool)
            .map(|definition| definition.parser)
            .unwrap_or_default()
    }

    fn statuses(&self) -> MutexGuard<'_, BTreeMap<ExternalTool, ToolStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_program(&self, tool: ExternalTool, program: &str) -> String {
        match self.paths.get(&tool) {
            Some(dir) => dir.join(program).display().to_string(),
            None => program.to_string(),
        }
    }

    fn invoke(
        &self,
        tool: ExternalTool,
        invocation: &Invocation,
        input: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let program = self.resolve_program(tool, &invocation.program);
        let args = invocation.args_for(input);
        debug!(%tool, %program, ?args, "running external tool");
        let output =
            process::run(&program, &args, self.timeout, cancel).map_err(|error| match error {
                ProcessError::Spawn(source) => ToolError::Spawn {
                    program: program.clone(),
                    source,
                },
                ProcessError::Io(source) => ToolError::Io { tool, source },
                ProcessError::Canceled => ToolError::Interrupted { tool },
                ProcessError::TimedOut => ToolError::TimedOut {
                    tool,
                    seconds: self.timeout.as_secs(),
                },
            })?;
        debug!(%tool, status = %output.status, "external tool finished");
        Ok(match invocation.stream {
            OutputStream::Stdout => output.stdout,
            OutputStream::Stderr => output.stderr,
        })
    }
}

fn extract_version(probe: &Invocation, output: &str) -> String {
    if let Some(regex) = &probe.version_regex
        && let Some(captures) = regex.captures(output)
    {
        let matched = captures.get(1).or_else(|| captures.get(0));
        if let Some(matched) = matched {
            return matched.as_str().trim().to_string();
        }
    }
    output.lines().next().unwrap_or_default().trim().to_string()
}
