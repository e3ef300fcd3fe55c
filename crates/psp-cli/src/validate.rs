//! The `validate` workflow: configuration, tools, run.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{info_span, warn};

use psp_engine::{ProgressListener, ProvidedValues, RunOutcome, Validator};
use psp_model::{CancellationToken, Dmf, DmfVersion, DocumentType};
use psp_standards::ValidatorConfig;
use psp_tools::{ExternalTool, ToolManager};

/// Provided string holding the package identifier.
pub const PSP_ID: &str = "PSP_ID";

/// `NAME=DIR` override of the directory a tool is resolved in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPath {
    pub tool: ExternalTool,
    pub dir: PathBuf,
}

impl FromStr for ToolPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, dir) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=DIR, got '{s}'"))?;
        let tool = name.trim().parse().map_err(|error| format!("{error}"))?;
        let dir = dir.trim();
        if dir.is_empty() {
            return Err(format!("empty directory for tool '{}'", name.trim()));
        }
        Ok(Self {
            tool,
            dir: PathBuf::from(dir),
        })
    }
}

/// Identifier of the package: the name of its directory.
pub fn package_id(package_dir: &Path) -> Option<String> {
    let absolute = std::path::absolute(package_dir).ok()?;
    absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

#[derive(Debug, Clone)]
pub struct ValidateRequest {
    pub config_dir: PathBuf,
    pub package_dir: PathBuf,
    /// Detected from the package when absent.
    pub document_type: Option<DocumentType>,
    /// Detected from the package when absent, then the latest registered one.
    pub version: Option<DmfVersion>,
    /// Defaults to [`package_id`].
    pub psp_id: Option<String>,
    pub tool_paths: Vec<ToolPath>,
    pub skipped_sections: Vec<String>,
    pub tool_timeout: Option<Duration>,
}

impl ValidateRequest {
    pub fn new(config_dir: impl Into<PathBuf>, package_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            package_dir: package_dir.into(),
            document_type: None,
            version: None,
            psp_id: None,
            tool_paths: Vec::new(),
            skipped_sections: Vec::new(),
            tool_timeout: None,
        }
    }
}

/// A finished run and what it ran against.
#[derive(Debug)]
pub struct ValidationRun {
    pub dmf: Dmf,
    pub package_dir: PathBuf,
    pub psp_id: String,
    pub outcome: RunOutcome,
}

/// Loads the configuration, probes the tools and validates one package.
///
/// The fDMF is forced by the request or detected from the package.
/// Configuration problems and an unknown fDMF fail before any rule runs.
pub fn validate_package(
    request: &ValidateRequest,
    listener: &mut dyn ProgressListener,
    cancel: &CancellationToken,
) -> Result<ValidationRun> {
    let config = ValidatorConfig::load(&request.config_dir).with_context(|| {
        format!(
            "load validator configuration from {}",
            request.config_dir.display()
        )
    })?;
    if !request.package_dir.is_dir() {
        bail!(
            "package directory {} does not exist or is not a directory",
            request.package_dir.display()
        );
    }
    let fdmf = config.registry.resolve_for_package(
        request.document_type,
        request.version.as_ref(),
        &request.package_dir,
    )?;
    let psp_id = match &request.psp_id {
        Some(id) => id.clone(),
        None => package_id(&request.package_dir).with_context(|| {
            format!(
                "cannot derive package id from {}",
                request.package_dir.display()
            )
        })?,
    };

    let span = info_span!("validate", dmf = %fdmf.dmf, psp_id = %psp_id);
    let _guard = span.enter();

    for name in &request.skipped_sections {
        if fdmf.rules.section_named(name).is_none() {
            warn!(section = %name, "skipped section is not defined in {}", fdmf.dmf);
        }
    }

    let mut tools = ToolManager::new(config.tools.clone());
    if let Some(timeout) = request.tool_timeout {
        tools = tools.with_timeout(timeout);
    }
    for override_path in &request.tool_paths {
        tools.set_path(override_path.tool, override_path.dir.clone());
    }
    tools.detect_all(cancel);

    let provided =
        ProvidedValues::for_package(request.package_dir.clone()).with_string(PSP_ID, psp_id.as_str());
    let outcome = Validator::new(&fdmf.rules, &tools)
        .with_provided(provided)
        .with_skipped_sections(request.skipped_sections.iter().cloned())
        .run(listener, cancel);

    Ok(ValidationRun {
        dmf: fdmf.dmf.clone(),
        package_dir: request.package_dir.clone(),
        psp_id,
        outcome,
    })
}
