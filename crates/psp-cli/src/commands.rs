use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table};

use psp_cli::{ProgressReporter, ValidateRequest, validate_package};
use psp_engine::NoProgress;
use psp_model::CancellationToken;
use psp_report::{
    ValidationReport, Verbosity, render_text, write_json_log_file, write_text_report,
    write_xml_log_file,
};
use psp_standards::{FdmfRegistry, paths};
use psp_tools::{ExternalTool, ToolManager, ToolStatus, ToolsConfig};

use crate::cli::{ToolsArgs, ValidateArgs};
use crate::summary::{apply_table_style, dim_cell, header_cell, print_section_table};

/// Validates the package and prints the report. Returns whether it is valid.
pub fn run_validate(args: &ValidateArgs, config_dir: &Path) -> Result<bool> {
    let verbosity = Verbosity::try_from(args.report_verbosity)?;
    let mut request = ValidateRequest::new(config_dir, &args.psp_dir);
    request.document_type = args.dmf_type;
    request.version.clone_from(&args.dmf_version);
    request.psp_id.clone_from(&args.psp_id);
    request.tool_paths.clone_from(&args.tool_paths);
    request.skipped_sections.clone_from(&args.skip_sections);
    request.tool_timeout = args.tool_timeout.map(Duration::from_secs);

    let cancel = CancellationToken::new();
    let run = if args.no_progress || !io::stderr().is_terminal() {
        validate_package(&request, &mut NoProgress, &cancel)?
    } else {
        validate_package(&request, &mut ProgressReporter::stderr(), &cancel)?
    };

    let report = ValidationReport::new(&run.dmf, &run.package_dir, &run.outcome);
    println!("Package: {} ({})", run.package_dir.display(), run.psp_id);
    println!("fDMF: {}", run.dmf);
    print!("{}", render_text(&report, verbosity));
    if args.table {
        println!();
        print_section_table(&run.outcome);
    }

    if let Some(path) = &args.text_report {
        write_text_report(path, &report, verbosity)
            .with_context(|| format!("write text report {}", path.display()))?;
    }
    if let Some(path) = &args.xml_log {
        write_xml_log_file(path, &report)
            .with_context(|| format!("write XML log {}", path.display()))?;
    }
    if let Some(path) = &args.json_log {
        write_json_log_file(path, &report)
            .with_context(|| format!("write JSON log {}", path.display()))?;
    }
    Ok(run.outcome.is_valid())
}

pub fn run_list(config_dir: &Path) -> Result<()> {
    let registry = FdmfRegistry::load(&paths::fdmf_root(config_dir))
        .with_context(|| format!("load fDMF registry from {}", config_dir.display()))?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Document type"),
        header_cell("Version"),
        header_cell("Sections"),
        header_cell("Rules"),
        header_cell("Profiles"),
        header_cell("Default"),
    ]);
    apply_table_style(&mut table);
    for dmf in registry.dmfs() {
        let Ok(configuration) = registry.get(dmf) else {
            continue;
        };
        let rules = &configuration.rules;
        let profiles: Vec<&str> = rules
            .metadata_profiles()
            .chain(rules.binary_profiles())
            .collect();
        let is_default = registry
            .latest(dmf.document_type)
            .is_some_and(|latest| latest.dmf == *dmf);
        table.add_row(vec![
            Cell::new(dmf.document_type),
            Cell::new(&dmf.version),
            Cell::new(rules.sections().len()),
            Cell::new(rules.rules().len()),
            Cell::new(profiles.join(", ")),
            if is_default {
                Cell::new("✓").fg(Color::Green)
            } else {
                dim_cell("-")
            },
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_tools(args: &ToolsArgs, config_dir: &Path) -> Result<()> {
    let path = paths::tools_config_path(config_dir);
    let config = if path.is_file() {
        ToolsConfig::load(&path).with_context(|| format!("load {}", path.display()))?
    } else {
        ToolsConfig::default()
    };
    let mut tools = ToolManager::new(config);
    for override_path in &args.tool_paths {
        tools.set_path(override_path.tool, override_path.dir.clone());
    }
    tools.detect_all(&CancellationToken::new());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Tool"),
        header_cell("Version detection"),
        header_cell("Execution"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    for tool in ExternalTool::ALL {
        table.add_row(vec![
            Cell::new(tool.display_name()),
            defined_cell(tools.is_version_detection_defined(tool)),
            defined_cell(tools.is_execution_defined(tool)),
            status_cell(&tools.status(tool)),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn defined_cell(defined: bool) -> Cell {
    if defined {
        Cell::new("defined")
    } else {
        dim_cell("-")
    }
}

fn status_cell(status: &ToolStatus) -> Cell {
    match status {
        ToolStatus::Available { version } => Cell::new(format!("available ({version})")).fg(Color::Green),
        ToolStatus::Unavailable { reason } => Cell::new(format!("unavailable: {reason}")).fg(Color::Red),
        ToolStatus::Undefined { reason } => dim_cell(&format!("not usable: {reason}")),
        ToolStatus::Unknown => dim_cell("not probed"),
    }
}
