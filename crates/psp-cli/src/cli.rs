//! Command-line arguments of `psp-validator`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use psp_cli::ToolPath;
use psp_model::{DmfVersion, DocumentType};

#[derive(Parser)]
#[command(
    name = "psp-validator",
    version,
    about = "Validate digital-preservation packages against fDMF rule sets",
    long_about = "Validate PSP packages against versioned, formally declared \
                  document metadata formats (fDMF).\n\n\
                  Rule sets are read from the configuration directory: \
                  --config-dir, then $PSP_VALIDATOR_CONFIG_DIR, then the \
                  bundled config/ directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Validator configuration directory.
    #[arg(long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate one package directory.
    Validate(ValidateArgs),

    /// List the registered fDMF versions.
    List,

    /// Show external tool definitions and whether they can be run.
    Tools(ToolsArgs),
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Package root directory.
    #[arg(value_name = "PSP_DIR")]
    pub psp_dir: PathBuf,

    /// Force the document type (monograph, periodical, audio_gram, audio_fono)
    /// instead of reading it from the main METS file.
    #[arg(long = "dmf-type", short = 't', value_name = "TYPE")]
    pub dmf_type: Option<DocumentType>,

    /// Force the fDMF version instead of reading it from the info file
    /// (default when undetected: latest registered).
    #[arg(long = "dmf-version", value_name = "VERSION")]
    pub dmf_version: Option<DmfVersion>,

    /// Package identifier (default: name of the package directory).
    #[arg(long = "psp-id", value_name = "ID")]
    pub psp_id: Option<String>,

    /// Report detail: 0 verdict only, 1 sections, 2 rules with problems, 3 everything.
    #[arg(
        long = "report-verbosity",
        short = 'r',
        default_value_t = 2,
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    pub report_verbosity: u8,

    /// Directory to run a tool from, as NAME=DIR (repeatable).
    #[arg(long = "tool-path", value_name = "NAME=DIR")]
    pub tool_paths: Vec<ToolPath>,

    /// Section to leave out of this run (repeatable).
    #[arg(long = "skip-section", value_name = "NAME")]
    pub skip_sections: Vec<String>,

    /// Seconds before an external tool invocation is abandoned.
    #[arg(long = "tool-timeout", value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// Also write the text report to this file.
    #[arg(long = "text-report", value_name = "PATH")]
    pub text_report: Option<PathBuf>,

    /// Write the structured XML log to this file.
    #[arg(long = "xml-log", value_name = "PATH")]
    pub xml_log: Option<PathBuf>,

    /// Write the structured JSON log to this file.
    #[arg(long = "json-log", value_name = "PATH")]
    pub json_log: Option<PathBuf>,

    /// Print a per-section summary table after the report.
    #[arg(long = "table")]
    pub table: bool,

    /// Do not draw a progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

#[derive(Parser)]
pub struct ToolsArgs {
    /// Directory to run a tool from, as NAME=DIR (repeatable).
    #[arg(long = "tool-path", value_name = "NAME=DIR")]
    pub tool_paths: Vec<ToolPath>,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
