pub mod binary;
pub mod config;
pub mod error;
pub mod manager;
pub mod output;
mod process;
pub mod tool;

pub use binary::{
    BINARY_PROFILE_SCHEMA, BINARY_PROFILE_SCHEMA_VERSION, BinaryFileProfile, BinaryProfileFile,
    BinaryProfileHeader, BinaryRule, BinaryRuleSpec, ExtractionSpec,
};
pub use config::{
    INPUT_FILE_PLACEHOLDER, Invocation, InvocationSpec, OutputFormat, OutputStream,
    TOOLS_SCHEMA, TOOLS_SCHEMA_VERSION, ToolDefinition, ToolSpec, ToolsConfig, ToolsFile,
    ToolsHeader,
};
pub use error::{OutputParsingError, ToolConfigError, ToolError};
pub use manager::{ToolManager, ToolStatus};
pub use output::ToolOutput;
pub use tool::ExternalTool;
