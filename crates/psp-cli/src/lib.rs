//! Library side of the `psp-validator` binary: logging setup, progress
//! display and the validation workflow shared by the commands.

pub mod logging;
pub mod progress;
pub mod validate;

pub use progress::ProgressReporter;
pub use validate::{PSP_ID, ToolPath, ValidateRequest, ValidationRun, package_id, validate_package};
