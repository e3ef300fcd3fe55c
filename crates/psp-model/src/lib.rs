pub mod dmf;
pub mod error;
pub mod level;
pub mod problem;
pub mod state;

pub use dmf::{Dmf, DmfVersion, DocumentType};
pub use error::ModelError;
pub use level::Level;
pub use problem::{LevelCounts, ValidationProblem, ValidationResult};
pub use state::{CancellationToken, RuleState};
