//! fDMF rule-set registry and validator configuration.
//!
//! # Configuration Directory Structure
//!
//! ```text
//! config/
//! ├── tools.toml                      # External tool definitions
//! └── fdmf/
//!     ├── monograph_1.2/
//!     │   ├── fdmf.toml               # Sections, rules, variables, patterns
//!     │   ├── metadata_profiles/*.toml
//!     │   └── binary_profiles/*.toml
//!     └── periodical_1.6/
//! ```
//!
//! Every file carries a `{ schema, schema_version }` header that is checked
//! before anything else; any malformed file is a fatal [`ConfigError`].

pub mod configuration;
pub mod detect;
pub mod error;
pub mod paths;
pub mod registry;
pub mod schema;

pub use configuration::FdmfConfiguration;
pub use detect::DetectedDmf;
pub use error::{ConfigError, UnknownFdmf};
pub use paths::{CONFIG_ENV_VAR, config_root};
pub use registry::{FdmfRegistry, ValidatorConfig};
pub use schema::{FDMF_SCHEMA, FDMF_SCHEMA_VERSION, FdmfFile};
