//! Configuration directory path resolution.

use std::path::{Path, PathBuf};

/// Environment variable for overriding the configuration directory.
pub const CONFIG_ENV_VAR: &str = "PSP_VALIDATOR_CONFIG_DIR";

/// Get the configuration root directory.
///
/// Resolution order:
/// 1. `explicit`, usually from `--config-dir`
/// 2. `PSP_VALIDATOR_CONFIG_DIR` environment variable
/// 3. `config/` directory relative to workspace root
pub fn config_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Ok(root) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(root);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config")
}

/// Directory holding one subdirectory per fDMF version.
pub fn fdmf_root(config_root: &Path) -> PathBuf {
    config_root.join("fdmf")
}

/// External tool definitions.
pub fn tools_config_path(config_root: &Path) -> PathBuf {
    config_root.join("tools.toml")
}
