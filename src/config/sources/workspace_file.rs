//! Per-project config layers under `<workspace>/config/`.
//!
//! `config.toml` holds the project's linker and extension settings; `<env>.toml` (env from
//! `CSN_LINK_ENV`, `development` when unset) overrides them, e.g. `strict` conflicts in `ci.toml`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_VAR: &str = "CSN_LINK_ENV";
const DEFAULT_ENV: &str = "development";

/// Candidate layer files, lowest precedence first.
fn layer_paths(workspace_root: &Path) -> [PathBuf; 2] {
    let dir = workspace_root.join("config");
    let env = std::env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENV.to_string());
    [dir.join("config.toml"), dir.join(format!("{}.toml", env))]
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = layer_paths(workspace_root)
        .into_iter()
        .filter(|path| path.is_file())
        .fold(builder, |builder, path| {
            debug!(config_path = %path.display(), "Adding workspace config layer");
            builder.add_source(File::from(path).required(true))
        });
    Ok(builder)
}
