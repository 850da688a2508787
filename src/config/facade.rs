//! Layered configuration loading

use crate::config::merge;
use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::DagfsConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`DagfsConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `workspace_root`.
    ///
    /// Precedence, lowest to highest: built-in defaults, the global file,
    /// `<workspace>/dagfs.toml`, then `DAGFS__SECTION__KEY` variables.
    pub fn load(workspace_root: &Path) -> Result<DagfsConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;

        let config: DagfsConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load a single file over the built-in defaults
    pub fn load_from_file(path: &Path) -> Result<DagfsConfig, ConfigError> {
        merge::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Location of the global configuration file, if HOME is set
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
