use super::ConverterConfig;
use crate::core::error::PipelineError;
use std::env;
use std::path::{Path, PathBuf};

/// File name looked up in the workspace root when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "nbproc.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/nbproc.toml).
    /// Environment variables override config file values; a missing file means defaults.
    pub fn load_from_workspace(workspace_path: &Path) -> Result<ConverterConfig, PipelineError> {
        Self::load(&workspace_path.join(CONFIG_FILE_NAME))
    }

    /// Load config from an explicit path, falling back to defaults when absent.
    pub fn load(path: &Path) -> Result<ConverterConfig, PipelineError> {
        let mut config = Self::load_from_file(path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Returns Ok(None) if the file doesn't exist.
    pub fn load_from_file(path: &Path) -> Result<Option<ConverterConfig>, PipelineError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: ConverterConfig = toml::from_str(&content).map_err(|e| {
            PipelineError::Config(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Some(config))
    }

    fn apply_env_overrides(config: &mut ConverterConfig) {
        if let Ok(dir) = env::var("NBPROC_NOTEBOOK_DIR") {
            config.paths.notebook_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var("NBPROC_SCRIPT_DIR") {
            config.paths.script_dir = PathBuf::from(dir);
        }

        if let Ok(program) = env::var("NBPROC_EXTRACTOR_PROGRAM") {
            config.extractor.program = program;
        }

        if let Ok(timeout) = env::var("NBPROC_EXTRACTOR_TIMEOUT") {
            config.extractor.timeout = timeout;
        }

        if let Ok(table) = env::var("NBPROC_LOG_TABLE") {
            config.procedure.log_table = table;
        }

        if let Ok(entry_point) = env::var("NBPROC_ENTRY_POINT") {
            config.procedure.entry_point = entry_point;
        }
    }
}
