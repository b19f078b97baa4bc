pub mod builtin;
pub mod execution;

pub use builtin::BuiltinExtractor;
pub use execution::{CommandExtractor, ExecutionError, ToolResult};

use crate::core::config::{ConverterConfig, ExtractorKind};
use crate::core::error::PipelineError;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// Inputs for one extractor run.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Sanitized notebook document on disk.
    pub input: PathBuf,
    /// Base name the produced file must carry.
    pub output_name: String,
    /// Directory the extractor writes into.
    pub output_dir: PathBuf,
}

/// Flattens a notebook document into one plain source file.
///
/// Implementations deposit `<output_name>.<ext>` inside `output_dir`; the driver
/// locates it with [`discover_output`].
#[async_trait]
pub trait ScriptExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, request: &ExtractionRequest) -> Result<(), PipelineError>;
}

/// Build the extractor selected by `[extractor].kind`.
pub fn extractor_from_config(
    config: &ConverterConfig,
) -> Result<Box<dyn ScriptExtractor>, PipelineError> {
    match config.extractor.kind {
        ExtractorKind::Command => Ok(Box::new(CommandExtractor::from_config(&config.extractor)?)),
        ExtractorKind::Builtin => Ok(Box::new(BuiltinExtractor::from_config(&config.extractor))),
    }
}

/// Find the extractor output by its expected name and normalize its extension.
///
/// Only `<output_name>.<ext>` for the configured extensions is considered; a missing
/// file is an extraction failure rather than a guess at some other file.
pub fn discover_output(
    request: &ExtractionRequest,
    extensions: &[String],
    canonical_extension: &str,
) -> Result<PathBuf, PipelineError> {
    let mut tried = Vec::new();
    for extension in extensions {
        let candidate = output_path(&request.output_dir, &request.output_name, extension);
        if candidate.is_file() {
            if extension == canonical_extension {
                return Ok(candidate);
            }
            let canonical =
                output_path(&request.output_dir, &request.output_name, canonical_extension);
            fs::rename(&candidate, &canonical).map_err(|e| {
                PipelineError::extraction(
                    &request.output_name,
                    format!(
                        "cannot rename {} to {}: {}",
                        candidate.display(),
                        canonical.display(),
                        e
                    ),
                )
            })?;
            return Ok(canonical);
        }
        tried.push(candidate.display().to_string());
    }
    Err(PipelineError::extraction(
        &request.output_name,
        format!("no output produced; looked for {}", tried.join(", ")),
    ))
}

fn output_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, extension.trim_start_matches('.')))
}
