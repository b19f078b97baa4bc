use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Stages of a single notebook conversion, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loaded,
    Sanitized,
    Extracted,
    Classified,
    Composed,
    Written,
    CleanedUp,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Loaded => "loaded",
            Stage::Sanitized => "sanitized",
            Stage::Extracted => "extracted",
            Stage::Classified => "classified",
            Stage::Composed => "composed",
            Stage::Written => "written",
            Stage::CleanedUp => "cleaned_up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by pipeline components.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("malformed notebook {path}: {reason}")]
    DocumentFormat { path: PathBuf, reason: String },
    #[error("extraction failed for {notebook}: {reason}")]
    Extraction { notebook: String, reason: String },
    #[error("extractor timed out after {} for {notebook}", format_timeout(.timeout))]
    ExtractionTimeout { notebook: String, timeout: Duration },
    #[error("cannot read extracted source {path}: {source}")]
    Classification {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot compose script at line {line}: {reason}")]
    Composition { line: usize, reason: String },
    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

fn format_timeout(timeout: &Duration) -> String {
    humantime::format_duration(*timeout).to_string()
}

impl PipelineError {
    pub fn document_format(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        PipelineError::DocumentFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction(notebook: impl Into<String>, reason: impl fmt::Display) -> Self {
        PipelineError::Extraction {
            notebook: notebook.into(),
            reason: reason.to_string(),
        }
    }
}

/// A pipeline failure tagged with the stage that was being attempted.
#[derive(Debug, thiserror::Error)]
#[error("stage '{stage}' failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

impl StageError {
    pub fn new(stage: Stage, error: PipelineError) -> Self {
        StageError { stage, error }
    }
}

/// Non-fatal problem removing a temporary artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not remove {}: {}",
            self.path.display(),
            self.reason
        )
    }
}
