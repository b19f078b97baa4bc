use crate::core::error::{CleanupWarning, Stage, StageError};
use crate::core::pipeline::Conversion;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Converted { output: PathBuf, digest: String },
    Failed { stage: Stage, reason: String },
}

/// Result of converting one notebook, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionOutcome {
    pub notebook: PathBuf,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CleanupWarning>,
}

impl ConversionOutcome {
    pub fn converted(conversion: Conversion) -> Self {
        ConversionOutcome {
            notebook: conversion.notebook,
            status: OutcomeStatus::Converted {
                output: conversion.output,
                digest: conversion.digest,
            },
            warnings: conversion.warnings,
        }
    }

    pub fn failed(notebook: &Path, error: &StageError) -> Self {
        ConversionOutcome {
            notebook: notebook.to_path_buf(),
            status: OutcomeStatus::Failed {
                stage: error.stage,
                reason: error.error.to_string(),
            },
            warnings: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Converted { .. })
    }
}

/// Outcomes for every notebook found in a batch, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<ConversionOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, outcome: ConversionOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn converted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.converted()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut report = String::new();
        for outcome in &self.outcomes {
            report.push_str(&render_outcome(outcome));
            report.push('\n');
            for warning in &outcome.warnings {
                report.push_str(&format!("  warning: {}\n", warning));
            }
        }
        report.push_str(&format!(
            "{} notebook(s): {} converted, {} failed\n",
            self.outcomes.len(),
            self.converted(),
            self.failed()
        ));
        report
    }
}

/// One-line summary of an outcome.
pub fn render_outcome(outcome: &ConversionOutcome) -> String {
    match &outcome.status {
        OutcomeStatus::Converted { output, digest } => format!(
            "converted {} -> {} (sha256 {})",
            outcome.notebook.display(),
            output.display(),
            short_digest(digest)
        ),
        OutcomeStatus::Failed { stage, reason } => format!(
            "FAILED    {} at stage '{}': {}",
            outcome.notebook.display(),
            stage,
            reason
        ),
    }
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
