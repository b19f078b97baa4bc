//! Orchestrates notebook conversion:
//! `Loaded -> Sanitized -> Extracted -> Classified -> Composed -> Written -> CleanedUp`.
//!
//! Each notebook gets its own scratch directory for the cleaned document and the
//! extracted source. The directory is removed whether the conversion succeeds or not.

use crate::core::composer::ProcedureComposer;
use crate::core::config::{ConfigValidator, ConverterConfig};
use crate::core::error::{CleanupWarning, PipelineError, Stage, StageError};
use crate::core::imports::{ImportClassifier, SafetyFilter};
use crate::core::line_filter::LineFilter;
use crate::core::report::{BatchReport, ConversionOutcome};
use crate::core::sanitizer::{check_format, DocumentSanitizer};
use crate::tools::{discover_output, extractor_from_config, ExtractionRequest, ScriptExtractor};
use crate::utils::files::{base_name, list_files_with_extension, write_file, ScratchSpace};
use crate::utils::serialization::{FileSerializer, FileUtils, JsonSerializer};
use nbproc_types::NotebookDocument;
use std::path::{Path, PathBuf};
use tracing::Instrument;

const NOTEBOOK_EXTENSION: &str = "ipynb";

/// A finished single-notebook conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub notebook: PathBuf,
    pub output: PathBuf,
    /// Hex SHA-256 of the generated script.
    pub digest: String,
    pub warnings: Vec<CleanupWarning>,
}

pub struct PipelineDriver {
    config: ConverterConfig,
    sanitizer: DocumentSanitizer,
    classifier: ImportClassifier,
    safety: SafetyFilter,
    line_filter: LineFilter,
    composer: ProcedureComposer,
    extractor: Box<dyn ScriptExtractor>,
}

impl PipelineDriver {
    /// Validate `config` and build every stage from it.
    pub fn new(
        config: ConverterConfig,
        extractor: Box<dyn ScriptExtractor>,
    ) -> Result<Self, PipelineError> {
        ConfigValidator::validate(&config)?;
        Ok(PipelineDriver {
            sanitizer: DocumentSanitizer::new(&config.sanitizer),
            classifier: ImportClassifier::new(),
            safety: SafetyFilter::new(&config.imports),
            line_filter: LineFilter::new(&config.filter, &config.imports)?,
            composer: ProcedureComposer::new(&config.procedure),
            extractor,
            config,
        })
    }

    /// Build a driver using the extractor named in the configuration.
    pub fn from_config(config: ConverterConfig) -> Result<Self, PipelineError> {
        let extractor = extractor_from_config(&config)?;
        Self::new(config, extractor)
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one notebook into `<output_dir>/<base>.<script_extension>`.
    pub async fn convert_notebook(
        &self,
        notebook: &Path,
        output_dir: &Path,
    ) -> Result<Conversion, StageError> {
        let base = base_name(notebook).ok_or_else(|| {
            StageError::new(
                Stage::Loaded,
                PipelineError::document_format(notebook, "file name is not valid UTF-8"),
            )
        })?;
        let span = tracing::info_span!("convert", notebook = %base);
        self.convert_named(notebook, &base, output_dir)
            .instrument(span)
            .await
    }

    async fn convert_named(
        &self,
        notebook: &Path,
        base: &str,
        output_dir: &Path,
    ) -> Result<Conversion, StageError> {
        let document = self.load(notebook)?;
        let already_clean = self.sanitizer.is_clean(&document);
        tracing::debug!(cells = document.cells.len(), already_clean, "loaded");

        let cleaned = self.sanitizer.sanitize(&document);
        let scratch_parent = self.scratch_parent(notebook);
        let scratch = ScratchSpace::create(&scratch_parent, base).map_err(|source| {
            StageError::new(
                Stage::Sanitized,
                PipelineError::Output {
                    path: scratch_parent.clone(),
                    source,
                },
            )
        })?;

        let result = self
            .run_stages(base, &cleaned, &scratch, output_dir)
            .await;

        let warning = scratch.close();
        if let Some(warning) = &warning {
            tracing::warn!(%warning, "cleanup incomplete");
        }

        match result {
            Ok(mut conversion) => {
                conversion.notebook = notebook.to_path_buf();
                conversion.warnings.extend(warning);
                tracing::info!(stage = %Stage::CleanedUp, output = %conversion.output.display(), "converted");
                Ok(conversion)
            }
            Err(err) => {
                tracing::error!(stage = %err.stage, error = %err.error, "conversion failed");
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        base: &str,
        cleaned: &NotebookDocument,
        scratch: &ScratchSpace,
        output_dir: &Path,
    ) -> Result<Conversion, StageError> {
        let cleaned_path = scratch.cleaned_document_path(base);
        FileUtils
            .save_to_file(&cleaned_path, cleaned, &JsonSerializer)
            .map_err(|e| {
                StageError::new(
                    Stage::Sanitized,
                    PipelineError::Output {
                        path: cleaned_path.clone(),
                        source: std::io::Error::other(e.to_string()),
                    },
                )
            })?;
        tracing::info!(stage = %Stage::Sanitized, "cleaned document persisted");

        let request = ExtractionRequest {
            input: cleaned_path,
            output_name: base.to_string(),
            output_dir: scratch.path().to_path_buf(),
        };
        self.extractor
            .extract(&request)
            .await
            .map_err(|e| StageError::new(Stage::Extracted, e))?;
        let source_path = discover_output(
            &request,
            &self.config.extractor.output_extensions,
            &self.config.procedure.script_extension,
        )
        .map_err(|e| StageError::new(Stage::Extracted, e))?;
        tracing::info!(stage = %Stage::Extracted, extractor = self.extractor.name(), "source extracted");

        let source = std::fs::read_to_string(&source_path).map_err(|source| {
            StageError::new(
                Stage::Classified,
                PipelineError::Classification {
                    path: source_path.clone(),
                    source,
                },
            )
        })?;
        let partition = self.safety.partition(self.classifier.classify(&source));
        let body = self.line_filter.filter(&source);
        tracing::debug!(
            safe_imports = partition.safe.len(),
            blocked_imports = partition.blocked.len(),
            body_lines = body.len(),
            "classified"
        );
        for blocked in &partition.blocked {
            tracing::debug!(import = %blocked.text, "import blocked");
        }

        let script = self
            .composer
            .compose(base, &partition.safe, &body)
            .map_err(|e| StageError::new(Stage::Composed, e))?;

        let output = output_dir.join(format!(
            "{}.{}",
            base, self.config.procedure.script_extension
        ));
        write_file(&output, &script.content).map_err(|source| {
            StageError::new(
                Stage::Written,
                PipelineError::Output {
                    path: output.clone(),
                    source,
                },
            )
        })?;
        tracing::info!(stage = %Stage::Written, "script written");

        Ok(Conversion {
            notebook: PathBuf::new(),
            output,
            digest: script.digest(),
            warnings: Vec::new(),
        })
    }

    /// Convert every notebook in `notebook_dir`; failures are recorded, not propagated.
    pub async fn convert_all(
        &self,
        notebook_dir: &Path,
        output_dir: &Path,
    ) -> Result<BatchReport, PipelineError> {
        let notebooks =
            list_files_with_extension(notebook_dir, NOTEBOOK_EXTENSION).map_err(|e| {
                PipelineError::Config(format!(
                    "cannot read notebook directory {}: {}",
                    notebook_dir.display(),
                    e
                ))
            })?;
        tracing::info!(count = notebooks.len(), dir = %notebook_dir.display(), "batch started");

        let mut report = BatchReport::default();
        for notebook in notebooks {
            let outcome = match self.convert_notebook(&notebook, output_dir).await {
                Ok(conversion) => ConversionOutcome::converted(conversion),
                Err(err) => ConversionOutcome::failed(&notebook, &err),
            };
            report.push(outcome);
        }

        tracing::info!(
            converted = report.converted(),
            failed = report.failed(),
            "batch finished"
        );
        Ok(report)
    }

    fn load(&self, notebook: &Path) -> Result<NotebookDocument, StageError> {
        let document: NotebookDocument = FileUtils
            .load_from_file(notebook, &JsonSerializer)
            .map_err(|e| {
                StageError::new(
                    Stage::Loaded,
                    PipelineError::document_format(notebook, format!("{:#}", e)),
                )
            })?;
        check_format(notebook, &document).map_err(|e| StageError::new(Stage::Loaded, e))?;
        Ok(document)
    }

    fn scratch_parent(&self, notebook: &Path) -> PathBuf {
        match &self.config.paths.scratch_dir {
            Some(dir) => dir.clone(),
            None => notebook
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}
