use crate::core::config::ExtractorConfig;
use crate::core::error::PipelineError;
use crate::core::sanitizer::parse_document;
use crate::tools::{ExtractionRequest, ScriptExtractor};
use async_trait::async_trait;
use nbproc_types::{CellType, NotebookDocument};

/// In-process extractor producing the same layout as `nbconvert --to script`:
/// code cells under `# In[ ]:` markers, markdown cells as comments, raw cells dropped.
#[derive(Debug, Clone)]
pub struct BuiltinExtractor {
    extension: String,
}

impl BuiltinExtractor {
    pub fn new() -> Self {
        Self::with_extension("py")
    }

    pub fn with_extension(extension: impl Into<String>) -> Self {
        BuiltinExtractor {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Writes the first extension the pipeline will look for.
    pub fn from_config(config: &ExtractorConfig) -> Self {
        config
            .output_extensions
            .first()
            .map(|extension| Self::with_extension(extension.as_str()))
            .unwrap_or_default()
    }

    pub fn render(document: &NotebookDocument) -> String {
        let mut out = String::from("#!/usr/bin/env python\n# coding: utf-8\n");
        for cell in &document.cells {
            let source = cell.source.text();
            match cell.cell_type {
                CellType::Code => {
                    out.push_str("\n# In[ ]:\n\n\n");
                    out.push_str(&source);
                    out.push_str("\n\n");
                }
                CellType::Markdown => {
                    out.push('\n');
                    for line in source.lines() {
                        if line.is_empty() {
                            out.push_str("#\n");
                        } else {
                            out.push_str("# ");
                            out.push_str(line);
                            out.push('\n');
                        }
                    }
                    out.push('\n');
                }
                CellType::Raw => {}
            }
        }
        out
    }
}

impl Default for BuiltinExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptExtractor for BuiltinExtractor {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<(), PipelineError> {
        let content = tokio::fs::read_to_string(&request.input)
            .await
            .map_err(|e| PipelineError::extraction(&request.output_name, e))?;
        let document = parse_document(&request.input, &content)?;
        let target = request
            .output_dir
            .join(format!("{}.{}", request.output_name, self.extension));
        tokio::fs::write(&target, Self::render(&document))
            .await
            .map_err(|e| PipelineError::extraction(&request.output_name, e))?;
        Ok(())
    }
}
