//! Strips per-cell identifiers, vendor metadata and execution state from a notebook.

use crate::core::config::SanitizerConfig;
use crate::core::error::PipelineError;
use nbproc_types::{CellType, NotebookDocument};
use std::path::Path;

/// Produces a portable copy of a notebook document.
#[derive(Debug, Clone)]
pub struct DocumentSanitizer {
    stripped_metadata_keys: Vec<String>,
}

impl DocumentSanitizer {
    pub fn new(config: &SanitizerConfig) -> Self {
        let stripped_metadata_keys = config
            .vendor_metadata_keys
            .iter()
            .chain(config.execution_metadata_keys.iter())
            .cloned()
            .collect();
        DocumentSanitizer {
            stripped_metadata_keys,
        }
    }

    /// Return a sanitized copy; cell order and all other content are unchanged.
    pub fn sanitize(&self, document: &NotebookDocument) -> NotebookDocument {
        let mut cleaned = document.clone();
        for cell in &mut cleaned.cells {
            cell.id = None;
            for key in &self.stripped_metadata_keys {
                cell.metadata.shift_remove(key);
            }
            if cell.cell_type == CellType::Code {
                cell.outputs = Some(Vec::new());
                cell.execution_count = Some(None);
            } else {
                cell.outputs = None;
                cell.execution_count = None;
            }
        }
        cleaned
    }

    /// True when no cell carries an identifier, execution state or a stripped key.
    pub fn is_clean(&self, document: &NotebookDocument) -> bool {
        document.cells.iter().all(|cell| {
            let state_cleared = match cell.cell_type {
                CellType::Code => {
                    cell.outputs.as_ref().is_some_and(|o| o.is_empty())
                        && cell.execution_count == Some(None)
                }
                _ => cell.outputs.is_none() && cell.execution_count.is_none(),
            };
            cell.id.is_none()
                && state_cleared
                && self
                    .stripped_metadata_keys
                    .iter()
                    .all(|key| !cell.metadata.contains_key(key))
        })
    }
}

/// Parse a notebook document, rejecting anything that is not nbformat 4.
pub fn parse_document(path: &Path, content: &str) -> Result<NotebookDocument, PipelineError> {
    let document: NotebookDocument = serde_json::from_str(content)
        .map_err(|e| PipelineError::document_format(path, e))?;
    check_format(path, &document)?;
    Ok(document)
}

pub fn check_format(path: &Path, document: &NotebookDocument) -> Result<(), PipelineError> {
    if document.nbformat != 4 {
        return Err(PipelineError::document_format(
            path,
            format!("unsupported nbformat {}", document.nbformat),
        ));
    }
    Ok(())
}
