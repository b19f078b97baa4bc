//! Renders `CREATE OR REPLACE PROCEDURE` statements for generated scripts.
//!
//! Rendering is offline: statements are printed, never executed.

use crate::core::config::{ProcedureConfig, RegistrationConfig};
use crate::core::error::PipelineError;
use crate::utils::files::{base_name, list_files_with_extension};
use std::path::{Path, PathBuf};

const BODY_DELIMITER: &str = "$$";

/// DDL for one script, or the reason it could not be rendered.
#[derive(Debug)]
pub struct RegistrationEntry {
    pub script: PathBuf,
    pub ddl: Result<String, PipelineError>,
}

#[derive(Debug, Clone)]
pub struct RegistrationRenderer {
    runtime_version: String,
    packages: Vec<String>,
    returns: String,
    handler: String,
}

impl RegistrationRenderer {
    pub fn new(registration: &RegistrationConfig, procedure: &ProcedureConfig) -> Self {
        RegistrationRenderer {
            runtime_version: registration.runtime_version.clone(),
            packages: registration.packages.clone(),
            returns: registration.returns.clone(),
            handler: procedure.entry_point.clone(),
        }
    }

    pub fn render(&self, procedure_name: &str, script: &str) -> Result<String, PipelineError> {
        if let Some(line) = script
            .lines()
            .position(|line| line.contains(BODY_DELIMITER))
        {
            return Err(PipelineError::Composition {
                line: line + 1,
                reason: format!(
                    "script for {} contains '{}' and cannot be embedded",
                    procedure_name, BODY_DELIMITER
                ),
            });
        }

        let packages = self
            .packages
            .iter()
            .map(|p| sql_literal(p))
            .collect::<Vec<_>>()
            .join(", ");

        let mut ddl = String::new();
        ddl.push_str(&format!("CREATE OR REPLACE PROCEDURE {}()\n", procedure_name));
        ddl.push_str(&format!("RETURNS {}\n", self.returns));
        ddl.push_str("LANGUAGE PYTHON\n");
        ddl.push_str(&format!(
            "RUNTIME_VERSION = {}\n",
            sql_literal(&self.runtime_version)
        ));
        ddl.push_str(&format!("PACKAGES = ({})\n", packages));
        ddl.push_str(&format!("HANDLER = {}\n", sql_literal(&self.handler)));
        ddl.push_str("AS\n");
        ddl.push_str(BODY_DELIMITER);
        ddl.push('\n');
        ddl.push_str(script.trim_end_matches('\n'));
        ddl.push('\n');
        ddl.push_str(BODY_DELIMITER);
        ddl.push_str(";\n");
        Ok(ddl)
    }

    /// One entry per `*.<extension>` file in `script_dir`, sorted by file name.
    pub fn render_dir(
        &self,
        script_dir: &Path,
        extension: &str,
    ) -> Result<Vec<RegistrationEntry>, PipelineError> {
        let scripts = list_files_with_extension(script_dir, extension).map_err(|e| {
            PipelineError::Config(format!(
                "cannot read script directory {}: {}",
                script_dir.display(),
                e
            ))
        })?;

        Ok(scripts
            .into_iter()
            .map(|script| {
                let ddl = self.render_file(&script);
                RegistrationEntry { script, ddl }
            })
            .collect())
    }

    fn render_file(&self, script: &Path) -> Result<String, PipelineError> {
        let name = base_name(script).ok_or_else(|| {
            PipelineError::document_format(script, "file name is not valid UTF-8")
        })?;
        let content = std::fs::read_to_string(script).map_err(|source| PipelineError::Output {
            path: script.to_path_buf(),
            source,
        })?;
        self.render(&name, &content)
    }
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
