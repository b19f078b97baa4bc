//! Generates the instrumented procedure script around a filtered notebook body.
//!
//! The only transformation applied to body lines is a fixed indent prefix; the
//! output depends solely on the configuration, the script name, the imports and the
//! body, so the same inputs always produce the same bytes. The run identifier and
//! timestamps are produced by the generated script when it executes.

use crate::core::config::ProcedureConfig;
use crate::core::error::PipelineError;
use crate::core::imports::ImportStatement;
use nbproc_types::RunStatus;
use sha2::{Digest, Sha256};

/// Nesting depth of body lines: entry point body, then the `try:` region.
const BODY_DEPTH: usize = 2;

/// Composed script text plus the name it was generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub name: String,
    pub content: String,
}

impl GeneratedScript {
    /// Hex SHA-256 of the script content.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.content.as_bytes()))
    }
}

#[derive(Debug, Clone)]
pub struct ProcedureComposer {
    entry_point: String,
    context_param: String,
    indent_unit: String,
    log_table: String,
    header_comment: bool,
}

impl ProcedureComposer {
    pub fn new(config: &ProcedureConfig) -> Self {
        ProcedureComposer {
            entry_point: config.entry_point.clone(),
            context_param: config.context_param.clone(),
            indent_unit: " ".repeat(config.indent_width),
            log_table: config.log_table.clone(),
            header_comment: config.header_comment,
        }
    }

    pub fn compose(
        &self,
        script_name: &str,
        imports: &[ImportStatement],
        body: &[String],
    ) -> Result<GeneratedScript, PipelineError> {
        check_body_shape(body)?;

        let mut out = ScriptWriter::new(&self.indent_unit);

        if !imports.is_empty() {
            for import in imports {
                out.line(0, &import.text);
            }
            out.blank();
        }

        if self.header_comment {
            out.line(0, &format!("# Notebook: {}", script_name));
            out.blank();
        }

        self.write_preamble(&mut out);
        out.line(0, &format!("SCRIPT_NAME = {}", python_string(script_name)));
        out.blank();
        out.blank();
        self.write_entry_point(&mut out, body);

        Ok(GeneratedScript {
            name: script_name.to_string(),
            content: out.finish(),
        })
    }

    /// Fixed for a given configuration; shared by every generated script.
    fn write_preamble(&self, out: &mut ScriptWriter) {
        out.line(0, "import datetime as _nbproc_datetime");
        out.line(0, "import json as _nbproc_json");
        out.line(0, "import traceback as _nbproc_traceback");
        out.line(0, "import uuid as _nbproc_uuid");
        out.blank();
        out.line(
            0,
            &format!("RUN_LOG_TABLE = {}", python_string(&self.log_table)),
        );
        out.blank();
        out.blank();
        out.line(
            0,
            "def _record_run(session, run_id, status, error_detail=None):",
        );
        out.line(1, "# Run logging must never change the procedure outcome.");
        out.line(1, "try:");
        out.line(2, "session.sql(");
        out.line(
            3,
            "f\"INSERT INTO {RUN_LOG_TABLE} (RUN_ID, SCRIPT_NAME, STATUS, ERROR_DETAIL, LOGGED_AT) \"",
        );
        out.line(3, "\"VALUES (?, ?, ?, ?, ?)\",");
        out.line(
            3,
            "params=[run_id, SCRIPT_NAME, status, error_detail, _nbproc_logged_at()],",
        );
        out.line(2, ").collect()");
        out.line(1, "except Exception:");
        out.line(2, "pass");
        out.blank();
        out.blank();
        out.line(0, "def _nbproc_logged_at():");
        out.line(
            1,
            "return _nbproc_datetime.datetime.now(_nbproc_datetime.timezone.utc).isoformat()",
        );
        out.blank();
        out.blank();
    }

    fn write_entry_point(&self, out: &mut ScriptWriter, body: &[String]) {
        let ctx = &self.context_param;
        let started = RunStatus::Started.as_str();
        let success = RunStatus::Success.as_str();
        let failed = RunStatus::Failed.as_str();

        out.line(0, &format!("def {}({}):", self.entry_point, ctx));
        out.line(1, "_nbproc_run_id = str(_nbproc_uuid.uuid4())");
        out.line(
            1,
            &format!("_record_run({}, _nbproc_run_id, \"{}\")", ctx, started),
        );
        out.line(1, "try:");
        if body.is_empty() {
            out.line(BODY_DEPTH, "pass");
        }
        for line in body {
            if line.trim().is_empty() {
                out.blank();
            } else {
                out.line(BODY_DEPTH, line);
            }
        }
        out.line(1, "except Exception as _nbproc_exc:");
        out.line(
            2,
            "_nbproc_error = f\"{_nbproc_exc}\\n{_nbproc_traceback.format_exc()}\"",
        );
        out.line(
            2,
            &format!(
                "_record_run({}, _nbproc_run_id, \"{}\", _nbproc_error)",
                ctx, failed
            ),
        );
        out.line(
            2,
            &format!(
                "return _nbproc_json.dumps({{\"run_id\": _nbproc_run_id, \"status\": \"{}\", \"error\": _nbproc_error}})",
                failed
            ),
        );
        out.line(
            1,
            &format!("_record_run({}, _nbproc_run_id, \"{}\")", ctx, success),
        );
        out.line(
            1,
            &format!(
                "return _nbproc_json.dumps({{\"run_id\": _nbproc_run_id, \"status\": \"{}\"}})",
                success
            ),
        );
    }
}

/// Reject bodies that cannot be re-indented into valid code.
fn check_body_shape(body: &[String]) -> Result<(), PipelineError> {
    let mut seen_tab = false;
    let mut seen_space = false;

    for (index, line) in body.iter().enumerate() {
        let number = index + 1;
        if line.contains('\n') || line.contains('\r') {
            return Err(PipelineError::Composition {
                line: number,
                reason: "line contains an embedded line break".to_string(),
            });
        }
        if line.trim().is_empty() {
            continue;
        }

        let indent: String = line
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        if number == 1 && !indent.is_empty() {
            return Err(PipelineError::Composition {
                line: number,
                reason: "first body line is indented".to_string(),
            });
        }
        seen_tab |= indent.contains('\t');
        seen_space |= indent.contains(' ');
        if seen_tab && seen_space {
            return Err(PipelineError::Composition {
                line: number,
                reason: "indentation mixes tabs and spaces".to_string(),
            });
        }
    }
    Ok(())
}

/// Double-quoted literal; JSON escapes are valid Python string escapes.
fn python_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

struct ScriptWriter<'a> {
    indent_unit: &'a str,
    buffer: String,
}

impl<'a> ScriptWriter<'a> {
    fn new(indent_unit: &'a str) -> Self {
        ScriptWriter {
            indent_unit,
            buffer: String::new(),
        }
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.buffer.push_str(self.indent_unit);
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    fn blank(&mut self) {
        self.buffer.push('\n');
    }

    fn finish(mut self) -> String {
        while self.buffer.ends_with("\n\n") {
            self.buffer.pop();
        }
        self.buffer
    }
}
