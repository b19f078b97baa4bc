use crate::core::config::ExtractorConfig;
use crate::core::error::PipelineError;
use crate::tools::{ExtractionRequest, ScriptExtractor};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Captured result of one external process run.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub exit_code: i32,
    pub execution_time_ms: u64,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Run `program` with `args`, killing it if it outlives `timeout`.
pub async fn execute_command(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<ToolResult, ExecutionError> {
    let started = Instant::now();
    let child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| ExecutionError::Timeout {
            program: program.to_string(),
            timeout,
        })?
        .map_err(|source| ExecutionError::Spawn {
            program: program.to_string(),
            source,
        })?;

    Ok(ToolResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        execution_time_ms: started.elapsed().as_millis() as u64,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Extractor backed by an external program such as `jupyter nbconvert --to script`.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        CommandExtractor {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Result<Self, PipelineError> {
        let timeout = config
            .timeout_duration()
            .map_err(|e| PipelineError::Config(format!("extractor.timeout: {}", e)))?;
        Ok(Self::new(config.program.clone(), config.args.clone(), timeout))
    }

    /// Substitute request placeholders into the configured arguments.
    pub fn render_args(&self, request: &ExtractionRequest) -> Vec<String> {
        let input = request.input.display().to_string();
        let output_dir = request.output_dir.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output_name}", &request.output_name)
                    .replace("{output_dir}", &output_dir)
            })
            .collect()
    }
}

#[async_trait]
impl ScriptExtractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.program
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<(), PipelineError> {
        let args = self.render_args(request);
        tracing::debug!(program = %self.program, ?args, "running extractor");

        let result = execute_command(&self.program, &args, self.timeout)
            .await
            .map_err(|err| match err {
                ExecutionError::Timeout { timeout, .. } => PipelineError::ExtractionTimeout {
                    notebook: request.output_name.clone(),
                    timeout,
                },
                spawn @ ExecutionError::Spawn { .. } => {
                    PipelineError::extraction(&request.output_name, spawn)
                }
            })?;

        tracing::debug!(
            exit_code = result.exit_code,
            elapsed_ms = result.execution_time_ms,
            "extractor finished"
        );

        if !result.success {
            let stderr = result.stderr.trim();
            let detail = if stderr.is_empty() {
                format!("{} exited with status {}", self.program, result.exit_code)
            } else {
                format!(
                    "{} exited with status {}: {}",
                    self.program, result.exit_code, stderr
                )
            };
            return Err(PipelineError::extraction(&request.output_name, detail));
        }
        Ok(())
    }
}
