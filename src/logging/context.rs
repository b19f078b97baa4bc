use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Single-notebook and diagnostic commands run from a terminal.
    LocalDev,
    /// Directory-wide conversion whose report is the console output.
    Batch,
    /// Any command under `NBPROC_CI=1`.
    Ci,
}

/// Derive the active execution context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> ExecutionContext {
    if ci_override_enabled() {
        return ExecutionContext::Ci;
    }

    match command {
        Command::Batch(_) => ExecutionContext::Batch,
        Command::Convert(_) | Command::Inspect(_) | Command::Ddl(_) => ExecutionContext::LocalDev,
    }
}

fn ci_override_enabled() -> bool {
    env::var("NBPROC_CI")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
