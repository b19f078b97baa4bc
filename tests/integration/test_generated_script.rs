//! Runs generated scripts under `python3` against a recording session.
//!
//! Every test returns early when `python3` is not on the PATH.

use nbproc::core::config::ExtractorKind;
use nbproc::core::{ConverterConfig, PipelineDriver};
use nbproc_types::{ProcedureResult, RunRecord, RunStatus};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Loads a generated script, calls its entry point with a session that records
/// every run-log insert, and prints the result plus the recorded rows.
const HARNESS: &str = r#"
import importlib.util
import json
import sys

rows = []
columns = ["run_id", "script_name", "status", "error_detail", "logged_at"]


class _Statement:
    def collect(self):
        return []


class RecordingSession:
    def sql(self, query, params=None):
        rows.append(dict(zip(columns, params)))
        return _Statement()


spec = importlib.util.spec_from_file_location("generated", sys.argv[1])
module = importlib.util.module_from_spec(spec)
spec.loader.exec_module(module)
result = getattr(module, sys.argv[2])(RecordingSession())
print(json.dumps({"result": result, "rows": rows}))
"#;

#[derive(Debug, Deserialize)]
struct Execution {
    result: String,
    rows: Vec<RunRecord>,
}

impl Execution {
    fn procedure_result(&self) -> ProcedureResult {
        serde_json::from_str(&self.result).unwrap()
    }
}

fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn builtin_config() -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.extractor.kind = ExtractorKind::Builtin;
    config
}

fn write_notebook(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(format!("{}.ipynb", name));
    let document = json!({
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": ["# Job"]},
            {"cell_type": "code", "id": "c1", "metadata": {}, "source": source,
             "outputs": [], "execution_count": 3}
        ],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5
    });
    fs::write(&path, document.to_string()).unwrap();
    path
}

async fn convert(work: &TempDir, name: &str, source: &str) -> PathBuf {
    let notebook = write_notebook(work.path(), name, source);
    let driver = PipelineDriver::from_config(builtin_config()).unwrap();
    driver
        .convert_notebook(&notebook, &work.path().join("scripts"))
        .await
        .unwrap()
        .output
}

fn execute(work: &TempDir, script: &Path) -> Execution {
    let harness = work.path().join("harness.py");
    fs::write(&harness, HARNESS).unwrap();
    let output = Command::new("python3")
        .arg(&harness)
        .arg(script)
        .arg("main")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "harness failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn assert_single_run(execution: &Execution, status: RunStatus) {
    let result = execution.procedure_result();
    assert_eq!(result.status, status, "error: {:?}", result.error);
    assert_eq!(execution.rows.len(), 2);
    assert_eq!(execution.rows[0].status, RunStatus::Started);
    assert!(execution.rows[1].terminates(&execution.rows[0]));
    assert_eq!(execution.rows[1].status, status);
    assert_eq!(execution.rows[0].run_id.to_string(), result.run_id);
}

#[tokio::test]
async fn notebook_datetime_module_survives_preamble() {
    if !python_available() {
        return;
    }
    let work = TempDir::new().unwrap();
    let script = convert(
        &work,
        "dates",
        "import datetime\nstart = datetime.date(2024, 1, 1)\nrun_id = 'notebook value'\nassert (start + datetime.timedelta(days=1)).day == 2",
    )
    .await;

    let execution = execute(&work, &script);
    assert_single_run(&execution, RunStatus::Success);
    assert_eq!(execution.rows[0].script_name, "dates");
}

#[tokio::test]
async fn lines_after_parenthesis_in_string_still_run() {
    if !python_available() {
        return;
    }
    let work = TempDir::new().unwrap();
    let script = convert(
        &work,
        "totals",
        "x = 1\nprint(\"total (\")\ny = x + 1\nassert y == 2",
    )
    .await;

    let execution = execute(&work, &script);
    assert_single_run(&execution, RunStatus::Success);
}

#[tokio::test]
async fn backslash_continued_platform_call_leaves_valid_script() {
    if !python_available() {
        return;
    }
    let work = TempDir::new().unwrap();
    let script = convert(
        &work,
        "chained",
        "rows = [1, 2]\nsdf = spark.read \\\n    .table('t')\ncount = len(rows)\nassert count == 2",
    )
    .await;

    let execution = execute(&work, &script);
    assert_single_run(&execution, RunStatus::Success);
}

#[tokio::test]
async fn raised_error_is_logged_and_returned() {
    if !python_available() {
        return;
    }
    let work = TempDir::new().unwrap();
    let script = convert(&work, "broken", "value = 1\nraise ValueError('boom')").await;

    let execution = execute(&work, &script);
    assert_single_run(&execution, RunStatus::Failed);
    let result = execution.procedure_result();
    assert!(result.error.as_deref().is_some_and(|e| e.contains("boom")));
    let detail = execution.rows[1].error_detail.as_deref().unwrap();
    assert!(detail.contains("ValueError"));
}

#[tokio::test]
async fn platform_heavy_notebook_compiles() {
    if !python_available() {
        return;
    }
    let work = TempDir::new().unwrap();
    let script = convert(
        &work,
        "platform",
        "\
import pandas as pd
from pyspark.sql import functions as F
session = get_active_session()
spark = SparkSession.builder \\
    .appName('job') \\
    .getOrCreate()
df = pd.DataFrame({'a': [1, 2]})
display(
    df,
)
for i in range(2):
    print(f'row {i} (')
    df.head()
    total = i
dbutils.fs.ls('/mnt')
result = df['a'].sum()",
    )
    .await;

    let output = Command::new("python3")
        .args(["-m", "py_compile"])
        .arg(&script)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "py_compile failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = fs::read_to_string(&script).unwrap();
    assert!(content.contains("            total = i\n"));
    assert!(content.contains("        result = df['a'].sum()\n"));
    assert!(!content.contains("appName"));
}
