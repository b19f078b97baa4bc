use async_trait::async_trait;
use nbproc::core::config::ExtractorKind;
use nbproc::core::error::PipelineError;
use nbproc::core::{ConverterConfig, OutcomeStatus, PipelineDriver, Stage};
use nbproc::tools::{BuiltinExtractor, ExtractionRequest, ScriptExtractor};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn builtin_config() -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.extractor.kind = ExtractorKind::Builtin;
    config
}

fn write_notebook(dir: &Path, name: &str, cells: serde_json::Value) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{}.ipynb", name));
    let document = json!({
        "cells": cells,
        "metadata": {"application/vnd.databricks.v1+notebook": {"notebookName": name}},
        "nbformat": 4,
        "nbformat_minor": 5
    });
    fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    path
}

fn code_cell(source: &str) -> serde_json::Value {
    json!({
        "cell_type": "code",
        "id": "cell-1",
        "metadata": {"application/vnd.databricks.v1+cell": {"title": ""}},
        "source": source,
        "outputs": [{"output_type": "stream", "name": "stdout", "text": ["1\n"]}],
        "execution_count": 12
    })
}

/// Fails extraction for one named notebook, delegating the rest.
struct FlakyExtractor {
    fail_for: &'static str,
    inner: BuiltinExtractor,
}

#[async_trait]
impl ScriptExtractor for FlakyExtractor {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<(), PipelineError> {
        if request.output_name == self.fail_for {
            return Err(PipelineError::extraction(
                &request.output_name,
                "extractor exited with status 1",
            ));
        }
        self.inner.extract(request).await
    }
}

#[tokio::test]
async fn markdown_and_code_cell_keeps_assignment_and_drops_print() {
    let work = TempDir::new().unwrap();
    let notebook = write_notebook(
        &work.path().join("notebooks"),
        "simple",
        json!([
            {"cell_type": "markdown", "metadata": {}, "source": ["# Simple notebook"]},
            code_cell("x = 1\nprint(x)")
        ]),
    );
    let out = work.path().join("scripts");

    let driver = PipelineDriver::from_config(builtin_config()).unwrap();
    let conversion = driver.convert_notebook(&notebook, &out).await.unwrap();

    let script = fs::read_to_string(&conversion.output).unwrap();
    assert!(script.contains("\n        x = 1\n"));
    assert!(!script.contains("print(x)"));
    assert!(!script.contains("Simple notebook"));
    assert!(script.contains("def main(session):"));
    assert!(script.contains("SCRIPT_NAME = \"simple\""));
}

#[tokio::test]
async fn platform_import_never_reaches_output() {
    let work = TempDir::new().unwrap();
    let notebook = write_notebook(
        work.path(),
        "vendor",
        json!([code_cell(
            "import pandas as pd\nfrom vendor.platform import display\ndf = pd.DataFrame()\ndisplay(df)"
        )]),
    );

    let driver = PipelineDriver::from_config(builtin_config()).unwrap();
    let conversion = driver
        .convert_notebook(&notebook, &work.path().join("scripts"))
        .await
        .unwrap();

    let script = fs::read_to_string(&conversion.output).unwrap();
    assert!(!script.contains("vendor.platform"));
    assert!(!script.contains("display(df)"));
    assert!(script.starts_with("import pandas as pd\n\n"));
    assert!(script.contains("        df = pd.DataFrame()\n"));
}

#[tokio::test]
async fn batch_continues_past_failed_notebook() {
    let work = TempDir::new().unwrap();
    let notebooks = work.path().join("notebooks");
    for name in ["nb1", "nb2", "nb3"] {
        write_notebook(&notebooks, name, json!([code_cell("total = 1 + 1")]));
    }
    let out = work.path().join("scripts");

    let extractor = FlakyExtractor {
        fail_for: "nb2",
        inner: BuiltinExtractor::new(),
    };
    let driver = PipelineDriver::new(builtin_config(), Box::new(extractor)).unwrap();
    let report = driver.convert_all(&notebooks, &out).await.unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.converted(), 2);
    assert!(report.has_failures());
    assert!(report.outcomes[0].is_success());
    assert!(report.outcomes[2].is_success());
    match &report.outcomes[1].status {
        OutcomeStatus::Failed { stage, reason } => {
            assert_eq!(*stage, Stage::Extracted);
            assert!(reason.contains("status 1"));
        }
        other => panic!("expected failure, got {:?}", other),
    }

    assert!(out.join("nb1.py").is_file());
    assert!(!out.join("nb2.py").exists());
    assert!(out.join("nb3.py").is_file());

    let leftovers: Vec<_> = fs::read_dir(&notebooks)
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with(".nbproc-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn repeated_conversion_is_byte_identical() {
    let work = TempDir::new().unwrap();
    let notebook = write_notebook(
        work.path(),
        "stable",
        json!([code_cell(
            "import numpy as np\nimport pandas as pd\nvalues = np.arange(3)\nframe = pd.DataFrame(values)\nframe.head()"
        )]),
    );
    let driver = PipelineDriver::from_config(builtin_config()).unwrap();

    let first = driver
        .convert_notebook(&notebook, &work.path().join("first"))
        .await
        .unwrap();
    let second = driver
        .convert_notebook(&notebook, &work.path().join("second"))
        .await
        .unwrap();

    assert_eq!(first.digest, second.digest);
    assert_eq!(
        fs::read(&first.output).unwrap(),
        fs::read(&second.output).unwrap()
    );
}

#[tokio::test]
async fn configs_with_different_targets_coexist() {
    let work = TempDir::new().unwrap();
    let notebook = write_notebook(work.path(), "job", json!([code_cell("x = 1")]));

    let mut other = builtin_config();
    other.procedure.entry_point = "run".to_string();
    other.procedure.log_table = "OPS.RUNS".to_string();

    let default_driver = PipelineDriver::from_config(builtin_config()).unwrap();
    let other_driver = PipelineDriver::from_config(other).unwrap();

    let a = default_driver
        .convert_notebook(&notebook, &work.path().join("a"))
        .await
        .unwrap();
    let b = other_driver
        .convert_notebook(&notebook, &work.path().join("b"))
        .await
        .unwrap();

    let a = fs::read_to_string(a.output).unwrap();
    let b = fs::read_to_string(b.output).unwrap();
    assert!(a.contains("def main(session):"));
    assert!(a.contains("RUN_LOG_TABLE = \"ML_MONITORING.OPERATION_LOGS\""));
    assert!(b.contains("def run(session):"));
    assert!(b.contains("RUN_LOG_TABLE = \"OPS.RUNS\""));
}
