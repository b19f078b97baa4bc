use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BUILTIN_CONFIG: &str = r#"
[extractor]
kind = "builtin"
"#;

fn write_notebook(dir: &Path, name: &str, source: &str) {
    fs::create_dir_all(dir).unwrap();
    let document = json!({
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": ["# Report"]},
            {"cell_type": "code", "id": "c1", "metadata": {}, "source": source,
             "outputs": [], "execution_count": 1}
        ],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5
    });
    fs::write(dir.join(format!("{}.ipynb", name)), document.to_string()).unwrap();
}

fn workspace(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("nbproc.toml"), config).unwrap();
    dir
}

fn nbproc(workspace: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nbproc").unwrap();
    cmd.env_remove("NBPROC_CI")
        .env_remove("NBPROC_NOTEBOOK_DIR")
        .env_remove("NBPROC_SCRIPT_DIR")
        .env_remove("RUST_LOG")
        .arg("--workspace")
        .arg(workspace);
    cmd
}

#[test]
fn batch_converts_every_notebook() -> Result<(), Box<dyn std::error::Error>> {
    let ws = workspace(BUILTIN_CONFIG);
    let notebooks = ws.path().join("notebooks");
    write_notebook(&notebooks, "alpha", "import pandas as pd\nrows = 3\nprint(rows)");
    write_notebook(&notebooks, "beta", "total = 1 + 2");

    nbproc(ws.path())
        .arg("batch")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 notebook(s): 2 converted, 0 failed"))
        .stdout(predicate::str::contains("alpha.ipynb"));

    let alpha = fs::read_to_string(ws.path().join("scripts").join("alpha.py"))?;
    assert!(alpha.contains("        rows = 3\n"));
    assert!(!alpha.contains("print(rows)"));
    assert!(ws.path().join("scripts").join("beta.py").is_file());
    assert!(ws
        .path()
        .join(".nbproc")
        .join("logs")
        .join("nbproc.log")
        .is_file());
    Ok(())
}

#[test]
fn batch_reports_failure_and_exits_nonzero() -> Result<(), Box<dyn std::error::Error>> {
    let ws = workspace(BUILTIN_CONFIG);
    let notebooks = ws.path().join("notebooks");
    write_notebook(&notebooks, "a_good", "x = 1");
    fs::write(notebooks.join("b_broken.ipynb"), "{\"cells\": ")?;
    write_notebook(&notebooks, "c_good", "y = 2");

    nbproc(ws.path())
        .arg("batch")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("at stage 'loaded'"))
        .stdout(predicate::str::contains("3 notebook(s): 2 converted, 1 failed"))
        .stderr(predicate::str::contains("1 of 3 notebook(s) failed"));

    assert!(ws.path().join("scripts").join("a_good.py").is_file());
    assert!(ws.path().join("scripts").join("c_good.py").is_file());
    assert!(!ws.path().join("scripts").join("b_broken.py").exists());
    Ok(())
}

#[test]
fn batch_json_report_lists_outcomes() -> Result<(), Box<dyn std::error::Error>> {
    let ws = workspace(BUILTIN_CONFIG);
    let notebooks = ws.path().join("src");
    write_notebook(&notebooks, "only", "x = 1");

    let output = nbproc(ws.path())
        .args(["batch", "--notebook-dir", "src", "--output-dir", "out", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let outcome = &report["outcomes"][0];
    assert_eq!(outcome["status"], "converted");
    assert_eq!(outcome["digest"].as_str().map(str::len), Some(64));
    assert!(ws.path().join("out").join("only.py").is_file());
    Ok(())
}

#[cfg(unix)]
#[test]
fn convert_runs_command_extractor() -> Result<(), Box<dyn std::error::Error>> {
    let ws = workspace(
        r#"
[extractor]
program = "sh"
args = ["-c", 'printf "x = 1\nprint(x)\n" > "$1/$2.txt"', "{input}", "{output_dir}", "{output_name}"]
"#,
    );
    write_notebook(&ws.path().join("notebooks"), "shell", "ignored = True");

    nbproc(ws.path())
        .args(["convert", "notebooks/shell.ipynb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("converted"))
        .stdout(predicate::str::contains("shell.py"));

    let script = fs::read_to_string(ws.path().join("scripts").join("shell.py"))?;
    assert!(script.contains("        x = 1\n"));
    assert!(!script.contains("print(x)"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn convert_reports_extractor_timeout() -> Result<(), Box<dyn std::error::Error>> {
    let ws = workspace(
        r#"
[extractor]
program = "sh"
args = ["-c", "sleep 10", "{input}"]
timeout = "1s"
"#,
    );
    write_notebook(&ws.path().join("notebooks"), "slow", "x = 1");

    nbproc(ws.path())
        .args(["convert", "notebooks/slow.ipynb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stage 'extracted' failed"))
        .stderr(predicate::str::contains("timed out after 1s"));

    let leftovers: Vec<_> = fs::read_dir(ws.path().join("notebooks"))?
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with(".nbproc-"))
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}

#[test]
fn inspect_shows_line_tags_and_imports() -> Result<(), Box<dyn std::error::Error>> {
    let ws = workspace("");
    fs::write(
        ws.path().join("source.py"),
        "import pandas as pd\nfrom pyspark.sql import functions as F\n\nsession = get_active_session()\ndf = pd.DataFrame()\ndisplay(df)\n",
    )?;

    nbproc(ws.path())
        .args(["inspect", "source.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("platform-call"))
        .stdout(predicate::str::contains("bootstrap"))
        .stdout(predicate::str::contains("safe imports (1):"))
        .stdout(predicate::str::contains("blocked imports (1):"))
        .stdout(predicate::str::contains("  from pyspark.sql import functions as F  [pyspark.sql]"))
        .stdout(predicate::str::contains("  import pandas as pd  [pandas]"));
    Ok(())
}

#[test]
fn ddl_renders_one_statement_per_script() -> Result<(), Box<dyn std::error::Error>> {
    let ws = workspace("[registration]\npackages = [\"pandas\"]\n");
    let scripts = ws.path().join("scripts");
    fs::create_dir_all(&scripts)?;
    fs::write(scripts.join("daily_load.py"), "def main(session):\n    return 1\n")?;
    fs::write(scripts.join("weekly_load.py"), "def main(session):\n    return 2\n")?;

    nbproc(ws.path())
        .arg("ddl")
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE OR REPLACE PROCEDURE daily_load()"))
        .stdout(predicate::str::contains("CREATE OR REPLACE PROCEDURE weekly_load()"))
        .stdout(predicate::str::contains("PACKAGES = ('pandas')"))
        .stdout(predicate::str::contains("HANDLER = 'main'"));
    Ok(())
}

#[test]
fn ddl_fails_for_unembeddable_script() -> Result<(), Box<dyn std::error::Error>> {
    let ws = workspace("");
    let scripts = ws.path().join("scripts");
    fs::create_dir_all(&scripts)?;
    fs::write(scripts.join("bad.py"), "price = '$$'\n")?;

    nbproc(ws.path())
        .arg("ddl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("skipped"))
        .stderr(predicate::str::contains("1 script(s) could not be rendered"));
    Ok(())
}

#[test]
fn missing_explicit_config_is_an_error() {
    let ws = TempDir::new().unwrap();
    nbproc(ws.path())
        .args(["--config", "absent.toml", "batch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file"));
}
