use crate::logging::ConsoleOutput;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

/// Conversion settings loaded from `nbproc.toml`.
///
/// Every component is built from one of these values, so two deployment targets
/// can be converted side by side in one process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConverterConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    #[serde(default)]
    pub imports: ImportsConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub procedure: ProcedureConfig,

    #[serde(default)]
    pub registration: RegistrationConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Source and destination directories, relative to the workspace unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_notebook_dir")]
    pub notebook_dir: PathBuf,

    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,

    /// Parent for per-notebook scratch directories (default: next to each notebook).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Per-cell metadata keys written by the authoring platform.
    #[serde(default = "default_vendor_metadata_keys")]
    pub vendor_metadata_keys: Vec<String>,

    /// Per-cell metadata keys holding execution timing or state.
    #[serde(default = "default_execution_metadata_keys")]
    pub execution_metadata_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportsConfig {
    /// Case-insensitive substrings marking an import as platform-bound.
    #[serde(default = "default_blocklist")]
    pub blocklist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Regexes for display/debug calls dropped from the body.
    #[serde(default = "default_platform_call_patterns")]
    pub platform_call_patterns: Vec<String>,

    /// Regexes for statements that obtain the ambient platform session.
    #[serde(default = "default_bootstrap_patterns")]
    pub bootstrap_patterns: Vec<String>,

    #[serde(default = "default_comment_prefixes")]
    pub comment_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Run an external program such as `jupyter nbconvert`.
    #[default]
    Command,
    /// Flatten code cells in-process.
    Builtin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub kind: ExtractorKind,

    #[serde(default = "default_extractor_program")]
    pub program: String,

    /// Arguments with `{input}`, `{output_name}` and `{output_dir}` placeholders.
    #[serde(default = "default_extractor_args")]
    pub args: Vec<String>,

    /// Upper bound for one extractor run, e.g. `"120s"` or `"2m"`.
    #[serde(default = "default_extractor_timeout")]
    pub timeout: String,

    /// Extensions the extractor may produce, tried in order.
    #[serde(default = "default_output_extensions")]
    pub output_extensions: Vec<String>,
}

impl ExtractorConfig {
    pub fn timeout_duration(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(self.timeout.trim())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureConfig {
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    #[serde(default = "default_context_param")]
    pub context_param: String,

    #[serde(default = "default_indent_width")]
    pub indent_width: usize,

    /// Table the generated wrapper appends run records to.
    #[serde(default = "default_log_table")]
    pub log_table: String,

    #[serde(default = "default_script_extension")]
    pub script_extension: String,

    #[serde(default = "default_header_comment")]
    pub header_comment: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,

    #[serde(default = "default_packages")]
    pub packages: Vec<String>,

    #[serde(default = "default_returns")]
    pub returns: String,
}

/// `[logging]` table; resolved into `logging::config::LoggingConfig` at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_file: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_output: Option<ConsoleOutput>,
}

fn default_notebook_dir() -> PathBuf {
    PathBuf::from("notebooks")
}

fn default_script_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_vendor_metadata_keys() -> Vec<String> {
    vec!["application/vnd.databricks.v1+cell".to_string()]
}

fn default_execution_metadata_keys() -> Vec<String> {
    vec!["execution".to_string()]
}

fn default_blocklist() -> Vec<String> {
    [
        "pyspark",
        "spark",
        "databricks",
        "dbutils",
        "display",
        "streamlit",
        "snowflake.snowpark.context",
        "get_active_session",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_platform_call_patterns() -> Vec<String> {
    [
        r"\bdisplay\s*\(",
        r"\bdisplayHTML\s*\(",
        r"\bprint\s*\(",
        r"\.show\s*\(",
        r"\.head\s*\(",
        r"\bdbutils\.",
        r"\bget_ipython\s*\(",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_bootstrap_patterns() -> Vec<String> {
    vec![
        r"^\s*\w+\s*=\s*get_active_session\(\s*\)".to_string(),
        r"^\s*\w+\s*=\s*SparkSession\.builder".to_string(),
    ]
}

fn default_comment_prefixes() -> Vec<String> {
    vec!["#".to_string()]
}

fn default_extractor_program() -> String {
    "jupyter".to_string()
}

fn default_extractor_args() -> Vec<String> {
    [
        "nbconvert",
        "--to",
        "script",
        "{input}",
        "--output",
        "{output_name}",
        "--output-dir",
        "{output_dir}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_extractor_timeout() -> String {
    "120s".to_string()
}

fn default_output_extensions() -> Vec<String> {
    vec!["py".to_string(), "txt".to_string()]
}

fn default_entry_point() -> String {
    "main".to_string()
}

fn default_context_param() -> String {
    "session".to_string()
}

fn default_indent_width() -> usize {
    4
}

fn default_log_table() -> String {
    "ML_MONITORING.OPERATION_LOGS".to_string()
}

fn default_script_extension() -> String {
    "py".to_string()
}

fn default_header_comment() -> bool {
    true
}

fn default_runtime_version() -> String {
    "3.11".to_string()
}

fn default_packages() -> Vec<String> {
    [
        "snowflake-snowpark-python",
        "pandas",
        "numpy",
        "snowflake-ml-python",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_returns() -> String {
    "STRING".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            notebook_dir: default_notebook_dir(),
            script_dir: default_script_dir(),
            scratch_dir: None,
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        SanitizerConfig {
            vendor_metadata_keys: default_vendor_metadata_keys(),
            execution_metadata_keys: default_execution_metadata_keys(),
        }
    }
}

impl Default for ImportsConfig {
    fn default() -> Self {
        ImportsConfig {
            blocklist: default_blocklist(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            platform_call_patterns: default_platform_call_patterns(),
            bootstrap_patterns: default_bootstrap_patterns(),
            comment_prefixes: default_comment_prefixes(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            kind: ExtractorKind::default(),
            program: default_extractor_program(),
            args: default_extractor_args(),
            timeout: default_extractor_timeout(),
            output_extensions: default_output_extensions(),
        }
    }
}

impl Default for ProcedureConfig {
    fn default() -> Self {
        ProcedureConfig {
            entry_point: default_entry_point(),
            context_param: default_context_param(),
            indent_width: default_indent_width(),
            log_table: default_log_table(),
            script_extension: default_script_extension(),
            header_comment: default_header_comment(),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        RegistrationConfig {
            runtime_version: default_runtime_version(),
            packages: default_packages(),
            returns: default_returns(),
        }
    }
}
