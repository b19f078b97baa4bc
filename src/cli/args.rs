use crate::core::OutputFormat;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Notebook document to convert (.ipynb)
    #[arg(value_name = "NOTEBOOK")]
    pub notebook: PathBuf,

    /// Directory for the generated script (default: paths.script_dir)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Directory scanned for *.ipynb files (default: paths.notebook_dir)
    #[arg(long, value_name = "DIR")]
    pub notebook_dir: Option<PathBuf>,

    /// Directory for generated scripts (default: paths.script_dir)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Already extracted source file to classify
    #[arg(value_name = "SOURCE_FILE")]
    pub source: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct DdlArgs {
    /// Directory holding generated scripts (default: paths.script_dir)
    #[arg(long, value_name = "DIR")]
    pub script_dir: Option<PathBuf>,
}
