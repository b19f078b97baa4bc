pub mod args;
pub mod commands;

pub use args::{BatchArgs, ConvertArgs, DdlArgs, InspectArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n\
{after-help}\n";

const ENV_HELP: &str = "\
Environment overrides (take precedence over nbproc.toml):
    NBPROC_NOTEBOOK_DIR       source notebook directory
    NBPROC_SCRIPT_DIR         generated script directory
    NBPROC_EXTRACTOR_PROGRAM  extractor program (default: jupyter)
    NBPROC_EXTRACTOR_TIMEOUT  extractor timeout (default: 120s)
    NBPROC_LOG_TABLE          run log table written by generated procedures
    NBPROC_ENTRY_POINT        generated entry point name (default: main)
    NBPROC_CI                 set to 1 to keep logs on stderr in every command";

#[derive(Parser, Debug)]
#[command(name = "nbproc")]
#[command(version = crate::VERSION)]
#[command(about = "Convert notebooks into instrumented stored-procedure scripts")]
#[command(help_template = HELP_TEMPLATE)]
#[command(after_long_help = ENV_HELP)]
pub struct Args {
    /// Configuration file (default: <workspace>/nbproc.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Workspace root that relative paths resolve against (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Convert one notebook",
        long_about = "Convert sanitizes a notebook, extracts its code, drops platform-bound imports and display calls, and writes the instrumented script.",
        after_help = "Example:\n    nbproc convert notebooks/sales_forecast.ipynb --output-dir scripts"
    )]
    Convert(ConvertArgs),
    #[command(
        about = "Convert every notebook in a directory",
        long_about = "Batch converts each *.ipynb in file-name order. A failing notebook is reported and the rest still run; the exit code is 1 if any failed.",
        after_help = "Example:\n    nbproc batch --notebook-dir notebooks --format json"
    )]
    Batch(BatchArgs),
    #[command(
        about = "Show how an extracted source file is classified",
        long_about = "Inspect prints the tag of every line plus the safe and blocked imports, to help tune filter patterns and the blocklist.",
        after_help = "Example:\n    nbproc inspect build/sales_forecast.py"
    )]
    Inspect(InspectArgs),
    #[command(
        about = "Print registration DDL for generated scripts",
        long_about = "Ddl renders one CREATE OR REPLACE PROCEDURE statement per generated script. Nothing is executed.",
        after_help = "Example:\n    nbproc ddl --script-dir scripts > register.sql"
    )]
    Ddl(DdlArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let workspace = commands::resolve_workspace(args.workspace.as_deref())?;
    let config = commands::load_config(args.config.as_deref(), &workspace)?;
    let logging = crate::logging::init(&args.command, &workspace, &config.logging)?;
    tracing::debug!(
        log_file = %logging.log_file_path().display(),
        console = %logging.console_output(),
        "logging initialized"
    );

    match args.command {
        Command::Convert(convert_args) => commands::convert(convert_args, &workspace, config).await,
        Command::Batch(batch_args) => commands::batch(batch_args, &workspace, config).await,
        Command::Inspect(inspect_args) => commands::inspect(inspect_args, &workspace, &config),
        Command::Ddl(ddl_args) => commands::ddl(ddl_args, &workspace, &config),
    }
}
