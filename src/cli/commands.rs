use crate::{
    cli::args::{BatchArgs, ConvertArgs, DdlArgs, InspectArgs},
    core::{
        config::loader::CONFIG_FILE_NAME, report::render_outcome, ConfigLoader, ConfigValidator,
        ConversionOutcome, ConverterConfig, ImportClassifier, LineFilter, PipelineDriver,
        RegistrationRenderer, SafetyFilter,
    },
    Result,
};
use anyhow::{anyhow, Context};
use std::env;
use std::path::{Path, PathBuf};

/// Canonical workspace root: the `--workspace` value or the current directory.
pub fn resolve_workspace(workspace: Option<&Path>) -> Result<PathBuf> {
    let root = match workspace {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("failed to read current directory")?,
    };
    root.canonicalize()
        .with_context(|| format!("workspace {} is not accessible", root.display()))
}

/// Load `--config` when given (it must exist), else `<workspace>/nbproc.toml` or defaults.
pub fn load_config(explicit: Option<&Path>, workspace: &Path) -> Result<ConverterConfig> {
    let config = match explicit {
        Some(path) => {
            let path = resolve_path(workspace, path);
            if !path.is_file() {
                return Err(anyhow!("config file {} not found", path.display()));
            }
            ConfigLoader::load(&path)?
        }
        None => ConfigLoader::load_from_workspace(workspace)
            .with_context(|| format!("failed to load {}", CONFIG_FILE_NAME))?,
    };
    ConfigValidator::validate(&config)?;
    Ok(config)
}

fn resolve_path(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

pub async fn convert(args: ConvertArgs, workspace: &Path, config: ConverterConfig) -> Result<()> {
    let notebook = resolve_path(workspace, &args.notebook);
    let output_dir = resolve_path(
        workspace,
        args.output_dir.as_deref().unwrap_or(config.paths.script_dir.as_path()),
    );
    let config = with_workspace_scratch(config, workspace);

    let driver = PipelineDriver::from_config(config)?;
    let conversion = driver
        .convert_notebook(&notebook, &output_dir)
        .await
        .map_err(|err| anyhow!("failed to convert {}: {}", notebook.display(), err))?;

    let outcome = ConversionOutcome::converted(conversion);
    println!("{}", render_outcome(&outcome));
    for warning in &outcome.warnings {
        println!("  warning: {}", warning);
    }
    Ok(())
}

pub async fn batch(args: BatchArgs, workspace: &Path, config: ConverterConfig) -> Result<()> {
    let notebook_dir = resolve_path(
        workspace,
        args.notebook_dir.as_deref().unwrap_or(config.paths.notebook_dir.as_path()),
    );
    let output_dir = resolve_path(
        workspace,
        args.output_dir.as_deref().unwrap_or(config.paths.script_dir.as_path()),
    );
    let config = with_workspace_scratch(config, workspace);

    let driver = PipelineDriver::from_config(config)?;
    let report = driver.convert_all(&notebook_dir, &output_dir).await?;
    let rendered = report
        .render(args.format)
        .context("failed to render batch report")?;
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }

    if report.has_failures() {
        return Err(anyhow!(
            "{} of {} notebook(s) failed",
            report.failed(),
            report.outcomes.len()
        ));
    }
    Ok(())
}

pub fn inspect(args: InspectArgs, workspace: &Path, config: &ConverterConfig) -> Result<()> {
    let path = resolve_path(workspace, &args.source);
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let line_filter = LineFilter::new(&config.filter, &config.imports)?;
    let imports = ImportClassifier::new().classify(&source);
    let partition = SafetyFilter::new(&config.imports).partition(imports);

    for line in line_filter.classify_lines(&source) {
        println!("{:>5}  {:<13} {}", line.number, line.tag.as_str(), line.text);
    }

    println!();
    println!("safe imports ({}):", partition.safe.len());
    for import in &partition.safe {
        println!("  {}  [{}]", import.text, import.module);
    }
    println!("blocked imports ({}):", partition.blocked.len());
    for import in &partition.blocked {
        println!("  {}  [{}]", import.text, import.module);
    }
    Ok(())
}

pub fn ddl(args: DdlArgs, workspace: &Path, config: &ConverterConfig) -> Result<()> {
    let script_dir = resolve_path(
        workspace,
        args.script_dir.as_deref().unwrap_or(config.paths.script_dir.as_path()),
    );
    let renderer = RegistrationRenderer::new(&config.registration, &config.procedure);
    let entries = renderer.render_dir(&script_dir, &config.procedure.script_extension)?;

    let mut failures = 0;
    for entry in entries {
        match entry.ddl {
            Ok(ddl) => println!("{}", ddl),
            Err(err) => {
                failures += 1;
                tracing::error!(script = %entry.script.display(), error = %err, "ddl not rendered");
                eprintln!("skipped {}: {}", entry.script.display(), err);
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} script(s) could not be rendered", failures));
    }
    Ok(())
}

/// Relative `paths.scratch_dir` values are anchored at the workspace.
fn with_workspace_scratch(mut config: ConverterConfig, workspace: &Path) -> ConverterConfig {
    if let Some(scratch) = config.paths.scratch_dir.take() {
        config.paths.scratch_dir = Some(resolve_path(workspace, &scratch));
    }
    config
}
