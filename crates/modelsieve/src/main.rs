use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use modelsieve_core::config::{Config, CONFIG_FILE};
use modelsieve_core::pipeline::{find_project_root, IncrementalPass};
use modelsieve_core::types::TransformInputs;

use modelsieve_report::{json, text};

#[derive(Parser)]
#[command(name = "modelsieve")]
#[command(about = "Classify domain model types in an incremental build's change set")]
#[command(version)]
struct Cli {
    /// Config file path (defaults to .modelsieve.toml in the project root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the working set from a change manifest
    Scan {
        /// JSON change manifest produced by the host build tool
        manifest: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },
    /// Scan, then classify the direct units into model types
    Classify {
        /// JSON change manifest produced by the host build tool
        manifest: PathBuf,
        /// Extra classpath entries (directories or archives) for supertype resolution
        #[arg(long = "classpath", value_name = "PATH")]
        classpath: Vec<PathBuf>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },
    /// Create a default .modelsieve.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG, when set, overrides the level picked by the flags.
    let level = if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Scan {
            manifest,
            format,
            compact,
        } => cmd_scan(&manifest, config_path, format, compact),
        Commands::Classify {
            manifest,
            classpath,
            format,
            compact,
        } => cmd_classify(&manifest, config_path, classpath, format, compact),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn cmd_scan(
    manifest: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let inputs = load_manifest(manifest)?;
    let pass = IncrementalPass::new(load_config(manifest, config_path)?)?;
    let working_set = pass.scan(&inputs)?;
    match format {
        OutputFormat::Text => print!("{}", text::format_working_set(&working_set)),
        OutputFormat::Json => println!("{}", json::format_working_set(&working_set, compact)),
    }
    Ok(())
}

fn cmd_classify(
    manifest: &Path,
    config_path: Option<&Path>,
    classpath: Vec<PathBuf>,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let inputs = load_manifest(manifest)?;
    let pass = IncrementalPass::new(load_config(manifest, config_path)?)?.with_library(classpath);
    let outcome = pass.run(&inputs)?;
    match format {
        OutputFormat::Text => print!("{}", text::format_outcome(&outcome)),
        OutputFormat::Json => println!("{}", json::format_outcome(&outcome, compact)),
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn load_manifest(path: &Path) -> Result<TransformInputs> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest '{}'", path.display()))?;
    TransformInputs::from_json(&content)
        .with_context(|| format!("failed to parse manifest '{}'", path.display()))
}

/// An explicit config wins; otherwise search upward from the manifest's project root.
fn load_config(manifest: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => {
            let start = manifest
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let root = find_project_root(start).unwrap_or_else(|| start.to_path_buf());
            Ok(Config::load_or_default(&root))
        }
    }
}
