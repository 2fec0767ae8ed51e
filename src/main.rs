use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

use kodegen_bundler_unity::config::{BuildMode, ToolConfig};
use kodegen_bundler_unity::env::{self, OutputFormat};
use kodegen_bundler_unity::keystore::{self, request};
use kodegen_bundler_unity::{SetupError, error as error_msg, warn};

// ============================================================================
// ERROR HANDLING STRATEGY
// ============================================================================
//
// CRITICAL I/O - Errors propagated with `?` operator:
//   • Config sources, project metadata, keystore and backup files
//   • Operator input and the keytool process
//
// DECORATIVE I/O - Errors ignored with `let _ =`:
//   • Terminal coloring and status messages
//
// Every propagated error ends the run with exit code 1.
// ============================================================================

const USAGE: &str = "Usage: kodegen_unity env [dev|prod] [--format text|shell|json]";

#[derive(Parser)]
#[command(name = "kodegen_unity")]
#[command(version, about = "Resolve the Unity build environment and provision Android keystores")]
#[command(after_help = "The build mode is an argument of `env`, e.g. `kodegen_unity env prod`.")]
struct Cli {
    /// Unity project root
    #[arg(long, short = 'p', global = true, default_value = ".")]
    project: PathBuf,

    /// Path to tool config file (TOML); defaults to kodegen-unity.toml in the project
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Print diagnostic logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve build mode, merged settings and the Unity editor installation
    Env {
        /// Build mode: dev or prod (default: dev)
        mode: Option<String>,

        /// Unity Hub editor root (defaults to the platform install location)
        #[arg(long, env = "KODEGEN_UNITY_HUB_ROOT")]
        hub_root: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Create an Android signing keystore interactively
    Keystore,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error_msg!("{e:#}");
        if e.downcast_ref::<SetupError>().is_some_and(SetupError::wants_usage) {
            eprintln!("{USAGE}");
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("KODEGEN_LOG")
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Env {
            mode,
            hub_root,
            format,
        }) => run_env(&cli.project, cli.config.as_deref(), mode.as_deref(), hub_root, format).await,
        Some(Command::Keystore) => run_keystore(&cli.project, cli.config.as_deref()).await,
        None => {
            let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
            let mut buffer = bufwtr.buffer();
            let _ = writeln!(
                &mut buffer,
                "No command specified. Resolving the dev environment...\n"
            );
            let _ = bufwtr.print(&buffer);
            run_env(&cli.project, cli.config.as_deref(), None, None, OutputFormat::Text).await
        }
    }
}

async fn run_env(
    project: &Path,
    config_path: Option<&Path>,
    mode: Option<&str>,
    hub_root: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    // Reject an unknown mode before touching the filesystem
    BuildMode::from_arg(mode)?;

    let project = project_root(project).await?;
    let mut config = ToolConfig::load(config_path, &project).await?;
    if hub_root.is_some() {
        config.hub_root = hub_root;
    }

    let resolved = env::resolve(mode, &project, &config).await?;
    for warning in &resolved.warnings {
        warn!("{warning}");
    }

    env::print_resolved(&resolved, format)?;
    Ok(())
}

async fn run_keystore(project: &Path, config_path: Option<&Path>) -> Result<()> {
    let project = project_root(project).await?;
    let config = ToolConfig::load(config_path, &project).await?;

    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();
    let _ = writeln!(&mut buffer, "{}", "=".repeat(60));
    let _ = writeln!(&mut buffer, "🔐 Android Keystore Setup");
    let _ = writeln!(&mut buffer, "Project: {}", project.display());
    let _ = writeln!(&mut buffer, "Enter 'q' at the path prompt or press Ctrl+D at any prompt to cancel");
    let _ = writeln!(&mut buffer, "{}", "=".repeat(60));
    let _ = bufwtr.print(&buffer);

    let outcome = keystore::interactive_setup(&project, &config.keystore).await?;

    let mut buffer = bufwtr.buffer();
    let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
    let _ = writeln!(&mut buffer, "\n✅ Keystore ready: {}", outcome.keystore_path.display());
    let _ = buffer.reset();
    if outcome.persisted.is_none() {
        let _ = writeln!(&mut buffer, "\nTo use it in builds, set:");
        let _ = writeln!(&mut buffer, "   {}={}", request::KEYSTORE_PATH_KEY, outcome.keystore_path.display());
        let _ = writeln!(&mut buffer, "   {}={}", request::KEY_ALIAS_KEY, outcome.alias);
        let _ = writeln!(&mut buffer, "   {}=<keystore password>", request::KEYSTORE_PASSWORD_KEY);
        let _ = writeln!(&mut buffer, "   {}=<key password>", request::KEY_PASSWORD_KEY);
    }
    let _ = bufwtr.print(&buffer);

    Ok(())
}

async fn project_root(project: &Path) -> Result<PathBuf> {
    let root = tokio::fs::canonicalize(project)
        .await
        .with_context(|| format!("Project directory not found: {}", project.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Project path is not a directory: {}", root.display());
    }
    Ok(root)
}
