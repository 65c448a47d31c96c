use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apidoc_ai::{
    BatchRequest, Config, ConfigLoader, EnhanceRequest, FailureStrategy, OperationError,
    Orchestrator, SummarizeRequest, ValidateRequest,
};

#[derive(Parser)]
#[command(name = "apidoc-ai")]
#[command(
    version,
    about = "AI summaries, enhancements and validation for API documentation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file; defaults to global + project config resolution
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize an endpoint (SummarizeRequest JSON)
    Summarize {
        file: PathBuf,
        #[arg(long, help = "Provider to use instead of the default")]
        provider: Option<String>,
    },

    /// Enhance documentation content (EnhanceRequest JSON)
    Enhance {
        file: PathBuf,
        #[arg(long, help = "Provider to use instead of the default")]
        provider: Option<String>,
    },

    /// Validate documentation content (ValidateRequest JSON)
    Validate {
        file: PathBuf,
        #[arg(long, help = "Provider to use instead of the default")]
        provider: Option<String>,
    },

    /// Run a batch of operations (BatchRequest JSON)
    Batch {
        file: PathBuf,
        #[arg(long, help = "Items run concurrently per chunk")]
        max_concurrency: Option<usize>,
        #[arg(long, help = "Abort at the first failed item")]
        stop_on_error: bool,
    },

    /// Check provider availability and show usage
    Providers,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a starter project configuration
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Ok(match path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid request in {}: {}", path.display(), e))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a response, or the error envelope with a failure exit code
fn report<T: Serialize>(result: Result<T, OperationError>) -> anyhow::Result<ExitCode> {
    match result {
        Ok(response) => {
            print_json(&response)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            print_json(&error)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Show { format } => {
                let config = load_config(cli.config.as_deref())?;
                ConfigLoader::show_config(&config, format == "json")?;
            }
            ConfigAction::Path => ConfigLoader::show_path(),
            ConfigAction::Init { force } => {
                let path = ConfigLoader::init_project(*force)?;
                println!("{}", path.display());
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(cli.config.as_deref())?;
    let orchestrator = Orchestrator::from_config(&config)?;
    let rt = Runtime::new()?;
    let work = run_command(&orchestrator, cli.command);

    rt.block_on(async {
        tokio::select! {
            result = work => result,
            _ = tokio::signal::ctrl_c() => {
                orchestrator.shutdown();
                anyhow::bail!("interrupted")
            }
        }
    })
}

async fn run_command(
    orchestrator: &Orchestrator,
    command: Commands,
) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Summarize { file, provider } => {
            let mut request: SummarizeRequest = read_json(&file)?;
            request.provider = provider.or(request.provider);
            report(orchestrator.summarize(request).await)
        }
        Commands::Enhance { file, provider } => {
            let mut request: EnhanceRequest = read_json(&file)?;
            request.provider = provider.or(request.provider);
            report(orchestrator.enhance(request).await)
        }
        Commands::Validate { file, provider } => {
            let mut request: ValidateRequest = read_json(&file)?;
            request.provider = provider.or(request.provider);
            report(orchestrator.validate(request).await)
        }
        Commands::Batch {
            file,
            max_concurrency,
            stop_on_error,
        } => {
            let mut request: BatchRequest = read_json(&file)?;
            let mut options = request
                .options
                .take()
                .unwrap_or_else(|| orchestrator.options().batch.clone());
            if let Some(max) = max_concurrency {
                options.max_concurrency = max;
            }
            if stop_on_error {
                options.failure_strategy = FailureStrategy::StopOnError;
            }
            request.options = Some(options);
            report(orchestrator.batch_process(request).await)
        }
        Commands::Providers => {
            let health = orchestrator.registry().health_check().await;
            let usage = orchestrator.usage_report();
            print_json(&serde_json::json!({
                "default": orchestrator.registry().default_name(),
                "available": health,
                "usage": usage,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { .. } => Ok(ExitCode::SUCCESS),
    }
}
