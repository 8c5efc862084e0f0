use clap::{Parser, Subcommand};
use orgbridge::{
    cache::CsvCache,
    config::{Config, ConfigLoader, ConfigValidator, LoggingConfig},
    error::Result,
    job::MigrationJob,
    prompt::{ConfirmPrompt, FixedPrompt, StdinPrompt},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "orgbridge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Record-set migration between orgs and flat-file directories",
    long_about = None
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ORGBRIDGE_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "ORGBRIDGE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration
    Run {
        /// Validate the plan and stop before any data moves
        #[arg(long)]
        dry_run: bool,

        /// Answer every confirmation prompt with yes (unattended runs)
        #[arg(long)]
        yes: bool,
    },
    /// Validate configuration
    Validate,
    /// Generate sample configuration
    GenerateSample,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (dry_run, assume_yes) = match cli.command {
        Some(Commands::GenerateSample) => {
            println!("{}", ConfigLoader::generate_sample());
            return Ok(());
        }
        Some(Commands::Version) => {
            println!("orgbridge v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(Commands::Validate) => {
            init_tracing(&cli.log_level, &LoggingConfig::default());
            let config = load_config(cli.config.as_deref())?;
            ConfigValidator::validate(&config)?;
            info!("Configuration is valid: {} objects", config.objects.len());
            return Ok(());
        }
        Some(Commands::Run { dry_run, yes }) => (dry_run, yes),
        None => (false, false),
    };

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&cli.log_level, &config.logging);
    info!("orgbridge v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "run {} ({}) started at {}: {} -> {}",
        config.app.run_id,
        config.app.name,
        chrono::Utc::now().to_rfc3339(),
        config.source.describe_label(),
        config.target.describe_label()
    );

    match run_migration(config, dry_run, assume_yes).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_user_abort() => {
            info!("{}", e);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e)
        }
    }
}

async fn run_migration(config: Config, dry_run: bool, assume_yes: bool) -> Result<()> {
    let cache = Arc::new(CsvCache::new());
    let source = MigrationJob::plane_for(&config.source, &config, Arc::clone(&cache));
    let target = MigrationJob::plane_for(&config.target, &config, Arc::clone(&cache));
    let prompt: Box<dyn ConfirmPrompt> = if assume_yes {
        Box::new(FixedPrompt(true))
    } else {
        Box::new(StdinPrompt)
    };

    let mut job = MigrationJob::prepare(config, source, target, prompt, cache).await?;
    info!("execution order: {}", job.task_order().join(" -> "));

    let summary = job.run(dry_run).await?;
    if summary.total_failed() > 0 {
        info!("run finished with {} failed records", summary.total_failed());
    } else {
        info!("run finished");
    }
    Ok(())
}

fn init_tracing(cli_level: &str, logging: &LoggingConfig) {
    let level = if cli_level == "info" && logging.level != "info" {
        logging.level.as_str()
    } else {
        cli_level
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("orgbridge={},info", level)));

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}
