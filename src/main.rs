use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolshim::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "toolshim")]
#[command(about = "Tool-calling gateway for OpenAI-compatible backends", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve,

    /// Validate configuration and templates, then print the routing table
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration: --config, then ~/.toolshim/config.yaml, then
    // config/default.yaml, then built-in defaults plus environment.
    if let Some(path) = &cli.config {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }
    let config_path = cli.config.or_else(|| {
        Config::default_path()
            .into_iter()
            .chain(Some(PathBuf::from("config/default.yaml")))
            .find(|path| path.exists())
    });

    let (config, source) = match config_path {
        Some(path) => (Config::load(&path)?, path.display().to_string()),
        None => (Config::from_env()?, "environment".to_string()),
    };

    // Initialize logging
    init_logging(&config.logging.level, &config.logging.format)?;

    tracing::info!("toolshim starting...");
    tracing::info!("Config loaded from: {}", source);

    match cli.command {
        Some(Commands::Serve) | None => {
            toolshim::run(config).await?;
        }
        Some(Commands::Check) => {
            for line in toolshim::check(&config)? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str, format: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
