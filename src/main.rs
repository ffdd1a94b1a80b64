use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use charsheet_core::{GoogleTransport, RecordStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{ConfigCommand, SheetCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "charsheet")]
#[command(version)]
#[command(about = "Manage spreadsheet-backed character sheets", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Sheet(SheetCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "charsheet=warn,charsheet_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;
    tracing::debug!(
        "Loaded config from {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string())
    );

    match cli.command {
        Some(Commands::Sheet(cmd)) => {
            // Layout errors are fatal before any remote call
            let schema = config.schema()?;
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs.value))
                .build()?;
            let store = RecordStore::new(
                GoogleTransport::with_client(client),
                schema,
                config.store_config(),
            );
            let credential = config.credential();
            cmd.run(&store, &credential).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
