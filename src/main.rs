use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use modbot::application::errors::BotError;
use modbot::build_dispatcher;
use modbot::domain::traits::ChatPlatform;
use modbot::infrastructure::adapters::console::{self, ConsoleAdapter};
use modbot::infrastructure::adapters::SlackAdapter;
use modbot::infrastructure::config::Config;
use modbot::infrastructure::server::{self, AppState, SignatureVerifier};

#[derive(Parser)]
#[command(name = "modbot")]
#[command(about = "Slack bot that redirects people to the right channel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Slack events server
    Run,
    /// Chat with the bot from the terminal (`/im <text>` for a direct message, `/quit` to leave)
    Simulate,
    /// Generate default config
    InitConfig,
    /// Show version
    Version,
}

/// Map the `DEBUG_LEVEL` variable (logging level names or numbers) to a filter
fn debug_level_filter(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" | "10" => Some("debug"),
        "INFO" | "20" => Some("info"),
        "WARNING" | "WARN" | "30" => Some("warn"),
        "ERROR" | "CRITICAL" | "40" | "50" => Some("error"),
        _ => None,
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("DEBUG_LEVEL")
            .ok()
            .and_then(|l| debug_level_filter(&l))
            .unwrap_or("info");
        tracing_subscriber::EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => block_on(run_bot(&cli.config)),
        Commands::Simulate => block_on(simulate(&cli.config)),
        Commands::InitConfig => init_config(),
        Commands::Version => {
            println!("modbot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn block_on<F: std::future::Future<Output = Result<(), BotError>>>(future: F) -> Result<(), BotError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;
    rt.block_on(future)
}

fn load_config(config_path: &str) -> Result<Config, BotError> {
    if Path::new(config_path).exists() {
        Ok(Config::load(config_path)?)
    } else {
        tracing::info!("No {} found, using defaults and environment", config_path);
        Ok(Config::load_env())
    }
}

async fn run_bot(config_path: &str) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    config.validate()?;

    tracing::info!("Starting {}", config.bot.name);

    let platform: Arc<dyn ChatPlatform> = Arc::new(SlackAdapter::from_config(&config));
    let dispatcher = build_dispatcher(&config, platform).await?;
    tracing::info!("[Bot] Server started at {}", dispatcher.started_at());

    let secret = config.slack.signing_secret.clone().unwrap_or_default();
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        verifier: SignatureVerifier::new(secret),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
    };

    server::serve(&config.bind_address(), &config.server.api_endpoint, state, shutdown).await
}

async fn simulate(config_path: &str) -> Result<(), BotError> {
    let config = load_config(config_path)?;

    let platform: Arc<dyn ChatPlatform> = Arc::new(ConsoleAdapter::new());
    let dispatcher = build_dispatcher(&config, platform).await?;

    println!("modbot console. You are an admin; `/im <text>` talks to the bot privately, `/quit` exits.");
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let handled = console::run_simulation(&dispatcher, input).await?;
    tracing::info!("Simulation ended after {} messages", handled);
    Ok(())
}

fn init_config() -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}
