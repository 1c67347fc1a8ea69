mod app;
mod doctor_commands;
mod serve_commands;
mod stream_commands;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tidings_streams::StreamStore,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::app::App;

#[derive(Parser)]
#[command(
    name = "tidings",
    version,
    about = "Tidings — notification stream subscriptions and daily delivery"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./tidings.toml and the user config dir).
    #[arg(long, global = true, env = "TIDINGS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create an empty stream store.
    Init {
        /// Where to write the config (defaults to the user config dir).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// List available notification streams.
    Streams,
    /// Subscribe a user to a stream, or change how they are reached.
    Subscribe(stream_commands::SubscribeArgs),
    /// Remove a user from a stream.
    Unsubscribe(stream_commands::UnsubscribeArgs),
    /// Poll every stream once and deliver new events now.
    Run {
        /// Print the dispatch report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run the daily scheduler until interrupted.
    Serve {
        /// Also dispatch once immediately on startup.
        #[arg(long)]
        run_now: bool,
    },
    /// Validate configuration and check streams and sources.
    Doctor,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output and console deliveries.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn init(explicit_config: Option<PathBuf>, path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = path
        .or(explicit_config)
        .unwrap_or_else(tidings_config::find_or_default_config_path);

    if tidings_config::write_default_config(&config_path)? {
        println!("Wrote {}", config_path.display());
    } else {
        println!("Config already exists at {}", config_path.display());
    }

    let app = App::load(Some(&config_path))?;
    app.store
        .ensure_exists()
        .await
        .with_context(|| format!("failed to create {}", app.store.path().display()))?;
    println!("Stream store at {}", app.store.path().display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "tidings starting");

    let config = cli.config.clone();
    match cli.command {
        Commands::Init { path } => init(config, path).await,
        Commands::Doctor => doctor_commands::handle_doctor(config.as_deref()).await,
        command => {
            let app = App::load(config.as_deref())?;
            match command {
                Commands::Streams => stream_commands::list(&app).await,
                Commands::Subscribe(args) => stream_commands::subscribe(&app, args).await,
                Commands::Unsubscribe(args) => stream_commands::unsubscribe(&app, args).await,
                Commands::Run { json } => stream_commands::run(&app, json).await,
                Commands::Serve { run_now } => serve_commands::serve(&app, run_now).await,
                Commands::Init { .. } | Commands::Doctor => Ok(()),
            }
        },
    }
}
