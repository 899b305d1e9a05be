pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod services;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;
use db::Store;
pub use error::Error;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    let args = cli::Cli::parse();

    match args.command.unwrap_or(cli::Commands::Serve) {
        cli::Commands::Serve => run_server(config).await,

        cli::Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("Config file already exists.");
            }
            Ok(())
        }

        cli::Commands::AddUser { name, password } => cmd_add_user(&config, &name, &password).await,

        cli::Commands::Promote { name } => cmd_promote(&config, &name).await,
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("linkarr v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let state = api::create_app_state(config).await?;
    let app = api::router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}

async fn cmd_add_user(config: &Config, name: &str, password: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let user = store.create_user(name, password).await?;

    println!("✓ Created user '{}' (ID: {})", user.name, user.id);
    println!("  Promote to admin with: linkarr promote {}", user.name);
    Ok(())
}

async fn cmd_promote(config: &Config, name: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let user = store.promote_admin(name).await?;

    println!("✓ '{}' is now an admin", user.name);
    Ok(())
}
