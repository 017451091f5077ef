//! orc-server — agent orchestration engine gateway
//!
//! Usage:
//!   orc-server serve      → bind and serve the JSON-RPC gateway
//!   orc-server version    → print the version and exit

use std::sync::Arc;

use clap::{Parser, Subcommand};
use orc_core::config::{ExecutorConfig, GatewayConfig, ModelConfig, StoreConfig};
use orc_executor::Executor;
use orc_gateway::{serve, AppState};
use orc_store::{InMemoryStore, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "orc-server",
    about = "Agent orchestration engine gateway",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind and serve the JSON-RPC gateway (default when no subcommand given).
    Serve,
    /// Print the version and exit.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Version => {
            println!("orc-server {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Serve => {
            init_tracing();
            run_server().await?;
        }
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orc_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run_server() -> anyhow::Result<()> {
    let executor_config = Arc::new(ExecutorConfig::from_env());
    let model_config = Arc::new(ModelConfig::from_env());
    let gateway_config = GatewayConfig::from_env();
    let store_config = StoreConfig::from_env();
    tracing::info!(
        uri = store_config.uri.as_deref().unwrap_or("(unset)"),
        database = store_config.database.as_deref().unwrap_or("(unset)"),
        "store configuration (in-process store does not require these to be set)"
    );

    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let model = orc_llm::select_provider(&model_config);
    let executor = Arc::new(Executor::new(store.clone(), model, executor_config.clone(), model_config.clone()));

    let state = AppState::new(store, executor, executor_config, model_config);
    serve(state, gateway_config.port).await
}
